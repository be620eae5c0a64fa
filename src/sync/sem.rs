//! Counting semaphore
//!
//! The count is a signed integer: a positive value is available permits, a
//! negative value is the (negated) number of tasks on the pending list.
//! `pend` always decrements first and blocks only if the value it read was
//! `<= 0`; `post` always increments first and wakes a waiter only if the
//! value it read was `< 0`. Reading the prior value before mutating it is
//! what makes the post/waiter test race-free under the critical section.

use core::cell::UnsafeCell;

use crate::config::MAX_SEMAPHORES;
use crate::core::cs_cell::CsCell;
use crate::core::lists::PendingList;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::types::{OsPendOn, OsSemCtr, OsTaskState};

/// Counting semaphore core. Application code interacts with it only
/// through [`Semaphore`], which provides a `Sync` wrapper over this.
pub struct OsSem {
    pend_list: PendingList,
    count: OsSemCtr,
}

impl OsSem {
    /// Create a semaphore with the given initial count.
    pub const fn new(count: OsSemCtr) -> Self {
        OsSem {
            pend_list: PendingList::new(),
            count,
        }
    }

    fn create(&mut self, count: OsSemCtr) {
        self.pend_list.init();
        self.count = count;
    }

    /// Wait on (pend) the semaphore. Blocks the calling task if, after
    /// decrementing, the semaphore has no permit left to give it.
    ///
    /// # Errors
    /// * `PendIsr` - called from ISR context
    /// * `OsNotRunning` - scheduler not running
    pub fn pend(&mut self) -> OsResult<OsSemCtr> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        critical_section(|_cs| {
            let old = self.count;
            self.count -= 1;

            if old <= 0 {
                unsafe {
                    if let Some(cur_tcb_ptr) = kernel::tcb_cur_ptr() {
                        let cur_tcb = &mut *cur_tcb_ptr.as_ptr();

                        crate::sched::ready_remove(cur_tcb_ptr);
                        cur_tcb.pend_on = OsPendOn::Semaphore;
                        cur_tcb.task_state = OsTaskState::Pending;

                        self.pend_list.insert_by_prio(cur_tcb_ptr);
                    }
                }

                crate::sched::schedule();
            }

            Ok(self.count)
        })
    }

    /// Signal (post) the semaphore. Wakes the highest priority waiter if
    /// the prior value indicated one was pending.
    ///
    /// # Errors
    /// * `SemOvf` - the count is already at its maximum
    pub fn post(&mut self) -> OsResult<OsSemCtr> {
        critical_section(|_cs| {
            if self.count == OsSemCtr::MAX {
                return Err(OsError::SemOvf);
            }

            let old = self.count;
            self.count += 1;

            if old < 0 {
                if let Some(tcb_ptr) = self.pend_list.pop_head() {
                    let tcb = unsafe { &mut *tcb_ptr.as_ptr() };
                    tcb.pend_on = OsPendOn::Nothing;
                    tcb.task_state = OsTaskState::Ready;
                    unsafe { crate::sched::ready_insert(tcb_ptr) };
                }
            }

            if !is_isr_context() {
                crate::sched::schedule();
            }

            Ok(self.count)
        })
    }

    /// Current signed count: positive is available permits, negative is
    /// the negated number of pending waiters.
    #[inline(always)]
    pub fn count(&self) -> OsSemCtr {
        self.count
    }
}

impl Default for OsSem {
    fn default() -> Self {
        Self::new(0)
    }
}

unsafe impl Send for OsSem {}
unsafe impl Sync for OsSem {}

// ============ Safe wrapper ============

/// A semaphore safe to share as a `'static` reference. Interior mutability
/// is guarded by the global critical section, not a lock-per-object, since
/// the whole point of a single-core RTOS core is that only one task (or
/// ISR) ever actually runs at a time.
pub struct Semaphore {
    inner: UnsafeCell<OsSem>,
}

unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    pub const fn new(count: OsSemCtr) -> Self {
        Semaphore {
            inner: UnsafeCell::new(OsSem::new(count)),
        }
    }

    pub fn wait(&self) -> OsResult<OsSemCtr> {
        unsafe { (*self.inner.get()).pend() }
    }

    pub fn signal(&self) -> OsResult<OsSemCtr> {
        unsafe { (*self.inner.get()).post() }
    }

    #[inline]
    pub fn count(&self) -> OsSemCtr {
        unsafe { (*self.inner.get()).count() }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

// ============ Static pool ============

/// Static pool of semaphores, sized by [`crate::config::MAX_SEMAPHORES`].
/// `sem_create` hands out handles from here; there is no deletion.
static SEM_POOL: CsCell<[OsSem; MAX_SEMAPHORES]> =
    CsCell::new([OsSem::new(0); MAX_SEMAPHORES]);

static NEXT_SEM: core::sync::atomic::AtomicUsize = core::sync::atomic::AtomicUsize::new(0);

impl Clone for OsSem {
    fn clone(&self) -> Self {
        // Only ever called to fill the static pool's initializer array,
        // before any semaphore in it has been created or touched.
        OsSem::new(self.count)
    }
}
impl Copy for OsSem {}

/// A handle to a pool-allocated semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemHandle(usize);

impl SemHandle {
    fn get(&self) -> &'static mut OsSem {
        unsafe { &mut SEM_POOL.get_unchecked()[self.0] }
    }

    pub fn wait(&self) -> OsResult<OsSemCtr> {
        self.get().pend()
    }

    pub fn signal(&self) -> OsResult<OsSemCtr> {
        self.get().post()
    }

    pub fn count(&self) -> OsSemCtr {
        self.get().count()
    }
}

/// Create a semaphore from the static pool.
///
/// # Errors
/// * `CreateIsr` - called from ISR context
/// * `SemPoolExhausted` - the static semaphore pool is full
pub fn sem_create(count: OsSemCtr) -> OsResult<SemHandle> {
    if is_isr_context() {
        return Err(OsError::CreateIsr);
    }

    critical_section(|cs| {
        let slot = NEXT_SEM.load(core::sync::atomic::Ordering::Relaxed);
        if slot >= MAX_SEMAPHORES {
            return Err(OsError::SemPoolExhausted);
        }
        NEXT_SEM.store(slot + 1, core::sync::atomic::Ordering::Relaxed);

        let pool = SEM_POOL.get(cs);
        pool[slot].create(count);

        Ok(SemHandle(slot))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel;
    use crate::task::OsTcb;
    use core::ptr::NonNull;

    #[test]
    fn pend_does_not_block_while_a_permit_is_available() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        let mut sem = OsSem::new(1);
        let remaining = sem.pend().unwrap();
        assert_eq!(remaining, 0);
        assert!(sem.pend_list.is_empty());
    }

    #[test]
    fn post_rejects_overflow_without_mutating_count() {
        let mut sem = OsSem::new(OsSemCtr::MAX);
        assert_eq!(sem.post(), Err(OsError::SemOvf));
        assert_eq!(sem.count(), OsSemCtr::MAX);
    }

    /// B(2) pends, then C(3), then A(1); a single post always wakes the
    /// highest-priority waiter regardless of arrival order, and three
    /// posts drain the pending list exactly in A, B, C order with the
    /// value returning to its starting point.
    #[test]
    fn post_wakes_highest_priority_waiter_first() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        let mut sem = OsSem::new(0);

        let mut tcb_b = OsTcb::new();
        tcb_b.prio = 52;
        let mut tcb_c = OsTcb::new();
        tcb_c.prio = 53;
        let mut tcb_a = OsTcb::new();
        tcb_a.prio = 51;

        let ptr_b = NonNull::from(&mut tcb_b);
        let ptr_c = NonNull::from(&mut tcb_c);
        let ptr_a = NonNull::from(&mut tcb_a);

        // Arrival order B, C, A -- deliberately not priority order.
        for ptr in [ptr_b, ptr_c, ptr_a] {
            unsafe {
                crate::sched::ready_insert(ptr);
                kernel::set_tcb_cur_ptr(Some(ptr));
            }
            sem.pend().unwrap();
        }
        assert_eq!(sem.count(), -3);

        sem.post().unwrap();
        assert_eq!(sem.pend_list.head(), Some(ptr_b));
        unsafe { crate::sched::ready_remove(ptr_a) };

        sem.post().unwrap();
        assert_eq!(sem.pend_list.head(), Some(ptr_c));
        unsafe { crate::sched::ready_remove(ptr_b) };

        sem.post().unwrap();
        assert!(sem.pend_list.is_empty());
        unsafe { crate::sched::ready_remove(ptr_c) };

        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn sem_create_pool_exhaustion() {
        let _g = crate::test_support::lock();

        let mut last = Ok(SemHandle(0));
        for _ in 0..MAX_SEMAPHORES {
            last = sem_create(0);
            assert!(last.is_ok());
        }
        let _ = last;
        assert_eq!(sem_create(0), Err(OsError::SemPoolExhausted));
    }
}
