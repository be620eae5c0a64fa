//! Bounded, priority-ordered message queue
//!
//! No message-queue primitive exists anywhere in the corpus this crate
//! grew out of; this module is new code, grounded in the semaphore's
//! pending-list/post-wakes-waiter pattern and in the "safe wrapper over a
//! raw, `UnsafeCell`-guarded struct" shape used throughout `sync::sem`.
//! Message storage is externally supplied (a `&'static mut [*const ()]`
//! buffer), matching this crate's no-dynamic-allocation discipline.

use core::cell::UnsafeCell;

use crate::config::MAX_QUEUES;
use crate::core::cs_cell::CsCell;
use crate::core::lists::PendingList;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::types::{OsPendOn, OsTaskState};

/// Bounded circular message queue core. Application code interacts with
/// it only through [`Queue`] or a pool-allocated [`QueueHandle`].
pub struct OsQueue {
    buffer: *mut *const (),
    capacity: usize,
    count: usize,
    head: usize,
    tail: usize,
    pend_list: PendingList,
}

impl OsQueue {
    /// Create an empty, uninitialized queue. Must be populated by
    /// [`OsQueue::create`] before use.
    pub const fn new() -> Self {
        OsQueue {
            buffer: core::ptr::null_mut(),
            capacity: 0,
            count: 0,
            head: 0,
            tail: 0,
            pend_list: PendingList::new(),
        }
    }

    fn create(&mut self, buffer: &'static mut [*const ()]) -> OsResult<()> {
        if buffer.is_empty() {
            return Err(OsError::QCapacityInvalid);
        }
        self.buffer = buffer.as_mut_ptr();
        self.capacity = buffer.len();
        self.count = 0;
        self.head = 0;
        self.tail = 0;
        self.pend_list.init();
        Ok(())
    }

    /// Post a message. Not a blocking call for any caller — task, ISR
    /// handler, or otherwise. A full queue is not an error: it is a
    /// return-coded condition ("did not deliver") the caller must check.
    ///
    /// # Returns
    /// `Ok(true)` if the message was stored, `Ok(false)` if the queue was
    /// full and nothing was stored.
    pub fn post(&mut self, msg: *const ()) -> OsResult<bool> {
        critical_section(|_cs| {
            if self.count == self.capacity {
                return Ok(false);
            }

            unsafe { *self.buffer.add(self.tail) = msg };
            self.tail = (self.tail + 1) % self.capacity;
            self.count += 1;

            if let Some(tcb_ptr) = self.pend_list.pop_head() {
                let tcb = unsafe { &mut *tcb_ptr.as_ptr() };
                tcb.pend_on = OsPendOn::Nothing;
                tcb.task_state = OsTaskState::Ready;
                unsafe { crate::sched::ready_insert(tcb_ptr) };

                if !is_isr_context() {
                    crate::sched::schedule();
                }
            }

            Ok(true)
        })
    }

    /// Wait for and receive a message, blocking the calling task if the
    /// queue is currently empty.
    ///
    /// # Errors
    /// * `PendIsr` - called from ISR context
    /// * `OsNotRunning` - scheduler not running
    pub fn pend(&mut self) -> OsResult<*const ()> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        critical_section(|_cs| {
            if self.count == 0 {
                unsafe {
                    if let Some(cur_tcb_ptr) = kernel::tcb_cur_ptr() {
                        let cur_tcb = &mut *cur_tcb_ptr.as_ptr();

                        crate::sched::ready_remove(cur_tcb_ptr);
                        cur_tcb.pend_on = OsPendOn::Queue;
                        cur_tcb.task_state = OsTaskState::Pending;

                        self.pend_list.insert_by_prio(cur_tcb_ptr);
                    }
                }

                crate::sched::schedule();

                // `schedule()` only returns control here once this task is
                // back at the ready-list head, which `post` only does
                // after storing a message and incrementing `count` — so
                // `count > 0` is guaranteed on every wakeup path, not just
                // the immediately-available one above.
                debug_assert!(self.count > 0);
            }

            let msg = unsafe { *self.buffer.add(self.head) };
            self.head = (self.head + 1) % self.capacity;
            self.count -= 1;

            Ok(msg)
        })
    }

    /// Number of unread messages currently buffered.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Total buffer capacity.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for OsQueue {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsQueue {}
unsafe impl Sync for OsQueue {}

// ============ Safe wrapper ============

/// A queue safe to share as a `'static` reference, backed by a
/// caller-supplied static buffer.
pub struct Queue {
    inner: UnsafeCell<OsQueue>,
}

unsafe impl Sync for Queue {}
unsafe impl Send for Queue {}

impl Queue {
    pub const fn new() -> Self {
        Queue {
            inner: UnsafeCell::new(OsQueue::new()),
        }
    }

    pub fn create(&self, buffer: &'static mut [*const ()]) -> OsResult<()> {
        unsafe { (*self.inner.get()).create(buffer) }
    }

    pub fn post(&self, msg: *const ()) -> OsResult<bool> {
        unsafe { (*self.inner.get()).post(msg) }
    }

    pub fn pend(&self) -> OsResult<*const ()> {
        unsafe { (*self.inner.get()).pend() }
    }

    #[inline]
    pub fn count(&self) -> usize {
        unsafe { (*self.inner.get()).count() }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        unsafe { (*self.inner.get()).capacity() }
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Static pool ============

impl Clone for OsQueue {
    fn clone(&self) -> Self {
        // Only ever used to fill the static pool's initializer array,
        // before any queue in it has been created.
        OsQueue::new()
    }
}
impl Copy for OsQueue {}

/// Static pool of queues, sized by [`crate::config::MAX_QUEUES`].
/// `queue_create` hands out handles from here; there is no deletion.
static QUEUE_POOL: CsCell<[OsQueue; MAX_QUEUES]> = CsCell::new([OsQueue::new(); MAX_QUEUES]);

static NEXT_QUEUE: core::sync::atomic::AtomicUsize = core::sync::atomic::AtomicUsize::new(0);

/// A handle to a pool-allocated queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle(usize);

impl QueueHandle {
    fn get(&self) -> &'static mut OsQueue {
        unsafe { &mut QUEUE_POOL.get_unchecked()[self.0] }
    }

    pub fn post(&self, msg: *const ()) -> OsResult<bool> {
        self.get().post(msg)
    }

    pub fn pend(&self) -> OsResult<*const ()> {
        self.get().pend()
    }

    pub fn count(&self) -> usize {
        self.get().count()
    }

    pub fn capacity(&self) -> usize {
        self.get().capacity()
    }
}

/// Create a queue from the static pool, backed by `buffer`.
///
/// # Errors
/// * `CreateIsr` - called from ISR context
/// * `QCapacityInvalid` - `buffer` is empty
/// * `QueuePoolExhausted` - the static queue pool is full
pub fn queue_create(buffer: &'static mut [*const ()]) -> OsResult<QueueHandle> {
    if is_isr_context() {
        return Err(OsError::CreateIsr);
    }

    critical_section(|cs| {
        let slot = NEXT_QUEUE.load(core::sync::atomic::Ordering::Relaxed);
        if slot >= MAX_QUEUES {
            return Err(OsError::QueuePoolExhausted);
        }
        NEXT_QUEUE.store(slot + 1, core::sync::atomic::Ordering::Relaxed);

        let pool = QUEUE_POOL.get(cs);
        pool[slot].create(buffer)?;

        Ok(QueueHandle(slot))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::OsTcb;
    use core::ptr::NonNull;

    static mut BUF1: [*const (); 1] = [core::ptr::null(); 1];
    static mut BUF2: [*const (); 2] = [core::ptr::null(); 2];

    #[test]
    fn post_returns_ok_false_when_queue_is_full() {
        let mut q = OsQueue::new();
        unsafe { q.create(&mut BUF2).unwrap() };
        assert_eq!(q.post(1usize as *const ()), Ok(true));
        assert_eq!(q.post(2usize as *const ()), Ok(true));
        assert_eq!(q.post(3usize as *const ()), Ok(false));
        assert_eq!(q.count(), 2);
    }

    /// Messages are delivered in the order they were posted, independent
    /// of any task's priority.
    #[test]
    fn pend_delivers_messages_in_post_order() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        let mut q = OsQueue::new();
        unsafe { q.create(&mut BUF2).unwrap() };
        q.post(10usize as *const ()).unwrap();
        q.post(20usize as *const ()).unwrap();
        assert_eq!(q.pend().unwrap() as usize, 10);
        assert_eq!(q.pend().unwrap() as usize, 20);
        assert_eq!(q.count(), 0);
    }

    /// A `post` that fills an empty queue wakes the highest-priority
    /// waiter first, same wake discipline as the semaphore's pending list.
    #[test]
    fn post_wakes_highest_priority_waiter_first() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        let mut q = OsQueue::new();
        unsafe { q.create(&mut BUF1).unwrap() };

        let mut tcb_b = OsTcb::new();
        tcb_b.prio = 52;
        tcb_b.pend_on = OsPendOn::Queue;
        tcb_b.task_state = OsTaskState::Pending;
        let mut tcb_c = OsTcb::new();
        tcb_c.prio = 53;
        tcb_c.pend_on = OsPendOn::Queue;
        tcb_c.task_state = OsTaskState::Pending;
        let mut tcb_a = OsTcb::new();
        tcb_a.prio = 51;
        tcb_a.pend_on = OsPendOn::Queue;
        tcb_a.task_state = OsTaskState::Pending;

        let ptr_b = NonNull::from(&mut tcb_b);
        let ptr_c = NonNull::from(&mut tcb_c);
        let ptr_a = NonNull::from(&mut tcb_a);

        // Arrival order B, C, A -- deliberately not priority order.
        q.pend_list.insert_by_prio(ptr_b);
        q.pend_list.insert_by_prio(ptr_c);
        q.pend_list.insert_by_prio(ptr_a);

        q.post(1usize as *const ()).unwrap();
        assert_eq!(unsafe { ptr_a.as_ref() }.task_state, OsTaskState::Ready);
        assert_eq!(q.pend_list.head(), Some(ptr_b));
        unsafe { crate::sched::ready_remove(ptr_a) };
        let _ = q.pend().unwrap();

        q.post(2usize as *const ()).unwrap();
        assert_eq!(q.pend_list.head(), Some(ptr_c));
        unsafe { crate::sched::ready_remove(ptr_b) };
        let _ = q.pend().unwrap();

        q.post(3usize as *const ()).unwrap();
        assert!(q.pend_list.is_empty());
        unsafe { crate::sched::ready_remove(ptr_c) };
        let _ = q.pend().unwrap();
    }

    #[test]
    fn queue_create_rejects_empty_buffer() {
        static mut EMPTY: [*const (); 0] = [];
        let _g = crate::test_support::lock();
        assert_eq!(
            unsafe { queue_create(&mut EMPTY) },
            Err(OsError::QCapacityInvalid)
        );
    }

    #[test]
    fn queue_create_pool_exhaustion() {
        let _g = crate::test_support::lock();

        static mut BUFS: [[*const (); 1]; MAX_QUEUES] = [[core::ptr::null(); 1]; MAX_QUEUES];
        static mut OVERFLOW_BUF: [*const (); 1] = [core::ptr::null(); 1];

        for buf in unsafe { BUFS.iter_mut() } {
            assert!(queue_create(buf).is_ok());
        }
        assert_eq!(
            queue_create(unsafe { &mut OVERFLOW_BUF }),
            Err(OsError::QueuePoolExhausted)
        );
    }
}
