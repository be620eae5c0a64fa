//! Task management module
//!
//! Provides task creation from a static, fixed-capacity pool. There is no
//! dynamic allocator: every `OsTcb` this crate ever hands out lives in the
//! `TASK_POOL` array, sized by [`crate::config::MAX_TASKS`] at build time.

mod tcb;

pub use tcb::OsTcb;

use core::ptr::NonNull;

use crate::config::{CFG_STK_SIZE_MIN, MAX_TASKS};
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::types::{OsPrio, OsStkElement, OsTaskId, OsTaskState};

/// Task entry point function type
pub type OsTaskFn = fn(*mut ()) -> !;

/// Static pool of task control blocks. `new_task` hands out slots from
/// here; there is no reuse once a slot is taken, since this crate has no
/// task deletion (Non-goal).
static TASK_POOL: CsCell<[OsTcb; MAX_TASKS]> = CsCell::new([OsTcb::new(); MAX_TASKS]);

/// Index of the next free pool slot. Index `0` is reserved for the idle
/// task, which is created directly by [`kernel::init`] rather than drawn
/// from this pool, so allocation starts at `1`.
static NEXT_SLOT: core::sync::atomic::AtomicUsize = core::sync::atomic::AtomicUsize::new(1);

/// A live task. Opaque handle over the pool-allocated TCB; application
/// code never touches `OsTcb` fields directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(NonNull<OsTcb>);

unsafe impl Send for TaskHandle {}
unsafe impl Sync for TaskHandle {}

impl TaskHandle {
    #[inline]
    pub fn id(&self) -> OsTaskId {
        unsafe { self.0.as_ref().task_id }
    }

    #[inline]
    pub fn prio(&self) -> OsPrio {
        unsafe { self.0.as_ref().prio }
    }

    #[inline]
    pub(crate) fn as_nonnull(&self) -> NonNull<OsTcb> {
        self.0
    }
}

/// Whether `prio` is already held by a task, blocked, delayed, or ready.
/// Backed by the global priority registry rather than a list walk: the
/// ready list alone can never see a task that is currently delayed or
/// pending on a semaphore/queue, so a list walk would let such a task's
/// priority be handed out a second time.
fn prio_in_use(prio: OsPrio) -> bool {
    unsafe { kernel::prio_is_used(prio) }
}

fn init_tcb(
    tcb_ref: &mut OsTcb,
    task_id: OsTaskId,
    name: &'static str,
    task_fn: OsTaskFn,
    arg: *mut (),
    prio: OsPrio,
    stk_base: *mut OsStkElement,
    stk_size: usize,
) {
    tcb_ref.init();
    tcb_ref.task_id = task_id;
    tcb_ref.name = name;
    tcb_ref.prio = prio;
    tcb_ref.task_state = OsTaskState::Ready;

    unsafe { kernel::prio_mark_used(prio) };

    let stk_ptr = unsafe { crate::port::os_task_stk_init(task_fn, arg, stk_base, stk_size) };
    tcb_ref.stk_ptr = stk_ptr;
    tcb_ref.stk_base = stk_base;
    tcb_ref.stk_size = stk_size;

    tcb_ref.task_entry_addr = task_fn as u32;
    tcb_ref.task_entry_arg = arg;
}

/// Create a new task.
///
/// The task is created in the ready state and, if the scheduler is already
/// running, may preempt the caller immediately if its priority is higher.
///
/// # Arguments
/// * `name` - Task name, for diagnostics
/// * `task_fn` - Task entry point; must never return
/// * `arg` - Opaque argument passed to `task_fn`
/// * `prio` - Task priority; must be unique and less than `LOWEST_PRIORITY`
/// * `stack` - Statically allocated stack for this task
///
/// # Errors
/// * `TaskCreateIsr` - called from ISR context
/// * `PrioInvalid` - `prio >= LOWEST_PRIORITY`
/// * `PrioExist` - another live task already holds `prio`
/// * `StkSizeInvalid` - stack smaller than `CFG_STK_SIZE_MIN`
/// * `TaskPoolExhausted` - the static task pool is full
pub fn new_task(
    name: &'static str,
    task_fn: OsTaskFn,
    arg: *mut (),
    prio: OsPrio,
    stack: &'static mut [OsStkElement],
) -> OsResult<TaskHandle> {
    if is_isr_context() {
        return Err(OsError::TaskCreateIsr);
    }
    if prio >= crate::config::LOWEST_PRIORITY {
        return Err(OsError::PrioInvalid);
    }
    if stack.len() < CFG_STK_SIZE_MIN {
        return Err(OsError::StkSizeInvalid);
    }

    critical_section(|cs| {
        if prio_in_use(prio) {
            return Err(OsError::PrioExist);
        }

        let slot = NEXT_SLOT.load(core::sync::atomic::Ordering::Relaxed);
        if slot >= MAX_TASKS {
            return Err(OsError::TaskPoolExhausted);
        }
        NEXT_SLOT.store(slot + 1, core::sync::atomic::Ordering::Relaxed);

        let pool = TASK_POOL.get(cs);
        let tcb_ref = &mut pool[slot];

        init_tcb(
            tcb_ref,
            slot as OsTaskId,
            name,
            task_fn,
            arg,
            prio,
            stack.as_mut_ptr(),
            stack.len(),
        );

        let tcb_ptr = unsafe { NonNull::new_unchecked(tcb_ref as *mut OsTcb) };
        unsafe { crate::sched::ready_insert(tcb_ptr) };

        if kernel::KERNEL.is_running() {
            crate::sched::schedule();
        }

        Ok(TaskHandle(tcb_ptr))
    })
}

/// Create the idle task directly into a caller-supplied static TCB, used
/// only by [`kernel::init`] before the task pool exists to draw from.
///
/// # Safety
/// `tcb` and the memory described by `stk_base`/`stk_size` must be valid
/// for `'static` and not aliased elsewhere.
pub(crate) unsafe fn create_idle_task(
    tcb: *mut OsTcb,
    task_fn: OsTaskFn,
    prio: OsPrio,
    stk_base: *mut OsStkElement,
    stk_size: usize,
) -> OsResult<()> {
    let tcb_ref = unsafe { &mut *tcb };
    init_tcb(tcb_ref, 0, "idle", task_fn, core::ptr::null_mut(), prio, stk_base, stk_size);

    let tcb_ptr = unsafe { NonNull::new_unchecked(tcb) };
    unsafe { crate::sched::ready_insert(tcb_ptr) };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    static mut STK_OK: [OsStkElement; CFG_STK_SIZE_MIN] = [0; CFG_STK_SIZE_MIN];
    static mut STK_SMALL: [OsStkElement; 1] = [0; 1];

    fn noop_task(_arg: *mut ()) -> ! {
        loop {}
    }

    #[test]
    fn rejects_priority_at_or_above_lowest_priority() {
        let _g = crate::test_support::lock();

        let stack: &'static mut [OsStkElement] = unsafe { &mut STK_OK };
        assert_eq!(
            new_task(
                "bad_prio",
                noop_task,
                core::ptr::null_mut(),
                crate::config::LOWEST_PRIORITY,
                stack
            ),
            Err(OsError::PrioInvalid)
        );
    }

    #[test]
    fn rejects_undersized_stack() {
        let _g = crate::test_support::lock();

        let stack: &'static mut [OsStkElement] = unsafe { &mut STK_SMALL };
        assert_eq!(
            new_task("small_stack", noop_task, core::ptr::null_mut(), 30, stack),
            Err(OsError::StkSizeInvalid)
        );
    }

    #[test]
    fn rejects_duplicate_priority() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        static mut STK_A: [OsStkElement; CFG_STK_SIZE_MIN] = [0; CFG_STK_SIZE_MIN];
        static mut STK_B: [OsStkElement; CFG_STK_SIZE_MIN] = [0; CFG_STK_SIZE_MIN];

        new_task("dup_a", noop_task, core::ptr::null_mut(), 40, unsafe { &mut STK_A }).unwrap();
        assert_eq!(
            new_task("dup_b", noop_task, core::ptr::null_mut(), 40, unsafe { &mut STK_B }),
            Err(OsError::PrioExist)
        );
    }

    /// A task that is off the ready list (blocked on a semaphore/queue, or
    /// delayed) must still hold its priority: the registry consulted by
    /// `new_task` has no notion of list membership, unlike a plain ready-list
    /// walk would.
    #[test]
    fn rejects_priority_held_by_a_task_currently_off_the_ready_list() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        static mut STK_HOLDER: [OsStkElement; CFG_STK_SIZE_MIN] = [0; CFG_STK_SIZE_MIN];
        static mut STK_DUP: [OsStkElement; CFG_STK_SIZE_MIN] = [0; CFG_STK_SIZE_MIN];

        let holder =
            new_task("holder", noop_task, core::ptr::null_mut(), 60, unsafe { &mut STK_HOLDER })
                .unwrap();

        // Simulate the holder being blocked: off the ready list entirely,
        // the way `sem_pend`/`queue_pend`/`delay_task` would leave it.
        unsafe { crate::sched::ready_remove(holder.as_nonnull()) };

        assert_eq!(
            new_task("dup_while_blocked", noop_task, core::ptr::null_mut(), 60, unsafe {
                &mut STK_DUP
            }),
            Err(OsError::PrioExist)
        );
    }

    /// There is no task deletion, so exhaustion is only ever reached once
    /// and stays reached; the test just has to get there, not land on an
    /// exact slot count that every other test in this module also nibbles
    /// at.
    #[test]
    fn task_pool_exhaustion_is_eventually_reported() {
        let _g = crate::test_support::lock();
        crate::test_support::ensure_kernel_running();

        static mut STKS: [[OsStkElement; CFG_STK_SIZE_MIN]; MAX_TASKS + 1] =
            [[0; CFG_STK_SIZE_MIN]; MAX_TASKS + 1];

        let mut saw_exhaustion = false;
        for (i, stk) in unsafe { STKS.iter_mut() }.enumerate() {
            // Priorities here are well clear of the ones the other tests
            // in this module use (30, 40) and of the idle task's prio.
            let prio = 1 + i as OsPrio;
            let stack: &'static mut [OsStkElement] = stk;
            match new_task("filler", noop_task, core::ptr::null_mut(), prio, stack) {
                Ok(_) => {}
                Err(OsError::TaskPoolExhausted) => {
                    saw_exhaustion = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert!(saw_exhaustion);
    }
}
