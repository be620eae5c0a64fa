//! Scheduler module
//!
//! Strict-priority preemptive scheduling: the ready list is kept in
//! ascending-priority order, so the highest priority ready task is always
//! its head. No round-robin or time-slicing among equal priorities —
//! priorities are unique, so there is never more than one ready task at a
//! given priority to rotate between.

use core::ptr::NonNull;

use crate::critical::{is_isr_context, CriticalSection};
use crate::kernel;
use crate::task::OsTcb;

/// Main scheduling point.
///
/// Determines the highest priority ready task and triggers a context
/// switch if it differs from the currently running task. Call this after
/// any operation that may change task readiness: task creation, a
/// semaphore/queue post, a delay or timeout expiry.
///
/// A no-op before the scheduler is running, or when called from ISR
/// context (ISRs defer rescheduling to [`schedule_from_isr`] at the
/// outermost [`crate::isr::exit_isr`]).
pub fn schedule() {
    if !kernel::KERNEL.is_running() {
        return;
    }
    if is_isr_context() {
        return;
    }

    let _cs = CriticalSection::enter();
    dispatch_highest_ready();
}

/// Scheduling point reached from the outermost [`crate::isr::exit_isr`].
/// Unlike [`schedule`], the caller is already inside ISR context and inside
/// an implicit critical section (interrupts are masked), so this skips
/// straight to the dispatch.
pub(crate) fn schedule_from_isr() {
    dispatch_highest_ready();
}

fn dispatch_highest_ready() {
    unsafe {
        if let Some(high_rdy) = kernel::ready_list().head() {
            kernel::set_tcb_high_rdy_ptr(Some(high_rdy));

            if Some(high_rdy) != kernel::tcb_cur_ptr() {
                kernel::KERNEL.ctx_sw_increment();
                if is_isr_context() {
                    crate::port::os_int_ctx_sw();
                } else {
                    crate::port::os_ctx_sw();
                }
            }
        }
    }
}

/// Link a task into the ready list.
///
/// # Safety
/// `tcb` must not already be linked into the ready, delayed, or any
/// pending list.
pub(crate) unsafe fn ready_insert(tcb: NonNull<OsTcb>) {
    unsafe { kernel::ready_list().insert(tcb) };
}

/// Unlink a task from the ready list.
///
/// # Safety
/// `tcb` must currently be linked into the ready list.
pub(crate) unsafe fn ready_remove(tcb: NonNull<OsTcb>) {
    unsafe { kernel::ready_list().remove(tcb) };
}
