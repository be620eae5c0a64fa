//! ISR entry/exit bookkeeping
//!
//! Every interrupt handler that touches kernel state calls [`enter_isr`] on
//! entry and [`exit_isr`] on exit. Nesting is tracked with a counter rather
//! than a boolean so a second interrupt firing while the first is still
//! unwinding doesn't trigger a reschedule until the outermost handler
//! returns.

use crate::kernel;

/// Mark entry into an interrupt handler. Call this before touching any
/// kernel list or primitive from ISR context.
#[inline]
pub fn enter_isr() {
    kernel::KERNEL.int_enter();
}

/// Mark exit from an interrupt handler. Once the nesting counter returns
/// to zero, reschedules if the work done during the ISR (a tick expiry, a
/// semaphore post) made a higher priority task ready than the one that was
/// running when the interrupt fired.
#[inline]
pub fn exit_isr() {
    kernel::exit_isr();
}
