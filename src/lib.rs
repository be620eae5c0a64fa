//! tinysched: a small preemptive real-time scheduler core
//!
//! Provides:
//! - Strict-priority preemptive scheduling, no time-slicing
//! - Tick-driven, delta-encoded delay timer
//! - Counting semaphores and bounded priority-ordered message queues
//! - ISR entry/exit bookkeeping and critical-section discipline
//! - Context switching for ARM Cortex-M

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

#[cfg(test)]
mod test_support;

pub mod core;
pub mod sync;
pub mod port;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::error;
pub use core::error::OsError;
pub use core::isr;
pub use core::kernel;
pub use core::kernel::{init, run};
pub use core::lists;
pub use core::types;
pub use core::types::*;
pub use core::task;
pub use core::task::{new_task, TaskHandle};
pub use core::sched;
pub use core::time;

#[cfg(feature = "sem")]
pub use sync::sem;
#[cfg(feature = "queue")]
pub use sync::queue;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
