//! Port layer - CPU-specific implementations
//!
//! This module provides the hardware abstraction layer for context switching
//! and other CPU-specific operations.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use crate::task::OsTaskFn;
    use crate::types::OsStkElement;

    // Real hardware never returns from here: the dispatcher restores a
    // task's saved context and branches straight into it. The host build
    // has no such context to restore into, so it just returns, letting
    // `run()`'s caller observe `Err(OsError::FatalReturn)` the same way a
    // misbehaving real dispatcher would be caught. This is what lets the
    // host test suite drive the kernel through `init()`/`run()` at all.
    pub unsafe fn os_start_high_rdy() {}

    pub fn os_ctx_sw() {
        // No-op on host builds: there is no PendSV to pend.
    }

    pub fn os_int_ctx_sw() {
        // No-op on host builds.
    }

    pub unsafe fn os_task_stk_init(
        _task_fn: OsTaskFn,
        _arg: *mut (),
        stk_base: *mut OsStkElement,
        stk_size: usize,
    ) -> *mut OsStkElement {
        // Return top of stack; host builds never actually dispatch.
        unsafe { stk_base.add(stk_size - 1) }
    }

    pub fn os_cpu_systick_init(_freq: u32) {
        // No-op on host builds.
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
