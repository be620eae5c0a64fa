//! Host-test-only plumbing, not part of the public API.
//!
//! Every in-crate `#[cfg(test)]` module that exercises kernel-global state
//! (the ready/delayed lists, the pools, `KERNEL`'s running/initialized
//! flags) shares the same process-wide singleton, since the kernel is
//! meant to be initialized exactly once, for the lifetime of the process.
//! `cargo test` runs `#[test]` functions
//! in parallel OS threads within one binary by default, so without this
//! lock two tests could concurrently mutate the same ready list the way
//! two real interrupts on a uniprocessor never could (the interrupt-mask
//! discipline this crate relies on only excludes other *interrupts*, not
//! other host threads).

extern crate std;

use std::sync::{Mutex, MutexGuard};

static KERNEL_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Acquire exclusive access to the kernel singleton for the duration of a
/// test. Poisoning from a prior test's panic is not itself a reason to
/// fail later tests, so a poisoned lock is recovered rather than propagated.
pub(crate) fn lock() -> MutexGuard<'static, ()> {
    KERNEL_TEST_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bring the kernel singleton up to the "running" state if it isn't
/// already. Idempotent and safe to call from every test, as long as the
/// caller already holds [`lock`].
///
/// On the host `stub` port `run()` always returns `Err(FatalReturn)`
/// (there is no real dispatcher to hand control to — see
/// `port::stub::os_start_high_rdy`), which is expected and ignored here.
pub(crate) fn ensure_kernel_running() {
    if !crate::kernel::KERNEL.is_initialized() {
        crate::kernel::init().expect("kernel init failed in test setup");
    }
    if !crate::kernel::KERNEL.is_running() {
        let _ = crate::kernel::run();
    }
}
