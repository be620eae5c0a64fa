//! Critical section handling for tinysched
//!
//! Provides safe critical section primitives for protecting shared resources.
//! This is the crate's single mutual-exclusion primitive: every kernel entry
//! point runs inside one, and the `CriticalSection` guard's `Drop` restores
//! interrupts exactly the way a `enter_mutex`/`exit_mutex` pair would.

use core::sync::atomic::{AtomicBool, Ordering};

/// Global flag indicating whether it is in the critical section
static IN_CRITICAL: AtomicBool = AtomicBool::new(false);

/// RAII guard for critical sections.
///
/// Entering captures whether interrupts were already disabled (i.e. we are
/// nested inside an outer critical section, or running from ISR context
/// with interrupts already masked), and dropping only re-enables them if
/// *this* guard was the one that actually disabled them. Without that, a
/// kernel call that enters a critical section and, inside it, calls
/// `schedule()` (which enters its own nested critical section) would have
/// the inner guard's drop re-enable interrupts before the outer critical
/// section is done with its own updates.
pub struct CriticalSection {
    was_active: bool,
}

impl CriticalSection {
    /// Enter a critical section, disabling interrupts if they were not
    /// already disabled.
    ///
    /// Returns a guard that restores the prior interrupt-enable state when
    /// dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        #[cfg(target_arch = "arm")]
        let was_active = {
            let was_active = cortex_m::register::primask::read().is_active();
            cortex_m::interrupt::disable();
            was_active
        };

        #[cfg(not(target_arch = "arm"))]
        let was_active = !IN_CRITICAL.swap(true, Ordering::AcqRel);

        #[cfg(target_arch = "arm")]
        IN_CRITICAL.store(true, Ordering::Release);

        CriticalSection { was_active }
    }

    /// Check if we're currently in a critical section
    #[inline(always)]
    pub fn is_active() -> bool {
        IN_CRITICAL.load(Ordering::Acquire)
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        if self.was_active {
            IN_CRITICAL.store(false, Ordering::Release);

            #[cfg(target_arch = "arm")]
            unsafe { cortex_m::interrupt::enable() };
        }
    }
}

/// Execute a closure with interrupts disabled
/// 
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`] protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }
    
    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}

/// Mask priority levels using BASEPRI (Cortex-M3/M4/M7)
/// 
/// This allows selective interrupt masking where only interrupts
/// with a priority value >= the mask value are blocked.
#[inline]
pub fn set_basepri(priority: u8) {
    #[cfg(target_arch = "arm")]
    unsafe {
        core::arch::asm!(
            "msr BASEPRI, {}",
            in(reg) priority as u32,
            options(nomem, nostack, preserves_flags)
        );
    }
    
    #[cfg(not(target_arch = "arm"))]
    {
        let _ = priority;
    }
}

/// Get current BASEPRI value
#[inline]
pub fn get_basepri() -> u8 {
    #[cfg(target_arch = "arm")]
    {
        let basepri: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, BASEPRI",
                out(reg) basepri,
                options(nomem, nostack, preserves_flags)
            );
        }
        basepri as u8
    }
    
    #[cfg(not(target_arch = "arm"))]
    {
        0
    }
}
