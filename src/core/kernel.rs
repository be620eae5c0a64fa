//! Global kernel state and initialization
//!
//! Owns the ready list, the delayed list, and the CPU context-switch block,
//! plus the small set of atomic counters ISRs touch without needing the
//! full critical section (tick count, ISR nesting depth, running flag).

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::IDLE_STACK_SIZE;
use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::core::lists::{DelayedList, ReadyList};
use crate::core::prio::PrioRegistry;
use crate::task::OsTcb;
use crate::types::{OsNestingCtr, OsPrio, OsTick, SENTINEL_TASK_ID};

// ============ Kernel State Structures ============

/// Atomic kernel flags touched from both task and ISR context.
pub struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
    int_nesting: AtomicU8,
    tick_counter: AtomicU32,
    ctx_sw_count: AtomicU32,
    idle_counter: AtomicU32,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            int_nesting: AtomicU8::new(0),
            tick_counter: AtomicU32::new(0),
            ctx_sw_count: AtomicU32::new(0),
            idle_counter: AtomicU32::new(0),
        }
    }

    /// Number of context switches performed since `init()`.
    #[inline(always)]
    pub fn ctx_sw_count(&self) -> u32 {
        self.ctx_sw_count.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub(crate) fn ctx_sw_increment(&self) {
        self.ctx_sw_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Idle-loop iteration count, a crude CPU-utilization proxy.
    #[inline(always)]
    pub fn idle_counter(&self) -> u32 {
        self.idle_counter.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub(crate) fn idle_increment(&self) {
        self.idle_counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Check if the scheduler is running
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Check if the scheduler has been initialized
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get current tick count
    #[inline(always)]
    pub fn tick_get(&self) -> OsTick {
        self.tick_counter.load(Ordering::Relaxed)
    }

    /// Get interrupt nesting level
    #[inline(always)]
    pub fn int_nesting(&self) -> OsNestingCtr {
        self.int_nesting.load(Ordering::Relaxed)
    }

    /// Increment and return tick count
    #[inline(always)]
    pub(crate) fn tick_increment(&self) -> OsTick {
        self.tick_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Enter ISR: bump the nesting counter, saturating rather than wrapping.
    #[inline(always)]
    pub(crate) fn int_enter(&self) -> OsNestingCtr {
        let nesting = self.int_nesting.load(Ordering::Relaxed);
        let new_nesting = nesting.saturating_add(1);
        self.int_nesting.store(new_nesting, Ordering::Relaxed);
        new_nesting
    }

    /// Exit ISR: decrement the nesting counter, returning the new value.
    #[inline(always)]
    pub(crate) fn int_nesting_dec(&self) -> OsNestingCtr {
        let nesting = self.int_nesting.load(Ordering::Relaxed);
        let new_nesting = nesting.saturating_sub(1);
        self.int_nesting.store(new_nesting, Ordering::Relaxed);
        new_nesting
    }

    /// Set initialized flag
    #[inline(always)]
    pub(crate) fn set_initialized(&self, val: bool) {
        self.initialized.store(val, Ordering::SeqCst);
    }

    /// Set running flag
    #[inline(always)]
    pub(crate) fn set_running(&self, val: bool) {
        self.running.store(val, Ordering::SeqCst);
    }
}

/// Global kernel flags instance
pub(crate) static KERNEL: KernelFlags = KernelFlags::new();

/// Scheduler state: the ready list and the delayed list, both protected by
/// the critical section cell.
pub struct SchedState {
    pub(crate) ready: ReadyList,
    pub(crate) delayed: DelayedList,
}

impl SchedState {
    const fn new() -> Self {
        Self {
            ready: ReadyList::new(),
            delayed: DelayedList::new(),
        }
    }
}

/// Global scheduler state instance
pub(crate) static SCHED: CsCell<SchedState> = CsCell::new(SchedState::new());

/// Global priority-uniqueness registry: which priorities are held by a
/// live task, whether that task is ready, delayed, or pending. Consulted
/// by `new_task` instead of the ready list, which can never see a blocked
/// or delayed task's priority.
pub(crate) static PRIO_REGISTRY: CsCell<PrioRegistry> = CsCell::new(PrioRegistry::new());

/// Idle task TCB and stack. The idle task is created directly by `init()`,
/// before any application task exists, and is never removed from the ready
/// list — it is the fallback the dispatcher always has available.
static mut IDLE_TCB: OsTcb = OsTcb::new();
static mut IDLE_STK: [crate::types::OsStkElement; IDLE_STACK_SIZE] = [0; IDLE_STACK_SIZE];

/// Dummy sentinel TCB installed as `current_task` by `init()`, before the
/// kernel has ever dispatched a real task. Its `task_id` can never match a
/// real task's, so the first `schedule()` call after `run()` is guaranteed
/// to see a mismatch against the ready list's head and dispatch
/// unconditionally. A real, zero-initialized static — not a dangling or
/// unallocated pointer.
static mut SENTINEL_TCB: OsTcb = OsTcb::new();

// ============ CPU/Context Switch State ============

/// CPU context switch state: the only data the architecture port touches
/// directly, from interrupt/naked-asm context.
#[repr(C)]
pub struct CpuState {
    /// Currently running task's TCB pointer
    pub tcb_cur: *mut OsTcb,
    /// Highest-priority ready task's TCB pointer, set by `schedule()`
    pub tcb_high_rdy: *mut OsTcb,
}

impl CpuState {
    pub const fn new() -> Self {
        Self {
            tcb_cur: core::ptr::null_mut(),
            tcb_high_rdy: core::ptr::null_mut(),
        }
    }

    #[inline(always)]
    pub unsafe fn tcb_cur_ptr(&self) -> Option<NonNull<OsTcb>> {
        NonNull::new(self.tcb_cur)
    }

    #[inline(always)]
    pub unsafe fn set_tcb_cur(&mut self, tcb: Option<NonNull<OsTcb>>) {
        self.tcb_cur = tcb.map_or(core::ptr::null_mut(), |p| p.as_ptr());
    }

    #[inline(always)]
    pub unsafe fn tcb_high_rdy_ptr(&self) -> Option<NonNull<OsTcb>> {
        NonNull::new(self.tcb_high_rdy)
    }

    #[inline(always)]
    pub unsafe fn set_tcb_high_rdy(&mut self, tcb: Option<NonNull<OsTcb>>) {
        self.tcb_high_rdy = tcb.map_or(core::ptr::null_mut(), |p| p.as_ptr());
    }
}

/// Global CPU state instance
#[no_mangle]
#[used]
pub static mut CPU_STATE: CpuState = CpuState::new();

// ============ Idle task ============

fn os_idle_task(_: *mut ()) -> ! {
    loop {
        let _cs = crate::critical::CriticalSection::enter();
        KERNEL.idle_increment();
        drop(_cs);

        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}

// ============ Public API ============

/// Initialize the scheduler core.
///
/// Must be called exactly once, before any task is created or [`run`] is
/// called. Creates the idle task at `LOWEST_PRIORITY` and installs the
/// dummy sentinel task as the current task so the first `schedule()` call
/// unconditionally dispatches a real task.
///
/// # Returns
/// * `Ok(())` - Initialization successful
/// * `Err(OsError::OsRunning)` - Already initialized/running
#[allow(static_mut_refs)]
pub fn init() -> OsResult<()> {
    if KERNEL.is_initialized() {
        return Err(OsError::OsRunning);
    }

    critical_section(|cs| {
        let sched = SCHED.get(cs);
        sched.ready.init();
        sched.delayed.init();
        PRIO_REGISTRY.get(cs).init();

        unsafe {
            SENTINEL_TCB.init();
            SENTINEL_TCB.task_id = SENTINEL_TASK_ID;
            CPU_STATE.tcb_cur = &raw mut SENTINEL_TCB;
            CPU_STATE.tcb_high_rdy = core::ptr::null_mut();

            crate::task::create_idle_task(
                &raw mut IDLE_TCB,
                os_idle_task,
                crate::config::LOWEST_PRIORITY,
                IDLE_STK.as_mut_ptr(),
                IDLE_STK.len(),
            )
            .expect("idle task creation failed");
        }

        KERNEL.set_initialized(true);
    });

    Ok(())
}

/// Start multitasking. Enables the system tick and dispatches the highest
/// priority ready task (always at least the idle task). Never returns
/// under normal operation.
///
/// # Returns
/// This function does not return under normal operation.
/// * `Err(OsError::OsNotInit)` - [`init`] was never called
/// * `Err(OsError::OsRunning)` - Already running
pub fn run() -> OsResult<()> {
    if !KERNEL.is_initialized() {
        return Err(OsError::OsNotInit);
    }
    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    KERNEL.set_running(true);
    crate::sched::schedule();

    crate::port::os_cpu_systick_init(16_000_000 / crate::config::CFG_TICK_RATE_HZ);

    unsafe { crate::port::os_start_high_rdy() };

    // A correctly functioning dispatcher never returns here.
    Err(OsError::FatalReturn)
}

/// Exit an ISR. Decrements the ISR nesting counter and, once it reaches
/// zero, reschedules if the pending tick/wakeup work made a higher
/// priority task ready than the one that was interrupted.
pub fn exit_isr() {
    if !KERNEL.is_running() {
        return;
    }

    let nesting = KERNEL.int_nesting();
    if nesting == 0 {
        return;
    }

    let new_nesting = KERNEL.int_nesting_dec();
    if new_nesting == 0 {
        crate::sched::schedule_from_isr();
    }
}

// ============ Internal accessors for other modules ============

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn tcb_cur_ptr() -> Option<NonNull<OsTcb>> {
    unsafe { CPU_STATE.tcb_cur_ptr() }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_tcb_cur_ptr(tcb: Option<NonNull<OsTcb>>) {
    unsafe { CPU_STATE.set_tcb_cur(tcb) }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn tcb_high_rdy_ptr() -> Option<NonNull<OsTcb>> {
    unsafe { CPU_STATE.tcb_high_rdy_ptr() }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_tcb_high_rdy_ptr(tcb: Option<NonNull<OsTcb>>) {
    unsafe { CPU_STATE.set_tcb_high_rdy(tcb) }
}

#[inline(always)]
pub(crate) unsafe fn ready_list() -> &'static mut ReadyList {
    unsafe { &mut SCHED.get_unchecked().ready }
}

#[inline(always)]
pub(crate) unsafe fn delayed_list() -> &'static mut DelayedList {
    unsafe { &mut SCHED.get_unchecked().delayed }
}

/// Whether some task, in any list or none, already holds `prio`.
#[inline(always)]
pub(crate) unsafe fn prio_is_used(prio: OsPrio) -> bool {
    unsafe { PRIO_REGISTRY.get_unchecked().is_used(prio) }
}

/// Record that `prio` is now held by a task. Never cleared: there is no
/// task deletion.
#[inline(always)]
pub(crate) unsafe fn prio_mark_used(prio: OsPrio) {
    unsafe { PRIO_REGISTRY.get_unchecked().mark_used(prio) }
}
