//! Error types for tinysched
//!
//! Uses Rust's Result pattern instead of a C-style "last error" global. Per
//! the design notes this taxonomy covers only programmer errors in a
//! correctly configured build: pool exhaustion and bad arguments are
//! returned from creation calls; invariant breaches that a well-formed
//! caller can never trigger are caught with `debug_assert!` instead (see
//! the individual list/scheduler modules).

/// Scheduler core error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OsError {
    /// No error
    None = 0,

    // ============ ISR errors ============
    /// Function cannot be called from ISR context
    PendIsr = 10001,
    /// Cannot create a kernel object from ISR context
    CreateIsr = 12001,
    /// Cannot create a task from ISR context
    TaskCreateIsr = 12002,
    /// Cannot delay from ISR context
    TimeDlyIsr = 12003,

    // ============ Fatal errors ============
    /// `run()` returned; this must never happen
    FatalReturn = 15001,

    // ============ Object/pool errors ============
    /// Task control block pool is exhausted
    TaskPoolExhausted = 22001,
    /// Semaphore pool is exhausted
    SemPoolExhausted = 22002,
    /// Queue pool is exhausted
    QueuePoolExhausted = 22003,

    // ============ Priority errors ============
    /// Priority out of range, or equal to the reserved idle priority
    PrioInvalid = 25201,
    /// Priority already in use by another task (priorities are unique)
    PrioExist = 25202,

    // ============ Stack errors ============
    /// Null or otherwise invalid stack pointer
    StkInvalid = 28207,
    /// Stack too small to hold the initial context frame
    StkSizeInvalid = 28208,

    // ============ Task/TCB errors ============
    /// Null or otherwise invalid TCB pointer
    TcbInvalid = 29101,
    /// Attempt to delay or remove the idle task
    IdleTaskProtected = 29019,

    // ============ Time errors ============
    /// Delay of zero ticks requested; `delay_task` requires `ticks >= 1`
    TimeZeroDly = 29310,

    // ============ OS state errors ============
    /// Scheduler core has not been initialized
    OsNotInit = 24203,
    /// Scheduler core is already running
    OsRunning = 24202,
    /// Scheduler core is not yet running
    OsNotRunning = 24201,

    // ============ Queue errors ============
    /// Queue capacity must be at least 1
    QCapacityInvalid = 26003,

    // ============ Semaphore errors ============
    /// Semaphore counter overflow
    SemOvf = 28101,
}

/// Result type alias for scheduler-core operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsError::None
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsError::None
    }
}
