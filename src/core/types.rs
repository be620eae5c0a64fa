//! Core type definitions for tinysched
//!
//! Strong types for the scheduler's primitives, so a raw `u8` tick count
//! can't be passed where a priority is expected and vice versa.

/// Task priority. Lower numeric value means higher scheduling priority.
/// Priorities are unique across all live tasks; `LOWEST_PRIORITY` is
/// reserved for the idle task.
pub type OsPrio = u8;

/// Tick counter type, wraps after `u32::MAX` ticks.
pub type OsTick = u32;

/// Semaphore counter type.
pub type OsSemCtr = i32;

/// ISR nesting depth.
pub type OsNestingCtr = u8;

/// Stack element type; the native machine word for the target.
pub type OsStkElement = u32;

/// Monotonic task identifier. `0` is reserved for the idle task.
pub type OsTaskId = u32;

/// Reserved task id for the dummy sentinel `current_task` installed by
/// `init()`, before the first real task has ever run. No real task is ever
/// assigned this id, so the very first `schedule()` call is guaranteed to
/// see `ready_head.task_id != current_task.task_id` and dispatch
/// unconditionally.
pub const SENTINEL_TASK_ID: OsTaskId = OsTaskId::MAX;

/// Task scheduling state. Purely a diagnostic/assertion aid: control flow is
/// driven entirely by which list (if any) a TCB is linked into, not by this
/// field, matching the data model's invariant that a TCB belongs to exactly
/// one list at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsTaskState {
    /// Task is linked into the ready list
    Ready = 0,
    /// Task is linked into the delayed list
    Delayed = 1,
    /// Task is linked into a primitive's pending list
    Pending = 2,
}

/// What kind of kernel object a pending task is blocked on. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsPendOn {
    Nothing = 0,
    Semaphore = 1,
    Queue = 2,
}
