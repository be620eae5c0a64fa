//! Task Control Block (TCB) definition
//!
//! The TCB contains all the information needed to manage a task, including
//! the three disjoint pairs of list links it can be threaded through: ready,
//! delayed, and pending. A TCB belongs to at most one of these lists at any
//! instant; the three link pairs are kept separate rather than shared so
//! the borrow is always unambiguous.

use core::ptr::NonNull;

use crate::types::{OsNestingCtr, OsPendOn, OsPrio, OsStkElement, OsTaskId, OsTaskState, OsTick};

/// Task Control Block
#[derive(Clone, Copy)]
#[repr(C)]
pub struct OsTcb {
    // ============ Stack ============
    /// Current saved stack pointer (opaque to the core; owned by the port)
    pub stk_ptr: *mut OsStkElement,
    /// Base of this task's stack region (diagnostic only)
    pub stk_base: *mut OsStkElement,
    /// Stack size in words
    pub stk_size: usize,

    // ============ Identity ============
    /// Task name, for diagnostics
    pub name: &'static str,
    /// Monotonic task id; unique per task, `0` reserved for idle
    pub task_id: OsTaskId,

    // ============ Ready list links ============
    pub next_ptr: Option<NonNull<OsTcb>>,
    pub prev_ptr: Option<NonNull<OsTcb>>,

    // ============ Delayed list links (delta-encoded) ============
    pub delay_next_ptr: Option<NonNull<OsTcb>>,
    pub delay_prev_ptr: Option<NonNull<OsTcb>>,
    /// While on the delayed list, this is the *delta* relative to the
    /// preceding entry (absolute remaining delay for the head). Meaningless
    /// off the delayed list.
    pub delay_ticks: OsTick,

    // ============ Pending list links ============
    pub pend_next_ptr: Option<NonNull<OsTcb>>,
    pub pend_prev_ptr: Option<NonNull<OsTcb>>,
    /// What kind of object this task is pending on (diagnostic only; the
    /// pending list itself is the source of truth for membership)
    pub pend_on: OsPendOn,

    // ============ Priority ============
    /// Priority; unique across all live tasks
    pub prio: OsPrio,

    // ============ State ============
    /// Current task state (diagnostic/assertion aid only)
    pub task_state: OsTaskState,

    // ============ ISR-nesting-at-creation (diagnostic) ============
    pub _reserved: OsNestingCtr,

    // ============ Task entry point ============
    pub task_entry_addr: u32,
    pub task_entry_arg: *mut (),
}

impl OsTcb {
    /// Create a new, uninitialized TCB. Safe to place in a `static`; must be
    /// populated by `new_task`/`init()` before use.
    pub const fn new() -> Self {
        OsTcb {
            stk_ptr: core::ptr::null_mut(),
            stk_base: core::ptr::null_mut(),
            stk_size: 0,

            name: "",
            task_id: 0,

            next_ptr: None,
            prev_ptr: None,

            delay_next_ptr: None,
            delay_prev_ptr: None,
            delay_ticks: 0,

            pend_next_ptr: None,
            pend_prev_ptr: None,
            pend_on: OsPendOn::Nothing,

            prio: 0,

            task_state: OsTaskState::Ready,

            _reserved: 0,

            task_entry_addr: 0,
            task_entry_arg: core::ptr::null_mut(),
        }
    }

    /// Reset a TCB slot to its default state before reuse.
    pub fn init(&mut self) {
        *self = Self::new();
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsTcb {}
unsafe impl Sync for OsTcb {}
