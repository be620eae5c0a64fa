//! Task list manager
//!
//! The three logical lists a TCB can be threaded through: ready, delayed,
//! and per-primitive pending. All operations here are defined only for
//! callers already inside a critical section; none of them block.
//!
//! Unlike the bitmap-backed ready "list" a fuller RTOS (and an earlier
//! revision of this crate) might use for O(1) highest-priority lookup, this
//! crate's priorities are unique per task, so a single ascending-priority
//! doubly-linked list is both sufficient and a more direct translation of
//! the walk-insert algorithm than a per-priority array would be.

use core::ptr::NonNull;

use crate::task::OsTcb;
use crate::types::OsTick;

/// Ready list: ascending priority, doubly linked. Head is the highest
/// priority task; there is always at least one entry (the idle task) once
/// the kernel has been initialized.
#[derive(Debug)]
pub struct ReadyList {
    head: Option<NonNull<OsTcb>>,
    tail: Option<NonNull<OsTcb>>,
}

impl ReadyList {
    pub const fn new() -> Self {
        ReadyList { head: None, tail: None }
    }

    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert `tcb` in ascending-priority order: walk from the head until
    /// the first node with a strictly higher priority value, and link
    /// before it (or append at the tail if none is found).
    ///
    /// # Safety
    /// `tcb` must not already be linked into this or any other list.
    pub fn insert(&mut self, tcb: NonNull<OsTcb>) {
        let prio = unsafe { tcb.as_ref().prio };

        let mut cursor = self.head;
        while let Some(node) = cursor {
            if unsafe { node.as_ref().prio } > prio {
                break;
            }
            cursor = unsafe { node.as_ref().next_ptr };
        }

        let tcb_ref = unsafe { &mut *tcb.as_ptr() };
        tcb_ref.next_ptr = cursor;
        tcb_ref.prev_ptr = match cursor {
            Some(node) => unsafe { node.as_ref().prev_ptr },
            None => self.tail,
        };

        match tcb_ref.prev_ptr {
            Some(prev) => unsafe { (*prev.as_ptr()).next_ptr = Some(tcb) },
            None => self.head = Some(tcb),
        }
        match cursor {
            Some(next) => unsafe { (*next.as_ptr()).prev_ptr = Some(tcb) },
            None => self.tail = Some(tcb),
        }
    }

    /// Unlink `tcb`. The links are already known (no search needed).
    ///
    /// # Safety
    /// `tcb` must currently be linked into this list.
    pub fn remove(&mut self, tcb: NonNull<OsTcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        match tcb_ref.prev_ptr {
            Some(prev) => unsafe { (*prev.as_ptr()).next_ptr = tcb_ref.next_ptr },
            None => self.head = tcb_ref.next_ptr,
        }
        match tcb_ref.next_ptr {
            Some(next) => unsafe { (*next.as_ptr()).prev_ptr = tcb_ref.prev_ptr },
            None => self.tail = tcb_ref.prev_ptr,
        }

        tcb_ref.prev_ptr = None;
        tcb_ref.next_ptr = None;
    }
}

impl Default for ReadyList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for ReadyList {}
unsafe impl Sync for ReadyList {}

/// Delayed list: delta-encoded, ordered by absolute expiry. The head's
/// `delay_ticks` is its own absolute remaining delay; every other entry's
/// `delay_ticks` is the delta relative to its predecessor, so the absolute
/// remaining delay for any entry is the prefix sum up to and including it.
#[derive(Debug)]
pub struct DelayedList {
    head: Option<NonNull<OsTcb>>,
    tail: Option<NonNull<OsTcb>>,
}

impl DelayedList {
    pub const fn new() -> Self {
        DelayedList { head: None, tail: None }
    }

    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert `tcb` with absolute remaining delay `delay`. Walks from the
    /// head, subtracting each traversed node's delta from the remaining
    /// budget, until the next node's delta exceeds what's left or the list
    /// ends. The loop condition is checked *before* any dereference — the
    /// corresponding C original dereferenced the cursor before checking it
    /// for null.
    ///
    /// # Safety
    /// `tcb` must not already be linked into this or any other list.
    pub fn insert(&mut self, tcb: NonNull<OsTcb>, delay: OsTick) {
        let mut remaining = delay;
        let mut cursor = self.head;

        while let Some(node) = cursor {
            let node_delta = unsafe { node.as_ref().delay_ticks };
            if node_delta > remaining {
                break;
            }
            remaining -= node_delta;
            cursor = unsafe { node.as_ref().delay_next_ptr };
        }

        let tcb_ref = unsafe { &mut *tcb.as_ptr() };
        tcb_ref.delay_ticks = remaining;
        tcb_ref.delay_next_ptr = cursor;
        tcb_ref.delay_prev_ptr = match cursor {
            Some(node) => unsafe { node.as_ref().delay_prev_ptr },
            None => self.tail,
        };

        match tcb_ref.delay_prev_ptr {
            Some(prev) => unsafe { (*prev.as_ptr()).delay_next_ptr = Some(tcb) },
            None => self.head = Some(tcb),
        }
        match cursor {
            Some(next) => {
                // The successor's delta now represents its distance from
                // the newly inserted node, not from the old predecessor.
                let next_ref = unsafe { &mut *next.as_ptr() };
                next_ref.delay_ticks -= remaining;
                next_ref.delay_prev_ptr = Some(tcb);
            }
            None => self.tail = Some(tcb),
        }
    }

    /// Decrement the head's delta by one tick. No-op on an empty list.
    pub fn tick(&mut self) {
        if let Some(head) = self.head {
            let head_ref = unsafe { &mut *head.as_ptr() };
            if head_ref.delay_ticks > 0 {
                head_ref.delay_ticks -= 1;
            }
        }
    }

    /// Pop the head if its delta has reached zero. Any number of entries may
    /// have a zero delta after `tick()` collapses onto the same instant;
    /// callers pop in a loop to drain all of them. Always checks the new
    /// head is present before touching it (no unconditional deref of a
    /// possibly-absent successor).
    pub fn pop_expired(&mut self) -> Option<NonNull<OsTcb>> {
        let head = self.head?;
        if unsafe { head.as_ref().delay_ticks } != 0 {
            return None;
        }

        let next = unsafe { head.as_ref().delay_next_ptr };
        self.head = next;
        match next {
            Some(node) => unsafe { (*node.as_ptr()).delay_prev_ptr = None },
            None => self.tail = None,
        }

        let head_ref = unsafe { &mut *head.as_ptr() };
        head_ref.delay_next_ptr = None;
        head_ref.delay_prev_ptr = None;
        Some(head)
    }
}

impl Default for DelayedList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for DelayedList {}
unsafe impl Sync for DelayedList {}

/// Per-primitive pending list: priority-ordered, head is the highest
/// priority waiter. Removal only ever happens from the head (the task
/// released by a post), so unlike the ready list there is no general
/// O(1) `remove`.
#[derive(Debug, Clone, Copy)]
pub struct PendingList {
    head: Option<NonNull<OsTcb>>,
    tail: Option<NonNull<OsTcb>>,
}

impl PendingList {
    pub const fn new() -> Self {
        PendingList { head: None, tail: None }
    }

    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert `tcb` in ascending-priority order, tie-broken FIFO (a later
    /// arrival at the same priority is impossible here since priorities are
    /// unique, but ties are resolved by appending after equal entries should
    /// that invariant ever be relaxed).
    ///
    /// # Safety
    /// `tcb` must not already be linked into this or any other list.
    pub fn insert_by_prio(&mut self, tcb: NonNull<OsTcb>) {
        let prio = unsafe { tcb.as_ref().prio };

        let mut cursor = self.head;
        while let Some(node) = cursor {
            if unsafe { node.as_ref().prio } > prio {
                break;
            }
            cursor = unsafe { node.as_ref().pend_next_ptr };
        }

        let tcb_ref = unsafe { &mut *tcb.as_ptr() };
        tcb_ref.pend_next_ptr = cursor;
        tcb_ref.pend_prev_ptr = match cursor {
            Some(node) => unsafe { node.as_ref().pend_prev_ptr },
            None => self.tail,
        };

        match tcb_ref.pend_prev_ptr {
            Some(prev) => unsafe { (*prev.as_ptr()).pend_next_ptr = Some(tcb) },
            None => self.head = Some(tcb),
        }
        match cursor {
            Some(next) => unsafe { (*next.as_ptr()).pend_prev_ptr = Some(tcb) },
            None => self.tail = Some(tcb),
        }
    }

    /// Remove and return the highest-priority waiter, if any. Guards the new
    /// head before touching it, unlike the single-element null-deref bug in
    /// the original `removePendSem`/`removePendQ`.
    pub fn pop_head(&mut self) -> Option<NonNull<OsTcb>> {
        let head = self.head?;
        let next = unsafe { head.as_ref().pend_next_ptr };

        self.head = next;
        match next {
            Some(node) => unsafe { (*node.as_ptr()).pend_prev_ptr = None },
            None => self.tail = None,
        }

        let head_ref = unsafe { &mut *head.as_ptr() };
        head_ref.pend_next_ptr = None;
        head_ref.pend_prev_ptr = None;
        Some(head)
    }
}

impl Default for PendingList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for PendingList {}
unsafe impl Sync for PendingList {}
