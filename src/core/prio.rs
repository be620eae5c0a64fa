//! Global priority-uniqueness registry
//!
//! A bitmap recording which priorities are currently held by a live task,
//! independent of which list (ready, delayed, or a primitive's pending
//! list) that task happens to be threaded through right now. `new_task`
//! consults this before handing out a priority: the ready list alone only
//! ever contains tasks that are neither delayed nor blocked, so walking it
//! would let a blocked or delayed task's priority be handed out a second
//! time. A task's bit, once set, is never cleared — there is no task
//! deletion.

use crate::config::LOWEST_PRIORITY;
use crate::types::OsPrio;

const PRIO_TBL_SIZE: usize = (LOWEST_PRIORITY as usize + 1 + 31) / 32;

/// Priority registry bitmap. Bit `n` of the table is set once a task has
/// been created at priority `n`.
pub struct PrioRegistry {
    bitmap: [u32; PRIO_TBL_SIZE],
}

impl PrioRegistry {
    pub const fn new() -> Self {
        PrioRegistry {
            bitmap: [0; PRIO_TBL_SIZE],
        }
    }

    pub fn init(&mut self) {
        for word in self.bitmap.iter_mut() {
            *word = 0;
        }
    }

    /// Record that `prio` is now held by a task.
    #[inline]
    pub fn mark_used(&mut self, prio: OsPrio) {
        let word_idx = (prio / 32) as usize;
        let bit_pos = prio % 32;

        self.bitmap[word_idx] |= 1 << bit_pos;
    }

    /// Whether some task, in any list or none, already holds `prio`.
    #[inline]
    pub fn is_used(&self, prio: OsPrio) -> bool {
        let word_idx = (prio / 32) as usize;
        let bit_pos = prio % 32;

        (self.bitmap[word_idx] & (1 << bit_pos)) != 0
    }
}

impl Default for PrioRegistry {
    fn default() -> Self {
        Self::new()
    }
}
