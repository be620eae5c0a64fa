//! Synchronization primitives
//!
//! Contains counting semaphores and bounded message queues.

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "queue")]
pub mod queue;
