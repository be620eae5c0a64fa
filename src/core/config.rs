//! Compile-time configuration for tinysched
//!
//! These constants control the behavior and resource limits of the scheduler
//! core. All of them are fixed at build time: there is no dynamic allocator
//! and no runtime reconfiguration.

/// Lowest (numerically highest) priority value. Reserved for the idle task;
/// no application task may use it.
pub const LOWEST_PRIORITY: u8 = 63;

/// Maximum number of tasks the static TCB pool can hold (idle task included).
pub const MAX_TASKS: usize = 16;

/// Maximum number of semaphores the static semaphore pool can hold.
pub const MAX_SEMAPHORES: usize = 16;

/// Maximum number of queues the static queue pool can hold.
pub const MAX_QUEUES: usize = 8;

/// System tick rate in Hz.
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Minimum task stack size, in stack words.
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Stack size (in stack words) reserved for the idle task.
pub const IDLE_STACK_SIZE: usize = 128;
