//! Three-stage pipeline demo using bounded message queues.
//!
//! stage_a -> queue_ab -> stage_b -> queue_bc -> stage_c
//!
//! Demonstrates strictly FIFO queue delivery regardless of which stage has
//! the highest priority, and a full queue returning the non-error
//! "not delivered" result.

#![no_std]
#![no_main]
#![allow(static_mut_refs)]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use tinysched::sync::queue::Queue;
use tinysched::types::OsStkElement;

const QUEUE_DEPTH: usize = 4;

static QUEUE_AB: Queue = Queue::new();
static QUEUE_BC: Queue = Queue::new();

static mut QUEUE_AB_BUF: [*const (); QUEUE_DEPTH] = [core::ptr::null(); QUEUE_DEPTH];
static mut QUEUE_BC_BUF: [*const (); QUEUE_DEPTH] = [core::ptr::null(); QUEUE_DEPTH];

static SEQUENCE: AtomicU32 = AtomicU32::new(0);
static DROPPED: AtomicU32 = AtomicU32::new(0);
static DELIVERED: AtomicU32 = AtomicU32::new(0);

static mut STAGE_A_STK: [OsStkElement; 256] = [0; 256];
static mut STAGE_B_STK: [OsStkElement; 256] = [0; 256];
static mut STAGE_C_STK: [OsStkElement; 256] = [0; 256];

fn stage_a(_arg: *mut ()) -> ! {
    loop {
        let n = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
        match QUEUE_AB.post(n as usize as *const ()) {
            Ok(true) => tinysched::info!("[a] sent #{}", n),
            Ok(false) => {
                DROPPED.fetch_add(1, Ordering::Relaxed);
                tinysched::info!("[a] queue full, dropped #{}", n);
            }
            Err(_) => {}
        }
        let _ = tinysched::time::delay_task(50);
    }
}

fn stage_b(_arg: *mut ()) -> ! {
    loop {
        if let Ok(msg) = QUEUE_AB.pend() {
            let _ = QUEUE_BC.post(msg);
        }
    }
}

fn stage_c(_arg: *mut ()) -> ! {
    loop {
        if let Ok(msg) = QUEUE_BC.pend() {
            DELIVERED.fetch_add(1, Ordering::Relaxed);
            tinysched::info!("[c] received #{}", msg as usize);
        }
    }
}

#[entry]
fn main() -> ! {
    tinysched::info!("pipeline demo");

    tinysched::init().expect("kernel init failed");

    QUEUE_AB
        .create(unsafe { &mut QUEUE_AB_BUF })
        .expect("queue_ab create failed");
    QUEUE_BC
        .create(unsafe { &mut QUEUE_BC_BUF })
        .expect("queue_bc create failed");

    tinysched::new_task("stage_a", stage_a, core::ptr::null_mut(), 5, unsafe { &mut STAGE_A_STK })
        .expect("stage_a task creation failed");
    tinysched::new_task("stage_b", stage_b, core::ptr::null_mut(), 6, unsafe { &mut STAGE_B_STK })
        .expect("stage_b task creation failed");
    tinysched::new_task("stage_c", stage_c, core::ptr::null_mut(), 7, unsafe { &mut STAGE_C_STK })
        .expect("stage_c task creation failed");

    tinysched::info!("starting scheduler");
    let _ = tinysched::run();

    loop {
        cortex_m::asm::wfi();
    }
}
