//! Producer-Consumer demo using a counting semaphore.
//!
//! A high-priority producer posts once per loop; a lower-priority consumer
//! blocks on the semaphore until one is available. Demonstrates `sem_pend`
//! blocking and `sem_post` waking exactly one waiter.

#![no_std]
#![no_main]
#![allow(static_mut_refs)]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use tinysched::sync::sem::Semaphore;
use tinysched::types::OsStkElement;

static PRODUCED: AtomicU32 = AtomicU32::new(0);
static CONSUMED: AtomicU32 = AtomicU32::new(0);

static SEM: Semaphore = Semaphore::new(0);

static mut PRODUCER_STK: [OsStkElement; 256] = [0; 256];
static mut CONSUMER_STK: [OsStkElement; 256] = [0; 256];

fn producer_task(_arg: *mut ()) -> ! {
    loop {
        let n = PRODUCED.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = SEM.signal();
        tinysched::info!("[producer] produced #{}", n);
        let _ = tinysched::time::delay_task(200);
    }
}

fn consumer_task(_arg: *mut ()) -> ! {
    loop {
        let _ = SEM.wait();
        let n = CONSUMED.fetch_add(1, Ordering::Relaxed) + 1;
        tinysched::info!("[consumer] consumed #{}", n);
    }
}

#[entry]
fn main() -> ! {
    tinysched::info!("producer/consumer demo");

    tinysched::init().expect("kernel init failed");

    tinysched::new_task(
        "producer",
        producer_task,
        core::ptr::null_mut(),
        5,
        unsafe { &mut PRODUCER_STK },
    )
    .expect("producer task creation failed");

    tinysched::new_task(
        "consumer",
        consumer_task,
        core::ptr::null_mut(),
        10,
        unsafe { &mut CONSUMER_STK },
    )
    .expect("consumer task creation failed");

    tinysched::info!("starting scheduler");
    let _ = tinysched::run();

    loop {
        cortex_m::asm::wfi();
    }
}
