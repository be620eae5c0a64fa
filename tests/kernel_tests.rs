//! Black-box integration tests driven entirely through the public API.
//!
//! Unlike the in-crate unit tests, these only see what an application
//! crate would see: `init`/`run`, task creation, and the semaphore/queue
//! safe wrappers. There is no way to fabricate a "current task" from here,
//! so anything that requires a task to actually block (and later be woken
//! by a real context switch) is out of scope for this file — that's
//! covered by the in-crate tests next to the code that implements it.

use tinysched::sync::queue::{queue_create, Queue};
use tinysched::sync::sem::{sem_create, Semaphore};
use tinysched::{OsError, OsStkElement};

static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bring the kernel up exactly once for the lifetime of this test binary.
/// `run()` never returns on real hardware; on the host `stub` port it
/// returns `Err(FatalReturn)` immediately, which is expected here and not
/// a sign anything is wrong (see `port::stub::os_start_high_rdy`).
fn ensure_running() {
    if tinysched::init().is_err() {
        // Already initialized by an earlier test in this process.
    }
    let _ = tinysched::run();
}

fn dummy_entry(_arg: *mut ()) -> ! {
    loop {}
}

#[test]
fn init_after_running_is_rejected() {
    let _g = lock();
    ensure_running();
    assert_eq!(tinysched::init(), Err(OsError::OsRunning));
}

#[test]
fn run_again_after_running_is_rejected() {
    let _g = lock();
    ensure_running();
    assert_eq!(tinysched::run(), Err(OsError::OsRunning));
}

#[test]
fn new_task_rejects_priority_at_or_above_lowest_priority() {
    static mut STK: [OsStkElement; 64] = [0; 64];
    assert_eq!(
        tinysched::new_task(
            "bad_prio",
            dummy_entry,
            core::ptr::null_mut(),
            tinysched::LOWEST_PRIORITY,
            unsafe { &mut STK }
        ),
        Err(OsError::PrioInvalid)
    );
}

#[test]
fn new_task_rejects_undersized_stack() {
    static mut STK: [OsStkElement; 1] = [0; 1];
    assert_eq!(
        tinysched::new_task("small_stack", dummy_entry, core::ptr::null_mut(), 22, unsafe {
            &mut STK
        }),
        Err(OsError::StkSizeInvalid)
    );
}

#[test]
fn new_task_creates_task_with_requested_priority() {
    let _g = lock();
    ensure_running();

    static mut STK: [OsStkElement; 128] = [0; 128];
    let handle = tinysched::new_task("dummy", dummy_entry, core::ptr::null_mut(), 20, unsafe {
        &mut STK
    })
    .unwrap();

    assert_eq!(handle.prio(), 20);
}

#[test]
fn new_task_rejects_duplicate_priority() {
    let _g = lock();
    ensure_running();

    static mut STK_A: [OsStkElement; 64] = [0; 64];
    static mut STK_B: [OsStkElement; 64] = [0; 64];

    tinysched::new_task("dup_a", dummy_entry, core::ptr::null_mut(), 25, unsafe { &mut STK_A })
        .unwrap();
    assert_eq!(
        tinysched::new_task("dup_b", dummy_entry, core::ptr::null_mut(), 25, unsafe {
            &mut STK_B
        }),
        Err(OsError::PrioExist)
    );
}

static DEMO_SEM: Semaphore = Semaphore::new(2);

#[test]
fn semaphore_wait_signal_round_trip() {
    let _g = lock();
    ensure_running();

    assert_eq!(DEMO_SEM.wait().unwrap(), 1);
    assert_eq!(DEMO_SEM.wait().unwrap(), 0);
    assert_eq!(DEMO_SEM.signal().unwrap(), 1);
    assert_eq!(DEMO_SEM.count(), 1);
}

#[test]
fn sem_create_pool_exhaustion() {
    let _g = lock();

    for _ in 0..tinysched::MAX_SEMAPHORES {
        assert!(sem_create(0).is_ok());
    }
    assert_eq!(sem_create(0), Err(OsError::SemPoolExhausted));
}

static DEMO_QUEUE: Queue = Queue::new();
static mut DEMO_QUEUE_BUF: [*const (); 2] = [core::ptr::null(); 2];

#[test]
fn queue_post_pend_round_trip_and_full_queue_is_not_an_error() {
    let _g = lock();
    ensure_running();

    unsafe { DEMO_QUEUE.create(&mut DEMO_QUEUE_BUF) }.unwrap();

    assert_eq!(DEMO_QUEUE.post(1usize as *const ()), Ok(true));
    assert_eq!(DEMO_QUEUE.post(2usize as *const ()), Ok(true));
    assert_eq!(DEMO_QUEUE.post(3usize as *const ()), Ok(false));

    assert_eq!(DEMO_QUEUE.pend().unwrap() as usize, 1);
    assert_eq!(DEMO_QUEUE.pend().unwrap() as usize, 2);
    assert_eq!(DEMO_QUEUE.count(), 0);
}

#[test]
fn queue_create_rejects_empty_buffer() {
    static mut EMPTY: [*const (); 0] = [];
    let _g = lock();
    assert_eq!(unsafe { queue_create(&mut EMPTY) }, Err(OsError::QCapacityInvalid));
}

#[test]
fn queue_create_pool_exhaustion() {
    let _g = lock();

    static mut BUFS: [[*const (); 1]; tinysched::MAX_QUEUES] =
        [[core::ptr::null(); 1]; tinysched::MAX_QUEUES];
    static mut OVERFLOW_BUF: [*const (); 1] = [core::ptr::null(); 1];

    for buf in unsafe { BUFS.iter_mut() } {
        assert!(queue_create(buf).is_ok());
    }
    assert_eq!(
        queue_create(unsafe { &mut OVERFLOW_BUF }),
        Err(OsError::QueuePoolExhausted)
    );
}
