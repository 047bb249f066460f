extern crate std;

use crate::timer::TimerGuard;
use crate::*;
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use heapless::Vec;
use spin::Mutex;

type Log = Mutex<Vec<u64, 16>>;

fn record(log: &Log, now: &AtomicU64) {
    log.lock().push(now.load(Ordering::Relaxed)).unwrap();
}

fn run_until(now: &AtomicU64, until: u64, step: u32, tick: impl Fn(u32) -> bool) {
    while now.load(Ordering::Relaxed) < until {
        now.fetch_add(u64::from(step), Ordering::Relaxed);
        tick(step);
    }
}

fn bump(counter: &AtomicU32) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn hits(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::Relaxed)
}

/// Lock delegates that count how often they are held.
#[derive(Default)]
struct Locks {
    held: AtomicI32,
    busy: AtomicBool,
    /// Calls to the blocking `lock`.
    waits: AtomicU32,
}

impl Locks {
    fn try_lock(&self) -> bool {
        if self.busy.load(Ordering::Relaxed) {
            return false;
        }
        self.held.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn lock(&self) {
        self.waits.fetch_add(1, Ordering::Relaxed);
        self.held.fetch_add(1, Ordering::Relaxed);
    }

    fn unlock(&self) {
        self.held.fetch_sub(1, Ordering::Relaxed);
    }

    fn held(&self) -> i32 {
        self.held.load(Ordering::Relaxed)
    }

    fn waits(&self) -> u32 {
        self.waits.load(Ordering::Relaxed)
    }
}

/// A real spin lock, for driving a controller from several threads.
#[derive(Default)]
struct SpinFlag {
    taken: AtomicBool,
}

impl SpinFlag {
    fn try_lock(&self) -> bool {
        self.taken
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn lock(&self) {
        while !self.try_lock() {
            core::hint::spin_loop();
        }
    }

    fn unlock(&self) {
        self.taken.store(false, Ordering::Release);
    }
}

#[test]
fn test_single_shot() {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let now = AtomicU64::new(0);
    let (log1, log2, log3) = (Log::default(), Log::default(), Log::default());
    let (cb1, cb2, cb3) = (
        || record(&log1, &now),
        || record(&log2, &now),
        || record(&log3, &now),
    );

    let timer = CallbackTimerLocked::<4>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id1 = timer.register_timer(Delegate::new(&cb1), 37, Mode::SingleShot).unwrap();
    let id2 = timer.register_timer(Delegate::new(&cb2), 23, Mode::SingleShot).unwrap();
    let id3 = timer.register_timer(Delegate::new(&cb3), 11, Mode::SingleShot).unwrap();

    assert!(timer.start(id1, Start::Delayed));
    assert!(timer.start(id3, Start::Delayed));
    assert!(timer.start(id2, Start::Delayed));
    timer.enable(true);

    run_until(&now, 100, 1, |step| timer.tick(step));

    assert_eq!(log1.lock().as_slice(), &[37]);
    assert_eq!(log2.lock().as_slice(), &[23]);
    assert_eq!(log3.lock().as_slice(), &[11]);
    assert!(!timer.has_active_timer());
    assert_eq!(timer.registered_timers(), 3);
    assert_eq!(locks.held(), 0);
}

fn check_repeating(step: u32, expected: [&[u64]; 3]) {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let now = AtomicU64::new(0);
    let (log1, log2, log3) = (Log::default(), Log::default(), Log::default());
    let (cb1, cb2, cb3) = (
        || record(&log1, &now),
        || record(&log2, &now),
        || record(&log3, &now),
    );

    let timer = CallbackTimerLocked::<3>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id1 = timer.register_timer(Delegate::new(&cb1), 37, Mode::Repeating).unwrap();
    let id2 = timer.register_timer(Delegate::new(&cb2), 23, Mode::Repeating).unwrap();
    let id3 = timer.register_timer(Delegate::new(&cb3), 11, Mode::Repeating).unwrap();

    timer.start(id1, Start::Delayed);
    timer.start(id3, Start::Delayed);
    timer.start(id2, Start::Delayed);
    timer.enable(true);

    run_until(&now, 100, step, |step| timer.tick(step));

    assert_eq!(log1.lock().as_slice(), expected[0], "step {step}");
    assert_eq!(log2.lock().as_slice(), expected[1], "step {step}");
    assert_eq!(log3.lock().as_slice(), expected[2], "step {step}");
    assert_eq!(locks.held(), 0);
}

#[test]
fn test_repeating() {
    check_repeating(
        1,
        [
            &[37, 74],
            &[23, 46, 69, 92],
            &[11, 22, 33, 44, 55, 66, 77, 88, 99],
        ],
    );
}

#[test]
fn test_repeating_bigger_step() {
    check_repeating(
        5,
        [
            &[40, 75],
            &[25, 50, 70, 95],
            &[15, 25, 35, 45, 55, 70, 80, 90, 100],
        ],
    );
}

#[test]
fn test_repeating_stop_start() {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let now = AtomicU64::new(0);
    let (log1, log2, log3) = (Log::default(), Log::default(), Log::default());
    let (cb1, cb2, cb3) = (
        || record(&log1, &now),
        || record(&log2, &now),
        || record(&log3, &now),
    );

    let timer = CallbackTimerLocked::<3>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id1 = timer.register_timer(Delegate::new(&cb1), 37, Mode::Repeating).unwrap();
    let id2 = timer.register_timer(Delegate::new(&cb2), 23, Mode::Repeating).unwrap();
    let id3 = timer.register_timer(Delegate::new(&cb3), 11, Mode::Repeating).unwrap();

    timer.start(id3, Start::Delayed);
    timer.start(id2, Start::Delayed);
    timer.enable(true);

    while now.load(Ordering::Relaxed) < 100 {
        if now.load(Ordering::Relaxed) == 40 {
            assert!(timer.start(id1, Start::Delayed));
            assert!(timer.stop(id2));
        }
        if now.load(Ordering::Relaxed) == 80 {
            assert!(timer.stop(id1));
            assert!(timer.start(id2, Start::Delayed));
        }
        now.fetch_add(1, Ordering::Relaxed);
        timer.tick(1);
    }

    assert_eq!(log1.lock().as_slice(), &[77]);
    assert_eq!(log2.lock().as_slice(), &[23]);
    assert_eq!(log3.lock().as_slice(), &[11, 22, 33, 44, 55, 66, 77, 88, 99]);
    assert_eq!(locks.held(), 0);
}

fn check_timer_starts_timer(step: u32, expected: &[u64]) {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let now = AtomicU64::new(0);
    let log = Log::default();
    let cb = || record(&log, &now);

    let timer = CallbackTimerLocked::<3>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let starter = || {
        record(&log, &now);
        assert!(timer.start(TimerId::new(2), Start::Delayed));
        assert!(timer.start(TimerId::new(1), Start::Delayed));
    };

    let id1 = timer.register_timer(Delegate::new(&starter), 100, Mode::SingleShot).unwrap();
    timer.register_timer(Delegate::new(&cb), 10, Mode::SingleShot).unwrap();
    timer.register_timer(Delegate::new(&cb), 22, Mode::SingleShot).unwrap();

    timer.start(id1, Start::Delayed);
    timer.enable(true);

    run_until(&now, 200, step, |step| timer.tick(step));

    assert_eq!(log.lock().as_slice(), expected, "step {step}");
    assert!(!timer.has_active_timer());
    assert_eq!(locks.held(), 0);
}

#[test]
fn test_timer_starts_timer_small_step() {
    check_timer_starts_timer(1, &[100, 110, 122]);
}

#[test]
fn test_timer_starts_timer_big_step() {
    check_timer_starts_timer(3, &[102, 111, 123]);
}

#[test]
fn test_repeating_register_unregister() {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let now = AtomicU64::new(0);
    let (log1, log2, log3) = (Log::default(), Log::default(), Log::default());
    let (cb1, cb2, cb3) = (
        || record(&log1, &now),
        || record(&log2, &now),
        || record(&log3, &now),
    );

    let timer = CallbackTimerLocked::<3>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id2 = timer.register_timer(Delegate::new(&cb2), 23, Mode::Repeating).unwrap();
    let id3 = timer.register_timer(Delegate::new(&cb3), 11, Mode::Repeating).unwrap();

    timer.start(id3, Start::Delayed);
    timer.start(id2, Start::Delayed);
    timer.enable(true);

    while now.load(Ordering::Relaxed) < 100 {
        if now.load(Ordering::Relaxed) == 40 {
            assert!(timer.unregister_timer(id2));
            assert!(!timer.unregister_timer(id2));
            let id1 = timer.register_timer(Delegate::new(&cb1), 37, Mode::Repeating).unwrap();
            // the freed slot is handed out again
            assert_eq!(id1, id2);
            timer.start(id1, Start::Delayed);
        }
        now.fetch_add(1, Ordering::Relaxed);
        timer.tick(1);
    }

    assert_eq!(log1.lock().as_slice(), &[77]);
    assert_eq!(log2.lock().as_slice(), &[23]);
    assert_eq!(log3.lock().as_slice(), &[11, 22, 33, 44, 55, 66, 77, 88, 99]);
    assert_eq!(locks.held(), 0);
}

#[test]
fn test_repeating_clear() {
    let now = AtomicU64::new(0);
    let (log1, log2, log3) = (Log::default(), Log::default(), Log::default());
    let (cb1, cb2, cb3) = (
        || record(&log1, &now),
        || record(&log2, &now),
        || record(&log3, &now),
    );

    let timer = CallbackTimerLocked::<3>::default();
    let id1 = timer.register_timer(Delegate::new(&cb1), 37, Mode::Repeating).unwrap();
    let id2 = timer.register_timer(Delegate::new(&cb2), 23, Mode::Repeating).unwrap();
    let id3 = timer.register_timer(Delegate::new(&cb3), 11, Mode::Repeating).unwrap();

    timer.start(id1, Start::Delayed);
    timer.start(id3, Start::Delayed);
    timer.start(id2, Start::Delayed);
    timer.enable(true);

    while now.load(Ordering::Relaxed) < 100 {
        if now.fetch_add(1, Ordering::Relaxed) + 1 == 40 {
            timer.clear();
            assert_eq!(timer.registered_timers(), 0);
            assert!(!timer.is_active(id1));
        }
        timer.tick(1);
    }

    assert_eq!(log1.lock().as_slice(), &[37]);
    assert_eq!(log2.lock().as_slice(), &[23]);
    assert_eq!(log3.lock().as_slice(), &[11, 22, 33]);
}

#[test]
fn test_delayed_immediate() {
    let now = AtomicU64::new(0);
    let (log1, log2, log3) = (Log::default(), Log::default(), Log::default());
    let (cb1, cb2, cb3) = (
        || record(&log1, &now),
        || record(&log2, &now),
        || record(&log3, &now),
    );

    let timer = CallbackTimerLocked::<3>::default();
    let id1 = timer.register_timer(Delegate::new(&cb1), 37, Mode::Repeating).unwrap();
    let id2 = timer.register_timer(Delegate::new(&cb2), 23, Mode::Repeating).unwrap();
    let id3 = timer.register_timer(Delegate::new(&cb3), 11, Mode::Repeating).unwrap();
    timer.enable(true);

    now.store(5, Ordering::Relaxed);
    timer.tick(5);

    timer.start(id1, Start::Immediate);
    timer.start(id2, Start::Immediate);
    timer.start(id3, Start::Delayed);

    run_until(&now, 100, 1, |step| timer.tick(step));

    assert_eq!(log1.lock().as_slice(), &[6, 42, 79]);
    assert_eq!(log2.lock().as_slice(), &[6, 28, 51, 74, 97]);
    assert_eq!(log3.lock().as_slice(), &[16, 27, 38, 49, 60, 71, 82, 93]);
}

#[test]
fn test_big_step_short_delay_insert() {
    let now = AtomicU64::new(0);
    let (log1, log2) = (Log::default(), Log::default());
    let (cb1, cb2) = (|| record(&log1, &now), || record(&log2, &now));

    let timer = CallbackTimerLocked::<3>::default();
    let id1 = timer.register_timer(Delegate::new(&cb1), 15, Mode::SingleShot).unwrap();
    let id2 = timer.register_timer(Delegate::new(&cb2), 5, Mode::Repeating).unwrap();

    timer.start(id1, Start::Delayed);
    timer.start(id2, Start::Delayed);
    timer.enable(true);

    run_until(&now, 22, 11, |step| timer.tick(step));

    assert_eq!(log1.lock().as_slice(), &[22]);
    assert_eq!(log2.lock().as_slice(), &[11, 11, 22, 22]);
}

#[test]
fn test_huge_tick_on_empty_list() {
    let now = AtomicU64::new(0);
    let log = Log::default();
    let cb = || record(&log, &now);

    let timer = CallbackTimerLocked::<3>::default();
    let id = timer.register_timer(Delegate::new(&cb), 5, Mode::SingleShot).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    run_until(&now, 5, 1, |step| timer.tick(step));
    assert!(timer.tick(u32::MAX - 4));
    assert_eq!(timer.time_to_next(), None);

    assert!(timer.start(id, Start::Delayed));
    assert_eq!(timer.time_to_next(), Some(5));
    run_until(&now, 10, 1, |step| timer.tick(step));

    assert_eq!(log.lock().as_slice(), &[5, 10]);
}

#[test]
fn test_huge_tick_drains_every_timer() {
    let fired = AtomicU32::new(0);
    let cb = || bump(&fired);

    let timer = CallbackTimerLocked::<3>::default();
    let short = timer.register_timer(Delegate::new(&cb), 7, Mode::SingleShot).unwrap();
    let long = timer.register_timer(Delegate::new(&cb), u32::MAX - 1, Mode::SingleShot).unwrap();
    timer.start(short, Start::Delayed);
    timer.start(long, Start::Delayed);
    timer.enable(true);

    assert!(timer.tick(u32::MAX));
    assert_eq!(hits(&fired), 2);
    assert!(!timer.has_active_timer());
}

#[test]
fn test_call_delegate() {
    let called = AtomicU32::new(0);
    let call = || bump(&called);

    let timer = CallbackTimerLocked::<1>::default();
    timer.enable(true);
    let id = timer.register_timer(Delegate::new(&call), 5, Mode::SingleShot).unwrap();
    timer.start(id, Start::Delayed);

    timer.tick(4);
    assert_eq!(hits(&called), 0);
    timer.tick(2);
    assert_eq!(hits(&called), 1);
}

#[test]
fn test_unbound_callback_is_silent() {
    let timer = CallbackTimerLocked::<1>::default();
    timer.enable(true);
    let id = timer.register_timer(Delegate::empty(), 3, Mode::Repeating).unwrap();
    timer.start(id, Start::Delayed);

    assert!(timer.tick(10));
    assert!(timer.is_active(id));
    assert_eq!(timer.time_to_next(), Some(2));
}

#[test]
fn test_time_to_next() {
    let timer = CallbackTimerLocked::<3>::default();
    timer.enable(true);
    assert_eq!(timer.time_to_next(), None);

    let id1 = timer.register_timer(Delegate::empty(), 37, Mode::Repeating).unwrap();
    let id2 = timer.register_timer(Delegate::empty(), 23, Mode::Repeating).unwrap();
    let id3 = timer.register_timer(Delegate::empty(), 11, Mode::Repeating).unwrap();
    timer.start(id1, Start::Delayed);
    timer.start(id2, Start::Delayed);
    timer.start(id3, Start::Delayed);
    assert_eq!(timer.time_to_next(), Some(11));

    timer.tick(7);
    assert_eq!(timer.time_to_next(), Some(4));

    timer.tick(4);
    assert_eq!(timer.time_to_next(), Some(11));

    timer.tick(11);
    assert_eq!(timer.time_to_next(), Some(1));

    timer.stop(id2);
    assert_eq!(timer.time_to_next(), Some(11));
    assert!(timer.has_active_timer());
}

#[test]
fn test_too_many_timers() {
    let timer = CallbackTimerLocked::<2>::default();

    assert!(timer.register_timer(Delegate::empty(), 10, Mode::SingleShot).is_some());
    assert!(timer.register_timer(Delegate::empty(), 10, Mode::SingleShot).is_some());
    assert_eq!(timer.register_timer(Delegate::empty(), 10, Mode::SingleShot), None);
    assert_eq!(timer.registered_timers(), 2);

    timer.clear();
    assert_eq!(
        timer.register_timer(Delegate::empty(), 10, Mode::SingleShot),
        Some(TimerId::new(0))
    );
}

#[test]
fn test_invalid_ids() {
    let timer = CallbackTimerLocked::<2>::default();
    let id = timer.register_timer(Delegate::empty(), 10, Mode::Repeating).unwrap();

    for bad in [TimerId::new(1), TimerId::new(2), TimerId::new(254), TimerId::new(255)] {
        assert!(!timer.start(bad, Start::Delayed));
        assert!(!timer.stop(bad));
        assert!(!timer.unregister_timer(bad));
        assert!(!timer.set_period(bad, 5));
        assert!(!timer.set_mode(bad, Mode::SingleShot));
        assert!(!timer.is_active(bad));
    }

    assert!(timer.stop(id));
    assert!(!timer.has_active_timer());
}

#[test]
fn test_start_needs_usable_period() {
    let timer = CallbackTimerLocked::<3>::default();
    let inactive = timer.register_timer(Delegate::empty(), u32::MAX, Mode::SingleShot).unwrap();
    let zero_repeating = timer.register_timer(Delegate::empty(), 0, Mode::Repeating).unwrap();
    let zero_single = timer.register_timer(Delegate::empty(), 0, Mode::SingleShot).unwrap();

    assert!(!timer.start(inactive, Start::Immediate));
    assert!(!timer.start(zero_repeating, Start::Delayed));
    assert!(timer.start(zero_single, Start::Delayed));
    assert_eq!(timer.time_to_next(), Some(0));

    assert!(timer.set_mode(zero_repeating, Mode::SingleShot));
    assert!(timer.start(zero_repeating, Start::Delayed));
}

#[test]
fn test_set_period_and_mode_stop_the_timer() {
    let fired = AtomicU32::new(0);
    let cb = || bump(&fired);

    let timer = CallbackTimerLocked::<1>::default();
    timer.enable(true);
    let id = timer.register_timer(Delegate::new(&cb), 10, Mode::Repeating).unwrap();

    timer.start(id, Start::Delayed);
    assert!(timer.set_period(id, 4));
    assert!(!timer.is_active(id));

    timer.start(id, Start::Delayed);
    assert_eq!(timer.time_to_next(), Some(4));
    timer.tick(8);
    assert_eq!(hits(&fired), 2);

    assert!(timer.set_mode(id, Mode::SingleShot));
    assert!(!timer.is_active(id));
    timer.start(id, Start::Delayed);
    timer.tick(8);
    assert_eq!(hits(&fired), 3);
    assert!(!timer.is_active(id));
}

#[test]
fn test_restart_from_own_callback() {
    let now = AtomicU64::new(0);
    let log = Log::default();

    let timer = CallbackTimerLocked::<1>::default();
    let restart = || {
        record(&log, &now);
        assert!(timer.start(TimerId::new(0), Start::Delayed));
    };
    let id = timer.register_timer(Delegate::new(&restart), 10, Mode::Repeating).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    run_until(&now, 30, 1, |step| timer.tick(step));

    assert_eq!(log.lock().as_slice(), &[10, 20, 30]);
    assert_eq!(timer.time_to_next(), Some(10));
}

#[test]
fn test_single_shot_from_own_callback() {
    let fired = AtomicU32::new(0);

    let timer = CallbackTimerLocked::<1>::default();
    let last_time = || {
        bump(&fired);
        timer.set_mode(TimerId::new(0), Mode::SingleShot);
    };
    let id = timer.register_timer(Delegate::new(&last_time), 3, Mode::Repeating).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    timer.tick(20);
    assert_eq!(hits(&fired), 1);
    assert!(!timer.is_active(id));
}

#[test]
fn test_stop_from_own_callback() {
    let fired = AtomicU32::new(0);

    let timer = CallbackTimerLocked::<1>::default();
    let once = || {
        bump(&fired);
        assert!(timer.is_active(TimerId::new(0)));
        assert!(timer.stop(TimerId::new(0)));
    };
    let id = timer.register_timer(Delegate::new(&once), 3, Mode::Repeating).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    assert!(timer.tick(20));
    assert_eq!(hits(&fired), 1);
    assert!(!timer.is_active(id));
    assert_eq!(timer.registered_timers(), 1);
}

fn check_slot_reused_from_callback(mode: Mode) {
    let fired = AtomicU32::new(0);
    let replacement = || bump(&fired);

    let timer = CallbackTimerLocked::<1>::default();
    let swap = || {
        assert!(timer.unregister_timer(TimerId::new(0)));
        assert_eq!(
            timer.register_timer(Delegate::new(&replacement), 7, Mode::Repeating),
            Some(TimerId::new(0))
        );
    };
    let id = timer.register_timer(Delegate::new(&swap), 1, mode).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    assert!(timer.tick(2));
    // the new registration stays stopped until someone starts it
    assert!(!timer.is_active(id));
    assert!(!timer.has_active_timer());
    assert_eq!(timer.registered_timers(), 1);

    assert!(timer.tick(20));
    assert_eq!(hits(&fired), 0);

    assert!(timer.start(id, Start::Delayed));
    assert!(timer.tick(7));
    assert_eq!(hits(&fired), 1);
}

#[test]
fn test_slot_reused_from_single_shot_callback() {
    check_slot_reused_from_callback(Mode::SingleShot);
}

#[test]
fn test_slot_reused_from_repeating_callback() {
    check_slot_reused_from_callback(Mode::Repeating);
}

#[test]
fn test_disabled_tick() {
    let fired = AtomicU32::new(0);
    let cb = || bump(&fired);

    let timer = CallbackTimerLocked::<1>::default();
    assert!(!timer.is_running());
    let id = timer.register_timer(Delegate::new(&cb), 1, Mode::SingleShot).unwrap();
    timer.start(id, Start::Delayed);

    assert!(!timer.tick(5));
    assert_eq!(hits(&fired), 0);
    assert_eq!(timer.time_to_next(), Some(1));

    timer.enable(true);
    assert!(timer.is_running());
    assert!(timer.tick(5));
    assert_eq!(hits(&fired), 1);
}

#[test]
fn test_busy_lock_skips_tick() {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let fired = AtomicU32::new(0);
    let cb = || bump(&fired);

    let mut timer = CallbackTimerLocked::<1>::default();
    timer.set_locks(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id = timer.register_timer(Delegate::new(&cb), 2, Mode::SingleShot).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    locks.busy.store(true, Ordering::Relaxed);
    assert!(!timer.tick(2));
    assert_eq!(locks.held(), 0);
    assert_eq!(hits(&fired), 0);
    assert_eq!(timer.time_to_next(), Some(2));

    locks.busy.store(false, Ordering::Relaxed);
    assert!(timer.tick(2));
    assert_eq!(hits(&fired), 1);
    assert_eq!(locks.held(), 0);
}

#[test]
fn test_tick_never_calls_blocking_lock() {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let fired = AtomicU32::new(0);
    let cb = || bump(&fired);

    let timer = CallbackTimerLocked::<2>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id = timer.register_timer(Delegate::new(&cb), 1, Mode::Repeating).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    let waits = locks.waits();
    assert!(timer.tick(3));
    assert_eq!(hits(&fired), 3);
    assert_eq!(locks.waits(), waits);
    assert_eq!(locks.held(), 0);
}

#[test]
fn test_lock_taken_during_callback_carries_ticks() {
    let locks = Locks::default();
    let (try_lock, lock, unlock) = (|| locks.try_lock(), || locks.lock(), || locks.unlock());
    let fired = AtomicU32::new(0);
    let interrupted = AtomicBool::new(false);
    let cb = || {
        bump(&fired);
        // another context takes the lock while the first callback runs
        if !interrupted.swap(true, Ordering::Relaxed) {
            locks.busy.store(true, Ordering::Relaxed);
        }
    };

    let timer = CallbackTimerLocked::<2>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id = timer.register_timer(Delegate::new(&cb), 1, Mode::Repeating).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    let waits = locks.waits();
    assert!(timer.tick(3));
    assert_eq!(hits(&fired), 1);
    assert_eq!(locks.waits(), waits);
    assert_eq!(locks.held(), 0);

    locks.busy.store(false, Ordering::Relaxed);
    assert_eq!(timer.time_to_next(), Some(1));
    assert!(timer.tick(0));
    assert_eq!(hits(&fired), 3);
    assert_eq!(timer.time_to_next(), Some(1));
    assert_eq!(locks.held(), 0);
}

#[test]
fn test_atomic_controller() {
    let now = AtomicU64::new(0);
    let log = Log::default();
    let cb = || record(&log, &now);

    let timer = CallbackTimerAtomic::<AtomicU32, 3>::new();
    let seen = AtomicUsize::new(usize::MAX);
    let starter = || {
        seen.store(timer.guard().count(), Ordering::Relaxed);
        record(&log, &now);
        timer.start(TimerId::new(1), Start::Delayed);
    };
    let id = timer.register_timer(Delegate::new(&starter), 10, Mode::SingleShot).unwrap();
    timer.register_timer(Delegate::new(&cb), 5, Mode::SingleShot).unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    run_until(&now, 20, 1, |step| timer.tick(step));

    assert_eq!(log.lock().as_slice(), &[10, 15]);
    // callbacks run outside the critical section
    assert_eq!(seen.load(Ordering::Relaxed), 0);
    assert_eq!(timer.guard().count(), 0);

    // a mutator mid-update makes tick back off
    let token = timer.guard().acquire();
    assert_eq!(timer.guard().count(), 1);
    assert!(!timer.tick(1));
    assert_eq!(timer.guard().count(), 1);
    drop(token);
    assert!(timer.tick(1));
}

static SCOPES_ENTERED: AtomicUsize = AtomicUsize::new(0);
static SCOPES_HELD: AtomicUsize = AtomicUsize::new(0);

struct InterruptsDisabled;

impl Default for InterruptsDisabled {
    fn default() -> Self {
        SCOPES_ENTERED.fetch_add(1, Ordering::SeqCst);
        SCOPES_HELD.fetch_add(1, Ordering::SeqCst);
        InterruptsDisabled
    }
}

impl Drop for InterruptsDisabled {
    fn drop(&mut self) {
        SCOPES_HELD.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn test_interrupt_controller() {
    let now = AtomicU64::new(0);
    let log = Log::default();
    let held_in_callback = AtomicUsize::new(usize::MAX);
    let cb = || {
        held_in_callback.store(SCOPES_HELD.load(Ordering::SeqCst), Ordering::Relaxed);
        record(&log, &now);
    };

    let timer = CallbackTimerInterrupt::<InterruptsDisabled, 2>::new();
    let id = timer.register_timer(Delegate::new(&cb), 4, Mode::Repeating).unwrap();
    timer.start(id, Start::Immediate);
    timer.enable(true);

    run_until(&now, 9, 1, |step| timer.tick(step));

    assert_eq!(log.lock().as_slice(), &[1, 5, 9]);
    assert_eq!(held_in_callback.load(Ordering::Relaxed), 0);
    assert_eq!(SCOPES_HELD.load(Ordering::SeqCst), 0);
    assert!(SCOPES_ENTERED.load(Ordering::SeqCst) > 0);
}

#[test]
fn test_controllers_are_sync() {
    fn assert_sync<T: Sync>() {}

    assert_sync::<CallbackTimerLocked<'static, 4>>();
    assert_sync::<CallbackTimerAtomic<'static, AtomicU32, 4>>();
    assert_sync::<CallbackTimerInterrupt<'static, InterruptsDisabled, 4>>();
    assert_sync::<CallbackTimerDeferredLocked<'static, 4, 4>>();
}

#[test]
fn test_start_stop_while_another_thread_ticks() {
    let flag = SpinFlag::default();
    let (try_lock, lock, unlock) = (|| flag.try_lock(), || flag.lock(), || flag.unlock());
    let fired = AtomicU32::new(0);
    let cb = || bump(&fired);

    let timer = CallbackTimerLocked::<2>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let ticker = timer.register_timer(Delegate::new(&cb), 1, Mode::Repeating).unwrap();
    let other = timer.register_timer(Delegate::empty(), 3, Mode::Repeating).unwrap();
    timer.start(ticker, Start::Delayed);
    timer.enable(true);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..1_000 {
                assert!(timer.start(other, Start::Delayed));
                assert!(timer.stop(other));
            }
        });
        scope.spawn(|| {
            for _ in 0..1_000 {
                timer.tick(1);
            }
        });
    });

    assert!(timer.tick(1));
    assert!(hits(&fired) >= 1);
    assert!(!flag.taken.load(Ordering::Relaxed));
    assert!(timer.is_active(ticker));
    assert!(!timer.is_active(other));
    assert_eq!(timer.time_to_next(), Some(1));
}
