use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use fixed_kit::{CallbackTimerLocked, Delegate, Mode, Start};

fn main() {
    let depth = AtomicI32::new(0);
    let try_lock = || {
        depth.fetch_add(1, Ordering::Relaxed);
        true
    };
    let lock = || {
        depth.fetch_add(1, Ordering::Relaxed);
    };
    let unlock = || {
        depth.fetch_sub(1, Ordering::Relaxed);
    };
    let fired = AtomicU32::new(0);
    let on_expiry = || {
        fired.fetch_add(1, Ordering::Relaxed);
    };

    let timer = CallbackTimerLocked::<2>::new(
        Delegate::new(&try_lock),
        Delegate::new(&lock),
        Delegate::new(&unlock),
    );
    let id = timer
        .register_timer(Delegate::new(&on_expiry), 3, Mode::Repeating)
        .unwrap();
    timer.start(id, Start::Immediate);
    timer.enable(true);

    for _ in 0..7 {
        timer.tick(1);
    }
    assert_eq!(fired.load(Ordering::Relaxed), 3);
    assert_eq!(depth.load(Ordering::Relaxed), 0);
}
