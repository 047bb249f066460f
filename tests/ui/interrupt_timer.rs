use core::sync::atomic::{AtomicU32, Ordering};
use fixed_kit::{CallbackTimerInterrupt, Delegate, Mode, Start, TimerId};

#[derive(Default)]
struct CriticalSection;

fn main() {
    let fired = AtomicU32::new(0);
    let timer = CallbackTimerInterrupt::<CriticalSection, 1>::new();
    let on_expiry = || {
        fired.fetch_add(1, Ordering::Relaxed);
        timer.set_period(TimerId::new(0), 2);
        timer.start(TimerId::new(0), Start::Delayed);
    };

    let id = timer
        .register_timer(Delegate::new(&on_expiry), 5, Mode::SingleShot)
        .unwrap();
    timer.start(id, Start::Delayed);
    timer.enable(true);

    timer.tick(5);
    assert_eq!(fired.load(Ordering::Relaxed), 1);
    assert_eq!(timer.time_to_next(), Some(2));
}
