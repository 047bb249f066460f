use core::cmp::Ordering;

use heapless::BinaryHeap;
use heapless::binary_heap::Min;
use spin::Mutex;

use super::controller::CallbackTimer;
use super::guard::{LockedGuard, TimerGuard};
use super::wheel::Expired;
use super::{Mode, Start, TimerId};
use crate::delegate::Delegate;

/// A queued expiry.
///
/// Ordered by `(priority, sequence)`: lower priority values run first and
/// equal priorities run in expiry order.
struct DeferredCallback<'a> {
    priority: u32,
    sequence: u32,
    callback: Delegate<'a>,
}

impl DeferredCallback<'_> {
    #[inline]
    fn key(&self) -> (u32, u32) {
        (self.priority, self.sequence)
    }
}

/// The pending heap plus the sequence number handed to the next entry.
struct DeferredQueue<'a, const QUEUE: usize> {
    heap: BinaryHeap<DeferredCallback<'a>, Min, QUEUE>,
    sequence: u32,
}

impl<'a, const QUEUE: usize> DeferredQueue<'a, QUEUE> {
    const fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            sequence: 0,
        }
    }

    fn push(&mut self, expired: Expired<'a>) {
        if !expired.callback.is_valid() {
            return;
        }

        let entry = DeferredCallback {
            priority: expired.priority,
            sequence: self.sequence,
            callback: expired.callback,
        };
        self.sequence = self.sequence.wrapping_add(1);
        if self.heap.push(entry).is_err() {
            log::warn!(
                "deferred queue full, dropping expiry of timer {}",
                expired.id.get()
            );
        }
    }
}

impl PartialEq for DeferredCallback<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for DeferredCallback<'_> {}

impl PartialOrd for DeferredCallback<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeferredCallback<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// A timer controller that only detects expiries in [`tick`] and runs their
/// callbacks later from [`handle_deferred`].
///
/// `tick` pushes each expired callback into a bounded min-heap of depth
/// `QUEUE`, keyed by the timer's priority, while it holds the guard.
/// `handle_deferred`, usually called from a less urgent context than `tick`,
/// drains the heap one entry at a time and runs each callback with the guard
/// released. An expiry that finds the heap full is dropped.
///
/// # Examples
/// ```
/// use core::sync::atomic::{AtomicU32, Ordering};
/// use fixed_kit::{CallbackTimerDeferredLocked, Delegate, Mode, Start};
///
/// let fired = AtomicU32::new(0);
/// let on_expiry = || {
///     fired.fetch_add(1, Ordering::Relaxed);
/// };
///
/// let timer = CallbackTimerDeferredLocked::<2, 4>::default();
/// let id = timer.register_timer(Delegate::new(&on_expiry), 5, Mode::SingleShot).unwrap();
/// timer.start(id, Start::Delayed);
/// timer.enable(true);
///
/// timer.tick(5);
/// assert_eq!(fired.load(Ordering::Relaxed), 0);
/// assert_eq!(timer.queued(), 1);
///
/// assert_eq!(timer.handle_deferred(), 1);
/// assert_eq!(fired.load(Ordering::Relaxed), 1);
/// ```
///
/// [`tick`]: CallbackTimerDeferred::tick
/// [`handle_deferred`]: CallbackTimerDeferred::handle_deferred
pub struct CallbackTimerDeferred<'a, G, const MAX_TIMERS: usize, const QUEUE: usize> {
    timer: CallbackTimer<'a, G, MAX_TIMERS>,
    queue: Mutex<DeferredQueue<'a, QUEUE>>,
}

/// Deferred controller locked through caller-supplied delegates.
pub type CallbackTimerDeferredLocked<'a, const MAX_TIMERS: usize, const QUEUE: usize> =
    CallbackTimerDeferred<'a, LockedGuard<'a>, MAX_TIMERS, QUEUE>;

impl<'a, G, const MAX_TIMERS: usize, const QUEUE: usize> CallbackTimerDeferred<'a, G, MAX_TIMERS, QUEUE> {
    /// Creates a disabled controller guarded by `guard`.
    pub const fn with_guard(guard: G) -> Self {
        Self {
            timer: CallbackTimer::with_guard(guard),
            queue: Mutex::new(DeferredQueue::new()),
        }
    }

    /// Returns the guard.
    pub fn guard(&self) -> &G {
        self.timer.guard()
    }

    /// Enables or disables [`tick`](Self::tick).
    pub fn enable(&self, state: bool) {
        self.timer.enable(state);
    }

    /// Returns `true` if the controller is enabled.
    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}

impl<'a, G: TimerGuard, const MAX_TIMERS: usize, const QUEUE: usize>
    CallbackTimerDeferred<'a, G, MAX_TIMERS, QUEUE>
{
    /// Registers a stopped timer with priority 0.
    pub fn register_timer(
        &self,
        callback: Delegate<'a>,
        period: u32,
        mode: Mode,
    ) -> Option<TimerId> {
        self.timer.register_timer(callback, period, mode)
    }

    /// Registers a stopped timer. Lower `priority` values run first in
    /// [`handle_deferred`](Self::handle_deferred).
    pub fn register_timer_with_priority(
        &self,
        callback: Delegate<'a>,
        period: u32,
        mode: Mode,
        priority: u32,
    ) -> Option<TimerId> {
        self.timer
            .register_timer_with_priority(callback, period, mode, priority)
    }

    /// Stops and releases a timer.
    pub fn unregister_timer(&self, id: TimerId) -> bool {
        self.timer.unregister_timer(id)
    }

    /// Unregisters every timer and discards queued callbacks.
    pub fn clear(&self) {
        let mut section = self.timer.enter();
        section.wheel.clear();
        self.queue.lock().heap.clear();
    }

    /// Starts or restarts a timer.
    pub fn start(&self, id: TimerId, start: Start) -> bool {
        self.timer.start(id, start)
    }

    /// Stops a timer, keeping it registered.
    pub fn stop(&self, id: TimerId) -> bool {
        self.timer.stop(id)
    }

    /// Stops a timer and changes its period.
    pub fn set_period(&self, id: TimerId, period: u32) -> bool {
        self.timer.set_period(id, period)
    }

    /// Stops a timer and changes its mode.
    pub fn set_mode(&self, id: TimerId, mode: Mode) -> bool {
        self.timer.set_mode(id, mode)
    }

    /// Returns `true` if any timer is running.
    pub fn has_active_timer(&self) -> bool {
        self.timer.has_active_timer()
    }

    /// Returns the ticks until the next expiry, or `None` if no timer runs.
    pub fn time_to_next(&self) -> Option<u32> {
        self.timer.time_to_next()
    }

    /// Returns `true` if the timer is registered and running.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timer.is_active(id)
    }

    /// Returns the number of registered timers.
    pub fn registered_timers(&self) -> usize {
        self.timer.registered_timers()
    }

    /// Returns the number of callbacks waiting for
    /// [`handle_deferred`](Self::handle_deferred).
    pub fn queued(&self) -> usize {
        let _token = self.timer.guard().acquire();
        self.queue.lock().heap.len()
    }

    /// Advances time by `count` ticks, queueing the callback of every timer
    /// that expires.
    ///
    /// Returns `false`, changing nothing, if the controller is disabled or
    /// the guard or the queue is busy. Never waits.
    pub fn tick(&self, count: u32) -> bool {
        let Some(mut queue) = self.queue.try_lock() else {
            log::trace!("tick skipped, deferred queue busy");
            return false;
        };
        self.timer.advance(count, false, |expired| queue.push(expired))
    }

    /// Runs queued callbacks, most urgent first, until the queue is empty.
    ///
    /// Returns the number of callbacks run.
    pub fn handle_deferred(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = {
                let _token = self.timer.guard().acquire();
                self.queue.lock().heap.pop()
            };
            let Some(entry) = next else {
                break;
            };
            entry.callback.call_if();
            handled += 1;
        }
        handled
    }
}

impl<'a, const MAX_TIMERS: usize, const QUEUE: usize> CallbackTimerDeferredLocked<'a, MAX_TIMERS, QUEUE> {
    /// Creates a disabled controller using the given lock delegates.
    pub const fn new(try_lock: Delegate<'a, bool>, lock: Delegate<'a>, unlock: Delegate<'a>) -> Self {
        Self::with_guard(LockedGuard::new(try_lock, lock, unlock))
    }

    /// Replaces the lock delegates.
    pub fn set_locks(&mut self, try_lock: Delegate<'a, bool>, lock: Delegate<'a>, unlock: Delegate<'a>) {
        self.timer.set_locks(try_lock, lock, unlock);
    }
}

impl<const MAX_TIMERS: usize, const QUEUE: usize> Default
    for CallbackTimerDeferredLocked<'_, MAX_TIMERS, QUEUE>
{
    /// A controller without locking.
    fn default() -> Self {
        Self::with_guard(LockedGuard::default())
    }
}
