use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use spin::{Mutex, MutexGuard};

use super::guard::{AtomicCounter, AtomicGuard, InterruptGuard, LockedGuard, TimerGuard};
use super::wheel::{Expired, TimerWheel};
use super::{Mode, Start, TimerId};
use crate::delegate::Delegate;

/// A pool of up to `MAX_TIMERS` callback timers driven by [`tick`].
///
/// Every method takes `&self` and the controller is `Sync`, so one instance
/// can be shared between the threads or interrupt handlers that start timers
/// and the one that ticks, and callbacks may start or stop timers on the
/// controller running them. All list access happens under the guard `G`;
/// callbacks run with the guard released.
///
/// Controllers start disabled. Call [`enable`] before ticking.
///
/// # Examples
/// ```
/// use core::sync::atomic::{AtomicU32, Ordering};
/// use fixed_kit::{CallbackTimerLocked, Delegate, Mode, Start};
///
/// let fired = AtomicU32::new(0);
/// let on_expiry = || {
///     fired.fetch_add(1, Ordering::Relaxed);
/// };
///
/// let timer = CallbackTimerLocked::<4>::default();
/// let id = timer.register_timer(Delegate::new(&on_expiry), 10, Mode::Repeating).unwrap();
/// timer.start(id, Start::Delayed);
/// timer.enable(true);
///
/// for _ in 0..25 {
///     timer.tick(1);
/// }
/// assert_eq!(fired.load(Ordering::Relaxed), 2);
/// assert_eq!(timer.time_to_next(), Some(5));
/// ```
///
/// [`tick`]: CallbackTimer::tick
/// [`enable`]: CallbackTimer::enable
pub struct CallbackTimer<'a, G, const MAX_TIMERS: usize> {
    wheel: Mutex<TimerWheel<'a, MAX_TIMERS>>,
    enabled: AtomicBool,
    /// Ticks a `tick` could not charge because the guard was taken while a
    /// callback ran.
    carried: AtomicU32,
    guard: G,
}

/// Controller locked through caller-supplied delegates.
pub type CallbackTimerLocked<'a, const MAX_TIMERS: usize> =
    CallbackTimer<'a, LockedGuard<'a>, MAX_TIMERS>;

/// Controller guarded by an atomic busy counter of type `C`.
pub type CallbackTimerAtomic<'a, C, const MAX_TIMERS: usize> =
    CallbackTimer<'a, AtomicGuard<C>, MAX_TIMERS>;

/// Controller holding a scoped `S` around every critical section.
pub type CallbackTimerInterrupt<'a, S, const MAX_TIMERS: usize> =
    CallbackTimer<'a, InterruptGuard<S>, MAX_TIMERS>;

/// A held guard token plus the locked timer list.
///
/// Fields drop in order, so the list is unlocked before the guard is left.
pub(crate) struct Section<'s, 'a, G, const MAX_TIMERS: usize>
where
    G: TimerGuard + 's,
{
    pub(crate) wheel: MutexGuard<'s, TimerWheel<'a, MAX_TIMERS>>,
    _token: G::Token<'s>,
}

impl<'a, G, const MAX_TIMERS: usize> CallbackTimer<'a, G, MAX_TIMERS> {
    /// Creates a disabled controller with no timers, guarded by `guard`.
    ///
    /// # Compiler Errors
    /// Fails to compile when `MAX_TIMERS` exceeds 254.
    ///
    /// ```compile_fail
    /// use fixed_kit::CallbackTimerLocked;
    ///
    /// let timer = CallbackTimerLocked::<255>::default();
    /// # let _ = timer;
    /// ```
    pub const fn with_guard(guard: G) -> Self {
        Self {
            wheel: Mutex::new(TimerWheel::new()),
            enabled: AtomicBool::new(false),
            carried: AtomicU32::new(0),
            guard,
        }
    }

    /// Returns the guard.
    pub fn guard(&self) -> &G {
        &self.guard
    }

    /// Enables or disables [`tick`](Self::tick).
    pub fn enable(&self, state: bool) {
        self.enabled.store(state, Ordering::Release);
    }

    /// Returns `true` if the controller is enabled.
    pub fn is_running(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl<'a, G: TimerGuard, const MAX_TIMERS: usize> CallbackTimer<'a, G, MAX_TIMERS> {
    /// Enters the guard, waiting if the strategy can wait, and locks the list.
    pub(crate) fn enter(&self) -> Section<'_, 'a, G, MAX_TIMERS> {
        let token = self.guard.acquire();
        Section {
            wheel: self.wheel.lock(),
            _token: token,
        }
    }

    /// Enters the guard and locks the list only if neither is taken.
    fn try_enter(&self) -> Option<Section<'_, 'a, G, MAX_TIMERS>> {
        let token = self.guard.try_acquire()?;
        let wheel = self.wheel.try_lock()?;
        Some(Section {
            wheel,
            _token: token,
        })
    }

    /// Registers a timer with priority 0. See
    /// [`register_timer_with_priority`](Self::register_timer_with_priority).
    pub fn register_timer(
        &self,
        callback: Delegate<'a>,
        period: u32,
        mode: Mode,
    ) -> Option<TimerId> {
        self.register_timer_with_priority(callback, period, mode, 0)
    }

    /// Registers a stopped timer in the first free slot.
    ///
    /// `priority` only matters to deferred dispatch, where lower values run
    /// first. Returns `None` when the pool is full.
    pub fn register_timer_with_priority(
        &self,
        callback: Delegate<'a>,
        period: u32,
        mode: Mode,
        priority: u32,
    ) -> Option<TimerId> {
        let mut section = self.enter();
        let id = section.wheel.register(callback, period, mode, priority);
        if id.is_none() {
            log::debug!("timer pool full, all {MAX_TIMERS} slots registered");
        }
        id
    }

    /// Stops and releases a timer. Returns `false` for an id that is not
    /// registered.
    pub fn unregister_timer(&self, id: TimerId) -> bool {
        self.enter().wheel.unregister(id)
    }

    /// Unregisters every timer.
    pub fn clear(&self) {
        self.enter().wheel.clear();
    }

    /// Starts a timer, restarting it from a full period if it already runs.
    ///
    /// Returns `false` if the id is not registered or the timer has no usable
    /// period.
    pub fn start(&self, id: TimerId, start: Start) -> bool {
        self.enter().wheel.start(id, start)
    }

    /// Stops a timer, keeping it registered. Returns `false` for an id that is
    /// not registered.
    pub fn stop(&self, id: TimerId) -> bool {
        self.enter().wheel.stop(id)
    }

    /// Stops a timer and changes its period.
    pub fn set_period(&self, id: TimerId, period: u32) -> bool {
        self.enter().wheel.set_period(id, period)
    }

    /// Stops a timer and changes its mode.
    pub fn set_mode(&self, id: TimerId, mode: Mode) -> bool {
        self.enter().wheel.set_mode(id, mode)
    }

    /// Returns `true` if any timer is running.
    pub fn has_active_timer(&self) -> bool {
        self.enter().wheel.has_active()
    }

    /// Returns the ticks until the next expiry, or `None` if no timer runs.
    ///
    /// Ticks carried over from a `tick` that lost the guard to another
    /// context are not subtracted until the next `tick`.
    pub fn time_to_next(&self) -> Option<u32> {
        self.enter().wheel.time_to_next()
    }

    /// Returns `true` if the timer is registered and running.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.enter().wheel.is_active(id)
    }

    /// Returns the number of registered timers.
    pub fn registered_timers(&self) -> usize {
        self.enter().wheel.registered()
    }

    /// Advances time by `count` ticks, running the callback of every timer
    /// that expires, earliest deadline first.
    ///
    /// Returns `false`, changing nothing, if the controller is disabled or
    /// the guard is busy. Never waits for the guard: if another context
    /// takes it while a callback runs, the ticks not yet charged are carried
    /// over to the next call.
    pub fn tick(&self, count: u32) -> bool {
        self.advance(count, true, |expired| {
            expired.callback.call_if();
        })
    }

    /// Runs the expiry loop, handing each expired timer to `on_expired`.
    ///
    /// With `release` set, the guard is left around `on_expired` and
    /// re-entered without waiting afterwards. Without it, `on_expired` runs
    /// inside the critical section.
    pub(crate) fn advance(
        &self,
        count: u32,
        release: bool,
        mut on_expired: impl FnMut(Expired<'a>),
    ) -> bool {
        if !self.is_running() {
            log::trace!("tick skipped, timer disabled");
            return false;
        }
        let Some(mut section) = self.try_enter() else {
            log::trace!("tick skipped, guard busy");
            return false;
        };

        let mut count = count.saturating_add(self.carried.swap(0, Ordering::AcqRel));
        while let Some(expired) = section.wheel.pop_expired(&mut count) {
            if !release {
                on_expired(expired);
                continue;
            }

            drop(section);
            on_expired(expired);
            section = match self.try_enter() {
                Some(section) => section,
                None => {
                    log::trace!("guard taken during dispatch, carrying {count} ticks");
                    self.carry(count);
                    return true;
                }
            };
        }

        section.wheel.consume(count);
        true
    }

    fn carry(&self, count: u32) {
        let _ = self
            .carried
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |carried| {
                Some(carried.saturating_add(count))
            });
    }
}

impl<'a, const MAX_TIMERS: usize> CallbackTimerLocked<'a, MAX_TIMERS> {
    /// Creates a disabled controller using the given lock delegates.
    pub const fn new(try_lock: Delegate<'a, bool>, lock: Delegate<'a>, unlock: Delegate<'a>) -> Self {
        Self::with_guard(LockedGuard::new(try_lock, lock, unlock))
    }

    /// Replaces the lock delegates.
    pub fn set_locks(&mut self, try_lock: Delegate<'a, bool>, lock: Delegate<'a>, unlock: Delegate<'a>) {
        self.guard = LockedGuard::new(try_lock, lock, unlock);
    }
}

impl<const MAX_TIMERS: usize> Default for CallbackTimerLocked<'_, MAX_TIMERS> {
    /// A controller without locking.
    fn default() -> Self {
        Self::with_guard(LockedGuard::default())
    }
}

impl<C: AtomicCounter, const MAX_TIMERS: usize> CallbackTimerAtomic<'_, C, MAX_TIMERS> {
    /// Creates a disabled controller with a zero busy count.
    pub fn new() -> Self {
        Self::with_guard(AtomicGuard::new())
    }
}

impl<C: AtomicCounter, const MAX_TIMERS: usize> Default for CallbackTimerAtomic<'_, C, MAX_TIMERS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Default, const MAX_TIMERS: usize> CallbackTimerInterrupt<'_, S, MAX_TIMERS> {
    /// Creates a disabled controller.
    pub const fn new() -> Self {
        Self::with_guard(InterruptGuard::new())
    }
}

impl<S: Default, const MAX_TIMERS: usize> Default for CallbackTimerInterrupt<'_, S, MAX_TIMERS> {
    fn default() -> Self {
        Self::new()
    }
}
