//! Delta-list callback timers.
//!
//! A controller owns a fixed pool of timer slots. Started timers are kept in
//! a list ordered by time to expiry, where each entry stores its remaining
//! ticks relative to its predecessor, so [`tick`] only ever looks at the
//! head. Expired callbacks run outside the controller's guard, which lets a
//! callback start or stop timers on the controller that is running it.
//!
//! The guard strategy is pluggable through [`TimerGuard`]:
//!
//! - [`CallbackTimerLocked`] uses caller-supplied try-lock, lock and unlock
//!   delegates.
//! - [`CallbackTimerAtomic`] uses an atomic busy counter.
//! - [`CallbackTimerInterrupt`] holds a scoped RAII value, such as an
//!   interrupt-disable guard, around every critical section.
//! - [`CallbackTimerDeferred`] queues expired callbacks by priority and runs
//!   them later from [`handle_deferred`].
//!
//! [`tick`]: CallbackTimer::tick
//! [`handle_deferred`]: CallbackTimerDeferred::handle_deferred

mod controller;
mod deferred;
mod guard;
pub(crate) mod wheel;

pub use controller::{
    CallbackTimer, CallbackTimerAtomic, CallbackTimerInterrupt, CallbackTimerLocked,
};
pub use deferred::{CallbackTimerDeferred, CallbackTimerDeferredLocked};
pub use guard::{AtomicCounter, AtomicGuard, Exit, InterruptGuard, LockedGuard, TimerGuard, Unlock};

/// Raw id marking a free slot or a missing link.
pub(crate) const NO_TIMER: u8 = u8::MAX;

/// Delta of a timer that is not in the active list.
pub(crate) const INACTIVE: u32 = u32::MAX;

/// The largest pool a controller can hold; the remaining raw value is
/// reserved for [`NO_TIMER`].
pub const MAX_TIMER_CAPACITY: usize = 254;

/// Handle to a registered timer.
///
/// Ids are slot indices in `[0, MAX_TIMERS)`. An id stays valid until its
/// timer is unregistered or the controller is cleared, after which the slot
/// may be handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u8);

impl TimerId {
    /// Wraps a raw slot index.
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw slot index.
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a timer re-arms itself after expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Re-armed with its full period after every expiry.
    Repeating,
    /// Becomes inactive after one expiry.
    SingleShot,
}

impl Mode {
    #[inline]
    pub(crate) const fn is_repeating(self) -> bool {
        matches!(self, Mode::Repeating)
    }
}

/// When a started timer first expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Start {
    /// Expires on the next tick.
    Immediate,
    /// Expires after one full period.
    #[default]
    Delayed,
}
