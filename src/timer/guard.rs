//! Mutual-exclusion strategies for timer controllers.

use core::marker::PhantomData;

use crate::delegate::Delegate;

/// Serializes access to a controller's timer list.
///
/// The token returned by either method marks the critical section and ends it
/// when dropped.
pub trait TimerGuard {
    /// Proof of holding the guard.
    type Token<'g>
    where
        Self: 'g;

    /// Enters the critical section if that is possible without waiting.
    ///
    /// Used by `tick`, which skips its work rather than block.
    fn try_acquire(&self) -> Option<Self::Token<'_>>;

    /// Enters the critical section, waiting if the strategy can wait.
    fn acquire(&self) -> Self::Token<'_>;
}

/// Guard built from caller-supplied try-lock, lock and unlock delegates.
///
/// Unbound delegates mean no locking: `try_lock` then always succeeds and the
/// other two do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockedGuard<'a> {
    try_lock: Delegate<'a, bool>,
    lock: Delegate<'a>,
    unlock: Delegate<'a>,
}

impl<'a> LockedGuard<'a> {
    /// Creates a guard from the three lock delegates.
    pub const fn new(try_lock: Delegate<'a, bool>, lock: Delegate<'a>, unlock: Delegate<'a>) -> Self {
        Self {
            try_lock,
            lock,
            unlock,
        }
    }
}

/// Calls the unlock delegate when dropped.
pub struct Unlock<'a> {
    unlock: Delegate<'a>,
}

impl Drop for Unlock<'_> {
    fn drop(&mut self) {
        self.unlock.call_if();
    }
}

impl<'a> TimerGuard for LockedGuard<'a> {
    type Token<'g>
        = Unlock<'a>
    where
        Self: 'g;

    fn try_acquire(&self) -> Option<Unlock<'a>> {
        // built lazily, dropping an unused token would unlock
        self.try_lock.call_if().unwrap_or(true).then(|| Unlock {
            unlock: self.unlock,
        })
    }

    fn acquire(&self) -> Unlock<'a> {
        self.lock.call_if();
        Unlock {
            unlock: self.unlock,
        }
    }
}

/// An atomic integer usable as a busy counter.
pub trait AtomicCounter: Default {
    /// Returns the current count.
    fn count(&self) -> usize;

    /// Moves the count from zero to one. Returns `false` if it was not zero.
    fn try_enter(&self) -> bool;

    /// Increments the count unconditionally.
    fn enter(&self);

    /// Decrements the count.
    fn exit(&self);
}

macro_rules! impl_atomic_counter {
    ($($width:literal => $atomic:ty),+ $(,)?) => {
        $(
            #[cfg(target_has_atomic = $width)]
            impl AtomicCounter for $atomic {
                #[inline]
                fn count(&self) -> usize {
                    self.load(core::sync::atomic::Ordering::Acquire) as usize
                }

                #[inline]
                fn try_enter(&self) -> bool {
                    self.compare_exchange(
                        0,
                        1,
                        core::sync::atomic::Ordering::AcqRel,
                        core::sync::atomic::Ordering::Acquire,
                    )
                    .is_ok()
                }

                #[inline]
                fn enter(&self) {
                    self.fetch_add(1, core::sync::atomic::Ordering::AcqRel);
                }

                #[inline]
                fn exit(&self) {
                    self.fetch_sub(1, core::sync::atomic::Ordering::AcqRel);
                }
            }
        )+
    };
}

impl_atomic_counter!(
    "8" => core::sync::atomic::AtomicU8,
    "16" => core::sync::atomic::AtomicU16,
    "32" => core::sync::atomic::AtomicU32,
    "ptr" => core::sync::atomic::AtomicUsize,
);

/// Guard around an atomic busy counter.
///
/// Mutators always enter, bumping the count. `tick` only enters while the
/// count is zero, so it backs off whenever a mutator is mid-update, for
/// example when an interrupt driving `tick` preempts a thread calling
/// `start`.
#[derive(Debug, Default)]
pub struct AtomicGuard<C> {
    counter: C,
}

impl<C: AtomicCounter> AtomicGuard<C> {
    /// Creates a guard with a zero count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of critical sections currently entered.
    pub fn count(&self) -> usize {
        self.counter.count()
    }
}

/// Leaves an [`AtomicGuard`] critical section when dropped.
pub struct Exit<'g, C: AtomicCounter> {
    counter: &'g C,
}

impl<C: AtomicCounter> Drop for Exit<'_, C> {
    fn drop(&mut self) {
        self.counter.exit();
    }
}

impl<C: AtomicCounter> TimerGuard for AtomicGuard<C> {
    type Token<'g>
        = Exit<'g, C>
    where
        Self: 'g;

    fn try_acquire(&self) -> Option<Exit<'_, C>> {
        self.counter.try_enter().then(|| Exit {
            counter: &self.counter,
        })
    }

    fn acquire(&self) -> Exit<'_, C> {
        self.counter.enter();
        Exit {
            counter: &self.counter,
        }
    }
}

/// Guard that holds a fresh `S` for the length of every critical section.
///
/// `S` is a scoped type whose construction enters and whose drop leaves the
/// section, typically by disabling and restoring interrupts.
pub struct InterruptGuard<S> {
    _scope: PhantomData<fn() -> S>,
}

impl<S> InterruptGuard<S> {
    /// Creates the guard.
    pub const fn new() -> Self {
        Self {
            _scope: PhantomData,
        }
    }
}

impl<S> Default for InterruptGuard<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Default> TimerGuard for InterruptGuard<S> {
    type Token<'g>
        = S
    where
        Self: 'g;

    fn try_acquire(&self) -> Option<S> {
        Some(S::default())
    }

    fn acquire(&self) -> S {
        S::default()
    }
}
