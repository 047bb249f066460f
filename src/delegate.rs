use core::fmt::{Debug, Formatter};

use crate::error::{Error, Result};

/// A nullable, copyable handle to a callable returning `R`.
///
/// A delegate borrows its target, so it never allocates and can be stored in
/// fixed-size tables. Targets must be `Sync`, which keeps a table of
/// delegates shareable between threads and interrupt handlers. An empty delegate reports [`Error::DelegateUninitialised`]
/// when invoked through [`call`].
///
/// # Examples
/// ```
/// use fixed_kit::Delegate;
///
/// let answer = || 42;
/// let bound = Delegate::new(&answer);
/// assert_eq!(bound.call(), Ok(42));
///
/// let empty = Delegate::<u32>::empty();
/// assert!(!empty.is_valid());
/// assert_eq!(empty.call_if(), None);
/// ```
///
/// [`call`]: Delegate::call
pub struct Delegate<'a, R = ()> {
    target: Option<&'a (dyn Fn() -> R + Sync)>,
}

impl<'a, R> Delegate<'a, R> {
    /// Binds a delegate to `target`.
    #[inline]
    pub const fn new(target: &'a (dyn Fn() -> R + Sync)) -> Self {
        Self {
            target: Some(target),
        }
    }

    /// Creates an unbound delegate.
    #[inline]
    pub const fn empty() -> Self {
        Self { target: None }
    }

    /// Returns `true` if the delegate is bound to a target.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.target.is_some()
    }

    /// Invokes the target.
    ///
    /// # Errors
    /// Returns [`Error::DelegateUninitialised`] if the delegate is unbound.
    #[inline]
    pub fn call(&self) -> Result<R> {
        self.target
            .map(|target| target())
            .ok_or(Error::DelegateUninitialised)
    }

    /// Invokes the target if one is bound.
    #[inline]
    pub fn call_if(&self) -> Option<R> {
        self.target.map(|target| target())
    }
}

impl<R> Default for Delegate<'_, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R> Clone for Delegate<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Delegate<'_, R> {}

/// Two delegates are equal when both are unbound or both refer to the same
/// target object.
impl<R> PartialEq for Delegate<'_, R> {
    fn eq(&self, other: &Self) -> bool {
        match (self.target, other.target) {
            (None, None) => true,
            (Some(lhs), Some(rhs)) => core::ptr::addr_eq(lhs, rhs),
            _ => false,
        }
    }
}

impl<R> Debug for Delegate<'_, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.target {
            Some(target) => write!(f, "Delegate({target:p})"),
            None => write!(f, "Delegate(unbound)"),
        }
    }
}
