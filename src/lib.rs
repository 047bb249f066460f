//! Fixed-capacity bitsets and a delta-list callback timer, written in pure
//! Rust. `no_std`, no heap / `alloc`, no `unsafe`; just `core`.
//!
//! Designed for use in embedded and resource-constrained environments where
//! every buffer is sized at compile time.
//!
//! # Bitsets
//!
//! [`Bitset`] stores `BIT_COUNT` bits inline in words of any unsigned integer
//! type. [`BitsetExt`] runs the same operations over words borrowed from the
//! caller. Both are aliases of [`BitsetBase`].
//!
//! ```
//! use fixed_kit::{Bitset, word_count};
//!
//! const BIT_COUNT: usize = 20;
//! let mut bitset = Bitset::<u8, BIT_COUNT, { word_count::<u8>(BIT_COUNT) }>::new();
//! assert_eq!(bitset.count(), 0);
//! bitset.set(3);
//! bitset.set(17);
//! assert!(bitset.test(17));
//! assert_eq!(bitset.find_next(true, 4), Some(17));
//! assert_eq!(bitset.extract::<u32>(0, 20), Ok(0x2_0008));
//! ```
//!
//! # Timers
//!
//! [`CallbackTimer`] keeps up to `MAX_TIMERS` timers ordered by time to
//! expiry and runs their [`Delegate`] callbacks from [`tick`]. The guard
//! protecting the timer list is chosen through the type; see the [`timer`]
//! module for the variants.
//!
//! # Features
//!
//! - `#![no_std]` compatible, no heap allocations
//! - Const-generic API: `Bitset<E, BIT_COUNT, WORD_COUNT>`,
//!   `CallbackTimerLocked<'a, MAX_TIMERS>`
//! - Bit-level access: `test`, `set`, `reset`, `flip`, `bit_mut`, indexing
//! - Whole-bitset queries: `count`, `all`, `any`, `none`, `find_first`,
//!   `find_next`
//! - Bitwise ops:
//!   - `&`, `|`, `^`, `!`
//!   - `<<`, `>>`
//!   - `&=`, `|=`, `^=`, `<<=`, `>>=`
//! - Conversions: `value`, `to_u32`, `to_u64`, sign-extending `extract`,
//!   `to_bit_string`
//! - Equality across element types and storage
//! - Timers: repeating and single shot, immediate or delayed start, restart
//!   from inside callbacks, deferred dispatch by priority
//!
//! [`tick`]: CallbackTimer::tick

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![no_std]

mod bitset;
mod delegate;
mod element;
mod engine;
mod error;
mod span;
#[cfg(test)]
mod tests;
pub mod timer;

pub use bitset::{
    BitRef, Bitset, BitsetBase, BitsetExt, Iter, IterOnes, IterZeros, StorageModel, word_count,
};
pub use delegate::Delegate;
pub use element::{Element, Integral};
pub use error::{Error, Result};
pub use timer::{
    CallbackTimer, CallbackTimerAtomic, CallbackTimerDeferred, CallbackTimerDeferredLocked,
    CallbackTimerInterrupt, CallbackTimerLocked, Mode, Start, TimerId,
};
