use core::fmt::Debug;
use core::hash::Hash;
use core::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, ShlAssign, Shr,
    ShrAssign,
};

mod sealed {
    pub trait Sealed {}
}

/// An unsigned integer type usable as a backing word of a bitset.
///
/// Implemented for `u8`, `u16`, `u32`, `u64`, `u128` and `usize`. Changing
/// the element type of a bitset changes how many words it allocates, never
/// how many bits it exposes.
pub trait Element:
    sealed::Sealed
    + Copy
    + Eq
    + Hash
    + Debug
    + Default
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + BitAndAssign
    + BitOrAssign
    + BitXorAssign
    + ShlAssign<usize>
    + ShrAssign<usize>
{
    /// Number of bits in one word.
    const BITS: usize;
    /// The word with no bits set.
    const ALL_CLEAR: Self;
    /// The word with every bit set.
    const ALL_SET: Self;
    /// The word with only bit 0 set.
    const ONE: Self;

    /// Number of set bits in the word.
    fn count_ones(self) -> u32;

    /// Widens the word to `u128`.
    fn to_u128(self) -> u128;

    /// Truncates `value` to the width of the word.
    fn from_u128(value: u128) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const BITS: usize = <$ty>::BITS as usize;
                const ALL_CLEAR: Self = 0;
                const ALL_SET: Self = <$ty>::MAX;
                const ONE: Self = 1;

                #[inline]
                fn count_ones(self) -> u32 {
                    <$ty>::count_ones(self)
                }

                #[inline]
                fn to_u128(self) -> u128 {
                    self as u128
                }

                #[inline]
                fn from_u128(value: u128) -> Self {
                    value as $ty
                }
            }
        )+
    };
}

impl_element!(u8, u16, u32, u64, u128, usize);

mod sealed_integral {
    pub trait Sealed {}
}

/// An integral type a bit pattern can be read back into.
///
/// Used by [`value`] and [`extract`]. Signed targets are sign extended when
/// fewer bits than their width are read.
///
/// [`value`]: crate::BitsetBase::value
/// [`extract`]: crate::BitsetBase::extract
pub trait Integral: sealed_integral::Sealed + Copy {
    /// Number of bits in the type.
    const BITS: usize;
    /// Whether the type is signed.
    const SIGNED: bool;

    /// Truncates the raw two's complement pattern to the width of the type.
    fn from_bits(raw: u128) -> Self;
}

macro_rules! impl_integral {
    ($signed:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl sealed_integral::Sealed for $ty {}

            impl Integral for $ty {
                const BITS: usize = <$ty>::BITS as usize;
                const SIGNED: bool = $signed;

                #[inline]
                fn from_bits(raw: u128) -> Self {
                    raw as $ty
                }
            }
        )+
    };
}

impl_integral!(false => u8, u16, u32, u64, u128, usize);
impl_integral!(true => i8, i16, i32, i64, i128, isize);

/// Returns a `u128` with the low `width` bits set.
#[inline]
pub(crate) const fn low_mask(width: usize) -> u128 {
    if width >= 128 {
        // shift would overflow on u128
        !0u128
    } else {
        (1u128 << width) - 1
    }
}
