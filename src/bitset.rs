use core::fmt::{Debug, Display, Formatter, Write};
use core::iter::{FusedIterator, Iterator};
use core::marker::PhantomData;
use core::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Index, Not, Shl, ShlAssign,
    Shr, ShrAssign,
};

use crate::element::{Element, Integral, low_mask};
use crate::engine;
use crate::error::{Error, Result};
use crate::span;

/// Computes the number of words of type `E` needed to store `bit_count` bits.
///
/// It's recommended to inline this call as a const expression into the type
/// annotation generics to avoid unnecessary panics.
///
/// # Examples
/// ```
/// use fixed_kit::word_count;
///
/// assert_eq!(word_count::<u8>(9), 2);
/// assert_eq!(word_count::<u8>(16), 2);
/// assert_eq!(word_count::<u32>(33), 2);
/// assert_eq!(word_count::<u64>(0), 0);
/// ```
pub const fn word_count<E: Element>(bit_count: usize) -> usize {
    bit_count.div_ceil(E::BITS)
}

#[allow(clippy::no_effect)]
#[allow(clippy::unnecessary_operation)]
pub(crate) const fn compile_assert_const_params<E: Element>(bit_count: usize, words: usize) {
    // This will cause a compile-time error if words != word_count(bit_count)
    ["WORD_COUNT must match word_count(BIT_COUNT)."]
        [(word_count::<E>(bit_count) != words) as usize];
}

pub(crate) fn runtime_assert_const_params<E: Element>(bit_count: usize, words: usize) {
    assert_eq!(
        word_count::<E>(bit_count),
        words,
        "WORD_COUNT must match word_count(BIT_COUNT)."
    );
}

/// How many words back a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageModel {
    /// Exactly one word; no index arithmetic is needed.
    Single,
    /// Zero or several words.
    Multi,
}

impl StorageModel {
    /// Selects the storage model for a word count.
    pub const fn for_word_count(words: usize) -> Self {
        if words == 1 {
            StorageModel::Single
        } else {
            StorageModel::Multi
        }
    }
}

/// A fixed number of bits stored in words of type `E`.
///
/// `BIT_COUNT` is the number of usable bits. `S` is the word storage: an
/// inline array for [`Bitset`] or a caller's buffer for [`BitsetExt`]. Every
/// operation keeps the unused high bits of the top word clear.
///
/// Bitsets of the same `BIT_COUNT` compare equal when their bits match, no
/// matter which element type or storage holds them.
#[derive(Clone, Copy, Hash)]
pub struct BitsetBase<E, const BIT_COUNT: usize, S> {
    words: S,
    _element: PhantomData<E>,
}

/// A bitset owning its words inline.
///
/// `WORD_COUNT` should only be set via const expression with [`word_count`]
/// to avoid unnecessary panics (see [`new`]).
///
/// [`new`]: BitsetBase::new
pub type Bitset<E, const BIT_COUNT: usize, const WORD_COUNT: usize> =
    BitsetBase<E, BIT_COUNT, [E; WORD_COUNT]>;

/// A bitset whose words live in a buffer supplied by the caller.
pub type BitsetExt<'s, E, const BIT_COUNT: usize> = BitsetBase<E, BIT_COUNT, &'s mut [E]>;

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> Bitset<E, BIT_COUNT, WORD_COUNT> {
    /// Creates a new bitset with all bits clear.
    ///
    /// # Panics
    /// Panics if `WORD_COUNT != word_count::<E>(BIT_COUNT)`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 16, { word_count::<u8>(16) }>::new();
    /// assert_eq!(bitset.count(), 0);
    /// assert!(bitset.none());
    /// ```
    pub fn new() -> Self {
        runtime_assert_const_params::<E>(BIT_COUNT, WORD_COUNT);
        Self::from_words([E::ALL_CLEAR; WORD_COUNT])
    }

    /// Creates a new `const` bitset with all bits clear.
    ///
    /// Equivalent to [`new`], but callable in compile-time contexts such as
    /// const initialization.
    ///
    /// # Compiler Errors
    /// Prevents compilation in const contexts if `WORD_COUNT !=
    /// word_count::<E>(BIT_COUNT)` with an unintuitive message like `index out
    /// of bounds: the length is 1 but the index is 1`.
    ///
    /// ```compile_fail
    /// use fixed_kit::Bitset;
    ///
    /// const BROKEN: Bitset<u8, 9, 1> = Bitset::const_empty();
    /// ```
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// const EMPTY: Bitset<u16, 20, { word_count::<u16>(20) }> = Bitset::const_empty();
    /// assert_eq!(EMPTY.count(), 0);
    /// ```
    ///
    /// [`new`]: BitsetBase::new
    pub const fn const_empty() -> Self {
        compile_assert_const_params::<E>(BIT_COUNT, WORD_COUNT);
        Self {
            words: [E::ALL_CLEAR; WORD_COUNT],
            _element: PhantomData,
        }
    }

    /// Creates a new bitset with all bits set.
    ///
    /// # Panics
    /// Panics if `WORD_COUNT != word_count::<E>(BIT_COUNT)`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 10, { word_count::<u8>(10) }>::with_all_set();
    /// assert_eq!(bitset.count(), 10);
    /// assert_eq!(bitset.words(), &[0xFF, 0x03]);
    /// ```
    #[inline]
    pub fn with_all_set() -> Self {
        let mut bitset = Self::new();
        bitset.set_all();
        bitset
    }

    /// Creates a bitset from the low bits of `value`.
    ///
    /// Bits of `value` at or above `BIT_COUNT` are discarded.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 12, { word_count::<u8>(12) }>::from_value(0xF123);
    /// assert_eq!(bitset.to_u32(), Ok(0x123));
    /// ```
    pub fn from_value(value: u64) -> Self {
        let mut bitset = Self::new();
        bitset.set_value(value);
        bitset
    }

    /// Creates a bitset from text of `'0'` and `'1'` characters, most
    /// significant bit first.
    ///
    /// See [`set_text`] for how short and long text is handled.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 8, { word_count::<u8>(8) }>::from_text("101");
    /// assert_eq!(bitset.to_u32(), Ok(0b101));
    /// ```
    ///
    /// [`set_text`]: BitsetBase::set_text
    pub fn from_text(text: &str) -> Self {
        let mut bitset = Self::new();
        bitset.set_text(text);
        bitset
    }

    /// Constructs a bitset from a boolean slice, where `true` means set and
    /// index 0 is the least significant bit.
    ///
    /// # Panics
    /// Panics if the slice length doesn't match `BIT_COUNT` or if
    /// `WORD_COUNT != word_count::<E>(BIT_COUNT)`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 4, { word_count::<u8>(4) }>::from_slice(&[true, false, true, false]);
    /// assert_eq!(bitset.count(), 2);
    /// ```
    #[inline]
    pub fn from_slice(bits: &[bool]) -> Self {
        assert_eq!(bits.len(), BIT_COUNT);
        let mut bitset = Self::new();
        for (idx, bit) in bits.iter().enumerate() {
            if *bit {
                bitset.set(idx)
            }
        }
        bitset
    }

    /// Constructs a bitset by setting only the positions provided in the
    /// iterator.
    ///
    /// # Panics
    /// Panics if any position is out of bounds (i.e., `>= BIT_COUNT`) or if
    /// `WORD_COUNT != word_count::<E>(BIT_COUNT)`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u32, 5, { word_count::<u32>(5) }>::from_ones_iter([0, 2, 4]);
    /// assert!(bitset.test(0));
    /// assert!(!bitset.test(1));
    /// assert_eq!(bitset.count(), 3);
    /// ```
    pub fn from_ones_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bitset = Self::new();
        for idx in iter {
            bitset.set(idx);
        }
        bitset
    }

    /// Consumes the bitset and returns its words, least significant first.
    pub fn into_words(self) -> [E; WORD_COUNT] {
        self.words
    }

    #[inline]
    fn from_words(words: [E; WORD_COUNT]) -> Self {
        Self {
            words,
            _element: PhantomData,
        }
    }

    /// Returns a new bitset representing the bitwise OR of `self` and `other`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// type Bits = Bitset<u8, 4, { word_count::<u8>(4) }>;
    /// let a = Bits::from_text("0101");
    /// let b = Bits::from_text("0110");
    /// assert_eq!(a.bit_or(&b), Bits::from_text("0111"));
    /// ```
    #[inline]
    pub fn bit_or(&self, other: &Self) -> Self {
        let mut result = *self;
        result.in_place_bit_or(other);
        result
    }

    /// Returns a new bitset representing the bitwise AND of `self` and `other`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// type Bits = Bitset<u8, 4, { word_count::<u8>(4) }>;
    /// let a = Bits::from_text("0101");
    /// let b = Bits::from_text("0110");
    /// assert_eq!(a.bit_and(&b), Bits::from_text("0100"));
    /// ```
    #[inline]
    pub fn bit_and(&self, other: &Self) -> Self {
        let mut result = *self;
        result.in_place_bit_and(other);
        result
    }

    /// Returns a new bitset representing the bitwise XOR of `self` and `other`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// type Bits = Bitset<u8, 4, { word_count::<u8>(4) }>;
    /// let a = Bits::from_text("0101");
    /// let b = Bits::from_text("0110");
    /// assert_eq!(a.bit_xor(&b), Bits::from_text("0011"));
    /// ```
    #[inline]
    pub fn bit_xor(&self, other: &Self) -> Self {
        let mut result = *self;
        result.in_place_bit_xor(other);
        result
    }

    /// Returns a new bitset with each bit inverted (bitwise NOT).
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// type Bits = Bitset<u8, 4, { word_count::<u8>(4) }>;
    /// assert_eq!(Bits::from_text("0100").bit_not(), Bits::from_text("1011"));
    /// ```
    #[inline]
    pub fn bit_not(&self) -> Self {
        let mut result = *self;
        result.flip_all();
        result
    }
}

impl<'s, E: Element, const BIT_COUNT: usize> BitsetExt<'s, E, BIT_COUNT> {
    /// Creates a bitset over the caller's `buffer` with all bits clear.
    ///
    /// Only the first `word_count::<E>(BIT_COUNT)` words of the buffer are
    /// used.
    ///
    /// # Errors
    /// Returns [`Error::BitsetInvalidBuffer`] if the buffer is shorter than
    /// `word_count::<E>(BIT_COUNT)` words.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{BitsetExt, Error, word_count};
    ///
    /// let mut buffer = [0xFFu8; word_count::<u8>(12)];
    /// let bitset = BitsetExt::<u8, 12>::new(&mut buffer).unwrap();
    /// assert!(bitset.none());
    ///
    /// let mut short = [0u8; 1];
    /// assert_eq!(BitsetExt::<u8, 12>::new(&mut short).unwrap_err(), Error::BitsetInvalidBuffer);
    /// ```
    pub fn new(buffer: &'s mut [E]) -> Result<Self> {
        let needed = word_count::<E>(BIT_COUNT);
        if buffer.len() < needed {
            log::debug!(
                "bitset buffer holds {} words, {} needed",
                buffer.len(),
                needed
            );
            return Err(Error::BitsetInvalidBuffer);
        }
        let (words, _) = buffer.split_at_mut(needed);
        words.fill(E::ALL_CLEAR);
        Ok(Self {
            words,
            _element: PhantomData,
        })
    }

    /// Creates a bitset over `buffer` from the low bits of `value`.
    ///
    /// # Errors
    /// Returns [`Error::BitsetInvalidBuffer`] if the buffer is too short.
    pub fn from_value(value: u64, buffer: &'s mut [E]) -> Result<Self> {
        let mut bitset = Self::new(buffer)?;
        bitset.set_value(value);
        Ok(bitset)
    }

    /// Creates a bitset over `buffer` from `'0'`/`'1'` text.
    ///
    /// # Errors
    /// Returns [`Error::BitsetInvalidBuffer`] if the buffer is too short.
    pub fn from_text(text: &str, buffer: &'s mut [E]) -> Result<Self> {
        let mut bitset = Self::new(buffer)?;
        bitset.set_text(text);
        Ok(bitset)
    }

    /// Creates a bitset over `buffer` holding a copy of `other`'s bits.
    ///
    /// # Errors
    /// Returns [`Error::BitsetInvalidBuffer`] if the buffer is too short.
    pub fn from_bitset<S2: AsRef<[E]>>(
        other: &BitsetBase<E, BIT_COUNT, S2>,
        buffer: &'s mut [E],
    ) -> Result<Self> {
        let mut bitset = Self::new(buffer)?;
        bitset.copy_from(other);
        Ok(bitset)
    }

    /// Releases the borrowed words.
    pub fn into_buffer(self) -> &'s mut [E] {
        self.words
    }
}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]>> BitsetBase<E, BIT_COUNT, S> {
    /// The number of usable bits.
    pub const ACTIVE_BITS: usize = BIT_COUNT;
    /// The number of bits in one backing word.
    pub const BITS_PER_ELEMENT: usize = E::BITS;
    /// The number of backing words.
    pub const WORD_COUNT: usize = word_count::<E>(BIT_COUNT);
    /// Whether the bitset uses one or several words.
    pub const STORAGE_MODEL: StorageModel = StorageModel::for_word_count(word_count::<E>(BIT_COUNT));

    /// Returns the number of usable bits, `BIT_COUNT`.
    #[inline]
    pub const fn size(&self) -> usize {
        BIT_COUNT
    }

    /// Returns the storage model in use.
    #[inline]
    pub const fn storage_model(&self) -> StorageModel {
        Self::STORAGE_MODEL
    }

    /// Returns the mask of valid bits within the most significant word.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// assert_eq!(Bitset::<u8, 12, { word_count::<u8>(12) }>::top_mask(), 0x0F);
    /// assert_eq!(Bitset::<u8, 16, { word_count::<u8>(16) }>::top_mask(), 0xFF);
    /// ```
    #[inline]
    pub fn top_mask() -> E {
        engine::top_mask::<E>(BIT_COUNT)
    }

    /// Returns the backing words, least significant first.
    #[inline]
    pub fn words(&self) -> &[E] {
        self.words.as_ref()
    }

    /// Returns `true` if the bit at the given position is set.
    ///
    /// # Panics
    /// Panics if `idx >= BIT_COUNT`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 8, { word_count::<u8>(8) }>::new();
    /// bitset.set(1);
    /// assert!(bitset.test(1));
    /// assert!(!bitset.test(0));
    /// ```
    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        assert!(idx < BIT_COUNT, "Bit index {idx} out of bounds");
        engine::test(self.words(), idx)
    }

    /// Returns the bit at the given position, or `None` if it is out of
    /// bounds.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<bool> {
        (idx < BIT_COUNT).then(|| engine::test(self.words(), idx))
    }

    /// Returns the number of set bits.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u16, 40, { word_count::<u16>(40) }>::from_value(0xF0_F000_0001);
    /// assert_eq!(bitset.count(), 9);
    /// ```
    #[inline]
    pub fn count(&self) -> usize {
        engine::count(self.words())
    }

    /// Returns `true` if every bit is set. Vacuously `true` when
    /// `BIT_COUNT == 0`.
    #[inline]
    pub fn all(&self) -> bool {
        engine::all(self.words(), BIT_COUNT)
    }

    /// Returns `true` if any bit is set.
    #[inline]
    pub fn any(&self) -> bool {
        !self.none()
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn none(&self) -> bool {
        engine::none(self.words())
    }

    /// Returns the position of the first bit in `state`, or `None`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 12, { word_count::<u8>(12) }>::from_text("000011110000");
    /// assert_eq!(bitset.find_first(true), Some(4));
    /// assert_eq!(bitset.find_first(false), Some(0));
    /// ```
    #[inline]
    pub fn find_first(&self, state: bool) -> Option<usize> {
        self.find_next(state, 0)
    }

    /// Returns the position of the first bit in `state` at or after
    /// `position`, or `None` if there is none before `BIT_COUNT`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let bitset = Bitset::<u8, 12, { word_count::<u8>(12) }>::from_text("000011110000");
    /// assert_eq!(bitset.find_next(false, 4), Some(8));
    /// assert_eq!(bitset.find_next(true, 8), None);
    /// ```
    #[inline]
    pub fn find_next(&self, state: bool, position: usize) -> Option<usize> {
        engine::find_next(self.words(), BIT_COUNT, state, position)
    }

    /// Returns an iterator over all bits as `bool`, from least to most
    /// significant.
    ///
    /// The iterator yields exactly `BIT_COUNT` items in order.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    /// use core::array::from_fn;
    ///
    /// let bitset = Bitset::<u8, 4, { word_count::<u8>(4) }>::from_slice(&[true, false, true, false]);
    /// let mut iter = bitset.iter();
    /// assert_eq!(from_fn(|_| iter.next().unwrap()), [true, false, true, false]);
    /// ```
    #[inline]
    pub fn iter(&self) -> Iter<'_, E, BIT_COUNT> {
        Iter {
            words: self.words(),
            word_idx: 0,
            bit_idx: 0,
        }
    }

    /// Returns an iterator over the positions of all set bits, in ascending
    /// order.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    /// use core::array::from_fn;
    ///
    /// let bitset = Bitset::<u8, 5, { word_count::<u8>(5) }>::from_text("10101");
    /// let mut ones = bitset.iter_ones();
    /// assert_eq!(from_fn(|_| ones.next().unwrap_or(999)), [0, 2, 4, 999]);
    /// ```
    #[inline]
    pub fn iter_ones(&self) -> IterOnes<'_, E, BIT_COUNT> {
        IterOnes {
            words: self.words(),
            next: 0,
        }
    }

    /// Returns an iterator over the positions of all clear bits, in ascending
    /// order.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    /// use core::array::from_fn;
    ///
    /// let bitset = Bitset::<u8, 5, { word_count::<u8>(5) }>::from_text("10101");
    /// let mut zeros = bitset.iter_zeros();
    /// assert_eq!(from_fn(|_| zeros.next().unwrap_or(999)), [1, 3, 999]);
    /// ```
    #[inline]
    pub fn iter_zeros(&self) -> IterZeros<'_, E, BIT_COUNT> {
        IterZeros {
            words: self.words(),
            next: 0,
        }
    }

    /// Reassembles every backing word into a value of type `T`.
    ///
    /// # Errors
    /// Returns [`Error::BitsetTypeTooSmall`] if `T` has fewer bits than the
    /// bitset allocates (`WORD_COUNT * BITS_PER_ELEMENT`), even when the
    /// high words are clear.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, Error, word_count};
    ///
    /// let bitset = Bitset::<u8, 12, { word_count::<u8>(12) }>::from_value(0x0ABC);
    /// assert_eq!(bitset.value::<u16>(), Ok(0x0ABC));
    /// assert_eq!(bitset.value::<u8>(), Err(Error::BitsetTypeTooSmall));
    /// ```
    pub fn value<T: Integral>(&self) -> Result<T> {
        let words = self.words();
        if words.len() * E::BITS > T::BITS {
            return Err(Error::BitsetTypeTooSmall);
        }
        Ok(T::from_bits(engine::value_bits(words)))
    }

    /// Returns the bits as a `u32`. See [`value`].
    ///
    /// [`value`]: BitsetBase::value
    #[inline]
    pub fn to_u32(&self) -> Result<u32> {
        self.value::<u32>()
    }

    /// Returns the bits as a `u64`. See [`value`].
    ///
    /// [`value`]: BitsetBase::value
    #[inline]
    pub fn to_u64(&self) -> Result<u64> {
        self.value::<u64>()
    }

    /// Reads `length` bits starting at `position` as a value of type `T`.
    ///
    /// The field may span word boundaries. If `T` is signed and `length` is
    /// less than its width, the top bit of the field is sign extended.
    ///
    /// # Errors
    /// Returns [`Error::BitsetOverflow`] if `length` exceeds the width of
    /// `T` or if the field reaches past `BIT_COUNT`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, Error, word_count};
    ///
    /// let bitset = Bitset::<u8, 32, { word_count::<u8>(32) }>::from_value(0x1234_5678);
    /// assert_eq!(bitset.extract::<u8>(4, 8), Ok(0x67));
    /// assert_eq!(bitset.extract::<u16>(12, 12), Ok(0x345));
    /// assert_eq!(bitset.extract::<i8>(0, 6), Ok(-8));
    /// assert_eq!(bitset.extract::<u8>(25, 8), Err(Error::BitsetOverflow));
    /// ```
    pub fn extract<T: Integral>(&self, position: usize, length: usize) -> Result<T> {
        let fits = length <= T::BITS
            && position
                .checked_add(length)
                .is_some_and(|end| end <= BIT_COUNT);
        if !fits {
            return Err(Error::BitsetOverflow);
        }

        let mut raw = engine::extract(self.words(), position, length);
        if T::SIGNED && length > 0 && length < T::BITS && (raw >> (length - 1)) & 1 == 1 {
            raw |= !low_mask(length);
        }
        Ok(T::from_bits(raw))
    }

    /// Writes the bits to `out`, most significant first, using `zero` and
    /// `one` for clear and set bits.
    pub fn write_bits<W: Write>(&self, out: &mut W, zero: char, one: char) -> core::fmt::Result {
        let words = self.words();
        for idx in (0..BIT_COUNT).rev() {
            out.write_char(if engine::test(words, idx) { one } else { zero })?;
        }
        Ok(())
    }

    /// Returns the bits as text of `BIT_COUNT` characters, most significant
    /// first.
    ///
    /// # Errors
    /// Returns [`Error::StringTooSmall`] if `CAP` bytes cannot hold the text.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, Error, word_count};
    ///
    /// let bitset = Bitset::<u32, 8, { word_count::<u32>(8) }>::from_value(0x35);
    /// assert_eq!(bitset.to_bit_string::<8>('.', '*').unwrap().as_str(), "..**.*.*");
    /// assert_eq!(bitset.to_bit_string::<7>('0', '1'), Err(Error::StringTooSmall));
    /// ```
    pub fn to_bit_string<const CAP: usize>(
        &self,
        zero: char,
        one: char,
    ) -> Result<heapless::String<CAP>> {
        let ones = self.count();
        let needed = ones * one.len_utf8() + (BIT_COUNT - ones) * zero.len_utf8();
        if needed > CAP {
            return Err(Error::StringTooSmall);
        }

        let mut text = heapless::String::new();
        self.write_bits(&mut text, zero, one)
            .map_err(|_| Error::StringTooSmall)?;
        Ok(text)
    }
}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]> + AsMut<[E]>> BitsetBase<E, BIT_COUNT, S> {
    /// Returns the backing words for direct modification.
    ///
    /// Callers must keep the bits above `BIT_COUNT` clear.
    #[inline]
    pub fn words_mut(&mut self) -> &mut [E] {
        self.words.as_mut()
    }

    /// Sets the bit at the given position.
    ///
    /// # Panics
    /// Panics if the position is out of bounds (i.e., `>= BIT_COUNT`).
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 8, { word_count::<u8>(8) }>::new();
    /// bitset.set(3);
    /// assert!(bitset.test(3));
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        self.set_to(idx, true);
    }

    /// Sets the bit at the given position to `value`.
    ///
    /// # Panics
    /// Panics if `idx >= BIT_COUNT`.
    #[inline]
    pub fn set_to(&mut self, idx: usize, value: bool) {
        assert!(idx < BIT_COUNT, "Bit index {idx} out of bounds");
        engine::set(self.words_mut(), idx, value);
    }

    /// Sets every bit.
    #[inline]
    pub fn set_all(&mut self) {
        engine::set_all(self.words_mut(), BIT_COUNT);
    }

    /// Replaces the bits with the low bits of `value`.
    #[inline]
    pub fn set_value(&mut self, value: u64) {
        engine::initialise(self.words_mut(), BIT_COUNT, value);
    }

    /// Replaces the bits with `'0'`/`'1'` text, most significant bit first.
    ///
    /// Text shorter than `BIT_COUNT` leaves the high bits clear. Text longer
    /// than `BIT_COUNT` only contributes its rightmost `BIT_COUNT`
    /// characters. Any character other than `'1'` reads as a clear bit.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 4, { word_count::<u8>(4) }>::new();
    /// bitset.set_text("110101");
    /// assert_eq!(bitset.to_u32(), Ok(0b0101));
    /// ```
    #[inline]
    pub fn set_text(&mut self, text: &str) {
        engine::set_from_text(self.words_mut(), BIT_COUNT, text);
    }

    /// Clears the bit at the given position.
    ///
    /// # Panics
    /// Panics if `idx >= BIT_COUNT`.
    #[inline]
    pub fn reset(&mut self, idx: usize) {
        self.set_to(idx, false);
    }

    /// Clears every bit.
    #[inline]
    pub fn reset_all(&mut self) {
        self.words_mut().fill(E::ALL_CLEAR);
    }

    /// Toggles the bit at the given position.
    ///
    /// Returns the previous value of the bit (before the toggle).
    ///
    /// # Panics
    /// Panics if `idx >= BIT_COUNT`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 8, { word_count::<u8>(8) }>::new();
    /// assert_eq!(bitset.flip(4), false); // flipped from false to true
    /// assert_eq!(bitset.flip(4), true);  // flipped from true to false
    /// ```
    #[inline]
    pub fn flip(&mut self, idx: usize) -> bool {
        let previous = self.test(idx);
        engine::flip(self.words_mut(), idx);
        previous
    }

    /// Toggles every bit.
    #[inline]
    pub fn flip_all(&mut self) {
        engine::flip_all(self.words_mut(), BIT_COUNT);
    }

    /// Returns a proxy for reading, assigning and flipping one bit.
    ///
    /// # Panics
    /// Panics if `idx >= BIT_COUNT`.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 8, { word_count::<u8>(8) }>::new();
    /// bitset.bit_mut(2).set(true);
    /// bitset.bit_mut(3).flip();
    /// assert_eq!(bitset.to_u32(), Ok(0b1100));
    /// ```
    #[inline]
    pub fn bit_mut(&mut self, idx: usize) -> BitRef<'_, E> {
        assert!(idx < BIT_COUNT, "Bit index {idx} out of bounds");
        BitRef {
            words: self.words_mut(),
            position: idx,
        }
    }

    /// Copies the bits of `other` into `self`.
    #[inline]
    pub fn copy_from<S2: AsRef<[E]>>(&mut self, other: &BitsetBase<E, BIT_COUNT, S2>) {
        self.words_mut().copy_from_slice(other.words());
    }

    /// Exchanges the bits of `self` and `other`.
    #[inline]
    pub fn swap<S2: AsRef<[E]> + AsMut<[E]>>(&mut self, other: &mut BitsetBase<E, BIT_COUNT, S2>) {
        self.words_mut().swap_with_slice(other.words_mut());
    }

    /// Performs an in-place bitwise OR with another bitset.
    #[inline]
    pub fn in_place_bit_or<S2: AsRef<[E]>>(&mut self, other: &BitsetBase<E, BIT_COUNT, S2>) {
        for (word, other_word) in self.words_mut().iter_mut().zip(other.words()) {
            *word |= *other_word
        }
    }

    /// Performs an in-place bitwise AND with another bitset.
    #[inline]
    pub fn in_place_bit_and<S2: AsRef<[E]>>(&mut self, other: &BitsetBase<E, BIT_COUNT, S2>) {
        for (word, other_word) in self.words_mut().iter_mut().zip(other.words()) {
            *word &= *other_word
        }
    }

    /// Performs an in-place bitwise XOR with another bitset.
    #[inline]
    pub fn in_place_bit_xor<S2: AsRef<[E]>>(&mut self, other: &BitsetBase<E, BIT_COUNT, S2>) {
        for (word, other_word) in self.words_mut().iter_mut().zip(other.words()) {
            *word ^= *other_word
        }
    }

    /// Does a left shift by `n` positions, filling with clear bits. This
    /// means bits move towards higher positions.
    ///
    /// Bits that are shifted beyond `BIT_COUNT` are lost.
    /// If `n >= BIT_COUNT`, the bitset is cleared.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 12, { word_count::<u8>(12) }>::from_text("000010100001");
    /// bitset.shift_left(4);
    /// assert_eq!(bitset, Bitset::<u8, 12, { word_count::<u8>(12) }>::from_text("101000010000"));
    /// ```
    pub fn shift_left(&mut self, n: usize) {
        engine::shift_left(self.words_mut(), BIT_COUNT, n);
    }

    /// Does a right shift by `n` positions, filling with clear bits. This
    /// means bits move towards lower positions.
    ///
    /// Bits that are shifted beyond position 0 are lost.
    /// If `n >= BIT_COUNT`, the bitset is cleared.
    ///
    /// # Examples
    /// ```
    /// use fixed_kit::{Bitset, word_count};
    ///
    /// let mut bitset = Bitset::<u8, 12, { word_count::<u8>(12) }>::from_text("101000010000");
    /// bitset.shift_right(5);
    /// assert_eq!(bitset, Bitset::<u8, 12, { word_count::<u8>(12) }>::from_text("000001010000"));
    /// ```
    pub fn shift_right(&mut self, n: usize) {
        engine::shift_right(self.words_mut(), BIT_COUNT, n);
    }
}

/// A proxy for one bit of a bitset, returned by [`BitsetBase::bit_mut`].
pub struct BitRef<'b, E> {
    words: &'b mut [E],
    position: usize,
}

impl<E: Element> BitRef<'_, E> {
    /// Returns the value of the bit.
    #[inline]
    pub fn get(&self) -> bool {
        engine::test(self.words, self.position)
    }

    /// Assigns the bit.
    #[inline]
    pub fn set(&mut self, value: bool) {
        engine::set(self.words, self.position, value);
    }

    /// Toggles the bit.
    #[inline]
    pub fn flip(&mut self) {
        engine::flip(self.words, self.position);
    }

    /// Returns the inverse of the bit without changing it.
    #[inline]
    pub fn inverted(&self) -> bool {
        !self.get()
    }

    /// Returns the position this proxy refers to.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> Default
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<L, R, const BIT_COUNT: usize, SL, SR> PartialEq<BitsetBase<R, BIT_COUNT, SR>>
    for BitsetBase<L, BIT_COUNT, SL>
where
    L: Element,
    R: Element,
    SL: AsRef<[L]>,
    SR: AsRef<[R]>,
{
    fn eq(&self, other: &BitsetBase<R, BIT_COUNT, SR>) -> bool {
        span::equal(self.words(), other.words())
    }
}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]>> Eq for BitsetBase<E, BIT_COUNT, S> {}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]>> Index<usize> for BitsetBase<E, BIT_COUNT, S> {
    type Output = bool;

    fn index(&self, idx: usize) -> &bool {
        if self.test(idx) { &true } else { &false }
    }
}

impl<'bitset, E: Element, const BIT_COUNT: usize, S: AsRef<[E]>> IntoIterator
    for &'bitset BitsetBase<E, BIT_COUNT, S>
{
    type Item = bool;
    type IntoIter = Iter<'bitset, E, BIT_COUNT>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]>> Debug for BitsetBase<E, BIT_COUNT, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "LSB -> ")?;
        for (i, bit) in self.iter().enumerate() {
            if i % 8 == 0 {
                write!(f, "{i}: ")?;
            }
            write!(f, "{}", if bit { '1' } else { '0' })?;
            if i % 8 == 7 && i + 1 < BIT_COUNT {
                write!(f, " ")?;
            }
        }
        write!(f, " <- MSB")?;
        Ok(())
    }
}

/// Formats the bits as `'0'`/`'1'` text, most significant first.
impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]>> Display for BitsetBase<E, BIT_COUNT, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.write_bits(f, '0', '1')
    }
}

/// Constructs a bitset from an iterator over `bool`s, least significant first.
///
/// # Panics
/// Panics if the iterator yields more or fewer than `BIT_COUNT` elements or
/// if `WORD_COUNT != word_count::<E>(BIT_COUNT)`.
impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> FromIterator<bool>
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let mut bitset = Self::new();
        let mut idx = 0;

        for bit in iter {
            if idx >= BIT_COUNT {
                panic!("Iterator yielded more than {BIT_COUNT} elements");
            }
            if bit {
                bitset.set(idx);
            }
            idx += 1;
        }

        if idx != BIT_COUNT {
            panic!("Iterator yielded fewer than {BIT_COUNT} elements");
        }

        bitset
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> BitAnd
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.bit_and(&rhs)
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> BitAndAssign
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    fn bitand_assign(&mut self, rhs: Self) {
        self.in_place_bit_and(&rhs)
    }
}

impl<E, const BIT_COUNT: usize, S, S2> BitAndAssign<&BitsetBase<E, BIT_COUNT, S2>>
    for BitsetBase<E, BIT_COUNT, S>
where
    E: Element,
    S: AsRef<[E]> + AsMut<[E]>,
    S2: AsRef<[E]>,
{
    fn bitand_assign(&mut self, rhs: &BitsetBase<E, BIT_COUNT, S2>) {
        self.in_place_bit_and(rhs)
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> BitOr
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.bit_or(&rhs)
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> BitOrAssign
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    fn bitor_assign(&mut self, rhs: Self) {
        self.in_place_bit_or(&rhs)
    }
}

impl<E, const BIT_COUNT: usize, S, S2> BitOrAssign<&BitsetBase<E, BIT_COUNT, S2>>
    for BitsetBase<E, BIT_COUNT, S>
where
    E: Element,
    S: AsRef<[E]> + AsMut<[E]>,
    S2: AsRef<[E]>,
{
    fn bitor_assign(&mut self, rhs: &BitsetBase<E, BIT_COUNT, S2>) {
        self.in_place_bit_or(rhs)
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> BitXor
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        self.bit_xor(&rhs)
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> BitXorAssign
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    fn bitxor_assign(&mut self, rhs: Self) {
        self.in_place_bit_xor(&rhs)
    }
}

impl<E, const BIT_COUNT: usize, S, S2> BitXorAssign<&BitsetBase<E, BIT_COUNT, S2>>
    for BitsetBase<E, BIT_COUNT, S>
where
    E: Element,
    S: AsRef<[E]> + AsMut<[E]>,
    S2: AsRef<[E]>,
{
    fn bitxor_assign(&mut self, rhs: &BitsetBase<E, BIT_COUNT, S2>) {
        self.in_place_bit_xor(rhs)
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> Not
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    type Output = Self;

    fn not(self) -> Self::Output {
        self.bit_not()
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> Shl<usize>
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    type Output = Self;

    fn shl(mut self, rhs: usize) -> Self::Output {
        self.shift_left(rhs);
        self
    }
}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]> + AsMut<[E]>> ShlAssign<usize>
    for BitsetBase<E, BIT_COUNT, S>
{
    fn shl_assign(&mut self, rhs: usize) {
        self.shift_left(rhs);
    }
}

impl<E: Element, const BIT_COUNT: usize, const WORD_COUNT: usize> Shr<usize>
    for Bitset<E, BIT_COUNT, WORD_COUNT>
{
    type Output = Self;

    fn shr(mut self, rhs: usize) -> Self::Output {
        self.shift_right(rhs);
        self
    }
}

impl<E: Element, const BIT_COUNT: usize, S: AsRef<[E]> + AsMut<[E]>> ShrAssign<usize>
    for BitsetBase<E, BIT_COUNT, S>
{
    fn shr_assign(&mut self, rhs: usize) {
        self.shift_right(rhs);
    }
}

/// Iterator over all bits of a bitset as `bool` values.
///
/// Yields `true` for set bits and `false` for clear bits, starting from
/// position 0.
///
/// Returned by [`BitsetBase::iter()`].
#[derive(Clone, Copy)]
pub struct Iter<'bitset, E, const BIT_COUNT: usize> {
    words: &'bitset [E],
    word_idx: usize,
    bit_idx: usize,
}

impl<E: Element, const BIT_COUNT: usize> Iterator for Iter<'_, E, BIT_COUNT> {
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        let absolute_idx = self.word_idx * E::BITS + self.bit_idx;
        if absolute_idx >= BIT_COUNT {
            return None;
        }
        let bit = self.words[self.word_idx] & (E::ONE << self.bit_idx);
        self.bit_idx += 1;
        if self.bit_idx == E::BITS {
            self.bit_idx = 0;
            self.word_idx += 1;
        }
        Some(bit != E::ALL_CLEAR)
    }
}

impl<E: Element, const BIT_COUNT: usize> FusedIterator for Iter<'_, E, BIT_COUNT> {}

/// Iterator over the positions of set bits in a bitset.
///
/// Returned by [`BitsetBase::iter_ones()`].
#[derive(Clone, Copy)]
pub struct IterOnes<'bitset, E, const BIT_COUNT: usize> {
    words: &'bitset [E],
    next: usize,
}

impl<E: Element, const BIT_COUNT: usize> Iterator for IterOnes<'_, E, BIT_COUNT> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let found = engine::find_next(self.words, BIT_COUNT, true, self.next);
        // park past the end once exhausted
        self.next = found.map_or(BIT_COUNT, |idx| idx + 1);
        found
    }
}

impl<E: Element, const BIT_COUNT: usize> FusedIterator for IterOnes<'_, E, BIT_COUNT> {}

/// Iterator over the positions of clear bits in a bitset.
///
/// Returned by [`BitsetBase::iter_zeros()`].
#[derive(Clone, Copy)]
pub struct IterZeros<'bitset, E, const BIT_COUNT: usize> {
    words: &'bitset [E],
    next: usize,
}

impl<E: Element, const BIT_COUNT: usize> Iterator for IterZeros<'_, E, BIT_COUNT> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let found = engine::find_next(self.words, BIT_COUNT, false, self.next);
        self.next = found.map_or(BIT_COUNT, |idx| idx + 1);
        found
    }
}

impl<E: Element, const BIT_COUNT: usize> FusedIterator for IterZeros<'_, E, BIT_COUNT> {}
