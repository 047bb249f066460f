//! Word-slice algorithms behind every bitset.
//!
//! All functions take the backing words plus the number of active bits, so
//! the owned and the borrowed bitsets share one implementation. Callers are
//! responsible for bounds checking positions; every whole-bitset mutator
//! re-applies the top mask before returning.

use crate::element::{Element, low_mask};

/// Splits a bit position into a word index and a bit index within the word.
#[inline]
pub(crate) fn idxs<E: Element>(position: usize) -> (usize, usize) {
    (position / E::BITS, position % E::BITS)
}

/// Mask of the valid bits within the most significant word.
#[inline]
pub(crate) fn top_mask<E: Element>(active_bits: usize) -> E {
    let bits_in_top = active_bits % E::BITS;
    if bits_in_top == 0 {
        E::ALL_SET
    } else {
        E::ALL_SET >> (E::BITS - bits_in_top)
    }
}

#[inline]
pub(crate) fn clear_unused_bits<E: Element>(words: &mut [E], active_bits: usize) {
    if let Some(top) = words.last_mut() {
        *top &= top_mask::<E>(active_bits);
    }
}

#[inline]
fn word_and_mask<E: Element>(word_len: usize, position: usize) -> (usize, E) {
    if word_len == 1 {
        // single word, no index arithmetic
        (0, E::ONE << position)
    } else {
        let (index, bit) = idxs::<E>(position);
        (index, E::ONE << bit)
    }
}

#[inline]
pub(crate) fn test<E: Element>(words: &[E], position: usize) -> bool {
    let (index, mask) = word_and_mask::<E>(words.len(), position);
    words[index] & mask != E::ALL_CLEAR
}

#[inline]
pub(crate) fn set<E: Element>(words: &mut [E], position: usize, value: bool) {
    let (index, mask) = word_and_mask::<E>(words.len(), position);
    if value {
        words[index] |= mask;
    } else {
        words[index] &= !mask;
    }
}

#[inline]
pub(crate) fn flip<E: Element>(words: &mut [E], position: usize) {
    let (index, mask) = word_and_mask::<E>(words.len(), position);
    words[index] ^= mask;
}

pub(crate) fn set_all<E: Element>(words: &mut [E], active_bits: usize) {
    words.fill(E::ALL_SET);
    clear_unused_bits(words, active_bits);
}

pub(crate) fn flip_all<E: Element>(words: &mut [E], active_bits: usize) {
    for word in words.iter_mut() {
        *word = !*word;
    }
    clear_unused_bits(words, active_bits);
}

pub(crate) fn count<E: Element>(words: &[E]) -> usize {
    words.iter().map(|w| w.count_ones() as usize).sum()
}

pub(crate) fn all<E: Element>(words: &[E], active_bits: usize) -> bool {
    let Some((top, rest)) = words.split_last() else {
        return true;
    };
    rest.iter().all(|w| *w == E::ALL_SET) && *top == E::ALL_SET & top_mask::<E>(active_bits)
}

pub(crate) fn none<E: Element>(words: &[E]) -> bool {
    words.iter().all(|w| *w == E::ALL_CLEAR)
}

/// Finds the first bit at or after `position` that is in `state`.
///
/// Whole words that cannot hold the state are skipped; candidate words are
/// scanned bit by bit and the scan never runs past `active_bits`, which
/// matters for the partially used top word.
pub(crate) fn find_next<E: Element>(
    words: &[E],
    active_bits: usize,
    state: bool,
    position: usize,
) -> Option<usize> {
    if position >= active_bits {
        return None;
    }

    let (mut index, mut bit) = idxs::<E>(position);
    let mut position = position;
    let skip = if state { E::ALL_CLEAR } else { E::ALL_SET };

    while index < words.len() {
        let value = words[index];

        if value != skip {
            let mut mask = E::ONE << bit;
            while bit < E::BITS && position < active_bits {
                if (value & mask != E::ALL_CLEAR) == state {
                    return Some(position);
                }
                mask <<= 1usize;
                position += 1;
                bit += 1;
            }
        } else {
            position += E::BITS - bit;
        }

        bit = 0;
        index += 1;
    }

    None
}

/// Shifts towards higher bit positions, filling with zeros.
pub(crate) fn shift_left<E: Element>(words: &mut [E], active_bits: usize, shift: usize) {
    if shift >= active_bits {
        words.fill(E::ALL_CLEAR);
        return;
    }
    let word_len = words.len();

    if word_len == 1 {
        words[0] <<= shift;
        clear_unused_bits(words, active_bits);
        return;
    }

    let (word_shift, bit_shift) = idxs::<E>(shift);

    // whole words first, a shift of exactly one word ends here
    if word_shift > 0 {
        words.copy_within(0..word_len - word_shift, word_shift);
        words[..word_shift].fill(E::ALL_CLEAR);
    }

    if bit_shift > 0 {
        for i in (0..word_len).rev() {
            let carry = if i > 0 {
                words[i - 1] >> (E::BITS - bit_shift)
            } else {
                E::ALL_CLEAR
            };
            words[i] = (words[i] << bit_shift) | carry;
        }
    }

    clear_unused_bits(words, active_bits);
}

/// Shifts towards lower bit positions, filling with zeros.
pub(crate) fn shift_right<E: Element>(words: &mut [E], active_bits: usize, shift: usize) {
    if shift >= active_bits {
        words.fill(E::ALL_CLEAR);
        return;
    }
    let word_len = words.len();

    if word_len == 1 {
        words[0] >>= shift;
        return;
    }

    let (word_shift, bit_shift) = idxs::<E>(shift);

    if word_shift > 0 {
        words.copy_within(word_shift.., 0);
        words[word_len - word_shift..].fill(E::ALL_CLEAR);
    }

    if bit_shift > 0 {
        for i in 0..word_len {
            let carry = if i + 1 < word_len {
                words[i + 1] << (E::BITS - bit_shift)
            } else {
                E::ALL_CLEAR
            };
            words[i] = (words[i] >> bit_shift) | carry;
        }
    }
}

/// Loads the low bits of `value`, truncated to `active_bits`.
pub(crate) fn initialise<E: Element>(words: &mut [E], active_bits: usize, value: u64) {
    words.fill(E::ALL_CLEAR);
    for (i, word) in words.iter_mut().enumerate() {
        let shift = i * E::BITS;
        if shift >= u64::BITS as usize {
            break;
        }
        *word = E::from_u128((value as u128) >> shift);
    }
    clear_unused_bits(words, active_bits);
}

/// Parses `'0'`/`'1'` text, most significant bit first.
///
/// Short text leaves the high bits clear. Long text keeps only its rightmost
/// `active_bits` characters. Any character other than `'1'` reads as zero.
pub(crate) fn set_from_text<E: Element>(words: &mut [E], active_bits: usize, text: &str) {
    words.fill(E::ALL_CLEAR);

    let length = text.chars().count();
    let used = length.min(active_bits);

    for (i, c) in text.chars().skip(length - used).enumerate() {
        if c == '1' {
            set(words, used - 1 - i, true);
        }
    }
}

/// Reassembles every word into one value, word 0 lowest.
///
/// The caller guarantees the words fit in 128 bits.
pub(crate) fn value_bits<E: Element>(words: &[E]) -> u128 {
    words
        .iter()
        .enumerate()
        .fold(0u128, |value, (i, word)| value | (word.to_u128() << (i * E::BITS)))
}

/// Reads `length` bits starting at `position` as an unsigned value.
///
/// The caller guarantees `length <= 128` and that the field lies within the
/// active bits.
pub(crate) fn extract<E: Element>(words: &[E], position: usize, length: usize) -> u128 {
    if length == 0 {
        return 0;
    }

    let (lsb_index, lsb_shift) = idxs::<E>(position);
    let (msb_index, msb_bit) = idxs::<E>(position + length - 1);

    if lsb_index == msb_index {
        return (words[lsb_index].to_u128() >> lsb_shift) & low_mask(length);
    }

    // high part from the word holding the most significant requested bit
    let mut value = words[msb_index].to_u128() & low_mask(msb_bit + 1);

    // whole words in between
    for word in words[lsb_index + 1..msb_index].iter().rev() {
        value = (value << E::BITS) | word.to_u128();
    }

    // low remainder
    let low_bits = E::BITS - lsb_shift;
    (value << low_bits) | (words[lsb_index].to_u128() >> lsb_shift)
}
