//! Comparison of bit patterns stored with different word widths.

use crate::element::Element;

/// A read-only view of bits stored in words of type `E`.
#[derive(Clone, Copy)]
pub(crate) struct BitSpan<'w, E> {
    words: &'w [E],
}

impl<'w, E: Element> BitSpan<'w, E> {
    pub(crate) fn new(words: &'w [E]) -> Self {
        Self { words }
    }

    /// Re-chunks the span into words of the narrower type `N`, least
    /// significant first.
    pub(crate) fn rechunk<N: Element>(self) -> impl Iterator<Item = N> + 'w {
        let per_word = E::BITS / N::BITS;
        self.words.iter().flat_map(move |word| {
            let word = word.to_u128();
            (0..per_word).map(move |i| N::from_u128(word >> (i * N::BITS)))
        })
    }

    /// Compares against words of a type no wider than `E`.
    ///
    /// `self` must hold the wider word type: it drives the iteration and its
    /// words are split to match `narrow`. Missing words on either side must
    /// be zero.
    pub(crate) fn equals_narrower<N: Element>(&self, narrow: &[N]) -> bool {
        debug_assert!(E::BITS >= N::BITS, "the wider span must drive the comparison");
        let mut narrow_iter = narrow.iter();
        for chunk in self.rechunk::<N>() {
            let other = narrow_iter.next().copied().unwrap_or(N::ALL_CLEAR);
            if chunk != other {
                return false;
            }
        }
        narrow_iter.all(|word| *word == N::ALL_CLEAR)
    }
}

/// Compares two word arrays holding the same number of active bits.
pub(crate) fn equal<L: Element, R: Element>(lhs: &[L], rhs: &[R]) -> bool {
    if L::BITS == R::BITS {
        lhs.len() == rhs.len()
            && lhs
                .iter()
                .zip(rhs.iter())
                .all(|(l, r)| l.to_u128() == r.to_u128())
    } else if L::BITS > R::BITS {
        BitSpan::new(lhs).equals_narrower(rhs)
    } else {
        BitSpan::new(rhs).equals_narrower(lhs)
    }
}
