//! Error types shared by the bitset and delegate APIs.

/// Errors reported by fallible conversions and invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A position, length or value lies outside the active bits.
    BitsetOverflow,
    /// The target integral type has fewer bits than the bitset allocates.
    BitsetTypeTooSmall,
    /// An external buffer is too short to hold the bitset's words.
    BitsetInvalidBuffer,
    /// A string does not have the capacity for the requested text.
    StringTooSmall,
    /// An unbound delegate was invoked.
    DelegateUninitialised,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::BitsetOverflow => "Bitset overflow",
            Error::BitsetTypeTooSmall => "Bitset type too small",
            Error::BitsetInvalidBuffer => "Bitset buffer too small",
            Error::StringTooSmall => "String capacity too small",
            Error::DelegateUninitialised => "Delegate uninitialised",
        };
        write!(f, "{msg}")
    }
}

/// Result type for fallible operations in this crate.
pub type Result<T> = core::result::Result<T, Error>;
