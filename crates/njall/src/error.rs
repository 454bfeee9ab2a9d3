use core::fmt;

/// A result type whose error defaults to [`Error`].
///
/// Generation itself is infallible; only parsing textual identifiers can fail.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `njall` can produce.
///
/// Every variant describes why a string could not be parsed into a
/// [`Uuid`](crate::Uuid). Generating identifiers never fails.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Error {
    /// The input is neither the 36-character hyphenated form nor the
    /// 32-character simple form.
    InvalidLength {
        /// Length of the rejected input, in bytes.
        len: usize,
    },

    /// A byte that should have been a hexadecimal digit was not.
    InvalidCharacter {
        /// Byte offset of the offending character.
        index: usize,
    },

    /// The hyphenated form is missing a `-` at one of the group boundaries.
    MissingHyphen {
        /// Byte offset where the hyphen was expected.
        index: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl core::error::Error for Error {}
