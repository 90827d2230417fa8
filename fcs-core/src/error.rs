//! Error types for FCS container operations

use alloc::string::String;

/// Failure taxonomy for fatal conditions
///
/// Every fatal error falls into one of these kinds. Vendor deviations with
/// a well-defined safe interpretation are not errors at all; they are
/// recorded as warnings in the [`crate::FileLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A structural rule of the format was violated
    Malformed,
    /// Fewer bytes were available than the file declared
    Truncated,
    /// A recognized but intentionally unimplemented feature
    Unsupported,
    /// The underlying read or write failed
    Io,
}

/// Errors that can occur while reading or writing an FCS file
///
/// The carried string is the short, user-facing message. The more verbose
/// technical detail for the same condition is appended to the
/// [`crate::FileLog`] of the call that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FcsError {
    /// Invalid structure: bad offsets, bad enum value, empty required segment
    Malformed(String),
    /// Declared length exceeds the bytes actually present
    Truncated(String),
    /// Feature-named rejection: ASCII data mode, histogram modes, multi-dataset files
    Unsupported(String),
    /// File system or I/O failure
    Io(String),
}

impl FcsError {
    /// The taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FcsError::Malformed(_) => ErrorKind::Malformed,
            FcsError::Truncated(_) => ErrorKind::Truncated,
            FcsError::Unsupported(_) => ErrorKind::Unsupported,
            FcsError::Io(_) => ErrorKind::Io,
        }
    }

    /// The user-facing message
    pub fn message(&self) -> &str {
        match self {
            FcsError::Malformed(m)
            | FcsError::Truncated(m)
            | FcsError::Unsupported(m)
            | FcsError::Io(m) => m,
        }
    }
}

impl core::fmt::Display for FcsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FcsError::Malformed(m) => write!(f, "malformed FCS file: {m}"),
            FcsError::Truncated(m) => write!(f, "truncated FCS file: {m}"),
            FcsError::Unsupported(m) => write!(f, "unsupported FCS feature: {m}"),
            FcsError::Io(m) => write!(f, "I/O error: {m}"),
        }
    }
}

/// Result type for FCS operations
pub type Result<T> = core::result::Result<T, FcsError>;
