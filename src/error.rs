//! Error type for the fallible corners of the fixed-point substrate.
//!
//! Most invalid input in this crate is a caller bug (a frequency above
//! Nyquist, a phase argument with garbage in its unused high bits) and is
//! reported with `debug_assert!`, which is checked in development and
//! compiled out of release builds.  The one place where genuinely
//! data-dependent input can be invalid is a signed-to-unsigned [Q-format
//! conversion](crate::fixedmath) of a negative value, which a caller may
//! legitimately hit with untrusted data; that case returns this error
//! instead of asserting.

use core::fmt;

/// An input fell outside the range a fixed-point operation requires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DomainError {
    /// A signed value was negative where an unsigned reinterpretation was
    /// requested.
    NegativeToUnsigned,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeToUnsigned => {
                write!(f, "cannot reinterpret a negative value as unsigned")
            }
        }
    }
}
