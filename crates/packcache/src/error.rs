//! Error types for packcache

use std::fmt;

/// Result type alias for packcache construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported when building a cache with invalid configuration.
///
/// Normal cache operations never fail; absence is reported as `None` or
/// `false`, and over-budget admissions are a soft, observable condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Byte capacity must be greater than zero
    InvalidCapacity,

    /// Probationary (A1in) fraction outside [0, 1]
    InvalidRecentRatio(f64),

    /// Ghost (A1out) fraction outside [0, 1]
    InvalidGhostRatio(f64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity => write!(f, "cache capacity must be > 0"),
            Error::InvalidRecentRatio(r) => {
                write!(f, "invalid recent ratio: {} (must be in [0, 1])", r)
            }
            Error::InvalidGhostRatio(r) => {
                write!(f, "invalid ghost ratio: {} (must be in [0, 1])", r)
            }
        }
    }
}

impl std::error::Error for Error {}
