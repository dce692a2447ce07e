//! Error types for path parsing and configuration.
//!
//! Reads and writes against the store never fail on missing data; the only
//! hard failures are malformed paths and invalid configuration.

use thiserror::Error;

/// Main error type for tether operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The path ends in an escape character with nothing left to escape.
    #[error("dangling escape at end of path: {path:?}")]
    DanglingEscape { path: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
