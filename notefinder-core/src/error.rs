//! Error types for the note finder core.

use thiserror::Error;

/// Result type for note finder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building scales, drawing random notes,
/// or looking notes up.
///
/// Every variant is recoverable; the library never aborts on these.
#[derive(Error, Debug)]
pub enum Error {
    /// A pitch-class label that is not one of the 12 canonical names.
    #[error("invalid note name: {0:?}")]
    InvalidNoteName(String),

    /// Random draw requested with an empty or inverted range.
    #[error("invalid range: high ({high}) is below low ({low})")]
    Range { low: i64, high: i64 },

    /// Exact frequency lookup found no stored value.
    #[error("{0} is not in the scale")]
    NotFound(f64),

    /// Unrecognized or out-of-domain argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
