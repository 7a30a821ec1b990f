//! Error types for CrabStat

use thiserror::Error;

/// CrabStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration defect that cannot be recovered from mid-run
    /// (malformed index block, uncovered model year, unknown enum label).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (mismatched lengths, out-of-range indices).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error raised while evaluating the objective function.
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
