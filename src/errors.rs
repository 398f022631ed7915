//! Error types for the improper-payments data generating process.

use thiserror::Error;

/// Everything that can go wrong while generating a population.
///
/// All parameter validation happens before any sampling starts, so a
/// failed call never produces a partial table. None of these conditions
/// are retriable: the caller has to fix the inputs.
#[derive(Debug, Error)]
pub enum DgpError {
    /// Malformed truncation bounds or malformed fraction bounds.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// `p_improper` outside the `[0, 1]` interval.
    #[error("invalid probability: {0}")]
    InvalidProbability(String),

    /// A non-positive number of records was requested.
    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// The truncated gamma sampler could not match the requested mean
    /// and coefficient of variation under the given bounds.
    #[error("moment fitting failed: {0}")]
    MomentFitting(String),
}

/// Convenience alias used throughout the crate.
pub type DgpResult<T> = Result<T, DgpError>;
