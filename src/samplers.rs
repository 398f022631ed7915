//! Fraction and indicator samplers for the data generating process.
//!
//! These are the two simple collaborators next to the truncated gamma
//! amount sampler: an inclusive uniform draw for the improper fraction of
//! each payment and a Bernoulli draw for whether the payment is improper
//! at all.

use crate::errors::{DgpError, DgpResult};
use rand::distr::{Bernoulli, Distribution, Uniform};
use rand::Rng;

/// Bounds of the uniform improper-fraction distribution.
///
/// Callers either fix a single fraction (every record gets exactly that
/// value) or give a `(lo, hi)` interval. Both forms resolve to a
/// canonical pair before any sampling happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FractionBounds {
    /// Degenerate point: equivalent to `Range(v, v)`.
    Scalar(f64),
    /// Inclusive interval `[lo, hi]`.
    Range(f64, f64),
}

impl FractionBounds {
    /// Normalize to a `(lo, hi)` pair, checking `0 <= lo <= hi <= 1`.
    pub fn resolve(self) -> DgpResult<(f64, f64)> {
        let (lo, hi) = match self {
            FractionBounds::Scalar(v) => (v, v),
            FractionBounds::Range(lo, hi) => (lo, hi),
        };
        if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || hi > 1.0 || lo > hi {
            return Err(DgpError::InvalidBounds(format!(
                "fraction bounds must satisfy 0 <= lo <= hi <= 1, got ({lo}, {hi})"
            )));
        }
        Ok((lo, hi))
    }
}

impl From<f64> for FractionBounds {
    fn from(v: f64) -> Self {
        FractionBounds::Scalar(v)
    }
}

impl From<(f64, f64)> for FractionBounds {
    fn from((lo, hi): (f64, f64)) -> Self {
        FractionBounds::Range(lo, hi)
    }
}

/// Draw `size` variates uniformly from the inclusive interval `[lower, upper]`.
///
/// A degenerate interval (`lower == upper`) is a point mass.
pub fn sample_uniform<R: Rng + ?Sized>(
    lower: f64,
    upper: f64,
    size: usize,
    rng: &mut R,
) -> DgpResult<Vec<f64>> {
    let dist = Uniform::new_inclusive(lower, upper).map_err(|e| {
        DgpError::InvalidBounds(format!("uniform bounds ({lower}, {upper}): {e}"))
    })?;
    Ok((0..size).map(|_| dist.sample(rng)).collect())
}

/// Draw `size` independent Bernoulli(`p`) indicators as `{0, 1}` integers.
pub fn sample_bernoulli<R: Rng + ?Sized>(
    p: f64,
    size: usize,
    rng: &mut R,
) -> DgpResult<Vec<u8>> {
    let dist = Bernoulli::new(p).map_err(|e| {
        DgpError::InvalidProbability(format!("Bernoulli probability {p}: {e}"))
    })?;
    Ok((0..size).map(|_| u8::from(dist.sample(rng))).collect())
}
