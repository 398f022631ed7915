//! Moment-matched sampling from a gamma distribution truncated to `[lower, upper]`.
//!
//! The caller specifies the mean and coefficient of variation that the
//! *truncated* variate should have. Matching those targets is not a
//! closed-form problem: truncation shifts both moments, so the gamma
//! shape and rate are found by two nested bisections over the analytic
//! truncated moments. Both one-dimensional maps are monotone, which is
//! what makes the solve robust: for a fixed shape the truncated mean
//! falls as the rate rises, and with the mean pinned to its target the
//! truncated CV falls as the shape rises. Draws then go through the
//! usual inverse-CDF route, `u ~ U(F(lower), F(upper))`, `x = F⁻¹(u)`.

use crate::errors::{DgpError, DgpResult};
use rand::Rng;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Gamma};

// Bisection limits and tolerances for the moment fit.
const MAX_SOLVE_ITERATIONS: u32 = 300;
const MAX_BRACKET_STEPS: u32 = 200;
const SOLVE_RELATIVE_TOL: f64 = 1e-13;

// The fitted truncated moments must land this close (relatively) to the
// targets, or the fit is reported as failed.
const FIT_TOLERANCE: f64 = 1e-8;

// Shape values outside this range mean the requested coefficient of
// variation is not reachable on the truncation interval.
const MIN_SHAPE: f64 = 1e-8;
const MAX_SHAPE: f64 = 1e12;

/// A gamma distribution truncated to `[lower, upper]` whose truncated
/// mean and coefficient of variation match externally given targets.
#[derive(Debug, Clone)]
pub struct TruncatedGamma {
    kind: Kind,
    lower: f64,
    upper: f64,
    fitted_mean: f64,
    fitted_cv: f64,
}

#[derive(Debug, Clone)]
enum Kind {
    /// Proper truncated gamma, with the interval CDF values cached.
    Spread {
        dist: Gamma,
        cdf_lower: f64,
        cdf_upper: f64,
    },
    /// Degenerate point mass, used when the target CV is zero.
    Point(f64),
}

impl TruncatedGamma {
    /// Fit gamma parameters so that the distribution truncated to
    /// `[lower, upper]` has the requested mean and coefficient of variation.
    ///
    /// The outer bisection searches the shape against the truncated CV;
    /// for every candidate shape, an inner bisection finds the rate that
    /// pins the truncated mean to the target. Shapes too small to reach
    /// the mean at any rate sort with the high-CV side of the outer
    /// search, so feasible targets are always bracketed.
    ///
    /// # Parameters
    /// - `mean_target`: Target mean of the truncated variate
    /// - `cv_target`: Target coefficient of variation (SD / mean), `>= 0`
    /// - `lower`, `upper`: Inclusive truncation bounds, `lower < upper`
    ///
    /// # Returns
    /// A fitted sampler, or `DgpError::MomentFitting` when the targets
    /// are infeasible on the interval.
    pub fn fit(mean_target: f64, cv_target: f64, lower: f64, upper: f64) -> DgpResult<Self> {
        if !mean_target.is_finite() || !cv_target.is_finite() {
            return Err(DgpError::MomentFitting(
                "mean and CV targets must be finite".to_string(),
            ));
        }
        if cv_target < 0.0 {
            return Err(DgpError::MomentFitting(format!(
                "CV target must be non-negative, got {cv_target}"
            )));
        }

        if cv_target == 0.0 {
            // Point mass: every draw is exactly the mean target.
            if mean_target < lower || mean_target > upper {
                return Err(DgpError::MomentFitting(format!(
                    "mean target {mean_target} with zero CV lies outside [{lower}, {upper}]"
                )));
            }
            return Ok(Self {
                kind: Kind::Point(mean_target),
                lower,
                upper,
                fitted_mean: mean_target,
                fitted_cv: 0.0,
            });
        }

        // The truncated mean always lies strictly inside the interval
        // (intersected with the gamma support), so targets on or outside
        // it can never be matched.
        if mean_target <= lower.max(0.0) || mean_target >= upper {
            return Err(DgpError::MomentFitting(format!(
                "mean target {mean_target} lies outside the open truncation interval \
                 ({}, {upper})",
                lower.max(0.0)
            )));
        }

        let shape = solve_shape(mean_target, cv_target, lower, upper)?;
        let rate = solve_rate(shape, mean_target, lower, upper).ok_or_else(|| {
            DgpError::MomentFitting(format!(
                "mean target {mean_target} is not reachable on [{lower}, {upper}]"
            ))
        })?;
        let (mean, cv) = truncated_moments(shape, rate, lower, upper)?;

        if (cv / cv_target - 1.0).abs() > FIT_TOLERANCE {
            return Err(DgpError::MomentFitting(format!(
                "CV target {cv_target} is not reachable on [{lower}, {upper}] \
                 (closest attainable: {cv:.6})"
            )));
        }
        if (mean / mean_target - 1.0).abs() > FIT_TOLERANCE {
            return Err(DgpError::MomentFitting(format!(
                "moment fit did not converge for mean {mean_target}, CV {cv_target} \
                 on [{lower}, {upper}]"
            )));
        }

        let dist = gamma_dist(shape, rate)?;
        let cdf_lower = dist.cdf(lower);
        let cdf_upper = dist.cdf(upper);
        Ok(Self {
            kind: Kind::Spread {
                dist,
                cdf_lower,
                cdf_upper,
            },
            lower,
            upper,
            fitted_mean: mean,
            fitted_cv: cv,
        })
    }

    /// Draw `size` variates, each guaranteed to lie in `[lower, upper]`.
    ///
    /// Uniforms are drawn sequentially from `rng` so that a seeded
    /// generator reproduces the same output; the inverse-CDF transform
    /// itself is data-parallel.
    pub fn sample<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<f64> {
        match &self.kind {
            Kind::Point(value) => vec![*value; size],
            Kind::Spread {
                dist,
                cdf_lower,
                cdf_upper,
            } => {
                let mass = cdf_upper - cdf_lower;
                let uniforms: Vec<f64> = (0..size)
                    .map(|_| cdf_lower + rng.random::<f64>() * mass)
                    .collect();
                uniforms
                    .par_iter()
                    .map(|&u| dist.inverse_cdf(u).clamp(self.lower, self.upper))
                    .collect()
            }
        }
    }

    /// Mean of the fitted truncated distribution.
    pub fn truncated_mean(&self) -> f64 {
        self.fitted_mean
    }

    /// Coefficient of variation of the fitted truncated distribution.
    pub fn truncated_cv(&self) -> f64 {
        self.fitted_cv
    }

    /// Inclusive truncation bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

/// Outer bisection: find the shape whose mean-pinned truncated CV hits
/// `cv_target`. The CV is strictly decreasing in the shape, and shapes
/// whose truncated mean can never reach `mean_target` (or whose moments
/// are not numerically resolvable) count as the high-CV side.
fn solve_shape(mean_target: f64, cv_target: f64, lower: f64, upper: f64) -> DgpResult<f64> {
    let cv_above = |shape: f64| -> bool {
        match solve_rate(shape, mean_target, lower, upper) {
            Some(rate) => match truncated_moments(shape, rate, lower, upper) {
                Ok((_, cv)) => cv > cv_target,
                Err(_) => true,
            },
            None => true,
        }
    };

    let unreachable = || {
        DgpError::MomentFitting(format!(
            "CV target {cv_target} is not reachable on [{lower}, {upper}] \
             for mean {mean_target}"
        ))
    };

    // Bracket around the untruncated solution shape = 1/cv².
    let guess = (1.0 / (cv_target * cv_target)).clamp(MIN_SHAPE, MAX_SHAPE);
    let mut lo = guess;
    let mut hi = guess;
    if cv_above(guess) {
        while cv_above(hi) {
            hi *= 4.0;
            if hi > MAX_SHAPE {
                return Err(unreachable());
            }
        }
    } else {
        while !cv_above(lo) {
            lo /= 4.0;
            if lo < MIN_SHAPE {
                return Err(unreachable());
            }
        }
    }

    // Shapes span orders of magnitude, so bisect geometrically.
    for _ in 0..MAX_SOLVE_ITERATIONS {
        if hi / lo <= 1.0 + SOLVE_RELATIVE_TOL {
            break;
        }
        let mid = (lo * hi).sqrt();
        if cv_above(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok((lo * hi).sqrt())
}

/// Inner bisection: for a fixed shape, find the rate at which the
/// truncated mean equals `mean_target`. The truncated mean is strictly
/// decreasing in the rate. Returns `None` when no rate reaches the
/// target, which happens for shapes too small to pull the truncated
/// mean up to it.
fn solve_rate(shape: f64, mean_target: f64, lower: f64, upper: f64) -> Option<f64> {
    let mean_at =
        |rate: f64| truncated_moments(shape, rate, lower, upper).ok().map(|(m, _)| m);

    // Untruncated mean is shape/rate, so this is the natural seed.
    let mut lo = shape / mean_target;
    let mut hi = lo;
    if mean_at(lo)? > mean_target {
        // Mean too high: raise the rate until the target is straddled.
        let mut bracketed = false;
        for _ in 0..MAX_BRACKET_STEPS {
            hi *= 2.0;
            if mean_at(hi)? <= mean_target {
                bracketed = true;
                break;
            }
        }
        if !bracketed {
            return None;
        }
    } else {
        // Mean too low: lower the rate. The truncated mean plateaus at a
        // shape-dependent limit as the rate goes to zero, so the target
        // may simply be out of reach.
        let mut bracketed = false;
        for _ in 0..MAX_BRACKET_STEPS {
            lo /= 2.0;
            match mean_at(lo) {
                Some(m) if m >= mean_target => {
                    bracketed = true;
                    break;
                }
                Some(_) => continue,
                None => return None,
            }
        }
        if !bracketed {
            return None;
        }
    }

    for _ in 0..MAX_SOLVE_ITERATIONS {
        if hi / lo <= 1.0 + SOLVE_RELATIVE_TOL {
            break;
        }
        let mid = (lo * hi).sqrt();
        if mean_at(mid)? > mean_target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some((lo * hi).sqrt())
}

fn gamma_dist(shape: f64, rate: f64) -> DgpResult<Gamma> {
    Gamma::new(shape, rate).map_err(|e| {
        DgpError::MomentFitting(format!(
            "invalid gamma parameters shape {shape}, rate {rate}: {e}"
        ))
    })
}

/// Mean and CV of Gamma(shape, rate) truncated to `[lower, upper]`.
///
/// Uses the incomplete-gamma identities
/// `∫ x f_k(x) dx = (k/λ)·F_{k+1}(x)` and
/// `∫ x² f_k(x) dx = (k(k+1)/λ²)·F_{k+2}(x)`,
/// so the truncated moments reduce to CDF differences of the shape-shifted
/// distributions. Errors only when the interval mass underflows to zero
/// and the moments stop being numerically resolvable.
fn truncated_moments(shape: f64, rate: f64, lower: f64, upper: f64) -> DgpResult<(f64, f64)> {
    let g0 = gamma_dist(shape, rate)?;
    let g1 = gamma_dist(shape + 1.0, rate)?;
    let g2 = gamma_dist(shape + 2.0, rate)?;

    let mass = g0.cdf(upper) - g0.cdf(lower);
    if !(mass > 0.0) || !mass.is_finite() {
        return Err(DgpError::MomentFitting(format!(
            "truncation interval [{lower}, {upper}] carries no numerically \
             resolvable probability mass for shape {shape}, rate {rate}"
        )));
    }

    let m1 = (shape / rate) * (g1.cdf(upper) - g1.cdf(lower)) / mass;
    let m2 = (shape * (shape + 1.0) / (rate * rate)) * (g2.cdf(upper) - g2.cdf(lower)) / mass;
    let variance = (m2 - m1 * m1).max(0.0);

    Ok((m1, variance.sqrt() / m1))
}
