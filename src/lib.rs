//! Data generating process for simulated improper-payment populations.
//!
//! Crate improper-payments-dgp generates synthetic ground-truth data for
//! improper-payment studies: each record carries a payment amount drawn
//! from a truncated gamma distribution moment-matched to a target mean
//! and coefficient of variation, an improper fraction drawn uniformly
//! from a bounded interval, a Bernoulli indicator of whether the payment
//! is improper at all, and the realized improper amount derived from the
//! three. Auditors and researchers use such populations to stress-test
//! estimators against known truth.
//!
//! The main API is [`improper_payments_dgp`], which returns a
//! column-oriented [`PopulationTable`]. The moment-matching core lives in
//! [`truncated_gamma`].

use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod errors;
pub mod samplers;
pub mod summary;
pub mod truncated_gamma;
pub mod utils;

pub use errors::{DgpError, DgpResult};
pub use samplers::FractionBounds;
pub use summary::PopulationSummary;
pub use truncated_gamma::TruncatedGamma;

use samplers::{sample_bernoulli, sample_uniform};

/// One generated population, column-oriented, all columns of equal length.
///
/// Column order is fixed: payment amount `X`, improper fraction `B`,
/// improper indicator `Z`, improper amount `Y`. Rows satisfy
/// `Y = X * B * Z`, so `Y` is exactly zero whenever `Z` is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationTable {
    /// Payment amount, within the requested truncation bounds.
    pub amount: Vec<f64>,
    /// Fraction of the payment that is improper, if the record is flagged.
    pub fraction_improper: Vec<f64>,
    /// Whether the payment is improper, as a `{0, 1}` indicator.
    pub is_improper: Vec<u8>,
    /// Realized improper amount, `amount * fraction_improper * is_improper`.
    pub improper_amount: Vec<f64>,
}

impl PopulationTable {
    /// Column names in their fixed output order.
    pub const COLUMN_ORDER: [&'static str; 4] = ["X", "B", "Z", "Y"];

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.amount.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.amount.is_empty()
    }
}

// Stream tags for deriving one independent sub-seed per sampling step.
const AMOUNT_STREAM: u64 = 1;
const FRACTION_STREAM: u64 = 2;
const INDICATOR_STREAM: u64 = 3;

/// SplitMix64 finalizer, used to spread a user seed plus a stream tag
/// over the full 64-bit space before seeding a generator.
fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Generator for one sampling step.
///
/// With a seed, each step gets its own deterministic sub-stream, so the
/// three steps stay statistically independent while the whole table is
/// reproducible; without one, each stream seeds from OS entropy.
fn stream_rng(random_state: Option<u64>, stream: u64) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(splitmix64(seed ^ splitmix64(stream))),
        None => StdRng::from_os_rng(),
    }
}

/// Generate a synthetic improper-payments population.
///
/// Parameters are validated eagerly, before any sampling begins, so a
/// failed call never consumes entropy or returns a partial table.
///
/// # Parameters
/// - `mean_target`: Target mean payment amount
/// - `cv_target`: Target coefficient of variation (SD / mean) of amounts
/// - `lower`, `upper`: Inclusive truncation bounds for amounts, `lower < upper`
/// - `fraction_bounds`: Bounds of the uniform improper-fraction draw,
///   either a scalar point or a `(lo, hi)` pair within `[0, 1]`
/// - `p_improper`: Probability that a given payment is improper
/// - `size`: Number of records to generate, `> 0`
/// - `random_state`: Optional seed; identical inputs with the same seed
///   reproduce the table element for element
///
/// # Returns
/// A [`PopulationTable`] with exactly `size` rows, or the specific
/// [`DgpError`] describing the first malformed parameter.
///
/// # Example
/// ```
/// use improper_payments_dgp::{improper_payments_dgp, FractionBounds};
///
/// let pop = improper_payments_dgp(
///     100.0,
///     0.5,
///     0.0,
///     1000.0,
///     FractionBounds::Range(0.4, 0.6),
///     0.1,
///     1000,
///     Some(123),
/// )
/// .unwrap();
/// assert_eq!(pop.len(), 1000);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn improper_payments_dgp(
    mean_target: f64,
    cv_target: f64,
    lower: f64,
    upper: f64,
    fraction_bounds: FractionBounds,
    p_improper: f64,
    size: usize,
    random_state: Option<u64>,
) -> DgpResult<PopulationTable> {
    if size == 0 {
        return Err(DgpError::InvalidSize(
            "at least one record must be requested".to_string(),
        ));
    }
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(DgpError::InvalidBounds(format!(
            "truncation bounds must be finite with lower < upper, got [{lower}, {upper}]"
        )));
    }
    let (fraction_lo, fraction_hi) = fraction_bounds.resolve()?;
    if !p_improper.is_finite() || !(0.0..=1.0).contains(&p_improper) {
        return Err(DgpError::InvalidProbability(format!(
            "p_improper must lie in [0, 1], got {p_improper}"
        )));
    }

    let amount_sampler = TruncatedGamma::fit(mean_target, cv_target, lower, upper)?;

    let amount = amount_sampler.sample(size, &mut stream_rng(random_state, AMOUNT_STREAM));
    let fraction_improper = sample_uniform(
        fraction_lo,
        fraction_hi,
        size,
        &mut stream_rng(random_state, FRACTION_STREAM),
    )?;
    let is_improper = sample_bernoulli(
        p_improper,
        size,
        &mut stream_rng(random_state, INDICATOR_STREAM),
    )?;

    let improper_amount: Vec<f64> = amount
        .iter()
        .zip(&fraction_improper)
        .zip(&is_improper)
        .map(|((&x, &b), &z)| if z == 1 { x * b } else { 0.0 })
        .collect();

    Ok(PopulationTable {
        amount,
        fraction_improper,
        is_improper,
        improper_amount,
    })
}

/// Write a population table to a CSV file, columns `X,B,Z,Y` in order.
#[cfg(feature = "test-harness")]
pub fn write_population_csv(
    table: &PopulationTable,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(PopulationTable::COLUMN_ORDER)?;
    for i in 0..table.len() {
        writer.write_record(&[
            table.amount[i].to_string(),
            table.fraction_improper[i].to_string(),
            table.is_improper[i].to_string(),
            table.improper_amount[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_near;

    fn reference_population() -> PopulationTable {
        improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Range(0.4, 0.6),
            0.1,
            100_000,
            Some(123),
        )
        .unwrap()
    }

    #[test]
    fn table_has_the_requested_shape() {
        let pop = reference_population();
        assert_eq!(pop.len(), 100_000);
        assert!(!pop.is_empty());
        assert_eq!(pop.fraction_improper.len(), pop.len());
        assert_eq!(pop.is_improper.len(), pop.len());
        assert_eq!(pop.improper_amount.len(), pop.len());
        assert_eq!(PopulationTable::COLUMN_ORDER, ["X", "B", "Z", "Y"]);
    }

    #[test]
    fn all_columns_respect_their_bounds() {
        let pop = reference_population();
        assert!(pop.amount.iter().all(|&x| (0.0..=1000.0).contains(&x)));
        assert!(pop
            .fraction_improper
            .iter()
            .all(|&b| (0.4..=0.6).contains(&b)));
        assert!(pop.is_improper.iter().all(|&z| z == 0 || z == 1));
    }

    #[test]
    fn improper_amount_is_consistent_with_the_indicator() {
        let pop = reference_population();
        for i in 0..pop.len() {
            if pop.is_improper[i] == 0 {
                assert_eq!(pop.improper_amount[i], 0.0);
            } else {
                assert_eq!(
                    pop.improper_amount[i],
                    pop.amount[i] * pop.fraction_improper[i]
                );
                assert!(pop.improper_amount[i] >= 0.0);
                assert!(pop.improper_amount[i] <= pop.amount[i]);
            }
        }
    }

    #[test]
    fn empirical_moments_match_the_targets() {
        let pop = reference_population();
        let summary = PopulationSummary::from_table(&pop);

        assert!(is_near(summary.mean_amount, 100.0, 0.5));
        assert!(is_near(summary.cv_amount, 0.5, 0.01));
        assert!(is_near(summary.min_fraction, 0.4, 0.01));
        assert!(is_near(summary.max_fraction, 0.6, 0.01));
        assert!(is_near(summary.improper_rate, 0.1, 0.005));
        // Amounts and fractions are independent, so the conditional mean
        // improper amount sits near 100 * 0.5.
        assert!(is_near(summary.mean_improper_amount.unwrap(), 50.0, 1.5));
        assert!(is_near(
            summary.total_improper_amount,
            0.1 * 100_000.0 * 50.0,
            20_000.0
        ));
    }

    #[test]
    fn same_seed_reproduces_the_table_exactly() {
        let a = reference_population();
        let b = reference_population();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_produce_different_tables() {
        let run = |random_state| {
            improper_payments_dgp(
                100.0,
                0.5,
                0.0,
                1000.0,
                FractionBounds::Range(0.4, 0.6),
                0.1,
                1000,
                random_state,
            )
            .unwrap()
        };
        assert_ne!(run(Some(1)), run(Some(2)));
        // Unseeded draws come from OS entropy and should never repeat.
        assert_ne!(run(None), run(None));
    }

    #[test]
    fn scalar_fraction_bounds_match_the_degenerate_pair() {
        let run = |bounds| {
            improper_payments_dgp(100.0, 0.5, 0.0, 1000.0, bounds, 0.1, 500, Some(7)).unwrap()
        };
        let scalar = run(FractionBounds::Scalar(0.5));
        let pair = run(FractionBounds::Range(0.5, 0.5));
        assert_eq!(scalar, pair);
        assert!(scalar.fraction_improper.iter().all(|&b| b == 0.5));
    }

    #[test]
    fn reversed_truncation_bounds_are_rejected() {
        let result = improper_payments_dgp(
            100.0,
            0.5,
            1000.0,
            0.0,
            FractionBounds::Scalar(0.5),
            0.1,
            10,
            None,
        );
        assert!(matches!(result, Err(DgpError::InvalidBounds(_))));
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let result = improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Scalar(0.5),
            1.5,
            10,
            None,
        );
        assert!(matches!(result, Err(DgpError::InvalidProbability(_))));
    }

    #[test]
    fn zero_size_is_rejected() {
        let result = improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Scalar(0.5),
            0.1,
            0,
            None,
        );
        assert!(matches!(result, Err(DgpError::InvalidSize(_))));
    }

    #[test]
    fn malformed_fraction_bounds_are_rejected_before_sampling() {
        let result = improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Range(0.6, 0.4),
            0.1,
            10,
            None,
        );
        assert!(matches!(result, Err(DgpError::InvalidBounds(_))));
    }

    #[test]
    fn infeasible_moment_targets_surface_as_moment_fitting() {
        let result = improper_payments_dgp(
            500.0,
            0.5,
            0.0,
            100.0,
            FractionBounds::Scalar(0.5),
            0.1,
            10,
            Some(1),
        );
        assert!(matches!(result, Err(DgpError::MomentFitting(_))));
    }

    #[test]
    fn probability_extremes_pin_the_indicator_column() {
        let none = improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Range(0.4, 0.6),
            0.0,
            200,
            Some(3),
        )
        .unwrap();
        assert!(none.is_improper.iter().all(|&z| z == 0));
        assert!(none.improper_amount.iter().all(|&y| y == 0.0));

        let all = improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Range(0.4, 0.6),
            1.0,
            200,
            Some(3),
        )
        .unwrap();
        assert!(all.is_improper.iter().all(|&z| z == 1));
        assert!(all
            .improper_amount
            .iter()
            .zip(&all.amount)
            .all(|(&y, &x)| y > 0.0 && y <= x));
    }
}
