//! Descriptive statistics for a generated population.
//!
//! Mirrors the diagnostics an analyst checks first against the ground
//! truth: realized payment-amount moments, the improper-fraction range,
//! the realized improper rate, and the improper-amount totals.

use crate::PopulationTable;
use statrs::statistics::Statistics;
use std::fmt;

/// Summary statistics of one generated population table.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSummary {
    /// Empirical mean of the payment amount column.
    pub mean_amount: f64,
    /// Sum of all payment amounts.
    pub total_amount: f64,
    /// Empirical coefficient of variation (sample SD / mean) of amounts.
    pub cv_amount: f64,
    /// Smallest drawn improper fraction.
    pub min_fraction: f64,
    /// Largest drawn improper fraction.
    pub max_fraction: f64,
    /// Share of records flagged improper.
    pub improper_rate: f64,
    /// Mean improper amount conditional on the payment being improper
    /// with a non-zero amount; `None` when no such record exists.
    pub mean_improper_amount: Option<f64>,
    /// Sum of all improper amounts.
    pub total_improper_amount: f64,
}

impl PopulationSummary {
    /// Compute the summary of a non-empty population table.
    pub fn from_table(table: &PopulationTable) -> Self {
        let n = table.len() as f64;

        let mean_amount = table.amount.iter().mean();
        let total_amount: f64 = table.amount.iter().sum();
        let cv_amount = table.amount.iter().std_dev() / mean_amount;

        let min_fraction = table
            .fraction_improper
            .iter()
            .fold(f64::INFINITY, |a, &b| a.min(b));
        let max_fraction = table
            .fraction_improper
            .iter()
            .fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        let improper_count = table.is_improper.iter().filter(|&&z| z == 1).count();
        let improper_rate = improper_count as f64 / n;

        let positive: Vec<f64> = table
            .improper_amount
            .iter()
            .copied()
            .filter(|&y| y > 0.0)
            .collect();
        let mean_improper_amount = if positive.is_empty() {
            None
        } else {
            Some(positive.iter().sum::<f64>() / positive.len() as f64)
        };
        let total_improper_amount: f64 = table.improper_amount.iter().sum();

        Self {
            mean_amount,
            total_amount,
            cv_amount,
            min_fraction,
            max_fraction,
            improper_rate,
            mean_improper_amount,
            total_improper_amount,
        }
    }
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mean payment amount: ${:.2} (total ${:.2})",
            self.mean_amount, self.total_amount
        )?;
        writeln!(f, "payment amount CV: {:.2}%", self.cv_amount * 100.0)?;
        writeln!(
            f,
            "improper fraction range: [{:.2}%, {:.2}%]",
            self.min_fraction * 100.0,
            self.max_fraction * 100.0
        )?;
        writeln!(f, "improper payment rate: {:.2}%", self.improper_rate * 100.0)?;
        match self.mean_improper_amount {
            Some(mean) => write!(
                f,
                "mean improper amount (conditional): ${:.2} (total ${:.2})",
                mean, self.total_improper_amount
            ),
            None => write!(f, "no improper payments in this population"),
        }
    }
}
