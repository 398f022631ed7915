use improper_payments_dgp::utils::round_f64;
use improper_payments_dgp::{improper_payments_dgp, FractionBounds, PopulationSummary};

fn main() {
    let pop = improper_payments_dgp(
        100.0,
        0.5,
        0.0,
        1000.0,
        FractionBounds::Range(0.4, 0.6),
        0.1,
        100_000,
        Some(123),
    )
    .unwrap();

    let summary = PopulationSummary::from_table(&pop);
    println!("{summary}");

    assert_eq!(round_f64(summary.mean_amount / 100.0, 1), 1.0);
    assert_eq!(round_f64(summary.cv_amount, 1), 0.5);
}
