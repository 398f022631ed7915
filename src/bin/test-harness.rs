use improper_payments_dgp::{improper_payments_dgp, write_population_csv, FractionBounds};
use indicatif::ProgressBar;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Running test harness...");

    let sizes = [1_000, 10_000, 100_000];
    let bar = ProgressBar::new(sizes.len() as u64);

    for size in sizes {
        let pop = improper_payments_dgp(
            100.0,
            0.5,
            0.0,
            1000.0,
            FractionBounds::Range(0.4, 0.6),
            0.1,
            size,
            Some(123),
        )?;
        write_population_csv(&pop, &format!("population_{size}.csv"))?;
        bar.inc(1);
    }
    bar.finish();

    println!("Test completed successfully");
    Ok(())
}
