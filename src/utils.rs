/// Absolute-difference comparison, for checking fitted and empirical
/// moments against their targets.
pub fn is_near(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Round to `decimals` decimal places. `f64::round` only rounds to
/// whole numbers, so scale up, round, and scale back down.
pub fn round_f64(x: f64, decimals: i32) -> f64 {
    let factor = 10.0f64.powi(decimals);
    (x * factor).round() / factor
}
