//! Floating point precision handling
//!
//! Avoids ugly values like 13.000000001 in conditioned snapshots.

/// Decimal places used when a rule does not specify its own precision
pub const DEFAULT_PRECISION: u8 = 2;

/// Round a value to the specified number of decimal places
pub fn round_to_precision(value: f64, precision: u8) -> f64 {
    if precision == 0 {
        value.round()
    } else {
        let factor = 10_f64.powi(precision as i32);
        (value * factor).round() / factor
    }
}
