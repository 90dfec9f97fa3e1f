use super::tokens::u256_to_f64;
use alloy::primitives::U256;

pub const SECONDS_PER_YEAR: f64 = 31_536_000.0;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Aave's 27-decimal fixed point.
pub const RAY: f64 = 1e27;
/// 18-decimal fixed point.
pub const WAD: f64 = 1e18;

pub fn ray_to_f64(value: U256) -> f64 {
    u256_to_f64(value) / RAY
}

pub fn wad_to_f64(value: U256) -> f64 {
    u256_to_f64(value) / WAD
}

/// Per-second compounding of a simple annual rate.
pub fn calculate_apy(apr: f64) -> f64 {
    (1.0 + apr / SECONDS_PER_YEAR).powf(SECONDS_PER_YEAR) - 1.0
}

/// Inverse of [`calculate_apy`].
pub fn calculate_apr(apy: f64) -> f64 {
    ((1.0 + apy).powf(1.0 / SECONDS_PER_YEAR) - 1.0) * SECONDS_PER_YEAR
}

/// Daily compounding of a daily rate over one year.
pub fn daily_compound_apy(daily_rate: f64) -> f64 {
    (1.0 + daily_rate).powf(DAYS_PER_YEAR) - 1.0
}
