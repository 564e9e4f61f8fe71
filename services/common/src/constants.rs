//! Platform-wide constants

/// Hot numbers are drawn from 00-99
pub const HOT_NUMBER_MAX: u8 = 99;

/// Fixed-point scale for money amounts (4 decimal places)
pub const AMOUNT_SCALE: i64 = 10_000;

/// Consumption fraction that triggers a near-limit warning (percent)
pub const NEAR_LIMIT_WARN_PCT: u8 = 80;
