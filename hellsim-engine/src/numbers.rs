//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i64 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    clamp_to_i64(value.round())
}

/// Floor a f64 and clamp it to the i64 range, returning 0 for NaN values.
#[must_use]
pub fn floor_f64_to_i64(value: f64) -> i64 {
    clamp_to_i64(value.floor())
}

/// Ceil a f64 and clamp it to the i64 range, returning 0 for NaN values.
#[must_use]
pub fn ceil_f64_to_i64(value: f64) -> i64 {
    clamp_to_i64(value.ceil())
}

fn clamp_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    // i64::MAX is not representable; its nearest f64 is 2^63, one past the range.
    if value >= I64_UPPER {
        return i64::MAX;
    }
    if value <= I64_LOWER {
        return i64::MIN;
    }
    cast::<f64, i64>(value).unwrap_or(0)
}

const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Widen a configuration count to the signed domain used by trial state.
#[must_use]
pub fn count_to_i64(value: u32) -> i64 {
    i64::from(value)
}

/// Ratio that yields 0.0 instead of NaN/inf when the denominator is zero.
#[must_use]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
