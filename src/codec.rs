//! Numeric helpers shared by all sensor channels: truncating decimal
//! rounding and epsilon-based equality.
//!
//! Rounding deliberately truncates toward zero instead of rounding
//! half-up; downstream consumers compare published values bit for bit,
//! so the exact semantics matter.

/// Largest useful fractional precision for `f32` payloads. Requests
/// beyond this are clamped; single precision carries no more digits
/// anyway.
pub const MAX_DIGITS: u32 = 6;

/// Rounds `value` to `digits` fractional digits by truncating toward zero.
/// `digits` is clamped to [`MAX_DIGITS`].
///
/// Negative zero is normalized to positive zero so that formatted
/// payloads never contain `-0.00`.
pub fn round(value: f32, digits: u32) -> f32 {
    let scale = 10f32.powi(digits.min(MAX_DIGITS) as i32);
    let rounded = (value * scale).trunc() / scale;
    // -0.0 compares equal to 0.0, so this folds the sign away.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Returns true when `a` and `b` are indistinguishable within single
/// precision.
///
/// NaN is never nearly-equal to anything, including itself. Channels
/// rely on that: a NaN-seeded last-published cache makes the first
/// sample after a reset always publish.
pub fn nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < f32::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_truncates_instead_of_rounding_half_up() {
        assert_eq!(round(2.345, 2), 2.34);
        assert_eq!(round(2.999, 2), 2.99);
        assert_eq!(round(-2.345, 2), -2.34);
    }

    #[test]
    fn round_normalizes_negative_zero() {
        let rounded = round(-0.0001, 2);
        assert_eq!(rounded, 0.0);
        assert!(rounded.is_sign_positive());
        assert_eq!(format!("{rounded:.2}"), "0.00");
    }

    #[test]
    fn round_with_zero_digits_keeps_integer_part() {
        assert_eq!(round(7.89, 0), 7.0);
        assert_eq!(round(-7.89, 0), -7.0);
    }

    #[test]
    fn oversized_digit_requests_are_clamped() {
        let clamped = round(2.345, u32::MAX);
        assert!(clamped.is_finite());
        assert_eq!(clamped, round(2.345, MAX_DIGITS));
    }

    #[test]
    fn nearly_equal_matches_identical_values() {
        assert!(nearly_equal(2.1, 2.1));
        assert!(nearly_equal(0.0, -0.0));
        assert!(!nearly_equal(2.1, 2.2));
    }

    #[test]
    fn nan_is_never_nearly_equal() {
        assert!(!nearly_equal(f32::NAN, f32::NAN));
        assert!(!nearly_equal(f32::NAN, 0.0));
        assert!(!nearly_equal(1.0, f32::NAN));
    }
}
