//! Numeric casting helpers.

/// Round a possibly-missing float to the nearest integer.
///
/// Non-finite values (NaN from a failed parse, infinities from a division)
/// are treated as missing, never as zero.
pub fn cast_int(num: Option<f64>) -> Option<i64> {
    match num {
        Some(n) if n.is_finite() => Some(n.round() as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_int_rounds() {
        assert_eq!(cast_int(Some(2.4)), Some(2));
        assert_eq!(cast_int(Some(2.5)), Some(3));
        assert_eq!(cast_int(Some(-2.5)), Some(-3));
        assert_eq!(cast_int(Some(100.0)), Some(100));
    }

    #[test]
    fn test_cast_int_missing() {
        assert_eq!(cast_int(None), None);
        assert_eq!(cast_int(Some(f64::NAN)), None);
        assert_eq!(cast_int(Some(f64::INFINITY)), None);
    }
}
