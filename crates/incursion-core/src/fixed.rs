use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Resource amounts. Fixed-point so that turn resolution is bit-for-bit
/// deterministic across platforms.
pub type Resources = Fixed64;

/// Turns are the atomic unit of campaign time.
pub type Turn = u64;

/// Convert an f64 to Resources. Use only for initialization, never in the turn loop.
#[inline]
pub fn f64_to_resources(v: f64) -> Resources {
    Resources::from_num(v)
}

/// Convert Resources to f64. Use only for display.
#[inline]
pub fn resources_to_f64(v: Resources) -> f64 {
    v.to_num::<f64>()
}

/// Convert an integer quantity (points, storage) to Resources.
/// Returns None when the value does not fit the integer range.
#[inline]
pub fn checked_from_count(v: u64) -> Option<Resources> {
    Resources::checked_from_num(v)
}

/// Exact `numerator / denominator` in fixed-point, computed through integer
/// quotient and remainder so large numerators do not overflow before the
/// division. Returns None for a zero denominator or an out-of-range quotient.
pub fn ratio(numerator: u64, denominator: u32) -> Option<Resources> {
    if denominator == 0 {
        return None;
    }
    let d = u64::from(denominator);
    let whole = Resources::checked_from_num(numerator / d)?;
    let frac = Resources::checked_from_num(numerator % d)?.checked_div(Resources::checked_from_num(d)?)?;
    whole.checked_add(frac)
}

/// Checked multiplication of a resource amount by an integer count.
#[inline]
pub fn checked_mul_count(a: Resources, count: u64) -> Option<Resources> {
    a.checked_mul(Resources::checked_from_num(count)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_exact_division() {
        assert_eq!(ratio(30, 30), Some(Resources::from_num(1)));
        assert_eq!(ratio(100, 10), Some(Resources::from_num(10)));
    }

    #[test]
    fn ratio_fractional() {
        assert_eq!(ratio(15, 30), Some(f64_to_resources(0.5)));
        assert_eq!(ratio(10, 4), Some(f64_to_resources(2.5)));
    }

    #[test]
    fn ratio_zero_denominator() {
        assert!(ratio(1, 0).is_none());
    }

    #[test]
    fn ratio_out_of_range() {
        assert!(ratio(u64::MAX, 1).is_none());
    }

    #[test]
    fn ratio_is_deterministic() {
        let a = ratio(100, 3).unwrap();
        let b = ratio(100, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a * Resources::from_num(3), b * Resources::from_num(3));
    }

    #[test]
    fn checked_mul_count_overflow() {
        assert!(checked_mul_count(Resources::MAX, 2).is_none());
        assert_eq!(
            checked_mul_count(f64_to_resources(1.5), 4),
            Some(Resources::from_num(6))
        );
    }

    #[test]
    fn round_trip_display_helpers() {
        let r = f64_to_resources(12.25);
        assert_eq!(resources_to_f64(r), 12.25);
    }
}
