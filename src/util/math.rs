//! Small numeric helpers shared by the decoder and suppressor.

/// Returns `true` when `value` is finite and lies in `[0, 1]`.
pub(crate) fn is_unit_interval(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Returns `true` when `value` is finite and strictly positive.
pub(crate) fn is_positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Index and value of the first maximum in `values`.
///
/// NaN entries never win. Returns `None` for an empty slice or when every
/// entry is NaN.
pub(crate) fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((idx, value)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{argmax, is_positive_finite, is_unit_interval};

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.3]), Some((1, 0.9)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), Some((1, 0.2)));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn range_helpers_reject_non_finite() {
        assert!(is_unit_interval(0.0));
        assert!(is_unit_interval(1.0));
        assert!(!is_unit_interval(1.01));
        assert!(!is_unit_interval(f32::NAN));
        assert!(is_positive_finite(640.0));
        assert!(!is_positive_finite(0.0));
        assert!(!is_positive_finite(f32::INFINITY));
    }
}
