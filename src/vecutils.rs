//! Vector utility functions like max(), relative_error()

/// Largest element, `f64::NEG_INFINITY` for an empty slice.
pub fn max(vec: &[f64]) -> f64 {
    vec.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Relative difference of `actual` from `expected`.
///
/// Falls back to the absolute difference when `expected` is zero.
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    let diff = (actual - expected).abs();
    if expected == 0. { diff } else { diff / expected.abs() }
}

/// Checks if two arrays or vectors are almost equal.
///
/// Elements in both containers must be in the same order.
pub fn almost_equal(a: &[f64], b: &[f64], eps: f64) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(&x, &y)| (x - y).abs() <= eps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max() {
        assert_eq!(max(&[1.0, 3.0, 2.0]), 3.0);
        assert_eq!(max(&[-5.0, -1.0, -3.0]), -1.0);
        assert_eq!(max(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_relative_error() {
        assert!((relative_error(0.5, 1.0) - 0.5).abs() < 1e-15);
        assert!((relative_error(-3.0, -2.0) - 0.5).abs() < 1e-15);
        assert_eq!(relative_error(0.25, 0.0), 0.25);
        assert_eq!(relative_error(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_almost_equal() {
        assert!(almost_equal(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0 + 1e-12], 1e-10));
        assert!(!almost_equal(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0], 1e-10));
        assert!(!almost_equal(&[1.0, 2.0], &[1.0, 2.0, 3.0], 1e-10));
    }
}
