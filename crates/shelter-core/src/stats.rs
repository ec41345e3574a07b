//! Descriptive statistics shared by the detector and the scorer.

use serde::{Deserialize, Serialize};

/// Count, arithmetic mean and population standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    /// Summarise `values`. An empty series yields all zeros.
    ///
    /// A constant series reports its value as the mean and exactly zero
    /// deviation, so equality checks against the mean are exact.
    pub fn of(values: &[f64]) -> Self {
        let Some(&first) = values.first() else {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
            };
        };

        if values.iter().all(|v| *v == first) {
            return Self {
                count: values.len(),
                mean: first,
                std_dev: 0.0,
            };
        }

        let mean = mean(values);
        Self {
            count: values.len(),
            mean,
            std_dev: population_std_dev(values, mean),
        }
    }
}

/// Arithmetic mean, accumulated incrementally so finite input stays finite.
/// Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().enumerate().fold(0.0, |m, (i, v)| {
        let k = (i + 1) as f64;
        m + (v / k - m / k)
    })
}

/// Square root of the average squared deviation from `mean`.
///
/// Deviations are taken on values scaled by the largest magnitude, so the
/// squares cannot overflow.
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let scale = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if values.is_empty() || scale == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| (v / scale - mean / scale).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    scale * variance.sqrt()
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_reference_window() {
        let s = Summary::of(&[20.0, 21.0, 19.0, 22.0, 18.0]);
        assert_eq!(s.count, 5);
        assert!((s.mean - 20.0).abs() < 1e-12);
        assert!((s.std_dev - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summary_of_empty_is_zero() {
        let s = Summary::of(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn constant_series_has_exact_zero_deviation() {
        let s = Summary::of(&[0.1; 7]);
        assert_eq!(s.mean, 0.1);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn extreme_magnitudes_stay_finite() {
        let s = Summary::of(&[1e308, 1e308, 1e308, 1e308, -1e308]);
        assert!((s.mean - 0.6e308).abs() < 1e295);
        assert!((s.std_dev - 0.8e308).abs() < 1e295);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(0.3, 2), 0.3);
        assert_eq!(round_to(0.456, 2), 0.46);
        assert_eq!(round_to(0.7 + 0.3, 2), 1.0);
        assert_eq!(round_to(0.125, 1), 0.1);
    }
}
