//! Telemetry anomaly detector.
//!
//! Decides whether a new sensor value is anomalous relative to the window of
//! readings that preceded it. Evaluation is pure: no I/O, no history
//! mutation, no logging above `debug`. Alerting on a positive result belongs
//! to the caller (see [`crate::obs::emit_anomaly_detected`]).
//!
//! Two rules exist, selected by [`DetectionPolicy`]:
//! - **Statistical**: flag when `|value - mean| > k * std_dev` over the window
//!   (`k = 2` by default). Windows shorter than `min_history` are never
//!   flagged.
//! - **FixedThreshold**: flag temperatures above and humidity below fixed
//!   bounds.

use serde::{Deserialize, Serialize};
use shelter_state::Metric;

use crate::config::{DetectionPolicy, DetectorConfig, ThresholdBounds};
use crate::domain::{CoreError, ReadingWindow, Result};
use crate::stats::Summary;

/// Reason reported when the window is too short for statistics.
pub const INSUFFICIENT_HISTORY: &str = "insufficient history";

/// Outcome of evaluating one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// The value under evaluation.
    pub current: f64,
    /// Mean of the window (0.0 for an empty window).
    pub mean: f64,
    /// Population standard deviation of the window.
    pub std_dev: f64,
    /// Explanation when flagged, or when history was insufficient.
    pub reason: Option<String>,
    /// Rule that produced the verdict.
    pub policy: DetectionPolicy,
    /// The window was shorter than `min_history`.
    pub insufficient_history: bool,
}

/// Anomaly detector parameterised by a [`DetectorConfig`].
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    /// Build a detector, rejecting configs that fail [`DetectorConfig::validate`].
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Evaluate `new_value` against the window of prior readings.
    ///
    /// Only the newest `window_size` readings are considered. Fails with
    /// `InvalidInput` when `new_value` or any window value is not finite, or
    /// when the window mixes subjects or metrics.
    pub fn evaluate(&self, window: &ReadingWindow, new_value: f64) -> Result<AnomalyResult> {
        if !new_value.is_finite() {
            return Err(CoreError::invalid_input(format!(
                "new value must be finite, got {new_value}"
            )));
        }
        window.validate()?;

        let values = window.values(self.config.window_size);
        let summary = Summary::of(&values);

        let result = match self.config.policy {
            DetectionPolicy::FixedThreshold => self.threshold_verdict(window.metric, new_value, summary),
            DetectionPolicy::Statistical if summary.count < self.config.min_history => {
                if self.config.threshold_fallback {
                    let mut result = self.threshold_verdict(window.metric, new_value, summary);
                    result.insufficient_history = true;
                    result
                        .reason
                        .get_or_insert_with(|| INSUFFICIENT_HISTORY.to_string());
                    result
                } else {
                    AnomalyResult {
                        is_anomaly: false,
                        current: new_value,
                        mean: summary.mean,
                        std_dev: summary.std_dev,
                        reason: Some(INSUFFICIENT_HISTORY.to_string()),
                        policy: DetectionPolicy::Statistical,
                        insufficient_history: true,
                    }
                }
            }
            DetectionPolicy::Statistical => self.statistical_verdict(new_value, summary),
        };

        tracing::debug!(
            subject_id = %window.subject_id,
            metric = %window.metric,
            window_len = summary.count,
            current = new_value,
            mean = result.mean,
            std_dev = result.std_dev,
            is_anomaly = result.is_anomaly,
            "reading evaluated"
        );
        Ok(result)
    }

    fn statistical_verdict(&self, new_value: f64, summary: Summary) -> AnomalyResult {
        let deviation = (new_value - summary.mean).abs();
        let band = self.config.sigma_multiplier * summary.std_dev;

        let (is_anomaly, reason) = if summary.std_dev == 0.0 {
            let flagged = new_value != summary.mean;
            let reason = flagged.then(|| {
                format!(
                    "value {new_value} differs from constant history {}",
                    summary.mean
                )
            });
            (flagged, reason)
        } else {
            let flagged = deviation > band;
            let reason = flagged.then(|| {
                format!(
                    "deviation {deviation:.2} from mean {:.2} exceeds {}σ band {band:.2}",
                    summary.mean, self.config.sigma_multiplier
                )
            });
            (flagged, reason)
        };

        AnomalyResult {
            is_anomaly,
            current: new_value,
            mean: summary.mean,
            std_dev: summary.std_dev,
            reason,
            policy: DetectionPolicy::Statistical,
            insufficient_history: false,
        }
    }

    fn threshold_verdict(&self, metric: Metric, new_value: f64, summary: Summary) -> AnomalyResult {
        let reason = threshold_breach(&self.config.thresholds, metric, new_value);
        AnomalyResult {
            is_anomaly: reason.is_some(),
            current: new_value,
            mean: summary.mean,
            std_dev: summary.std_dev,
            reason,
            policy: DetectionPolicy::FixedThreshold,
            insufficient_history: false,
        }
    }
}

/// Fixed-bound check for a single value; `None` when within bounds.
pub fn threshold_breach(bounds: &ThresholdBounds, metric: Metric, value: f64) -> Option<String> {
    match metric {
        Metric::Temperature if value > bounds.temperature_max => {
            Some(format!("high temperature ({value} {})", metric.unit()))
        }
        Metric::Humidity if value < bounds.humidity_min => {
            Some(format!("low humidity ({value} {})", metric.unit()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shelter_state::{Reading, ReadingId, SubjectId};

    fn window(metric: Metric, values: &[f64]) -> ReadingWindow {
        let now = Utc::now();
        let readings = values
            .iter()
            .enumerate()
            .map(|(i, v)| Reading {
                id: ReadingId::new(),
                subject_id: SubjectId(1),
                metric,
                value: *v,
                timestamp: now - Duration::minutes(i as i64),
            })
            .collect();
        ReadingWindow::new(SubjectId(1), metric, readings)
    }

    #[test]
    fn test_two_sigma_flags_outlier() {
        let detector = AnomalyDetector::default();
        let result = detector
            .evaluate(&window(Metric::Temperature, &[20.0, 21.0, 19.0, 22.0, 18.0]), 25.0)
            .unwrap();

        assert!(result.is_anomaly);
        assert!((result.mean - 20.0).abs() < 1e-12);
        assert!((result.std_dev - 1.4142).abs() < 1e-4);
        assert!(result.reason.unwrap().contains("exceeds 2σ band 2.83"));
    }

    #[test]
    fn test_two_sigma_accepts_close_value() {
        let detector = AnomalyDetector::default();
        let result = detector
            .evaluate(&window(Metric::Temperature, &[20.0, 21.0, 19.0, 22.0, 18.0]), 21.0)
            .unwrap();

        assert!(!result.is_anomaly);
        assert!(result.reason.is_none());
        assert!(!result.insufficient_history);
    }

    #[test]
    fn test_only_window_size_readings_considered() {
        let config = DetectorConfig {
            window_size: 5,
            ..DetectorConfig::default()
        };
        let detector = AnomalyDetector::new(config).unwrap();
        // The sixth (oldest) reading would widen the band enough to hide 25.0.
        let result = detector
            .evaluate(
                &window(Metric::Temperature, &[20.0, 21.0, 19.0, 22.0, 18.0, 60.0]),
                25.0,
            )
            .unwrap();
        assert!(result.is_anomaly);
    }

    #[test]
    fn test_threshold_breach_messages() {
        let bounds = ThresholdBounds::default();
        assert_eq!(
            threshold_breach(&bounds, Metric::Temperature, 31.5).as_deref(),
            Some("high temperature (31.5 C)")
        );
        assert_eq!(
            threshold_breach(&bounds, Metric::Humidity, 25.0).as_deref(),
            Some("low humidity (25 %)")
        );
        assert!(threshold_breach(&bounds, Metric::Temperature, 30.0).is_none());
        assert!(threshold_breach(&bounds, Metric::Humidity, 30.0).is_none());
        // Bounds are per metric: a hot humidity value is not a temperature breach.
        assert!(threshold_breach(&bounds, Metric::Humidity, 80.0).is_none());
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let detector = AnomalyDetector::default();
        let err = detector
            .evaluate(&window(Metric::Humidity, &[50.0; 5]), f64::INFINITY)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_min_history_rejected() {
        let config = DetectorConfig {
            min_history: 0,
            ..DetectorConfig::default()
        };
        let err = AnomalyDetector::new(config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(ref msg) if msg.contains("min_history")));
    }

    #[test]
    fn test_fallback_in_bounds_keeps_insufficient_history_reason() {
        let detector =
            AnomalyDetector::new(DetectorConfig::default().with_threshold_fallback(true)).unwrap();
        let result = detector
            .evaluate(&window(Metric::Temperature, &[22.0, 23.0]), 24.0)
            .unwrap();
        assert!(!result.is_anomaly);
        assert!(result.insufficient_history);
        assert_eq!(result.reason.as_deref(), Some(INSUFFICIENT_HISTORY));
    }

    #[test]
    fn test_extreme_finite_window_has_finite_statistics() {
        let detector = AnomalyDetector::default();
        let result = detector
            .evaluate(
                &window(Metric::Temperature, &[1e308, 1e308, 1e308, 1e308, -1e308]),
                -1e308,
            )
            .unwrap();
        assert!(result.mean.is_finite());
        assert!(result.std_dev.is_finite());
    }
}
