//! Analytics configuration.
//!
//! Every field has a default matching the reference behaviour, so an empty
//! TOML file (or no file at all) yields the two-sigma statistical detector and
//! the 70/30 activity weighting.
//!
//! ```toml
//! [detector]
//! policy = "statistical"      # or "fixed_threshold"
//! window_size = 20
//! min_history = 5
//! sigma_multiplier = 2.0
//! threshold_fallback = false
//!
//! [detector.thresholds]
//! temperature_max = 30.0
//! humidity_min = 30.0
//!
//! [scorer]
//! completion_weight = 0.7
//! overdue_weight = 0.3
//! precision = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CoreError, Result};

/// Which anomaly rule the detector applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// Rolling mean / standard deviation over the reading window.
    #[default]
    Statistical,
    /// Fixed per-metric bounds, no history needed.
    FixedThreshold,
}

impl std::fmt::Display for DetectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionPolicy::Statistical => f.write_str("statistical"),
            DetectionPolicy::FixedThreshold => f.write_str("fixed_threshold"),
        }
    }
}

impl std::str::FromStr for DetectionPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "statistical" => Ok(DetectionPolicy::Statistical),
            "fixed_threshold" | "threshold" => Ok(DetectionPolicy::FixedThreshold),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown detection policy: {other}"
            ))),
        }
    }
}

/// Per-metric bounds used by the fixed-threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdBounds {
    /// Temperatures strictly above this are flagged.
    pub temperature_max: f64,
    /// Humidity strictly below this is flagged.
    pub humidity_min: f64,
}

impl Default for ThresholdBounds {
    fn default() -> Self {
        Self {
            temperature_max: 30.0,
            humidity_min: 30.0,
        }
    }
}

/// Anomaly detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub policy: DetectionPolicy,
    /// How many prior readings form the window.
    pub window_size: usize,
    /// Below this many prior readings the statistical rule never flags.
    pub min_history: usize,
    /// Deviation band, in standard deviations.
    pub sigma_multiplier: f64,
    /// Apply the threshold rule to windows too sparse for statistics.
    pub threshold_fallback: bool,
    pub thresholds: ThresholdBounds,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            policy: DetectionPolicy::Statistical,
            window_size: 20,
            min_history: 5,
            sigma_multiplier: 2.0,
            threshold_fallback: false,
            thresholds: ThresholdBounds::default(),
        }
    }
}

impl DetectorConfig {
    pub fn with_policy(mut self, policy: DetectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_threshold_fallback(mut self, enabled: bool) -> Self {
        self.threshold_fallback = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(CoreError::InvalidConfig(
                "detector.window_size must be at least 1".to_string(),
            ));
        }
        if self.min_history == 0 {
            return Err(CoreError::InvalidConfig(
                "detector.min_history must be at least 1".to_string(),
            ));
        }
        if self.min_history > self.window_size {
            return Err(CoreError::InvalidConfig(format!(
                "detector.min_history ({}) exceeds window_size ({})",
                self.min_history, self.window_size
            )));
        }
        if !self.sigma_multiplier.is_finite() || self.sigma_multiplier <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "detector.sigma_multiplier must be a positive number, got {}",
                self.sigma_multiplier
            )));
        }
        if !self.thresholds.temperature_max.is_finite() || !self.thresholds.humidity_min.is_finite()
        {
            return Err(CoreError::InvalidConfig(
                "detector.thresholds must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Activity scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Reward for completed work.
    pub completion_weight: f64,
    /// Penalty share for overdue work.
    pub overdue_weight: f64,
    /// Decimal places of the published index.
    pub precision: i32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            completion_weight: 0.7,
            overdue_weight: 0.3,
            precision: 2,
        }
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.completion_weight, self.overdue_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CoreError::InvalidConfig(
                "scorer weights must be finite and non-negative".to_string(),
            ));
        }
        if (self.completion_weight + self.overdue_weight - 1.0).abs() > 1e-9 {
            return Err(CoreError::InvalidConfig(format!(
                "scorer weights must sum to 1.0, got {} + {}",
                self.completion_weight, self.overdue_weight
            )));
        }
        if !(0..=10).contains(&self.precision) {
            return Err(CoreError::InvalidConfig(format!(
                "scorer.precision must be within 0..=10, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelterConfig {
    pub detector: DetectorConfig,
    pub scorer: ScorerConfig,
}

impl ShelterConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ShelterConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), policy = %config.detector.policy, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.scorer.validate()
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ShelterConfig::from_toml_str("").unwrap();
        assert_eq!(config, ShelterConfig::default());
        assert_eq!(config.detector.policy, DetectionPolicy::Statistical);
        assert_eq!(config.detector.window_size, 20);
        assert_eq!(config.detector.min_history, 5);
        assert_eq!(config.detector.sigma_multiplier, 2.0);
        assert_eq!(config.scorer.completion_weight, 0.7);
    }

    #[test]
    fn partial_override() {
        let config = ShelterConfig::from_toml_str(
            r#"
            [detector]
            policy = "fixed_threshold"

            [detector.thresholds]
            temperature_max = 28.5
            "#,
        )
        .unwrap();
        assert_eq!(config.detector.policy, DetectionPolicy::FixedThreshold);
        assert_eq!(config.detector.thresholds.temperature_max, 28.5);
        assert_eq!(config.detector.thresholds.humidity_min, 30.0);
        assert_eq!(config.detector.window_size, 20);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err = ShelterConfig::from_toml_str(
            r#"
            [scorer]
            completion_weight = 0.8
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_window() {
        let config = DetectorConfig {
            window_size: 0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_sigma() {
        let config = DetectorConfig {
            sigma_multiplier: 0.0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_parses() {
        assert_eq!(
            "statistical".parse::<DetectionPolicy>().unwrap(),
            DetectionPolicy::Statistical
        );
        assert_eq!(
            "threshold".parse::<DetectionPolicy>().unwrap(),
            DetectionPolicy::FixedThreshold
        );
        assert!("magic".parse::<DetectionPolicy>().is_err());
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let config = ShelterConfig {
            detector: DetectorConfig::default().with_policy(DetectionPolicy::FixedThreshold),
            scorer: ScorerConfig::default(),
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ShelterConfig::from_toml_str(&text).unwrap(), config);
    }
}
