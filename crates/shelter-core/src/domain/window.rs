//! Reading windows: the statistical baseline for one (subject, metric) pair.

use serde::{Deserialize, Serialize};
use shelter_state::{Metric, Reading, SubjectId};

use super::error::{CoreError, Result};

/// The most recent readings for one (subject, metric) pair, newest first.
///
/// Derived per evaluation, never persisted. The first element is treated as
/// the reading immediately preceding the value under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingWindow {
    pub subject_id: SubjectId,
    pub metric: Metric,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl ReadingWindow {
    pub fn new(subject_id: SubjectId, metric: Metric, readings: Vec<Reading>) -> Self {
        Self {
            subject_id,
            metric,
            readings,
        }
    }

    /// A window with no history.
    pub fn empty(subject_id: SubjectId, metric: Metric) -> Self {
        Self::new(subject_id, metric, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// The immediately preceding reading, if any.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.first()
    }

    /// Values of the newest `limit` readings.
    pub fn values(&self, limit: usize) -> Vec<f64> {
        self.readings.iter().take(limit).map(|r| r.value).collect()
    }

    /// Reject windows that mix series or carry non-finite values.
    pub fn validate(&self) -> Result<()> {
        for reading in &self.readings {
            if reading.subject_id != self.subject_id || reading.metric != self.metric {
                return Err(CoreError::invalid_input(format!(
                    "window for subject {} / {} contains reading {} of subject {} / {}",
                    self.subject_id, self.metric, reading.id, reading.subject_id, reading.metric
                )));
            }
            if !reading.value.is_finite() {
                return Err(CoreError::invalid_input(format!(
                    "reading {} has non-finite value {}",
                    reading.id, reading.value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shelter_state::ReadingId;

    fn reading(subject: i64, metric: Metric, value: f64) -> Reading {
        Reading {
            id: ReadingId::new(),
            subject_id: SubjectId(subject),
            metric,
            value,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn values_respect_limit_and_order() {
        let window = ReadingWindow::new(
            SubjectId(1),
            Metric::Temperature,
            vec![
                reading(1, Metric::Temperature, 3.0),
                reading(1, Metric::Temperature, 2.0),
                reading(1, Metric::Temperature, 1.0),
            ],
        );
        assert_eq!(window.values(2), vec![3.0, 2.0]);
        assert_eq!(window.latest().map(|r| r.value), Some(3.0));
    }

    #[test]
    fn mixed_subjects_rejected() {
        let window = ReadingWindow::new(
            SubjectId(1),
            Metric::Temperature,
            vec![
                reading(1, Metric::Temperature, 20.0),
                reading(2, Metric::Temperature, 20.0),
            ],
        );
        assert!(matches!(window.validate(), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn mixed_metrics_rejected() {
        let window = ReadingWindow::new(
            SubjectId(1),
            Metric::Temperature,
            vec![reading(1, Metric::Humidity, 40.0)],
        );
        assert!(window.validate().is_err());
    }

    #[test]
    fn empty_window_is_valid() {
        assert!(ReadingWindow::empty(SubjectId(1), Metric::Humidity)
            .validate()
            .is_ok());
    }
}
