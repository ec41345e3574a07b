//! Store-backed services that feed the pure detector and scorer.
//!
//! Data is fetched from the injected collaborators first, then handed to
//! [`AnomalyDetector`] or [`ActivityScorer`]. Storage failures surface as
//! [`CoreError::Storage`]; nothing here retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use shelter_state::{
    Metric, NewReading, Reading, ReadingStore, StorageError, SubjectId, TaskStatus, TaskStore,
    VolunteerDirectory, VolunteerId,
};
use tracing::Instrument;

use crate::activity::{ActivityScorer, VolunteerScore};
use crate::anomaly::{AnomalyDetector, AnomalyResult};
use crate::domain::{CoreError, ReadingWindow, Result};
use crate::metrics::METRICS;
use crate::obs::{
    emit_anomaly_detected, emit_reading_evaluated, emit_scores_computed, emit_store_error,
    subject_span,
};

fn store_failure(operation: &'static str) -> impl FnOnce(StorageError) -> CoreError {
    move |e| {
        emit_store_error(operation, &e);
        CoreError::Storage(e)
    }
}

/// A reading together with the verdict it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedReading {
    pub reading: Reading,
    pub anomaly: AnomalyResult,
}

/// Sensor ingestion and evaluation over a [`ReadingStore`].
#[derive(Clone)]
pub struct TelemetryService {
    store: Arc<dyn ReadingStore>,
    detector: AnomalyDetector,
}

impl TelemetryService {
    pub fn new(store: Arc<dyn ReadingStore>, detector: AnomalyDetector) -> Self {
        Self { store, detector }
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// The window of readings that would precede a new value.
    pub async fn window(&self, subject_id: SubjectId, metric: Metric) -> Result<ReadingWindow> {
        let readings = self
            .store
            .fetch_recent_readings(subject_id, metric, self.detector.config().window_size)
            .await
            .map_err(store_failure("fetch_recent_readings"))?;
        Ok(ReadingWindow::new(subject_id, metric, readings))
    }

    /// Evaluate a new reading against its history, then persist it.
    ///
    /// The window is fetched before the reading is stored, so the new value
    /// is never part of its own baseline. Invalid input is rejected before
    /// anything is written.
    pub async fn record_reading(&self, reading: NewReading) -> Result<RecordedReading> {
        let span = subject_span(reading.subject_id);
        async move {
            let window = self.window(reading.subject_id, reading.metric).await?;
            let anomaly = self.detector.evaluate(&window, reading.value)?;

            let reading = self
                .store
                .append_reading(reading)
                .await
                .map_err(store_failure("append_reading"))?;

            self.publish(&reading, &anomaly);
            Ok(RecordedReading { reading, anomaly })
        }
        .instrument(span)
        .await
    }

    /// Evaluate the newest stored reading of a series against the readings
    /// before it. `None` when the series is empty.
    pub async fn evaluate_latest(
        &self,
        subject_id: SubjectId,
        metric: Metric,
    ) -> Result<Option<RecordedReading>> {
        let mut readings = self
            .store
            .fetch_recent_readings(subject_id, metric, self.detector.config().window_size + 1)
            .instrument(subject_span(subject_id))
            .await
            .map_err(store_failure("fetch_recent_readings"))?;

        if readings.is_empty() {
            return Ok(None);
        }
        let latest = readings.remove(0);
        let window = ReadingWindow::new(subject_id, metric, readings);
        let anomaly = self.detector.evaluate(&window, latest.value)?;

        self.publish(&latest, &anomaly);
        Ok(Some(RecordedReading {
            reading: latest,
            anomaly,
        }))
    }

    /// [`Self::evaluate_latest`] for many series at once. Evaluations run
    /// concurrently; the first failure aborts the batch.
    pub async fn evaluate_many(
        &self,
        series: &[(SubjectId, Metric)],
    ) -> Result<Vec<Option<RecordedReading>>> {
        try_join_all(
            series
                .iter()
                .map(|&(subject_id, metric)| self.evaluate_latest(subject_id, metric)),
        )
        .await
    }

    /// Every reading of a subject, newest first.
    pub async fn history(&self, subject_id: SubjectId) -> Result<Vec<Reading>> {
        self.store
            .readings_for_subject(subject_id)
            .await
            .map_err(store_failure("readings_for_subject"))
    }

    fn publish(&self, reading: &Reading, anomaly: &AnomalyResult) {
        METRICS.inc_readings_evaluated();
        emit_reading_evaluated(reading.subject_id, reading.metric, anomaly);
        if anomaly.is_anomaly {
            METRICS.inc_anomalies();
            emit_anomaly_detected(reading.subject_id, reading.metric, anomaly);
        }
    }
}

/// Volunteer ranking over a [`TaskStore`] and [`VolunteerDirectory`].
#[derive(Clone)]
pub struct ActivityService {
    tasks: Arc<dyn TaskStore>,
    volunteers: Arc<dyn VolunteerDirectory>,
    scorer: ActivityScorer,
}

impl ActivityService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        volunteers: Arc<dyn VolunteerDirectory>,
        scorer: ActivityScorer,
    ) -> Self {
        Self {
            tasks,
            volunteers,
            scorer,
        }
    }

    /// Score every registered volunteer as of `as_of`, best first.
    pub async fn rank(&self, as_of: DateTime<Utc>) -> Result<Vec<VolunteerScore>> {
        let ids = self
            .volunteers
            .list_volunteer_ids()
            .await
            .map_err(store_failure("list_volunteer_ids"))?;
        let tasks = self
            .tasks
            .fetch_tasks_for_volunteers(&ids)
            .await
            .map_err(store_failure("fetch_tasks_for_volunteers"))?;

        let scores = self.scorer.score(&ids, &tasks, as_of)?;

        METRICS.inc_scoring_batches();
        emit_scores_computed(scores.len(), scores.first().map(|s| s.activity_index));
        Ok(scores)
    }

    /// Number of completed tasks for one volunteer.
    pub async fn completed_count(&self, volunteer_id: VolunteerId) -> Result<usize> {
        let tasks = self
            .tasks
            .fetch_tasks_for_volunteers(&[volunteer_id])
            .await
            .map_err(store_failure("fetch_tasks_for_volunteers"))?;
        Ok(tasks
            .get(&volunteer_id)
            .map(|list| {
                list.iter()
                    .filter(|t| t.status == TaskStatus::Completed)
                    .count()
            })
            .unwrap_or(0))
    }
}
