//! Structured observability hooks for shelter analytics.
//!
//! This module provides:
//! - Subject-scoped tracing spans via the `SubjectSpan` RAII guard
//! - Emission functions for evaluation, alerting and scoring events
//!
//! Events are emitted at `info!` level except alerts and store failures,
//! which use `warn!`. Verbosity follows `RUST_LOG`.

use shelter_state::{Metric, SubjectId};
use tracing::{info, warn};

use crate::anomaly::AnomalyResult;

/// RAII guard that enters a subject-scoped span.
///
/// ```ignore
/// let _span = SubjectSpan::enter(SubjectId(7));
/// // events below carry subject_id = 7
/// ```
pub struct SubjectSpan {
    _span: tracing::span::EnteredSpan,
}

impl SubjectSpan {
    pub fn enter(subject_id: SubjectId) -> Self {
        Self {
            _span: subject_span(subject_id).entered(),
        }
    }
}

/// The span behind [`SubjectSpan`], for instrumenting futures.
pub fn subject_span(subject_id: SubjectId) -> tracing::Span {
    tracing::info_span!("shelter.subject", subject_id = %subject_id)
}

/// Emit event: a reading was evaluated.
pub fn emit_reading_evaluated(subject_id: SubjectId, metric: Metric, result: &AnomalyResult) {
    info!(
        event = "reading.evaluated",
        subject_id = %subject_id,
        metric = %metric,
        value = result.current,
        mean = result.mean,
        std_dev = result.std_dev,
        policy = %result.policy,
        is_anomaly = result.is_anomaly,
        insufficient_history = result.insufficient_history,
    );
}

/// Emit alert: a reading was flagged as anomalous.
pub fn emit_anomaly_detected(subject_id: SubjectId, metric: Metric, result: &AnomalyResult) {
    let reason = result.reason.as_deref().unwrap_or("anomalous reading");
    warn!(
        event = "anomaly.detected",
        subject_id = %subject_id,
        metric = %metric,
        value = result.current,
        "ALERT: subject {subject_id}: {reason}"
    );
}

/// Emit event: an activity batch was scored.
pub fn emit_scores_computed(volunteers: usize, top_index: Option<f64>) {
    info!(
        event = "scores.computed",
        volunteers = volunteers,
        top_index = top_index.unwrap_or(0.0),
    );
}

/// Emit event: a storage call failed (warning level).
pub fn emit_store_error(operation: &str, error: &dyn std::fmt::Display) {
    warn!(event = "store.error", operation = %operation, error = %error);
}
