//! Observability tests for evaluation and scoring events.
//!
//! Event text is asserted in the `obs` unit tests; here we check that the
//! services drive the global counters and that emission is panic-free under
//! a capturing subscriber.

use std::sync::Arc;

use chrono::Utc;
use shelter_core::{
    emit_anomaly_detected, emit_scores_computed, emit_store_error, ActivityScorer,
    ActivityService, AnomalyDetector, AnomalyResult, DetectionPolicy, Metric, NewReading,
    SubjectId, SubjectSpan, TelemetryService, VolunteerId, METRICS,
};
use shelter_state::fakes::MemoryShelterStore;
use shelter_state::VolunteerDirectory;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_functions_under_subscriber() {
    let _span = SubjectSpan::enter(SubjectId(12));
    let result = AnomalyResult {
        is_anomaly: true,
        current: 14.0,
        mean: 45.0,
        std_dev: 2.0,
        reason: Some("low humidity (14 %)".to_string()),
        policy: DetectionPolicy::FixedThreshold,
        insufficient_history: false,
    };
    emit_anomaly_detected(SubjectId(12), Metric::Humidity, &result);
    emit_scores_computed(0, None);
    emit_store_error("append_reading", &"disk full");
}

#[traced_test]
#[tokio::test]
async fn test_recording_counts_evaluations_and_anomalies() {
    let store = Arc::new(MemoryShelterStore::new());
    let service = TelemetryService::new(store, AnomalyDetector::default());

    let evaluated_before = METRICS.readings_evaluated();
    let flagged_before = METRICS.anomalies_flagged();

    for _ in 0..5 {
        service
            .record_reading(NewReading::now(SubjectId(8), Metric::Temperature, 21.0))
            .await
            .unwrap();
    }
    let recorded = service
        .record_reading(NewReading::now(SubjectId(8), Metric::Temperature, 40.0))
        .await
        .unwrap();
    assert!(recorded.anomaly.is_anomaly);

    // Counters are process-wide; other tests may bump them concurrently.
    assert!(METRICS.readings_evaluated() >= evaluated_before + 6);
    assert!(METRICS.anomalies_flagged() > flagged_before);
}

#[traced_test]
#[tokio::test]
async fn test_ranking_counts_batches() {
    let store = Arc::new(MemoryShelterStore::new());
    store.register_volunteer(VolunteerId(1)).await.unwrap();
    let service = ActivityService::new(store.clone(), store, ActivityScorer::default());

    let before = METRICS.scoring_batches();
    service.rank(Utc::now()).await.unwrap();
    assert!(METRICS.scoring_batches() > before);
    METRICS.flush();
}
