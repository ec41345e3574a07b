//! Shelter Core Library
//!
//! Telemetry anomaly detection and volunteer activity scoring for shelter
//! operations.
//!
//! The two analytical components are pure and synchronous:
//! - [`AnomalyDetector`] judges a sensor value against its recent history
//! - [`ActivityScorer`] ranks volunteers by completed and overdue work
//!
//! [`TelemetryService`] and [`ActivityService`] wire them to the storage
//! traits from `shelter-state`.

pub mod activity;
pub mod anomaly;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod service;
pub mod stats;
pub mod telemetry;

pub use activity::{
    is_overdue, resolve_as_of, start_of_day, ActivityScorer, TaskTally, VolunteerScore,
};
pub use anomaly::{threshold_breach, AnomalyDetector, AnomalyResult, INSUFFICIENT_HISTORY};
pub use config::{DetectionPolicy, DetectorConfig, ScorerConfig, ShelterConfig, ThresholdBounds};
pub use domain::{CoreError, ReadingWindow, Result};
pub use service::{ActivityService, RecordedReading, TelemetryService};
pub use stats::Summary;

pub use shelter_state::{
    Metric, NewReading, NewTask, Reading, ReadingId, SubjectId, Task, TaskId, TaskStatus,
    VolunteerId,
};

pub use metrics::METRICS;
pub use obs::{
    emit_anomaly_detected, emit_reading_evaluated, emit_scores_computed, emit_store_error,
    subject_span, SubjectSpan,
};
pub use telemetry::init_tracing;

/// Shelter analytics version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
