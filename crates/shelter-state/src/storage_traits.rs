//! Storage trait definitions for shelter analytics
//!
//! These traits define the data the analytics core consumes:
//! - `ReadingStore`: append-only sensor telemetry per (subject, metric)
//! - `TaskStore`: volunteer task history
//! - `VolunteerDirectory`: the set of registered volunteers
//!
//! All traits are async and backend-agnostic. An in-memory implementation is
//! provided for testing via the `fakes` module.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of a monitored subject (an animal in the shelter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered volunteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolunteerId(pub i64);

impl std::fmt::Display for VolunteerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a stored reading
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(pub String);

impl ReadingId {
    /// Generate a new random ReadingId
    pub fn new() -> Self {
        ReadingId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ReadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReadingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a stored task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        TaskId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ReadingStore: Sensor Telemetry
// ---------------------------------------------------------------------------

/// Kind of sensor measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Degrees Celsius.
    Temperature,
    /// Relative humidity, percent.
    Humidity,
}

impl Metric {
    /// Stable name used in storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
        }
    }

    /// Unit suffix used in alert messages.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "C",
            Metric::Humidity => "%",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" => Ok(Metric::Temperature),
            "humidity" => Ok(Metric::Humidity),
            other => Err(StorageError::InvalidReading {
                reason: format!("unknown metric: {other}"),
            }),
        }
    }
}

/// A reading that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub subject_id: SubjectId,
    pub metric: Metric,
    pub value: f64,
    /// Defaults to the time of insertion when omitted.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl NewReading {
    /// Create a reading stamped with the current time.
    pub fn now(subject_id: SubjectId, metric: Metric, value: f64) -> Self {
        Self {
            subject_id,
            metric,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A stored, immutable sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    pub subject_id: SubjectId,
    pub metric: Metric,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Append-only sensor reading store.
///
/// Guarantees:
/// - Readings are never modified after `append_reading`.
/// - Fetches return readings newest first (descending `timestamp`).
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a reading. Fails with `InvalidReading` for non-finite values.
    async fn append_reading(&self, reading: NewReading) -> StorageResult<Reading>;

    /// The most recent `limit` readings for one (subject, metric) pair, newest first.
    async fn fetch_recent_readings(
        &self,
        subject_id: SubjectId,
        metric: Metric,
        limit: usize,
    ) -> StorageResult<Vec<Reading>>;

    /// Every reading recorded for a subject, newest first.
    async fn readings_for_subject(&self, subject_id: SubjectId) -> StorageResult<Vec<Reading>>;
}

// ---------------------------------------------------------------------------
// TaskStore: Volunteer Task History
// ---------------------------------------------------------------------------

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(StorageError::Backend(format!("unknown task status: {other}"))),
        }
    }
}

/// A task that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub volunteer_id: VolunteerId,
    pub title: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

impl NewTask {
    /// A pending task with no due date.
    pub fn new(volunteer_id: VolunteerId, title: impl Into<String>) -> Self {
        Self {
            volunteer_id,
            title: title.into(),
            status: TaskStatus::Pending,
            due_date: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub volunteer_id: VolunteerId,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
}

/// Volunteer task store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task.
    async fn add_task(&self, task: NewTask) -> StorageResult<Task>;

    /// Change the status of a task. Fails with `TaskNotFound` if absent.
    async fn update_task_status(&self, task_id: &TaskId, status: TaskStatus)
        -> StorageResult<Task>;

    /// Tasks grouped by volunteer. Every requested id is present in the
    /// result, mapped to an empty list when the volunteer has no tasks.
    async fn fetch_tasks_for_volunteers(
        &self,
        volunteer_ids: &[VolunteerId],
    ) -> StorageResult<HashMap<VolunteerId, Vec<Task>>>;
}

// ---------------------------------------------------------------------------
// VolunteerDirectory
// ---------------------------------------------------------------------------

/// Registry of volunteers.
#[async_trait]
pub trait VolunteerDirectory: Send + Sync {
    /// Register a volunteer. Fails with `DuplicateVolunteer` if already present.
    async fn register_volunteer(&self, volunteer_id: VolunteerId) -> StorageResult<()>;

    /// All registered volunteer ids, ascending.
    async fn list_volunteer_ids(&self) -> StorageResult<Vec<VolunteerId>>;
}
