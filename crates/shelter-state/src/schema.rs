//! Row definitions for the shelter SurrealDB tables
//!
//! Tables:
//! - sensor_readings: append-only telemetry per (subject, metric)
//! - tasks: volunteer task history
//! - volunteers: registered volunteer ids

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{
    Metric, NewReading, NewTask, Reading, ReadingId, StorageResult, SubjectId, Task, TaskId,
    TaskStatus, VolunteerId,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

// ---------------------------------------------------------------------------
// sensor_readings
// ---------------------------------------------------------------------------

/// Sensor reading row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Application-level reading ID (UUID string)
    pub reading_id: String,
    pub subject_id: i64,
    /// "Temperature" | "Humidity"
    pub metric: String,
    pub value: f64,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl ReadingRow {
    /// Build a row for a reading that is about to be inserted
    pub fn new(reading: &NewReading) -> Self {
        ReadingRow {
            id: None,
            reading_id: ReadingId::new().0,
            subject_id: reading.subject_id.0,
            metric: reading.metric.as_str().to_string(),
            value: reading.value,
            timestamp: reading.timestamp,
        }
    }

    /// Convert into the storage-trait type
    pub fn into_reading(self) -> StorageResult<Reading> {
        let metric = self
            .metric
            .parse::<Metric>()
            .map_err(|e| StorageError::Backend(format!("corrupt reading row: {e}")))?;
        Ok(Reading {
            id: ReadingId(self.reading_id),
            subject_id: SubjectId(self.subject_id),
            metric,
            value: self.value,
            timestamp: self.timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

/// Task row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Application-level task ID (UUID string)
    pub task_id: String,
    pub volunteer_id: i64,
    pub title: String,
    /// "pending" | "in_progress" | "completed"
    pub status: String,
    /// Calendar date, `YYYY-MM-DD`
    pub due_date: Option<NaiveDate>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    /// Build a row for a task that is about to be inserted
    pub fn new(task: NewTask) -> Self {
        let now = Utc::now();
        TaskRow {
            id: None,
            task_id: TaskId::new().0,
            volunteer_id: task.volunteer_id.0,
            title: task.title,
            status: task.status.as_str().to_string(),
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return a copy with a new status and a fresh `updated_at`
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status.as_str().to_string();
        self.updated_at = Utc::now();
        self
    }

    /// Convert into the storage-trait type
    pub fn into_task(self) -> StorageResult<Task> {
        Ok(Task {
            id: TaskId(self.task_id),
            volunteer_id: VolunteerId(self.volunteer_id),
            title: self.title,
            status: self.status.parse()?,
            due_date: self.due_date,
        })
    }
}

// ---------------------------------------------------------------------------
// volunteers
// ---------------------------------------------------------------------------

/// Volunteer row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub volunteer_id: i64,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VolunteerRow {
    pub fn new(volunteer_id: VolunteerId) -> Self {
        VolunteerRow {
            id: None,
            volunteer_id: volunteer_id.0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_row_round_trips_metric() {
        let row = ReadingRow::new(&NewReading::now(SubjectId(4), Metric::Humidity, 41.5));
        assert_eq!(row.metric, "Humidity");
        assert_eq!(row.reading_id.len(), 36);

        let reading = row.into_reading().unwrap();
        assert_eq!(reading.metric, Metric::Humidity);
        assert_eq!(reading.subject_id, SubjectId(4));
    }

    #[test]
    fn reading_row_rejects_unknown_metric() {
        let mut row = ReadingRow::new(&NewReading::now(SubjectId(1), Metric::Temperature, 20.0));
        row.metric = "Pressure".to_string();
        assert!(matches!(row.into_reading(), Err(StorageError::Backend(_))));
    }

    #[test]
    fn task_row_status_update() {
        let row = TaskRow::new(NewTask::new(VolunteerId(9), "clean kennels"));
        assert_eq!(row.status, "pending");

        let updated = row.with_status(TaskStatus::Completed);
        assert_eq!(updated.status, "completed");
        assert!(updated.updated_at >= updated.created_at);

        let task = updated.into_task().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.volunteer_id, VolunteerId(9));
    }
}
