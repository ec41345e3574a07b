//! SurrealDB-backed shelter store
//!
//! Uses the rows in `schema` for persistence, converting to/from
//! `storage_traits` types at the boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::handle::SurrealHandle;
use crate::schema::{ReadingRow, TaskRow, VolunteerRow};
use crate::storage_traits::{
    Metric, NewReading, NewTask, Reading, ReadingStore, StorageResult, SubjectId, Task, TaskId,
    TaskStatus, TaskStore, VolunteerDirectory, VolunteerId,
};

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A write rejected by a UNIQUE index.
fn is_unique_violation(e: &surrealdb::Error) -> bool {
    e.to_string().contains("already contains")
}

/// SurrealDB-backed implementation of the shelter storage traits.
#[derive(Clone)]
pub struct SurrealShelterStore {
    handle: SurrealHandle,
}

impl SurrealShelterStore {
    /// Wrap an already connected handle.
    pub fn new(handle: SurrealHandle) -> Self {
        Self { handle }
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Ok(Self::new(SurrealHandle::setup_db().await?))
    }

    /// Connect using the environment chain of [`SurrealHandle::setup_from_env`].
    pub async fn from_env() -> crate::Result<Self> {
        Ok(Self::new(SurrealHandle::setup_from_env().await?))
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_task_row(&self, task_id: &TaskId) -> StorageResult<TaskRow> {
        let tid = task_id.0.clone();
        let mut res = self
            .handle
            .db()
            .query("SELECT * FROM tasks WHERE task_id = $tid")
            .bind(("tid", tid))
            .await
            .map_err(backend)?;

        let rows: Vec<TaskRow> = res.take(0).map_err(backend)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::TaskNotFound {
                task_id: task_id.0.clone(),
            })
    }
}

#[async_trait]
impl ReadingStore for SurrealShelterStore {
    async fn append_reading(&self, reading: NewReading) -> StorageResult<Reading> {
        if !reading.value.is_finite() {
            return Err(StorageError::InvalidReading {
                reason: format!("value must be finite, got {}", reading.value),
            });
        }
        let row = ReadingRow::new(&reading);
        debug!(reading_id = %row.reading_id, subject_id = row.subject_id, metric = %row.metric, "appending reading");

        let created: Option<ReadingRow> = self
            .handle
            .db()
            .create("sensor_readings")
            .content(row)
            .await
            .map_err(backend)?;

        created
            .ok_or_else(|| StorageError::Backend("reading insert returned nothing".to_string()))?
            .into_reading()
    }

    async fn fetch_recent_readings(
        &self,
        subject_id: SubjectId,
        metric: Metric,
        limit: usize,
    ) -> StorageResult<Vec<Reading>> {
        let mut res = self
            .handle
            .db()
            .query(
                "SELECT * FROM sensor_readings \
                 WHERE subject_id = $subject AND metric = $metric \
                 ORDER BY timestamp DESC LIMIT $limit",
            )
            .bind(("subject", subject_id.0))
            .bind(("metric", metric.as_str().to_string()))
            .bind(("limit", limit as i64))
            .await
            .map_err(backend)?;

        let rows: Vec<ReadingRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(ReadingRow::into_reading).collect()
    }

    async fn readings_for_subject(&self, subject_id: SubjectId) -> StorageResult<Vec<Reading>> {
        let mut res = self
            .handle
            .db()
            .query("SELECT * FROM sensor_readings WHERE subject_id = $subject ORDER BY timestamp DESC")
            .bind(("subject", subject_id.0))
            .await
            .map_err(backend)?;

        let rows: Vec<ReadingRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(ReadingRow::into_reading).collect()
    }
}

#[async_trait]
impl TaskStore for SurrealShelterStore {
    async fn add_task(&self, task: NewTask) -> StorageResult<Task> {
        let row = TaskRow::new(task);
        debug!(task_id = %row.task_id, volunteer_id = row.volunteer_id, "adding task");

        let created: Option<TaskRow> = self
            .handle
            .db()
            .create("tasks")
            .content(row)
            .await
            .map_err(backend)?;

        created
            .ok_or_else(|| StorageError::Backend("task insert returned nothing".to_string()))?
            .into_task()
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> StorageResult<Task> {
        let mut row = self.fetch_task_row(task_id).await?.with_status(status);
        row.id = None;
        let tid = task_id.0.clone();

        self.handle
            .db()
            .query("UPDATE tasks CONTENT $row WHERE task_id = $tid")
            .bind(("row", row.clone()))
            .bind(("tid", tid))
            .await
            .map_err(backend)?;

        row.into_task()
    }

    async fn fetch_tasks_for_volunteers(
        &self,
        volunteer_ids: &[VolunteerId],
    ) -> StorageResult<HashMap<VolunteerId, Vec<Task>>> {
        let mut grouped: HashMap<VolunteerId, Vec<Task>> = volunteer_ids
            .iter()
            .map(|id| (*id, Vec::new()))
            .collect();
        if volunteer_ids.is_empty() {
            return Ok(grouped);
        }

        let ids: Vec<i64> = volunteer_ids.iter().map(|v| v.0).collect();
        let mut res = self
            .handle
            .db()
            .query("SELECT * FROM tasks WHERE volunteer_id IN $ids ORDER BY created_at ASC")
            .bind(("ids", ids))
            .await
            .map_err(backend)?;

        let rows: Vec<TaskRow> = res.take(0).map_err(backend)?;
        for row in rows {
            let task = row.into_task()?;
            if let Some(bucket) = grouped.get_mut(&task.volunteer_id) {
                bucket.push(task);
            }
        }
        Ok(grouped)
    }
}

#[async_trait]
impl VolunteerDirectory for SurrealShelterStore {
    async fn register_volunteer(&self, volunteer_id: VolunteerId) -> StorageResult<()> {
        let mut res = self
            .handle
            .db()
            .query("SELECT * FROM volunteers WHERE volunteer_id = $vid")
            .bind(("vid", volunteer_id.0))
            .await
            .map_err(backend)?;
        let existing: Vec<VolunteerRow> = res.take(0).map_err(backend)?;
        if !existing.is_empty() {
            return Err(StorageError::DuplicateVolunteer {
                volunteer_id: volunteer_id.0,
            });
        }

        let _created: Option<VolunteerRow> = self
            .handle
            .db()
            .create("volunteers")
            .content(VolunteerRow::new(volunteer_id))
            .await
            .map_err(|e| {
                // A concurrent registration can pass the check above; the
                // index on volunteer_id rejects the later write.
                if is_unique_violation(&e) {
                    StorageError::DuplicateVolunteer {
                        volunteer_id: volunteer_id.0,
                    }
                } else {
                    backend(e)
                }
            })?;
        Ok(())
    }

    async fn list_volunteer_ids(&self) -> StorageResult<Vec<VolunteerId>> {
        let mut res = self
            .handle
            .db()
            .query("SELECT * FROM volunteers ORDER BY volunteer_id ASC")
            .await
            .map_err(backend)?;
        let rows: Vec<VolunteerRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(|r| VolunteerId(r.volunteer_id)).collect())
    }
}
