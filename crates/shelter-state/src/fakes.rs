//! In-memory fakes for storage traits
//!
//! Provides `MemoryShelterStore`, which satisfies `ReadingStore`, `TaskStore`
//! and `VolunteerDirectory` without any external dependencies.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

fn lock<T>(mutex: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StorageError::Backend(format!("memory store poisoned: {e}")))
}

/// In-memory shelter store backed by plain collections.
///
/// Readings and tasks keep insertion order internally; fetches sort as the
/// trait contracts require.
#[derive(Debug, Default)]
pub struct MemoryShelterStore {
    readings: Mutex<Vec<Reading>>,
    tasks: Mutex<Vec<Task>>,
    volunteers: Mutex<BTreeSet<VolunteerId>>,
}

impl MemoryShelterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; among equal timestamps the later insertion wins.
fn newest_first<'a>(readings: impl DoubleEndedIterator<Item = &'a Reading>) -> Vec<Reading> {
    let mut out: Vec<Reading> = readings.rev().cloned().collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

#[async_trait]
impl ReadingStore for MemoryShelterStore {
    async fn append_reading(&self, reading: NewReading) -> StorageResult<Reading> {
        if !reading.value.is_finite() {
            return Err(StorageError::InvalidReading {
                reason: format!("value must be finite, got {}", reading.value),
            });
        }
        let stored = Reading {
            id: ReadingId::new(),
            subject_id: reading.subject_id,
            metric: reading.metric,
            value: reading.value,
            timestamp: reading.timestamp,
        };
        lock(&self.readings)?.push(stored.clone());
        Ok(stored)
    }

    async fn fetch_recent_readings(
        &self,
        subject_id: SubjectId,
        metric: Metric,
        limit: usize,
    ) -> StorageResult<Vec<Reading>> {
        let readings = lock(&self.readings)?;
        let mut out = newest_first(
            readings
                .iter()
                .filter(|r| r.subject_id == subject_id && r.metric == metric),
        );
        out.truncate(limit);
        Ok(out)
    }

    async fn readings_for_subject(&self, subject_id: SubjectId) -> StorageResult<Vec<Reading>> {
        let readings = lock(&self.readings)?;
        Ok(newest_first(
            readings.iter().filter(|r| r.subject_id == subject_id),
        ))
    }
}

#[async_trait]
impl TaskStore for MemoryShelterStore {
    async fn add_task(&self, task: NewTask) -> StorageResult<Task> {
        let stored = Task {
            id: TaskId::new(),
            volunteer_id: task.volunteer_id,
            title: task.title,
            status: task.status,
            due_date: task.due_date,
        };
        lock(&self.tasks)?.push(stored.clone());
        Ok(stored)
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> StorageResult<Task> {
        let mut tasks = lock(&self.tasks)?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == *task_id)
            .ok_or_else(|| StorageError::TaskNotFound {
                task_id: task_id.0.clone(),
            })?;
        task.status = status;
        Ok(task.clone())
    }

    async fn fetch_tasks_for_volunteers(
        &self,
        volunteer_ids: &[VolunteerId],
    ) -> StorageResult<HashMap<VolunteerId, Vec<Task>>> {
        let tasks = lock(&self.tasks)?;
        let mut grouped: HashMap<VolunteerId, Vec<Task>> = volunteer_ids
            .iter()
            .map(|id| (*id, Vec::new()))
            .collect();
        for task in tasks.iter() {
            if let Some(bucket) = grouped.get_mut(&task.volunteer_id) {
                bucket.push(task.clone());
            }
        }
        Ok(grouped)
    }
}

#[async_trait]
impl VolunteerDirectory for MemoryShelterStore {
    async fn register_volunteer(&self, volunteer_id: VolunteerId) -> StorageResult<()> {
        if !lock(&self.volunteers)?.insert(volunteer_id) {
            return Err(StorageError::DuplicateVolunteer {
                volunteer_id: volunteer_id.0,
            });
        }
        Ok(())
    }

    async fn list_volunteer_ids(&self) -> StorageResult<Vec<VolunteerId>> {
        Ok(lock(&self.volunteers)?.iter().copied().collect())
    }
}
