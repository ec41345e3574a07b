//! Volunteer activity scoring.
//!
//! Turns each volunteer's task history into counts of completed and overdue
//! work, normalises both against the busiest volunteer in the same batch and
//! blends them into a single activity index:
//!
//! ```text
//! index = 0.7 * completed / max_completed + 0.3 * (1 - overdue / max_overdue)
//! ```
//!
//! Both maxima are floored at 1, so a batch where nobody has completed (or
//! nobody has overdue) work does not divide by zero. The scale is relative to
//! peers: adding a volunteer to the batch can change everyone else's index.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shelter_state::{Task, TaskStatus, VolunteerId};

use crate::config::ScorerConfig;
use crate::domain::{CoreError, Result};
use crate::stats::round_to;

/// One volunteer's standing within a scoring batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerScore {
    pub volunteer_id: VolunteerId,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    /// Normalised index, rounded to the configured precision.
    pub activity_index: f64,
}

/// Completed and overdue counts for one volunteer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskTally {
    pub completed: usize,
    pub overdue: usize,
}

impl TaskTally {
    pub fn of(tasks: &[Task], as_of: DateTime<Utc>) -> Self {
        tasks.iter().fold(Self::default(), |mut tally, task| {
            if task.status == TaskStatus::Completed {
                tally.completed += 1;
            } else if is_overdue(task, as_of) {
                tally.overdue += 1;
            }
            tally
        })
    }
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// An unfinished task whose due date lies before `as_of`.
///
/// Tasks without a due date are never overdue.
pub fn is_overdue(task: &Task, as_of: DateTime<Utc>) -> bool {
    task.status != TaskStatus::Completed
        && task
            .due_date
            .is_some_and(|due| start_of_day(due) < as_of)
}

/// Resolve a textual reference time: RFC 3339, or a bare `YYYY-MM-DD` date
/// meaning midnight UTC.
pub fn resolve_as_of(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }
    Err(CoreError::invalid_input(format!(
        "cannot resolve '{text}' to a timestamp (expected RFC 3339 or YYYY-MM-DD)"
    )))
}

/// Batch scorer parameterised by a [`ScorerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ActivityScorer {
    config: ScorerConfig,
}

impl ActivityScorer {
    /// Build a scorer, rejecting configs that fail [`ScorerConfig::validate`].
    pub fn new(config: ScorerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score and rank every volunteer in `volunteer_ids`.
    ///
    /// Volunteers missing from `tasks_by_volunteer` have no tasks. Duplicate
    /// ids are scored once, at their first position. The result is sorted by
    /// `activity_index` descending; ties keep the order of `volunteer_ids`.
    ///
    /// Fails with `InvalidInput` when a task filed under one volunteer belongs
    /// to another.
    pub fn score(
        &self,
        volunteer_ids: &[VolunteerId],
        tasks_by_volunteer: &HashMap<VolunteerId, Vec<Task>>,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<VolunteerScore>> {
        let mut seen = HashSet::with_capacity(volunteer_ids.len());
        let mut tallies = Vec::with_capacity(volunteer_ids.len());

        for &volunteer_id in volunteer_ids {
            if !seen.insert(volunteer_id) {
                continue;
            }
            let tasks = tasks_by_volunteer
                .get(&volunteer_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if let Some(stray) = tasks.iter().find(|t| t.volunteer_id != volunteer_id) {
                return Err(CoreError::invalid_input(format!(
                    "task {} of volunteer {} listed under volunteer {}",
                    stray.id, stray.volunteer_id, volunteer_id
                )));
            }
            tallies.push((volunteer_id, TaskTally::of(tasks, as_of)));
        }

        let max_completed = tallies.iter().map(|(_, t)| t.completed).max().unwrap_or(0).max(1);
        let max_overdue = tallies.iter().map(|(_, t)| t.overdue).max().unwrap_or(0).max(1);

        let mut scores: Vec<VolunteerScore> = tallies
            .into_iter()
            .map(|(volunteer_id, tally)| {
                let c_norm = tally.completed as f64 / max_completed as f64;
                let o_norm = tally.overdue as f64 / max_overdue as f64;
                let raw = self.config.completion_weight * c_norm
                    + self.config.overdue_weight * (1.0 - o_norm);
                VolunteerScore {
                    volunteer_id,
                    completed_tasks: tally.completed,
                    overdue_tasks: tally.overdue,
                    activity_index: round_to(raw, self.config.precision),
                }
            })
            .collect();

        // Stable: equal indices keep input order.
        scores.sort_by(|a, b| b.activity_index.total_cmp(&a.activity_index));

        tracing::debug!(
            volunteers = scores.len(),
            max_completed,
            max_overdue,
            "activity batch scored"
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shelter_state::TaskId;

    fn task(volunteer: i64, status: TaskStatus, due: Option<(i32, u32, u32)>) -> Task {
        Task {
            id: TaskId::new(),
            volunteer_id: VolunteerId(volunteer),
            title: "task".to_string(),
            status,
            due_date: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn tally_counts_completed_and_overdue() {
        let tasks = vec![
            task(1, TaskStatus::Completed, Some((2024, 1, 1))),
            task(1, TaskStatus::Pending, Some((2024, 6, 1))),
            task(1, TaskStatus::InProgress, Some((2024, 6, 14))),
            task(1, TaskStatus::Pending, Some((2024, 7, 1))),
            task(1, TaskStatus::Pending, None),
        ];
        assert_eq!(
            TaskTally::of(&tasks, as_of()),
            TaskTally {
                completed: 1,
                overdue: 2
            }
        );
    }

    #[test]
    fn due_today_counts_once_day_has_started() {
        let t = task(1, TaskStatus::Pending, Some((2024, 6, 15)));
        assert!(is_overdue(&t, as_of()));
        assert!(!is_overdue(&t, start_of_day(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())));
    }

    #[test]
    fn completed_task_never_overdue() {
        let t = task(1, TaskStatus::Completed, Some((2000, 1, 1)));
        assert!(!is_overdue(&t, as_of()));
    }

    #[test]
    fn resolve_as_of_accepts_rfc3339_and_dates() {
        assert_eq!(resolve_as_of("2024-06-15T09:30:00Z").unwrap(), as_of());
        assert_eq!(
            resolve_as_of("2024-06-15T11:30:00+02:00").unwrap(),
            as_of()
        );
        assert_eq!(
            resolve_as_of("2024-06-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
        );
        assert!(matches!(
            resolve_as_of("next tuesday"),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn cross_listed_task_rejected() {
        let mut tasks = HashMap::new();
        tasks.insert(VolunteerId(1), vec![task(2, TaskStatus::Completed, None)]);
        let err = ActivityScorer::default()
            .score(&[VolunteerId(1)], &tasks, as_of())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_ids_scored_once() {
        let scores = ActivityScorer::default()
            .score(
                &[VolunteerId(1), VolunteerId(2), VolunteerId(1)],
                &HashMap::new(),
                as_of(),
            )
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].volunteer_id, VolunteerId(1));
    }

    #[test]
    fn empty_batch_scores_nothing() {
        let scores = ActivityScorer::default()
            .score(&[], &HashMap::new(), as_of())
            .unwrap();
        assert!(scores.is_empty());
    }
}
