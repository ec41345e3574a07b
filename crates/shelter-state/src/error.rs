//! Error types for shelter-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

/// Errors surfaced by the storage traits
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("volunteer already registered: {volunteer_id}")]
    DuplicateVolunteer { volunteer_id: i64 },

    #[error("invalid reading: {reason}")]
    InvalidReading { reason: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_error_converts_to_backend() {
        let err: StorageError = StateError::Connection("refused".to_string()).into();
        assert!(matches!(err, StorageError::Backend(ref msg) if msg.contains("refused")));
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::DuplicateVolunteer { volunteer_id: 7 };
        assert_eq!(err.to_string(), "volunteer already registered: 7");
    }
}
