//! Shelter-State: storage collaborator for shelter analytics
//!
//! This crate owns every row the analytics core reads: sensor readings,
//! registered volunteers and their tasks. The core never queries a database
//! itself; it is handed an explicitly constructed store implementing the
//! traits in [`storage_traits`].
//!
//! ## Key Components
//!
//! - `ReadingStore`, `TaskStore`, `VolunteerDirectory`: backend-agnostic traits
//! - `MemoryShelterStore`: in-memory implementation for tests and demos
//! - `SurrealShelterStore`: SurrealDB implementation (memory, file or cloud)
//! - `SurrealHandle` / `CloudConfig`: connection management

mod error;
pub mod fakes;
mod handle;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::{CloudConfig, SurrealHandle};
pub use schema::{ReadingRow, TaskRow, VolunteerRow};
pub use storage_traits::{
    Metric, NewReading, NewTask, Reading, ReadingId, ReadingStore, StorageResult, SubjectId, Task,
    TaskId, TaskStatus, TaskStore, VolunteerDirectory, VolunteerId,
};
pub use surreal_store::SurrealShelterStore;

/// Result type for shelter-state connection operations
pub type Result<T> = std::result::Result<T, StateError>;
