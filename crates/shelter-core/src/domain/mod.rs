//! Domain models for shelter analytics.
//!
//! - `ReadingWindow`: baseline history for one (subject, metric) pair
//! - `CoreError`: error taxonomy shared by the detector, scorer and services

pub mod error;
pub mod window;

pub use error::{CoreError, Result};
pub use window::ReadingWindow;
