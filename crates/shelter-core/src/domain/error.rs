//! Domain-level error taxonomy for shelter analytics.
//!
//! Sparse history is not an error: the detector reports it as a result state
//! (`AnomalyResult::insufficient_history`).

use shelter_state::StorageError;

/// Shelter analytics errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed or cross-contaminated data supplied by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }
}

/// Result type for shelter analytics operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = CoreError::invalid_input("value must be finite");
        assert_eq!(err.to_string(), "invalid input: value must be finite");
    }

    #[test]
    fn test_storage_error_wraps() {
        let err: CoreError = StorageError::Backend("connection reset".to_string()).into();
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_config_parse_error() {
        let err: CoreError = toml::from_str::<toml::Value>("= broken")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("config parse error"));
    }
}
