//! Centralized error types for mailsender using thiserror.
//!
//! Two families exist: configuration errors are fatal and stop the writer
//! from starting, append errors are scoped to a single log event and never
//! reach the code that emitted the event.

use thiserror::Error;

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    LoadError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("connection source is not configured")]
    MissingConnection,
    #[error("sender address is not configured")]
    MissingSender,
    #[error("recipient template #{index} is empty")]
    BlankRecipient { index: usize },
    #[error("invalid template '{name}': {message}")]
    InvalidTemplate { name: String, message: String },
    #[error("no Tokio runtime available to run appends on")]
    NoRuntime,
}

/// Failure of one `append` call.
///
/// None of these stop the writer; the event is dropped and the failure is
/// reported through tracing and metrics.
#[derive(Error, Debug)]
pub enum AppendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("recipient list is empty, transfer aborted")]
    EmptyRecipients,
    #[error("body insert returned no identifier")]
    MissingBodyId,
}

impl AppendError {
    /// Stable label used for the `error_type` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AppendError::Database(_) => "database",
            AppendError::EmptyRecipients => "empty_recipients",
            AppendError::MissingBodyId => "missing_body_id",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::LoadError("file not found".to_string());
        assert_eq!(
            err.to_string(),
            "failed to load config file: file not found"
        );

        let err = ConfigError::ValidationError("missing field".to_string());
        assert_eq!(err.to_string(), "invalid configuration: missing field");
    }

    #[test]
    fn config_error_missing_parts_display() {
        assert_eq!(
            ConfigError::MissingConnection.to_string(),
            "connection source is not configured"
        );
        assert_eq!(
            ConfigError::MissingSender.to_string(),
            "sender address is not configured"
        );
        assert_eq!(
            ConfigError::BlankRecipient { index: 2 }.to_string(),
            "recipient template #2 is empty"
        );
    }

    #[test]
    fn config_error_invalid_template_display() {
        let err = ConfigError::InvalidTemplate {
            name: "subject".to_string(),
            message: "unexpected end of input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid template 'subject': unexpected end of input"
        );
    }

    #[test]
    fn append_error_display_and_kind() {
        let err = AppendError::EmptyRecipients;
        assert_eq!(err.to_string(), "recipient list is empty, transfer aborted");
        assert_eq!(err.kind(), "empty_recipients");

        let err = AppendError::MissingBodyId;
        assert_eq!(err.kind(), "missing_body_id");

        let err = AppendError::from(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().starts_with("database error:"));
        assert_eq!(err.kind(), "database");
    }
}
