//! Error types for the client engine and its automation
//!
//! Errors are classified by who has to act:
//! - Caller input: missing records, empty input, invalid form fields
//! - Environment: configuration, record store failures
//! - Boundary: unauthenticated triggers, overlapping automation runs

use std::collections::BTreeMap;

use thiserror::Error;

/// Field name -> human-readable message.
pub type ValidationErrors = BTreeMap<String, String>;

/// Error types for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Client not found: {0}")]
    NotFound(String),

    #[error("No client records to process: {0}")]
    EmptyInput(String),

    #[error("Validation failed: {}", format_fields(.0))]
    Validation(ValidationErrors),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Unauthorized trigger: missing signature")]
    Unauthorized,

    #[error("An automation run is already in progress")]
    AutomationBusy,

    /// A store run that failed after some of its writes had landed.
    #[error("{source} (after {} writes)", applied_ids.len())]
    PartiallyApplied {
        applied_ids: Vec<String>,
        source: Box<EngineError>,
    },
}

fn format_fields(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{}: {}", field, msg))
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    /// Wrap a write failure with the ids written before it. With nothing
    /// written the failure is returned as-is.
    pub fn partially_applied(applied_ids: Vec<String>, source: EngineError) -> Self {
        if applied_ids.is_empty() {
            source
        } else {
            EngineError::PartiallyApplied {
                applied_ids,
                source: Box::new(source),
            }
        }
    }

    /// Ids whose writes landed before the run failed.
    pub fn applied_ids(&self) -> &[String] {
        match self {
            EngineError::PartiallyApplied { applied_ids, .. } => applied_ids,
            _ => &[],
        }
    }

    /// Returns true if running the same call again later can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(_) | EngineError::AutomationBusy => true,
            EngineError::PartiallyApplied { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the caller sent something the engine cannot use
    pub fn is_caller_error(&self) -> bool {
        match self {
            EngineError::NotFound(_) | EngineError::EmptyInput(_) | EngineError::Validation(_) => {
                true
            }
            EngineError::PartiallyApplied { source, .. } => source.is_caller_error(),
            _ => false,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "Check the client id; the record may have been deleted.",
            EngineError::EmptyInput(_) => "Load client records before running the engine.",
            EngineError::Validation(_) => "Correct the highlighted fields and submit again.",
            EngineError::ConfigurationError(_) => {
                "Check your configuration in ~/.clientpulse/config.json"
            }
            EngineError::Store(_) => "The record store is unavailable. Try again.",
            EngineError::Unauthorized => "Send the trigger from the configured scheduler.",
            EngineError::AutomationBusy => "Wait for the current run to finish.",
            EngineError::PartiallyApplied { source, .. } => source.recovery_suggestion(),
        }
    }
}

/// Serializable error representation for boundary responses
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Input,
    Retryable,
    Fatal,
}

impl From<&EngineError> for ErrorPayload {
    fn from(err: &EngineError) -> Self {
        let error_type = if err.is_caller_error() {
            ErrorType::Input
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::Fatal
        };

        let fields = match err {
            EngineError::Validation(map) => Some(map.clone()),
            _ => None,
        };

        ErrorPayload {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let mut fields = ValidationErrors::new();
        fields.insert("name".to_string(), "Name is required".to_string());
        fields.insert("phone".to_string(), "Phone is required".to_string());
        let err = EngineError::Validation(fields);
        assert_eq!(
            err.to_string(),
            "Validation failed: name: Name is required; phone: Phone is required"
        );
    }

    #[test]
    fn test_payload_classification() {
        let payload = ErrorPayload::from(&EngineError::NotFound("c9".to_string()));
        assert_eq!(payload.error_type, ErrorType::Input);
        assert!(!payload.can_retry);

        let payload = ErrorPayload::from(&EngineError::AutomationBusy);
        assert_eq!(payload.error_type, ErrorType::Retryable);
        assert!(payload.can_retry);

        let payload = ErrorPayload::from(&EngineError::ConfigurationError("bad".into()));
        assert_eq!(payload.error_type, ErrorType::Fatal);
    }

    #[test]
    fn test_partially_applied_keeps_ids_and_source_class() {
        let err = EngineError::partially_applied(
            vec!["a".to_string()],
            EngineError::Store("disk full".to_string()),
        );
        assert_eq!(err.applied_ids(), ["a".to_string()]);
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Record store error: disk full (after 1 writes)"
        );
    }

    #[test]
    fn test_partially_applied_with_nothing_written_is_the_source() {
        let err = EngineError::partially_applied(Vec::new(), EngineError::NotFound("x".into()));
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(err.applied_ids().is_empty());
    }

    #[test]
    fn test_payload_carries_validation_fields() {
        let mut fields = ValidationErrors::new();
        fields.insert("description".to_string(), "Too short".to_string());
        let payload = ErrorPayload::from(&EngineError::Validation(fields));
        assert_eq!(
            payload.fields.unwrap().get("description").map(String::as_str),
            Some("Too short")
        );
    }
}
