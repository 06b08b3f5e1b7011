use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Input fields that can carry a validation message back to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Email,
    VideoUrl,
    SubtitleLanguage,
    DubbingLanguage,
    FullName,
    Password,
    Code,
    UserId,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Email => "email",
            Field::VideoUrl => "videoUrl",
            Field::SubtitleLanguage => "subtitleLanguage",
            Field::DubbingLanguage => "dubbingLanguage",
            Field::FullName => "fullName",
            Field::Password => "password",
            Field::Code => "code",
            Field::UserId => "userId",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Field-level validation failures, collected rather than short-circuited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn fields(&self) -> Vec<Field> {
        self.errors.iter().map(|e| e.field).collect()
    }

    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), FlowError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FlowError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Failures talking to the remote video service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network error, timeout, 5xx, or a body that could not be understood
    #[error("remote service unavailable: {0}")]
    Unavailable(String),
    /// The service answered with a definitive 4xx and an explanation
    #[error("remote service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl RemoteError {
    /// Whether the demo fallback may stand in for this failure
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("invalid verification code: {0}")]
    InvalidCode(String),
    #[error("step '{step}' cannot start before '{predecessor}' completes")]
    DependencyNotReady { step: String, predecessor: String },
    #[error("no step at position {index}")]
    UnknownStep { index: usize },
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
    #[error("verification locked after {max_attempts} failed attempts")]
    AttemptsExhausted { max_attempts: u32 },
}

impl FlowError {
    pub fn validation(field: Field, message: impl Into<String>) -> Self {
        FlowError::Validation(ValidationErrors::single(field, message))
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            FlowError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation(errors) => errors
                .errors()
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Invalid input".to_string()),
            FlowError::Remote(RemoteError::Rejected { message, .. }) => message.clone(),
            FlowError::Remote(RemoteError::Unavailable(_)) => {
                "The video service is unavailable. Please try again.".to_string()
            }
            FlowError::InvalidCode(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
