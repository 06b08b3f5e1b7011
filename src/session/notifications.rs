use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state_machine::Stage;

pub const VERIFICATION_REQUIRED: &str = "Verification Required";
pub const ACCOUNT_CREATION_FAILED: &str = "Account Creation Failed";
pub const ACCOUNT_VERIFIED: &str = "Account Verified";
pub const VERIFICATION_FAILED: &str = "Verification Failed";
pub const PROCESSING_ERROR: &str = "Processing Error";
pub const PROCESSING_COMPLETE: &str = "Processing Complete";
pub const CREDITS_RENEWED: &str = "Credits Renewed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// User-facing message raised by a session operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub stage: Stage,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: &str, message: impl Into<String>, stage: Stage) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
            stage,
            raised_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}
