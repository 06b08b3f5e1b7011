//! Request and response shapes for the remote video service.

use serde::{Deserialize, Serialize};

use crate::session::types::AccountTier;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupRequest<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupResponse {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verification_sent: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct VerifyRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyResponse {
    pub account_type: String,
    pub credits: u32,
    pub max_credits: u32,
    pub member_since: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessRequest<'a> {
    pub video_url: &'a str,
    pub subtitle_language: &'a str,
    pub dubbing_language: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessResponse {
    pub project_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body the service sends alongside 4xx/5xx statuses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Remote,
    DemoFallback,
}

/// Successful result of a remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReply<T> {
    pub value: T,
    pub source: ReplySource,
    /// Extra note for the user, set when demo data stood in for the service
    pub notice: Option<String>,
}

impl<T> RemoteReply<T> {
    pub fn remote(value: T) -> Self {
        Self {
            value,
            source: ReplySource::Remote,
            notice: None,
        }
    }

    pub fn demo(value: T, notice: impl Into<String>) -> Self {
        Self {
            value,
            source: ReplySource::DemoFallback,
            notice: Some(notice.into()),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.source == ReplySource::DemoFallback
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreated {
    pub user_id: String,
    pub email: String,
    pub verification_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub tier: AccountTier,
    pub credits_remaining: u32,
    pub credits_total: u32,
    pub member_since: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub video_url: String,
    pub subtitle_language: String,
    pub dubbing_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStarted {
    pub project_id: String,
    pub status: String,
}
