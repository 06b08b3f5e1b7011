use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SUBTITLE_LANGUAGE: &str = "en";
pub const DEFAULT_DUBBING_LANGUAGE: &str = "es";

/// Below this many remaining credits the account is offered a renewal
pub const LOW_CREDIT_THRESHOLD: u32 = 3;

/// Raw intake fields as submitted by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    pub email: String,
    pub video_url: String,
    pub subtitle_language: String,
    pub dubbing_language: String,
}

impl IntakeForm {
    /// Intake with the default subtitle (English) and dubbing (Spanish) languages
    pub fn new(email: impl Into<String>, video_url: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            video_url: video_url.into(),
            subtitle_language: DEFAULT_SUBTITLE_LANGUAGE.to_string(),
            dubbing_language: DEFAULT_DUBBING_LANGUAGE.to_string(),
        }
    }

    pub fn with_languages(mut self, subtitle: impl Into<String>, dubbing: impl Into<String>) -> Self {
        self.subtitle_language = subtitle.into();
        self.dubbing_language = dubbing.into();
        self
    }
}

/// Intake that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub email: String,
    pub video_url: String,
    pub subtitle_language: String,
    pub dubbing_language: String,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signup credential, written once and held only for the lifetime of the session
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    full_name: String,
    email: String,
    password: String,
}

impl Credential {
    pub(crate) fn from_form(form: SignupForm) -> Self {
        Self {
            full_name: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl AccountTier {
    /// Unknown tier names fall back to `Free`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pro" => AccountTier::Pro,
            "enterprise" => AccountTier::Enterprise,
            _ => AccountTier::Free,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountTier::Free => "Free",
            AccountTier::Pro => "Pro",
            AccountTier::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for AccountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Remote account as known to this session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHandle {
    pub user_id: String,
    pub verified: bool,
    pub tier: AccountTier,
    pub credits_remaining: u32,
    pub credits_total: u32,
    pub member_since: String,
}

impl AccountHandle {
    pub fn unverified(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            verified: false,
            tier: AccountTier::Free,
            credits_remaining: 0,
            credits_total: 0,
            member_since: String::new(),
        }
    }

    /// Apply a successful verification. Remaining credits never exceed the total.
    pub fn mark_verified(&mut self, tier: AccountTier, credits_remaining: u32, credits_total: u32, member_since: String) {
        self.verified = true;
        self.tier = tier;
        self.credits_total = credits_total;
        self.credits_remaining = credits_remaining.min(credits_total);
        self.member_since = member_since;
    }

    pub fn needs_renewal(&self) -> bool {
        self.verified && self.credits_remaining < LOW_CREDIT_THRESHOLD
    }

    /// Remaining credits as a rounded percentage of the total
    pub fn credit_percentage(&self) -> u8 {
        if self.credits_total == 0 {
            return 0;
        }
        let pct = (f64::from(self.credits_remaining) / f64::from(self.credits_total) * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    NotStarted,
    Processing,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::Processing => "Processing",
            StepStatus::Completed => "Completed",
            StepStatus::Error => "Error",
        }
    }

    /// Completed and errored steps take no further part in a run
    pub fn is_inert(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Step {
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Pending,
            progress: 0,
            message: None,
        }
    }
}

/// The fixed pipeline every job runs through, in dependency order
pub fn pipeline_steps() -> Vec<Step> {
    vec![
        Step::pending("account", "Account Setup"),
        Step::pending("video", "Video Processing"),
        Step::pending("subtitles", "Subtitle Generation"),
        Step::pending("dubbing", "Audio Dubbing"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub project_id: String,
    pub status: JobStatus,
    pub steps: Vec<Step>,
}

impl Job {
    /// Freshly started job with every step pending
    pub fn started(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            status: JobStatus::Processing,
            steps: pipeline_steps(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Complete | JobStatus::Error)
    }
}
