//! One user's pass through intake, signup, processing and download.
//!
//! [`Session`] ties the stage machine, the provisioning workflow and the
//! progress tracker together. Operations are gated on the current [`Stage`];
//! anything invoked out of order fails with `InvalidState` and changes nothing.

pub mod downloads;
pub mod languages;
pub mod notifications;
pub mod state_machine;
pub mod types;
pub mod validation;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn, Instrument};

use crate::config::SubdubConfig;
use crate::errors::{FlowError, FlowResult};
use crate::remote::{RemoteService, RemoteServiceClient};
use crate::telemetry::{create_session_span, generate_correlation_id};
use crate::tracker::{format_time_remaining, ChannelObserver, JobProgressTracker, ProgressSnapshot, TrackerEvent, TrackerHandle};
use crate::workflows::{ProvisioningState, ProvisioningWorkflow};

pub use downloads::{DownloadKind, DownloadLink, DownloadLinks};
pub use notifications::{Notification, NotificationLevel};
pub use state_machine::{SessionEvent, SessionFlow, Stage};
pub use types::{AccountHandle, AccountTier, Intake, IntakeForm, Job, JobStatus, SignupForm, Step, StepStatus};

/// How a call to [`Session::run_to_completion`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    StepFailed { step_id: String, message: String },
    /// No tracker was running, or it stopped without completing
    Stopped,
}

/// Serializable read model of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub stage: Stage,
    pub provisioning: ProvisioningState,
    pub intake: Option<Intake>,
    pub account: Option<AccountHandle>,
    pub job: Option<Job>,
    pub overall_progress: u8,
    pub time_remaining: u32,
    pub time_remaining_display: String,
    pub notifications: Vec<Notification>,
    pub downloads: Option<DownloadLinks>,
}

pub struct Session {
    id: String,
    config: SubdubConfig,
    flow: SessionFlow,
    workflow: ProvisioningWorkflow,
    tracker: Option<TrackerHandle>,
    events: Option<mpsc::UnboundedReceiver<TrackerEvent>>,
    progress: Option<ProgressSnapshot>,
    notifications: Vec<Notification>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("stage", &self.stage())
            .field("workflow", &self.workflow)
            .field("tracking", &self.tracker.is_some())
            .finish()
    }
}

impl Session {
    pub fn new(config: SubdubConfig, remote: Arc<dyn RemoteService>) -> Self {
        let id = generate_correlation_id();
        let workflow = ProvisioningWorkflow::new(remote, config.verification.max_attempts);
        Self {
            flow: SessionFlow::new(id.clone()),
            id,
            config,
            workflow,
            tracker: None,
            events: None,
            progress: None,
            notifications: Vec::new(),
        }
    }

    /// Session backed by the HTTP client for `config.remote`
    pub fn connect(config: SubdubConfig) -> Result<Self, reqwest::Error> {
        let remote = RemoteServiceClient::new(&config.remote)?;
        Ok(Self::new(config, Arc::new(remote)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> Stage {
        self.flow.stage()
    }

    pub fn config(&self) -> &SubdubConfig {
        &self.config
    }

    pub fn workflow(&self) -> &ProvisioningWorkflow {
        &self.workflow
    }

    pub fn account(&self) -> Option<&AccountHandle> {
        self.workflow.account()
    }

    pub fn job(&self) -> Option<&Job> {
        self.workflow.job()
    }

    pub fn progress(&self) -> Option<&ProgressSnapshot> {
        self.progress.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_some()
    }

    fn notify(&mut self, level: NotificationLevel, title: &str, message: impl Into<String>) {
        let notification = Notification::new(level, title, message, self.stage());
        info!(
            session_id = %self.id,
            level = ?notification.level,
            title = %notification.title,
            "Session notification"
        );
        self.notifications.push(notification);
    }

    fn require_stage(&self, stage: Stage, operation: &'static str) -> FlowResult<()> {
        if self.stage() != stage {
            return Err(FlowError::InvalidState {
                operation,
                state: format!("on the {} stage", self.stage()),
            });
        }
        Ok(())
    }

    fn span(&self, operation: &str) -> tracing::Span {
        create_session_span(operation, &self.id, Some(self.stage().label()))
    }

    /// Accept the intake and move on to signup
    pub fn submit_intake(&mut self, form: &IntakeForm) -> FlowResult<()> {
        self.require_stage(Stage::Input, "submit intake")?;
        let _enter = self.span("submit_intake").entered();

        self.workflow.submit_intake(form)?;
        self.flow.apply(SessionEvent::IntakeAccepted);
        Ok(())
    }

    pub async fn create_account(&mut self, form: SignupForm) -> FlowResult<()> {
        self.require_stage(Stage::Signup, "create an account")?;
        let span = self.span("create_account");

        match self.workflow.create_account(form).instrument(span).await {
            Ok(reply) => {
                let message = reply
                    .notice
                    .unwrap_or_else(|| "Please check your email for a verification code.".to_string());
                self.notify(NotificationLevel::Info, notifications::VERIFICATION_REQUIRED, message);
                Ok(())
            }
            Err(e) => {
                if e.validation_errors().is_none() {
                    self.notify(NotificationLevel::Error, notifications::ACCOUNT_CREATION_FAILED, e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Verify the emailed code; on success the session enters processing and the job starts.
    ///
    /// A failed job start is reported as a notification and leaves the session
    /// on the processing stage, where [`start_job`](Self::start_job) may be retried.
    pub async fn submit_verification_code(&mut self, code: &str) -> FlowResult<()> {
        self.require_stage(Stage::Signup, "verify a code")?;
        let span = self.span("verify_code");

        match self.workflow.submit_verification_code(code).instrument(span).await {
            Ok(_) => {
                self.flow.apply(SessionEvent::AccountVerified);
                self.notify(
                    NotificationLevel::Success,
                    notifications::ACCOUNT_VERIFIED,
                    "Your account is now active. Processing has started.",
                );
                if let Err(e) = self.start_job().await {
                    warn!(session_id = %self.id, error = %e, "Job did not start after verification");
                }
                Ok(())
            }
            Err(e) => {
                if e.validation_errors().is_none() {
                    self.notify(NotificationLevel::Error, notifications::VERIFICATION_FAILED, e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Re-verify the account to top up its credits while a job is shown
    pub async fn renew_credits(&mut self, code: &str) -> FlowResult<()> {
        self.require_stage(Stage::Processing, "renew credits")?;
        let span = self.span("renew_credits");

        match self.workflow.renew_credits(code).instrument(span).await {
            Ok(reply) => {
                let message = format!(
                    "{} of {} credits available.",
                    reply.value.credits_remaining, reply.value.credits_total
                );
                self.notify(NotificationLevel::Success, notifications::CREDITS_RENEWED, message);
                Ok(())
            }
            Err(e) => {
                if e.validation_errors().is_none() {
                    self.notify(NotificationLevel::Error, notifications::VERIFICATION_FAILED, e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Start the remote job and its progress tracker
    pub async fn start_job(&mut self) -> FlowResult<()> {
        self.require_stage(Stage::Processing, "start a job")?;
        if self.tracker.is_some() {
            return Err(FlowError::InvalidState {
                operation: "start a job",
                state: "a job is running".to_string(),
            });
        }
        let span = self.span("start_job");

        match self.workflow.start_job().instrument(span).await {
            Ok(_) => {
                let steps = self.workflow.job().map(|job| job.steps.clone()).unwrap_or_default();
                let (observer, events) = ChannelObserver::channel();
                self.tracker = Some(JobProgressTracker::spawn(steps, &self.config.tracker, Arc::new(observer)));
                self.events = Some(events);
                self.progress = None;
                Ok(())
            }
            Err(e) => {
                self.notify(NotificationLevel::Error, notifications::PROCESSING_ERROR, e.user_message());
                Err(e)
            }
        }
    }

    /// Apply one tracker event. Returns false when the event no longer applies.
    pub fn handle_tracker_event(&mut self, event: &TrackerEvent) -> bool {
        if self.stage() != Stage::Processing || self.tracker.is_none() {
            return false;
        }
        match event {
            TrackerEvent::Progress(snapshot) => {
                self.workflow.record_progress(snapshot);
                self.progress = Some(snapshot.clone());
            }
            TrackerEvent::StepFailed { step_id, message } => {
                warn!(session_id = %self.id, step_id = %step_id, "Job step failed");
                self.notify(NotificationLevel::Error, notifications::PROCESSING_ERROR, message.clone());
            }
            TrackerEvent::Completed(snapshot) => {
                self.workflow.record_progress(snapshot);
                self.progress = Some(snapshot.clone());
                if let Err(e) = self.workflow.mark_job_complete() {
                    warn!(session_id = %self.id, error = %e, "Completed job could not be recorded");
                }
                self.tracker = None;
                self.events = None;
                self.flow.apply(SessionEvent::JobCompleted);
                self.notify(
                    NotificationLevel::Success,
                    notifications::PROCESSING_COMPLETE,
                    "Your video is ready for download!",
                );
            }
        }
        true
    }

    /// Wait for the next tracker event and apply it
    pub async fn next_tracker_event(&mut self) -> Option<TrackerEvent> {
        let event = self.events.as_mut()?.recv().await?;
        self.handle_tracker_event(&event);
        Some(event)
    }

    /// Pump tracker events until the job completes or a step fails
    pub async fn run_to_completion(&mut self) -> RunOutcome {
        while let Some(event) = self.next_tracker_event().await {
            match event {
                TrackerEvent::Completed(_) => return RunOutcome::Completed,
                TrackerEvent::StepFailed { step_id, message } => {
                    return RunOutcome::StepFailed { step_id, message };
                }
                TrackerEvent::Progress(_) => {}
            }
        }
        RunOutcome::Stopped
    }

    fn running_tracker(&self, operation: &'static str) -> FlowResult<&TrackerHandle> {
        self.tracker.as_ref().ok_or_else(|| FlowError::InvalidState {
            operation,
            state: "no job is running".to_string(),
        })
    }

    /// Force a step of the running job into `Error`
    pub fn fail_step(&self, step_id: &str, message: &str) -> FlowResult<()> {
        self.running_tracker("fail a step")?.fail_step(step_id, message);
        Ok(())
    }

    /// Retry an errored step of the running job
    pub fn retry_step(&self, step_id: &str) -> FlowResult<()> {
        self.running_tracker("retry a step")?.retry_step(step_id);
        Ok(())
    }

    /// Stop tracking and mark the job as failed. The session stays on processing until reset.
    pub async fn abandon_job(&mut self) -> FlowResult<()> {
        self.require_stage(Stage::Processing, "abandon a job")?;
        let Some(tracker) = self.tracker.take() else {
            return Err(FlowError::InvalidState {
                operation: "abandon a job",
                state: "no job is running".to_string(),
            });
        };
        tracker.cancel().await;
        self.events = None;
        self.workflow.mark_job_error()?;
        self.notify(
            NotificationLevel::Error,
            notifications::PROCESSING_ERROR,
            "Processing was stopped. Start over to try again.",
        );
        Ok(())
    }

    /// Back to a fresh session on the input stage. Safe to call from any stage.
    pub async fn reset(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.cancel().await;
        }
        self.events = None;
        self.progress = None;
        self.notifications.clear();
        self.workflow.reset();
        self.flow.apply(SessionEvent::Reset);
        info!(session_id = %self.id, "Session reset");
    }

    /// Download links, available once the session reaches the download stage
    pub fn download_links(&self) -> Option<DownloadLinks> {
        if self.stage() != Stage::Download {
            return None;
        }
        let job = self.workflow.job()?;
        let intake = self.workflow.intake()?;
        Some(DownloadLinks::build(&self.config.remote, &job.project_id, &intake.video_url))
    }

    pub fn snapshot(&self) -> SessionView {
        let (overall_progress, time_remaining) = match (&self.progress, self.stage()) {
            (Some(progress), _) => (progress.overall_progress, progress.time_remaining),
            (None, Stage::Download) => (100, 0),
            (None, _) => (0, self.config.tracker.initial_time_remaining()),
        };
        SessionView {
            session_id: self.id.clone(),
            stage: self.stage(),
            provisioning: self.workflow.state(),
            intake: self.workflow.intake().cloned(),
            account: self.workflow.account().cloned(),
            job: self.workflow.job().cloned(),
            overall_progress,
            time_remaining,
            time_remaining_display: format_time_remaining(time_remaining),
            notifications: self.notifications.clone(),
            downloads: self.download_links(),
        }
    }
}
