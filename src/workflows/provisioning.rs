use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{FlowError, FlowResult};
use crate::remote::{AccountCreated, JobRequest, JobStarted, RemoteReply, RemoteService, Verified};
use crate::session::types::{AccountHandle, Credential, Intake, IntakeForm, Job, JobStatus, SignupForm};
use crate::session::validation::{validate_code, validate_intake, validate_signup};
use crate::tracker::ProgressSnapshot;

/// Where an account and job stand in the provisioning sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    Idle,
    AccountPending,
    AwaitingVerification,
    Verified,
    JobPending,
    JobRunning,
    JobFinished,
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisioningState::Idle => "idle",
            ProvisioningState::AccountPending => "account pending",
            ProvisioningState::AwaitingVerification => "awaiting verification",
            ProvisioningState::Verified => "verified",
            ProvisioningState::JobPending => "job start is in flight",
            ProvisioningState::JobRunning => "a job is running",
            ProvisioningState::JobFinished => "the job has finished",
        };
        f.write_str(name)
    }
}

/// Account and job provisioning against a [`RemoteService`].
///
/// Every operation either fully applies or leaves the workflow as it was.
/// The credential is written once per session and only [`reset`](Self::reset)
/// clears it.
pub struct ProvisioningWorkflow {
    remote: Arc<dyn RemoteService>,
    max_verification_attempts: u32,
    state: ProvisioningState,
    intake: Option<Intake>,
    credential: Option<Credential>,
    account: Option<AccountHandle>,
    job: Option<Job>,
    failed_verifications: u32,
}

impl fmt::Debug for ProvisioningWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningWorkflow")
            .field("state", &self.state)
            .field("intake", &self.intake)
            .field("credential", &self.credential)
            .field("account", &self.account)
            .field("job", &self.job)
            .field("failed_verifications", &self.failed_verifications)
            .finish()
    }
}

impl ProvisioningWorkflow {
    /// `max_verification_attempts` of 0 disables the lockout
    pub fn new(remote: Arc<dyn RemoteService>, max_verification_attempts: u32) -> Self {
        Self {
            remote,
            max_verification_attempts,
            state: ProvisioningState::Idle,
            intake: None,
            credential: None,
            account: None,
            job: None,
            failed_verifications: 0,
        }
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    pub fn intake(&self) -> Option<&Intake> {
        self.intake.as_ref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn account(&self) -> Option<&AccountHandle> {
        self.account.as_ref()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn failed_verifications(&self) -> u32 {
        self.failed_verifications
    }

    /// The session email: the intake email until signup replaces it
    pub fn email(&self) -> Option<&str> {
        self.intake.as_ref().map(|i| i.email.as_str())
    }

    fn invalid_state(&self, operation: &'static str) -> FlowError {
        FlowError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }

    /// Validate and store the intake. Allowed only before signup begins.
    pub fn submit_intake(&mut self, form: &IntakeForm) -> FlowResult<&Intake> {
        if self.state != ProvisioningState::Idle {
            return Err(self.invalid_state("submit intake"));
        }
        let intake = validate_intake(form)?;
        debug!(
            subtitle_language = %intake.subtitle_language,
            dubbing_language = %intake.dubbing_language,
            "Intake accepted"
        );
        Ok(self.intake.insert(intake))
    }

    pub async fn create_account(&mut self, form: SignupForm) -> FlowResult<RemoteReply<AccountCreated>> {
        if !matches!(self.state, ProvisioningState::Idle | ProvisioningState::AccountPending) || self.intake.is_none() {
            return Err(self.invalid_state("create an account"));
        }
        validate_signup(&form)?;

        let credential = Credential::from_form(form);
        self.state = ProvisioningState::AccountPending;

        let result = self
            .remote
            .create_account(credential.full_name(), credential.email(), credential.password())
            .await;

        match result {
            Ok(reply) => {
                if let Some(intake) = self.intake.as_mut() {
                    intake.email = credential.email().to_string();
                }
                self.account = Some(AccountHandle::unverified(reply.value.user_id.clone()));
                self.credential = Some(credential);
                self.state = ProvisioningState::AwaitingVerification;
                info!(
                    user_id = %reply.value.user_id,
                    demo = reply.is_demo(),
                    "Account created, awaiting verification"
                );
                Ok(reply)
            }
            Err(e) => {
                warn!(error = %e, "Account creation failed");
                Err(e)
            }
        }
    }

    pub async fn submit_verification_code(&mut self, code: &str) -> FlowResult<RemoteReply<Verified>> {
        if self.state != ProvisioningState::AwaitingVerification {
            return Err(self.invalid_state("verify a code"));
        }
        let reply = self.verify_with_remote(code, "verify a code").await?;
        self.state = ProvisioningState::Verified;
        info!(tier = %reply.value.tier, demo = reply.is_demo(), "Account verified");
        Ok(reply)
    }

    /// Re-verify an already verified account to refresh its credit balance.
    ///
    /// The provisioning state is left where it is, so a running job keeps running.
    pub async fn renew_credits(&mut self, code: &str) -> FlowResult<RemoteReply<Verified>> {
        let verified = self.account.as_ref().is_some_and(|account| account.verified);
        if !verified {
            return Err(self.invalid_state("renew credits"));
        }
        let reply = self.verify_with_remote(code, "renew credits").await?;
        info!(
            credits = reply.value.credits_remaining,
            demo = reply.is_demo(),
            "Credits renewed"
        );
        Ok(reply)
    }

    /// Shared code check: lockout, local validation, remote call, account update
    async fn verify_with_remote(&mut self, code: &str, operation: &'static str) -> FlowResult<RemoteReply<Verified>> {
        if self.max_verification_attempts > 0 && self.failed_verifications >= self.max_verification_attempts {
            return Err(FlowError::AttemptsExhausted {
                max_attempts: self.max_verification_attempts,
            });
        }
        let code = validate_code(code)?;
        let email = self
            .email()
            .map(str::to_string)
            .ok_or_else(|| self.invalid_state(operation))?;

        match self.remote.verify_code(&email, &code).await {
            Ok(reply) => {
                let verified = &reply.value;
                if let Some(account) = self.account.as_mut() {
                    account.mark_verified(
                        verified.tier,
                        verified.credits_remaining,
                        verified.credits_total,
                        verified.member_since.clone(),
                    );
                }
                self.failed_verifications = 0;
                Ok(reply)
            }
            Err(e) => {
                if matches!(e, FlowError::InvalidCode(_)) {
                    self.failed_verifications += 1;
                }
                warn!(
                    error = %e,
                    failed_attempts = self.failed_verifications,
                    "Verification failed"
                );
                Err(e)
            }
        }
    }

    /// Start processing for the verified account
    pub async fn start_job(&mut self) -> FlowResult<RemoteReply<JobStarted>> {
        // JobPending here means an earlier start was dropped before it resolved.
        if !matches!(self.state, ProvisioningState::Verified | ProvisioningState::JobPending) {
            return Err(self.invalid_state("start a job"));
        }
        let (Some(account), Some(intake)) = (self.account.as_ref(), self.intake.as_ref()) else {
            return Err(self.invalid_state("start a job"));
        };
        if !account.verified {
            return Err(self.invalid_state("start a job"));
        }

        let user_id = account.user_id.clone();
        let request = JobRequest {
            video_url: intake.video_url.clone(),
            subtitle_language: intake.subtitle_language.clone(),
            dubbing_language: intake.dubbing_language.clone(),
        };
        self.state = ProvisioningState::JobPending;

        match self.remote.start_job(&user_id, &request).await {
            Ok(reply) => {
                self.job = Some(Job::started(reply.value.project_id.clone()));
                self.state = ProvisioningState::JobRunning;
                info!(project_id = %reply.value.project_id, demo = reply.is_demo(), "Job started");
                Ok(reply)
            }
            Err(e) => {
                self.state = ProvisioningState::Verified;
                warn!(error = %e, "Job start failed");
                Err(e)
            }
        }
    }

    /// Mirror the tracker's step view onto the job
    pub fn record_progress(&mut self, snapshot: &ProgressSnapshot) {
        if self.state != ProvisioningState::JobRunning {
            return;
        }
        if let Some(job) = self.job.as_mut() {
            job.steps = snapshot.steps.clone();
        }
    }

    pub fn mark_job_complete(&mut self) -> FlowResult<()> {
        self.finish_job(JobStatus::Complete, "complete a job")
    }

    /// Give up on a job whose step failed and will not be retried
    pub fn mark_job_error(&mut self) -> FlowResult<()> {
        self.finish_job(JobStatus::Error, "abandon a job")
    }

    fn finish_job(&mut self, status: JobStatus, operation: &'static str) -> FlowResult<()> {
        if self.state != ProvisioningState::JobRunning {
            return Err(self.invalid_state(operation));
        }
        let Some(job) = self.job.as_mut() else {
            return Err(self.invalid_state(operation));
        };
        job.status = status;
        self.state = ProvisioningState::JobFinished;
        info!(project_id = %job.project_id, status = ?status, "Job finished");
        Ok(())
    }

    /// Back to a fresh workflow; the credential is discarded
    pub fn reset(&mut self) {
        self.state = ProvisioningState::Idle;
        self.intake = None;
        self.credential = None;
        self.account = None;
        self.job = None;
        self.failed_verifications = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Field, RemoteError};
    use crate::remote::MockRemoteService;
    use crate::session::types::{AccountTier, StepStatus};

    fn intake_form() -> IntakeForm {
        IntakeForm::new("ada@example.com", "https://youtube.com/watch?v=abc")
    }

    fn signup_form() -> SignupForm {
        SignupForm::new("Ada Lovelace", "ada.l@example.com", "analytical")
    }

    fn created() -> RemoteReply<AccountCreated> {
        RemoteReply::remote(AccountCreated {
            user_id: "user-42".into(),
            email: "ada.l@example.com".into(),
            verification_sent: true,
        })
    }

    fn verified() -> RemoteReply<Verified> {
        RemoteReply::remote(Verified {
            tier: AccountTier::Pro,
            credits_remaining: 8,
            credits_total: 20,
            member_since: "March 2024".into(),
        })
    }

    fn mock_through_signup() -> MockRemoteService {
        let mut remote = MockRemoteService::new();
        remote
            .expect_create_account()
            .withf(|name, email, password| name == "Ada Lovelace" && email == "ada.l@example.com" && password == "analytical")
            .times(1)
            .returning(|_, _, _| Ok(created()));
        remote
    }

    async fn awaiting_verification(remote: MockRemoteService, max_attempts: u32) -> ProvisioningWorkflow {
        let mut workflow = ProvisioningWorkflow::new(Arc::new(remote), max_attempts);
        workflow.submit_intake(&intake_form()).unwrap();
        workflow.create_account(signup_form()).await.unwrap();
        workflow
    }

    #[tokio::test]
    async fn renew_credits_requires_a_verified_account() {
        let mut workflow = awaiting_verification(mock_through_signup(), 5).await;

        let err = workflow.renew_credits("123456").await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidState { operation: "renew credits", .. }));
    }

    #[tokio::test]
    async fn renew_credits_refreshes_balance_without_moving_state() {
        let mut remote = mock_through_signup();
        let mut calls = 0;
        remote.expect_verify_code().times(2).returning(move |_, _| {
            calls += 1;
            let mut reply = verified();
            if calls == 2 {
                reply.value.credits_remaining = 20;
            }
            Ok(reply)
        });
        let mut workflow = awaiting_verification(remote, 5).await;
        workflow.submit_verification_code("123456").await.unwrap();
        assert_eq!(workflow.account().unwrap().credits_remaining, 8);

        workflow.renew_credits("654321").await.unwrap();

        assert_eq!(workflow.state(), ProvisioningState::Verified);
        assert_eq!(workflow.account().unwrap().credits_remaining, 20);
        assert_eq!(workflow.account().unwrap().credit_percentage(), 100);
    }

    #[test]
    fn invalid_intake_leaves_workflow_untouched() {
        let mut workflow = ProvisioningWorkflow::new(Arc::new(MockRemoteService::new()), 5);
        let err = workflow
            .submit_intake(&IntakeForm::new("not-an-email", "https://youtube.com/watch?v=abc"))
            .unwrap_err();

        assert_eq!(err.validation_errors().unwrap().fields(), vec![Field::Email]);
        assert!(workflow.intake().is_none());
        assert_eq!(workflow.state(), ProvisioningState::Idle);
    }

    #[tokio::test]
    async fn signup_requires_intake() {
        let mut workflow = ProvisioningWorkflow::new(Arc::new(MockRemoteService::new()), 5);
        let err = workflow.create_account(signup_form()).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn short_password_never_reaches_the_service() {
        let mut workflow = ProvisioningWorkflow::new(Arc::new(MockRemoteService::new()), 5);
        workflow.submit_intake(&intake_form()).unwrap();

        let err = workflow
            .create_account(SignupForm::new("Ada Lovelace", "ada@example.com", "short"))
            .await
            .unwrap_err();

        assert_eq!(err.validation_errors().unwrap().fields(), vec![Field::Password]);
        assert_eq!(workflow.state(), ProvisioningState::Idle);
        assert!(workflow.credential().is_none());
    }

    #[tokio::test]
    async fn signup_stores_credential_and_replaces_email() {
        let workflow = awaiting_verification(mock_through_signup(), 5).await;

        assert_eq!(workflow.state(), ProvisioningState::AwaitingVerification);
        assert_eq!(workflow.email(), Some("ada.l@example.com"));
        assert_eq!(workflow.credential().unwrap().full_name(), "Ada Lovelace");
        let account = workflow.account().unwrap();
        assert_eq!(account.user_id, "user-42");
        assert!(!account.verified);
    }

    #[tokio::test]
    async fn rejected_signup_can_be_retried() {
        let mut remote = MockRemoteService::new();
        let mut calls = 0;
        remote.expect_create_account().times(2).returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(RemoteError::Rejected {
                    status: 409,
                    message: "Email already registered".into(),
                }
                .into())
            } else {
                Ok(created())
            }
        });
        let mut workflow = ProvisioningWorkflow::new(Arc::new(remote), 5);
        workflow.submit_intake(&intake_form()).unwrap();

        let err = workflow.create_account(signup_form()).await.unwrap_err();
        assert_eq!(err.user_message(), "Email already registered");
        assert!(workflow.credential().is_none());
        assert_eq!(workflow.state(), ProvisioningState::AccountPending);

        workflow.create_account(signup_form()).await.unwrap();
        assert_eq!(workflow.state(), ProvisioningState::AwaitingVerification);
    }

    #[tokio::test]
    async fn verification_uses_signup_email_and_verifies_account() {
        let mut remote = mock_through_signup();
        remote
            .expect_verify_code()
            .withf(|email, code| email == "ada.l@example.com" && code == "123456")
            .times(1)
            .returning(|_, _| Ok(verified()));
        let mut workflow = awaiting_verification(remote, 5).await;

        workflow.submit_verification_code(" 123456 ").await.unwrap();

        let account = workflow.account().unwrap();
        assert!(account.verified);
        assert_eq!(account.tier, AccountTier::Pro);
        assert_eq!(account.credits_remaining, 8);
        assert_eq!(workflow.state(), ProvisioningState::Verified);
    }

    #[tokio::test]
    async fn blank_code_is_rejected_locally() {
        let mut workflow = awaiting_verification(mock_through_signup(), 5).await;

        let err = workflow.submit_verification_code("   ").await.unwrap_err();
        assert_eq!(err.validation_errors().unwrap().fields(), vec![Field::Code]);
        assert_eq!(workflow.failed_verifications(), 0);
    }

    #[tokio::test]
    async fn lockout_after_repeated_wrong_codes() {
        let mut remote = mock_through_signup();
        remote
            .expect_verify_code()
            .times(2)
            .returning(|_, _| Err(FlowError::InvalidCode("Invalid verification code".into())));
        let mut workflow = awaiting_verification(remote, 2).await;

        for _ in 0..2 {
            let err = workflow.submit_verification_code("000000").await.unwrap_err();
            assert_eq!(err.user_message(), "Invalid verification code");
        }
        let err = workflow.submit_verification_code("000000").await.unwrap_err();

        assert_eq!(err, FlowError::AttemptsExhausted { max_attempts: 2 });
        assert_eq!(workflow.state(), ProvisioningState::AwaitingVerification);
        assert!(!workflow.account().unwrap().verified);
    }

    #[tokio::test]
    async fn start_job_sends_intake_and_tracks_job() {
        let mut remote = mock_through_signup();
        remote.expect_verify_code().returning(|_, _| Ok(verified()));
        remote
            .expect_start_job()
            .withf(|user_id, request| {
                user_id == "user-42"
                    && request.video_url == "https://youtube.com/watch?v=abc"
                    && request.subtitle_language == "en"
                    && request.dubbing_language == "es"
            })
            .times(1)
            .returning(|_, _| {
                Ok(RemoteReply::remote(JobStarted {
                    project_id: "proj-7".into(),
                    status: "processing".into(),
                }))
            });
        let mut workflow = awaiting_verification(remote, 5).await;
        workflow.submit_verification_code("123456").await.unwrap();

        workflow.start_job().await.unwrap();

        let job = workflow.job().unwrap();
        assert_eq!(job.project_id, "proj-7");
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(workflow.state(), ProvisioningState::JobRunning);

        workflow.mark_job_complete().unwrap();
        assert_eq!(workflow.job().unwrap().status, JobStatus::Complete);
        assert!(workflow.mark_job_complete().is_err());
    }

    #[tokio::test]
    async fn job_cannot_start_before_verification() {
        let mut workflow = awaiting_verification(mock_through_signup(), 5).await;
        let err = workflow.start_job().await.unwrap_err();

        assert!(matches!(err, FlowError::InvalidState { operation: "start a job", .. }));
        assert!(workflow.job().is_none());
    }

    #[tokio::test]
    async fn reset_discards_everything() {
        let mut workflow = awaiting_verification(mock_through_signup(), 5).await;
        workflow.reset();

        assert_eq!(workflow.state(), ProvisioningState::Idle);
        assert!(workflow.intake().is_none());
        assert!(workflow.credential().is_none());
        assert!(workflow.account().is_none());
    }
}
