use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::RemoteConfig;
use crate::errors::{Field, FlowError, FlowResult, RemoteError, ValidationErrors};
use crate::http::{HttpReply, RateLimitedHttpClient};
use crate::observability::remote_metrics;
use crate::session::types::AccountTier;

use super::fallback;
use super::types::{
    AccountCreated, ErrorBody, JobRequest, JobStarted, ProcessRequest, ProcessResponse, RemoteReply, SignupRequest,
    SignupResponse, Verified, VerifyRequest, VerifyResponse,
};
use super::RemoteService;

const SIGNUP_PATH: &str = "auth/signup";
const VERIFY_PATH: &str = "auth/verify";
const PROCESS_PATH: &str = "videos/process";

/// HTTP implementation of [`RemoteService`] with the configurable demo fallback
#[derive(Debug, Clone)]
pub struct RemoteServiceClient {
    http: RateLimitedHttpClient,
    allow_demo_fallback: bool,
}

impl RemoteServiceClient {
    pub fn new(remote: &RemoteConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: RateLimitedHttpClient::new(remote)?,
            allow_demo_fallback: remote.allow_demo_fallback,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Fallback only covers failures where the service never gave a usable answer
    fn may_fall_back(&self, error: &RemoteError) -> bool {
        self.allow_demo_fallback && error.is_transport_failure()
    }
}

/// Turn a raw exchange into a typed body or a classified failure.
///
/// Transport errors, 5xx, and bodies that fail to parse are `Unavailable`.
/// A 4xx with a JSON object body is a `Rejected` answer from the service.
fn interpret<T: DeserializeOwned>(
    exchange: Result<HttpReply, reqwest::Error>,
    default_message: &str,
) -> Result<T, RemoteError> {
    let reply = exchange.map_err(|e| RemoteError::Unavailable(e.to_string()))?;

    if reply.is_success() {
        return serde_json::from_str(&reply.body)
            .map_err(|e| RemoteError::Unavailable(format!("malformed response body: {e}")));
    }

    if reply.status.is_client_error() {
        if let Ok(body) = serde_json::from_str::<ErrorBody>(&reply.body) {
            let message = body
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| default_message.to_string());
            return Err(RemoteError::Rejected {
                status: reply.status.as_u16(),
                message,
            });
        }
    }

    Err(RemoteError::Unavailable(describe_status(reply.status)))
}

/// Statuses on the verify endpoint that mean the code itself was refused
fn is_code_rejection(status: u16) -> bool {
    matches!(status, 400 | 422)
}

fn describe_status(status: StatusCode) -> String {
    format!("unexpected {status} response")
}

fn record_failure(error: &RemoteError) {
    match error {
        RemoteError::Unavailable(_) => remote_metrics().record_transport_failure(),
        RemoteError::Rejected { .. } => remote_metrics().record_rejection(),
    }
}

fn require_filled(errors: &mut ValidationErrors, field: Field, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(field, message);
    }
}

#[async_trait]
impl RemoteService for RemoteServiceClient {
    async fn create_account(&self, full_name: &str, email: &str, password: &str) -> FlowResult<RemoteReply<AccountCreated>> {
        let mut errors = ValidationErrors::new();
        require_filled(&mut errors, Field::FullName, full_name, "Full name is required");
        require_filled(&mut errors, Field::Email, email, "Email is required");
        require_filled(&mut errors, Field::Password, password, "Password is required");
        errors.into_result()?;

        remote_metrics().record_request();
        let request = SignupRequest { full_name, email, password };
        let exchange = self.http.post_json(SIGNUP_PATH, &request, None).await;

        match interpret::<SignupResponse>(exchange, "Failed to create account") {
            Ok(response) => {
                info!(user_id = %response.user_id, "Remote account created");
                Ok(RemoteReply::remote(AccountCreated {
                    user_id: response.user_id,
                    email: response.email.unwrap_or_else(|| email.to_string()),
                    verification_sent: response.verification_sent.unwrap_or(true),
                }))
            }
            Err(error) => {
                record_failure(&error);
                if self.may_fall_back(&error) {
                    warn!(error = %error, "Account creation failed, continuing in demo mode");
                    remote_metrics().record_demo_fallback();
                    return Ok(RemoteReply::demo(
                        fallback::account_created(email),
                        fallback::DEMO_SIGNUP_NOTICE,
                    ));
                }
                warn!(error = %error, "Account creation failed");
                Err(FlowError::Remote(error))
            }
        }
    }

    async fn verify_code(&self, email: &str, code: &str) -> FlowResult<RemoteReply<Verified>> {
        let mut errors = ValidationErrors::new();
        require_filled(&mut errors, Field::Email, email, "Email is required");
        require_filled(&mut errors, Field::Code, code, "Please enter the verification code");
        errors.into_result()?;

        remote_metrics().record_request();
        let request = VerifyRequest { email, code };
        let exchange = self.http.post_json(VERIFY_PATH, &request, None).await;

        match interpret::<VerifyResponse>(exchange, "Failed to verify account") {
            Ok(response) => {
                let tier = AccountTier::parse(&response.account_type);
                info!(tier = %tier, credits = response.credits, "Remote account verified");
                Ok(RemoteReply::remote(Verified {
                    tier,
                    credits_remaining: response.credits,
                    credits_total: response.max_credits,
                    member_since: response.member_since,
                }))
            }
            Err(RemoteError::Rejected { status, message }) if is_code_rejection(status) => {
                remote_metrics().record_rejection();
                warn!(status, message = %message, "Verification code rejected");
                Err(FlowError::InvalidCode(message))
            }
            Err(error @ RemoteError::Rejected { .. }) => {
                remote_metrics().record_rejection();
                warn!(error = %error, "Verification request refused");
                Err(FlowError::Remote(error))
            }
            Err(error) => {
                record_failure(&error);
                if !self.may_fall_back(&error) {
                    warn!(error = %error, "Verification failed");
                    return Err(FlowError::Remote(error));
                }
                match fallback::verified(code) {
                    Some(verified) => {
                        warn!(error = %error, "Verification unreachable, accepted code in demo mode");
                        remote_metrics().record_demo_fallback();
                        Ok(RemoteReply::demo(verified, fallback::DEMO_VERIFY_NOTICE))
                    }
                    None => {
                        warn!(error = %error, "Verification unreachable and code is not six digits");
                        Err(FlowError::InvalidCode(fallback::INVALID_CODE_MESSAGE.to_string()))
                    }
                }
            }
        }
    }

    async fn start_job(&self, user_id: &str, request: &JobRequest) -> FlowResult<RemoteReply<JobStarted>> {
        let mut errors = ValidationErrors::new();
        require_filled(&mut errors, Field::VideoUrl, &request.video_url, "Video URL is required");
        require_filled(&mut errors, Field::UserId, user_id, "Account identifier is required");
        errors.into_result()?;

        remote_metrics().record_request();
        let body = ProcessRequest {
            video_url: &request.video_url,
            subtitle_language: &request.subtitle_language,
            dubbing_language: &request.dubbing_language,
        };
        let exchange = self.http.post_json(PROCESS_PATH, &body, Some(user_id)).await;

        match interpret::<ProcessResponse>(exchange, "Failed to process video") {
            Ok(response) => {
                info!(project_id = %response.project_id, "Remote processing job started");
                Ok(RemoteReply::remote(JobStarted {
                    project_id: response.project_id,
                    status: response.status.unwrap_or_else(|| "processing".to_string()),
                }))
            }
            Err(error) => {
                record_failure(&error);
                if self.may_fall_back(&error) {
                    warn!(error = %error, "Job start failed, continuing in demo mode");
                    remote_metrics().record_demo_fallback();
                    let started = fallback::job_started(&mut rand::rng());
                    return Ok(RemoteReply::demo(started, fallback::DEMO_JOB_NOTICE));
                }
                warn!(error = %error, "Job start failed");
                Err(FlowError::Remote(error))
            }
        }
    }
}
