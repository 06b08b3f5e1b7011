//! Demo data served in place of the remote service when it cannot be reached.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::errors::{FlowError, FlowResult};
use crate::session::types::AccountTier;
use crate::session::validation::is_six_digit_code;

use super::types::{AccountCreated, JobRequest, JobStarted, RemoteReply, Verified};
use super::RemoteService;

pub const DEMO_CREDITS_REMAINING: u32 = 5;
pub const DEMO_CREDITS_TOTAL: u32 = 10;

pub const DEMO_SIGNUP_NOTICE: &str = "Verification code sent to your email (demo mode)";
pub const DEMO_VERIFY_NOTICE: &str = "Account verified successfully (demo mode)";
pub const DEMO_JOB_NOTICE: &str = "Video processing started (demo mode)";
pub const INVALID_CODE_MESSAGE: &str = "Invalid verification code";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Stable per email address, so repeated offline signups agree on the id
pub fn demo_user_id(email: &str) -> String {
    let normalized = email.trim().to_ascii_lowercase();
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{normalized}").as_bytes());
    format!("demo-user-{id}")
}

pub fn account_created(email: &str) -> AccountCreated {
    AccountCreated {
        user_id: demo_user_id(email),
        email: email.to_string(),
        verification_sent: true,
    }
}

/// Demo verification only accepts six-digit codes
pub fn verified(code: &str) -> Option<Verified> {
    if !is_six_digit_code(code) {
        return None;
    }
    Some(Verified {
        tier: AccountTier::Free,
        credits_remaining: DEMO_CREDITS_REMAINING,
        credits_total: DEMO_CREDITS_TOTAL,
        member_since: member_since_now(),
    })
}

pub fn job_started<R: Rng + ?Sized>(rng: &mut R) -> JobStarted {
    let suffix: String = (0..8)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    JobStarted {
        project_id: format!("demo-project-{suffix}"),
        status: "processing".to_string(),
    }
}

/// "October 2026" style month and year
pub fn member_since_now() -> String {
    Utc::now().format("%B %Y").to_string()
}

/// Serves demo data without touching the network, for `--offline` runs
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoRemoteService;

#[async_trait]
impl RemoteService for DemoRemoteService {
    async fn create_account(&self, _full_name: &str, email: &str, _password: &str) -> FlowResult<RemoteReply<AccountCreated>> {
        info!("Offline signup, issuing demo account");
        Ok(RemoteReply::demo(account_created(email), DEMO_SIGNUP_NOTICE))
    }

    async fn verify_code(&self, _email: &str, code: &str) -> FlowResult<RemoteReply<Verified>> {
        verified(code)
            .map(|verified| RemoteReply::demo(verified, DEMO_VERIFY_NOTICE))
            .ok_or_else(|| FlowError::InvalidCode(INVALID_CODE_MESSAGE.to_string()))
    }

    async fn start_job(&self, _user_id: &str, _request: &JobRequest) -> FlowResult<RemoteReply<JobStarted>> {
        let started = job_started(&mut rand::rng());
        Ok(RemoteReply::demo(started, DEMO_JOB_NOTICE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn demo_user_id_is_stable_per_email() {
        assert_eq!(demo_user_id("Ada@Example.com"), demo_user_id("ada@example.com "));
        assert_ne!(demo_user_id("ada@example.com"), demo_user_id("grace@example.com"));
        assert!(demo_user_id("ada@example.com").starts_with("demo-user-"));
    }

    #[test]
    fn demo_verification_contract() {
        let accepted = verified("123456").unwrap();
        assert_eq!(accepted.tier, AccountTier::Free);
        assert_eq!(accepted.credits_remaining, 5);
        assert_eq!(accepted.credits_total, 10);
        assert!(verified("abc123").is_none());
    }

    #[test]
    fn demo_project_ids_are_base36() {
        let mut rng = StdRng::seed_from_u64(7);
        let job = job_started(&mut rng);
        let suffix = job.project_id.strip_prefix("demo-project-").unwrap();

        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(job.status, "processing");
    }

    #[tokio::test]
    async fn demo_service_never_needs_the_network() {
        let service = DemoRemoteService;
        let created = service.create_account("Ada", "ada@example.com", "analytical").await.unwrap();
        assert!(created.is_demo());
        assert_eq!(created.value.user_id, demo_user_id("ada@example.com"));

        let err = service.verify_code("ada@example.com", "12345").await.unwrap_err();
        assert_eq!(err, FlowError::InvalidCode(INVALID_CODE_MESSAGE.into()));
        assert!(service.verify_code("ada@example.com", "654321").await.is_ok());
    }
}
