//! Typed access to the remote video service: account signup, code
//! verification and job start.
//!
//! Each operation resolves to a [`RemoteReply`] or a [`FlowError`]; raw
//! transport failures never escape. When the service cannot be reached and
//! `allow_demo_fallback` is set, deterministic demo data stands in so the
//! session can continue offline.

pub mod client;
pub mod fallback;
pub mod types;

use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::errors::FlowResult;

pub use client::RemoteServiceClient;
pub use fallback::DemoRemoteService;
pub use types::{AccountCreated, JobRequest, JobStarted, RemoteReply, ReplySource, Verified};

/// The three remote operations a session depends on
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Create an account; a verification code is sent out of band
    async fn create_account(&self, full_name: &str, email: &str, password: &str) -> FlowResult<RemoteReply<AccountCreated>>;

    /// Confirm the out-of-band code for `email`
    async fn verify_code(&self, email: &str, code: &str) -> FlowResult<RemoteReply<Verified>>;

    /// Start subtitle and dubbing processing for a verified account
    async fn start_job(&self, user_id: &str, request: &JobRequest) -> FlowResult<RemoteReply<JobStarted>>;
}
