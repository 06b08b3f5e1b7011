//! End-to-end session tests
//!
//! Sessions run against the offline demo service or a wiremock server with a
//! millisecond tracker tick, from intake through to download links.

use serde_json::json;
use std::sync::Arc;
use subdub::config::{RemoteConfig, SubdubConfig, TrackerConfig};
use subdub::errors::{Field, FlowError};
use subdub::remote::DemoRemoteService;
use subdub::session::notifications::{ACCOUNT_VERIFIED, PROCESSING_COMPLETE, VERIFICATION_FAILED, VERIFICATION_REQUIRED};
use subdub::session::{DownloadKind, IntakeForm, JobStatus, RunOutcome, Session, SignupForm, Stage, StepStatus};
use subdub::workflows::ProvisioningState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> SubdubConfig {
    SubdubConfig {
        tracker: TrackerConfig {
            tick_interval_ms: 1,
            seed: Some(2024),
            ..TrackerConfig::default()
        },
        ..SubdubConfig::default()
    }
}

fn offline_session() -> Session {
    Session::new(fast_config(), Arc::new(DemoRemoteService))
}

fn intake() -> IntakeForm {
    IntakeForm::new("viewer@example.com", "https://youtube.com/watch?v=dQw4w9WgXcQ").with_languages("ja", "fr")
}

fn signup() -> SignupForm {
    SignupForm::new("Kim Viewer", "kim@example.com", "correct-horse")
}

#[tokio::test]
async fn offline_session_reaches_download() {
    let mut session = offline_session();

    session.submit_intake(&intake()).unwrap();
    assert_eq!(session.stage(), Stage::Signup);

    session.create_account(signup()).await.unwrap();
    assert_eq!(session.workflow().email(), Some("kim@example.com"));
    assert_eq!(session.workflow().state(), ProvisioningState::AwaitingVerification);

    session.submit_verification_code("246810").await.unwrap();
    assert_eq!(session.stage(), Stage::Processing);
    let account = session.account().unwrap();
    assert!(account.verified);
    assert_eq!((account.credits_remaining, account.credits_total), (5, 10));

    assert_eq!(session.run_to_completion().await, RunOutcome::Completed);
    assert_eq!(session.stage(), Stage::Download);

    let job = session.job().unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert!(job.steps.iter().all(|s| s.status == StepStatus::Completed && s.progress == 100));

    let downloads = session.download_links().unwrap();
    assert!(downloads.project_url.ends_with(&job.project_id));
    let dubbed = downloads.get(DownloadKind::Dubbed).unwrap();
    assert!(dubbed.contains(&job.project_id));

    let titles: Vec<&str> = session.notifications().iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec![VERIFICATION_REQUIRED, ACCOUNT_VERIFIED, PROCESSING_COMPLETE]);
    assert_eq!(
        session.notifications()[0].message,
        "Verification code sent to your email (demo mode)"
    );
}

#[tokio::test]
async fn completion_is_delivered_once() {
    let mut session = offline_session();
    session.submit_intake(&intake()).unwrap();
    session.create_account(signup()).await.unwrap();
    session.submit_verification_code("135790").await.unwrap();

    let mut completions = 0;
    while let Some(event) = session.next_tracker_event().await {
        if matches!(event, subdub::TrackerEvent::Completed(_)) {
            completions += 1;
        }
    }

    assert_eq!(completions, 1);
    assert_eq!(session.stage(), Stage::Download);
    assert_eq!(session.snapshot().overall_progress, 100);
}

#[tokio::test]
async fn wrong_demo_code_keeps_signup_open() {
    let mut session = offline_session();
    session.submit_intake(&intake()).unwrap();
    session.create_account(signup()).await.unwrap();

    let err = session.submit_verification_code("12-34").await.unwrap_err();

    assert!(matches!(err, FlowError::InvalidCode(_)));
    assert_eq!(session.stage(), Stage::Signup);
    assert_eq!(session.notifications().last().unwrap().title, VERIFICATION_FAILED);

    session.submit_verification_code("123456").await.unwrap();
    assert_eq!(session.stage(), Stage::Processing);
}

#[tokio::test]
async fn bad_email_is_reported_against_the_email_field() {
    let mut session = offline_session();
    let err = session
        .submit_intake(&IntakeForm::new("viewer@", "https://youtube.com/watch?v=x"))
        .unwrap_err();

    assert_eq!(err.validation_errors().unwrap().fields(), vec![Field::Email]);
    assert_eq!(session.stage(), Stage::Input);
}

#[tokio::test]
async fn reset_mid_processing_is_idempotent() {
    let mut session = offline_session();
    session.submit_intake(&intake()).unwrap();
    session.create_account(signup()).await.unwrap();
    session.submit_verification_code("123456").await.unwrap();
    assert!(session.is_tracking());

    session.reset().await;
    let first = session.snapshot();
    session.reset().await;
    let second = session.snapshot();

    assert_eq!(first.stage, Stage::Input);
    assert_eq!(second.stage, Stage::Input);
    assert_eq!(first.provisioning, second.provisioning);
    assert!(second.account.is_none() && second.job.is_none());
    assert!(session.workflow().credential().is_none());
    assert!(session.next_tracker_event().await.is_none());

    session.submit_intake(&intake()).unwrap();
    assert_eq!(session.stage(), Stage::Signup);
}

#[tokio::test]
async fn remote_session_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "userId": "user-77" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountType": "enterprise",
            "credits": 90,
            "maxCredits": 100,
            "memberSince": "February 2022"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/videos/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "projectId": "proj-live" })))
        .mount(&server)
        .await;

    let config = SubdubConfig {
        remote: RemoteConfig {
            base_url: server.uri(),
            allow_demo_fallback: false,
            ..RemoteConfig::default()
        },
        ..fast_config()
    };
    let mut session = Session::connect(config).unwrap();

    session.submit_intake(&intake()).unwrap();
    session.create_account(signup()).await.unwrap();
    session.submit_verification_code("000111").await.unwrap();

    assert_eq!(session.account().unwrap().user_id, "user-77");
    assert_eq!(session.job().unwrap().project_id, "proj-live");
    assert_eq!(
        session.notifications()[0].message,
        "Please check your email for a verification code."
    );
    assert_eq!(session.run_to_completion().await, RunOutcome::Completed);
    assert!(session.download_links().unwrap().project_url.ends_with("/proj-live"));
}
