use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Command;
use crate::config::SubdubConfig;
use crate::errors::FlowError;
use crate::remote::DemoRemoteService;
use crate::session::languages::language_name;
use crate::session::{DownloadKind, IntakeForm, NotificationLevel, Session, SignupForm, Stage, StepStatus};
use crate::shutdown::ShutdownCoordinator;
use crate::tracker::{ProgressSnapshot, TrackerEvent};

pub struct RunCommand {
    config: SubdubConfig,
    intake: IntakeForm,
    full_name: String,
    password: String,
    signup_email: Option<String>,
    code: Option<String>,
    offline: bool,
}

impl RunCommand {
    pub fn new(config: SubdubConfig, intake: IntakeForm) -> Self {
        Self {
            config,
            intake,
            full_name: String::new(),
            password: String::new(),
            signup_email: None,
            code: None,
            offline: false,
        }
    }

    pub fn with_signup(mut self, full_name: String, password: String, signup_email: Option<String>) -> Self {
        self.full_name = full_name;
        self.password = password;
        self.signup_email = signup_email;
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_tick_ms(mut self, tick_ms: Option<u64>) -> Self {
        if let Some(tick_ms) = tick_ms {
            self.config.tracker.tick_interval_ms = tick_ms;
        }
        self
    }

    fn build_session(&self) -> Result<Session> {
        if self.offline {
            return Ok(Session::new(self.config.clone(), Arc::new(DemoRemoteService)));
        }
        Ok(Session::connect(self.config.clone())?)
    }

    async fn drive(&self, session: &mut Session) -> Result<()> {
        let mut seen = 0;

        println!("🎬 Subdub session {}", session.id());
        println!(
            "   {} → subtitles: {}, dubbing: {}",
            self.intake.video_url,
            language_name(&self.intake.subtitle_language),
            language_name(&self.intake.dubbing_language)
        );
        println!();

        if let Err(e) = session.submit_intake(&self.intake) {
            print_flow_error(&e);
            bail!("Intake rejected");
        }
        println!("✅ Intake accepted");

        let signup_email = self.signup_email.clone().unwrap_or_else(|| self.intake.email.clone());
        let signup = SignupForm::new(self.full_name.clone(), signup_email, self.password.clone());
        let created = session.create_account(signup).await;
        flush_notifications(session, &mut seen);
        if let Err(e) = created {
            print_flow_error(&e);
            bail!("Account creation failed");
        }

        self.verify(session, &mut seen).await?;

        if !session.is_tracking() {
            bail!("Processing did not start");
        }
        if let Some(account) = session.account() {
            println!(
                "👤 {} plan, {}/{} credits ({}%), member since {}",
                account.tier,
                account.credits_remaining,
                account.credits_total,
                account.credit_percentage(),
                account.member_since
            );
            if account.needs_renewal() {
                println!("   Credits are running low. Verify again to renew them.");
            }
        }
        if let Some(job) = session.job() {
            println!("📦 Project {}", job.project_id);
        }
        println!();

        while let Some(event) = session.next_tracker_event().await {
            match event {
                TrackerEvent::Progress(snapshot) => print_progress(&snapshot),
                TrackerEvent::StepFailed { step_id, message } => {
                    flush_notifications(session, &mut seen);
                    session.abandon_job().await?;
                    bail!("Step '{step_id}' failed: {message}");
                }
                TrackerEvent::Completed(_) => break,
            }
        }
        flush_notifications(session, &mut seen);

        if session.stage() != Stage::Download {
            bail!("Processing stopped before completion");
        }
        print_downloads(session);
        Ok(())
    }

    async fn verify(&self, session: &mut Session, seen: &mut usize) -> Result<()> {
        if let Some(code) = &self.code {
            let result = session.submit_verification_code(code).await;
            flush_notifications(session, seen);
            if let Err(e) = result {
                print_flow_error(&e);
                bail!("Verification failed");
            }
            return Ok(());
        }

        let email = session.workflow().email().unwrap_or_default().to_string();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            println!("🔑 Enter the verification code sent to {email}:");
            let Some(line) = lines.next_line().await? else {
                bail!("No verification code entered");
            };
            let result = session.submit_verification_code(&line).await;
            flush_notifications(session, seen);
            match result {
                Ok(()) => return Ok(()),
                Err(e @ FlowError::AttemptsExhausted { .. }) => {
                    print_flow_error(&e);
                    bail!("Verification locked");
                }
                Err(e) => print_flow_error(&e),
            }
        }
    }
}

impl Command for RunCommand {
    async fn execute(&self) -> Result<()> {
        let mut shutdown = ShutdownCoordinator::install_signal_handlers();
        let mut session = self.build_session()?;

        let outcome = tokio::select! {
            result = self.drive(&mut session) => Some(result),
            _ = shutdown.wait_for_shutdown() => None,
        };

        match outcome {
            Some(result) => result,
            None => {
                session.reset().await;
                println!();
                println!("🛑 Interrupted, session reset");
                Ok(())
            }
        }
    }
}

fn flush_notifications(session: &Session, seen: &mut usize) {
    for notification in session.notifications().iter().skip(*seen) {
        let icon = match notification.level {
            NotificationLevel::Info => "ℹ️ ",
            NotificationLevel::Success => "✅",
            NotificationLevel::Error => "❌",
        };
        println!("{icon} {}: {}", notification.title, notification.message);
    }
    *seen = session.notifications().len();
}

fn print_flow_error(error: &FlowError) {
    match error.validation_errors() {
        Some(errors) => {
            for field_error in errors.errors() {
                println!("❌ {}: {}", field_error.field, field_error.message);
            }
        }
        None => println!("❌ {}", error.user_message()),
    }
}

fn print_progress(snapshot: &ProgressSnapshot) {
    let active = snapshot
        .steps
        .iter()
        .find(|step| step.status == StepStatus::Processing)
        .map(|step| format!("{} {}%", step.name, step.progress))
        .unwrap_or_default();
    println!(
        "⏳ {:>3}% | {} remaining | {}",
        snapshot.overall_progress,
        snapshot.time_remaining_display(),
        active
    );
}

fn print_downloads(session: &Session) {
    let Some(downloads) = session.download_links() else {
        return;
    };
    println!();
    println!("📥 DOWNLOADS");
    println!("────────────");
    println!("   Project: {}", downloads.project_url);
    for kind in DownloadKind::ALL {
        if let Some(url) = downloads.get(kind) {
            println!("   {:<10} {}", kind.as_str(), url);
        }
    }
}
