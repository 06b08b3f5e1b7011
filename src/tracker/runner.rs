//! Tick-driven job tracking on a background task.
//!
//! [`JobProgressTracker::spawn`] owns a [`ProgressModel`] inside a tokio task
//! and reports to a [`TrackerObserver`]. The returned [`TrackerHandle`] is the
//! only way to reach the task: dropping it aborts the task, and
//! [`TrackerHandle::cancel`] aborts and waits, so no callback fires after it
//! returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::session::types::Step;

use super::progress::{ProgressModel, ProgressSettings, ProgressSnapshot, StepFailure};

/// Receives tracker callbacks on the tracker task
pub trait TrackerObserver: Send + Sync {
    fn on_tick(&self, _snapshot: &ProgressSnapshot) {}

    /// Fired exactly once per run, after the tick that completed the last step
    fn on_complete(&self, snapshot: &ProgressSnapshot);

    fn on_error(&self, step_id: &str, message: &str);
}

/// Tracker callbacks as values, for consumers that would rather poll a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    Progress(ProgressSnapshot),
    StepFailed { step_id: String, message: String },
    Completed(ProgressSnapshot),
}

/// Forwards every callback into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<TrackerEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<TrackerEvent>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TrackerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl TrackerObserver for ChannelObserver {
    fn on_tick(&self, snapshot: &ProgressSnapshot) {
        let _ = self.sender.send(TrackerEvent::Progress(snapshot.clone()));
    }

    fn on_complete(&self, snapshot: &ProgressSnapshot) {
        let _ = self.sender.send(TrackerEvent::Completed(snapshot.clone()));
    }

    fn on_error(&self, step_id: &str, message: &str) {
        let _ = self.sender.send(TrackerEvent::StepFailed {
            step_id: step_id.to_string(),
            message: message.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
enum TrackerCommand {
    FailStep { step_id: String, message: String },
    RetryStep { step_id: String },
}

pub struct JobProgressTracker;

impl JobProgressTracker {
    /// Start ticking `steps` on a new task. Must be called inside a tokio runtime.
    pub fn spawn(steps: Vec<Step>, config: &TrackerConfig, observer: Arc<dyn TrackerObserver>) -> TrackerHandle {
        let model = ProgressModel::new(steps, ProgressSettings::from(config));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let tick_interval = config.tick_interval();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(model.snapshot());
        let cancelled = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_tracker(
            model,
            rng,
            tick_interval,
            observer,
            command_rx,
            snapshot_tx,
            Arc::clone(&cancelled),
        ));

        info!(tick_interval_ms = tick_interval.as_millis() as u64, "Started job progress tracker");

        TrackerHandle {
            task: Some(task),
            commands: command_tx,
            snapshot: snapshot_rx,
            cancelled,
        }
    }
}

async fn run_tracker(
    mut model: ProgressModel,
    mut rng: StdRng,
    tick_interval: std::time::Duration,
    observer: Arc<dyn TrackerObserver>,
    mut commands: mpsc::UnboundedReceiver<TrackerCommand>,
    snapshot_tx: watch::Sender<ProgressSnapshot>,
    cancelled: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick resolves immediately; progress starts one interval in.
    interval.tick().await;

    let report_failure = |failure: &StepFailure| {
        if !cancelled.load(Ordering::Acquire) {
            observer.on_error(&failure.step_id, &failure.message);
        }
    };

    loop {
        tokio::select! {
            Some(command) = commands.recv() => {
                match command {
                    TrackerCommand::FailStep { step_id, message } => {
                        if let Some(failure) = model.fail_step(&step_id, &message) {
                            report_failure(&failure);
                        }
                    }
                    TrackerCommand::RetryStep { step_id } => {
                        if model.retry_step(&step_id) {
                            debug!(step_id = %step_id, "Step queued for retry");
                        }
                    }
                }
                snapshot_tx.send_replace(model.snapshot());
            }

            _ = interval.tick() => {
                let report = model.tick(&mut rng);
                snapshot_tx.send_replace(report.snapshot.clone());

                for failure in &report.failures {
                    report_failure(failure);
                }
                if cancelled.load(Ordering::Acquire) {
                    break;
                }

                observer.on_tick(&report.snapshot);
                if report.completed_now {
                    observer.on_complete(&report.snapshot);
                    break;
                }
            }
        }
    }
}

/// Owner of a running tracker task
#[derive(Debug)]
pub struct TrackerHandle {
    task: Option<JoinHandle<()>>,
    commands: mpsc::UnboundedSender<TrackerCommand>,
    snapshot: watch::Receiver<ProgressSnapshot>,
    cancelled: Arc<AtomicBool>,
}

impl TrackerHandle {
    /// Latest published snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot.borrow().clone()
    }

    /// True once the run completed or the task was stopped
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Force a step into `Error`; ignored if the task has stopped
    pub fn fail_step(&self, step_id: &str, message: &str) -> bool {
        self.commands
            .send(TrackerCommand::FailStep {
                step_id: step_id.to_string(),
                message: message.to_string(),
            })
            .is_ok()
    }

    /// Put an errored step back into `Pending`
    pub fn retry_step(&self, step_id: &str) -> bool {
        self.commands
            .send(TrackerCommand::RetryStep {
                step_id: step_id.to_string(),
            })
            .is_ok()
    }

    /// Stop the task and wait for it to unwind
    pub async fn cancel(mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!("Job progress tracker cancelled");
        }
    }

    /// Wait for the run to finish on its own
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Job progress tracker task failed");
                }
            }
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{pipeline_steps, StepStatus};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingObserver {
        ticks: AtomicUsize,
        completions: AtomicUsize,
        errors: Mutex<Vec<(String, String)>>,
    }

    impl TrackerObserver for CountingObserver {
        fn on_tick(&self, _snapshot: &ProgressSnapshot) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_complete(&self, snapshot: &ProgressSnapshot) {
            assert_eq!(snapshot.overall_progress, 100);
            self.completions.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, step_id: &str, message: &str) {
            self.errors.lock().unwrap().push((step_id.to_string(), message.to_string()));
        }
    }

    fn fast_config(seed: u64) -> TrackerConfig {
        TrackerConfig {
            tick_interval_ms: 10,
            seed: Some(seed),
            ..TrackerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_exactly_once() {
        let observer = Arc::new(CountingObserver::default());
        let handle = JobProgressTracker::spawn(pipeline_steps(), &fast_config(1), observer.clone());

        handle.join().await;

        assert_eq!(observer.completions.load(Ordering::SeqCst), 1);
        assert!(observer.ticks.load(Ordering::SeqCst) >= 4);
        assert!(observer.errors.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_callbacks() {
        let observer = Arc::new(CountingObserver::default());
        let handle = JobProgressTracker::spawn(pipeline_steps(), &fast_config(2), observer.clone());

        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.cancel().await;
        let ticks = observer.ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(observer.ticks.load(Ordering::SeqCst), ticks);
        assert_eq!(observer.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn injected_failure_is_reported_and_retry_recovers() {
        let observer = Arc::new(CountingObserver::default());
        let handle = JobProgressTracker::spawn(pipeline_steps(), &fast_config(3), observer.clone());

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(handle.fail_step("account", "Upload rejected"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.steps[0].status, StepStatus::Error);
        assert!(snapshot.steps[1..].iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(
            observer.errors.lock().unwrap().as_slice(),
            &[("account".to_string(), "Upload rejected".to_string())]
        );

        assert!(handle.retry_step("account"));
        handle.join().await;
        assert_eq!(observer.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn channel_observer_ends_with_completion() {
        let (observer, mut events) = ChannelObserver::channel();
        let handle = JobProgressTracker::spawn(pipeline_steps(), &fast_config(4), Arc::new(observer));
        handle.join().await;

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        match last {
            Some(TrackerEvent::Completed(snapshot)) => assert!(snapshot.complete),
            other => panic!("expected completion, got {other:?}"),
        }
    }
}
