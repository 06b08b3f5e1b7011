use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::errors::{FlowError, FlowResult};
use crate::session::types::{Step, StepStatus};

pub const SIMULATED_FAILURE_MESSAGE: &str = "Connection timeout. Retrying...";

const OVERALL_CAP_BEFORE_COMPLETION: u8 = 99;

/// Tunables for one run of the progress model
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSettings {
    pub min_increment: u8,
    pub max_increment: u8,
    pub error_probability: f64,
    pub initial_time_remaining: u32,
}

impl ProgressSettings {
    /// Bring the fields back into the ranges sampling relies on
    fn normalized(self) -> Self {
        let max_increment = self.max_increment.clamp(1, 100);
        let min_increment = self.min_increment.clamp(1, max_increment);
        let error_probability = if self.error_probability.is_nan() {
            0.0
        } else {
            self.error_probability.clamp(0.0, 1.0)
        };
        Self {
            min_increment,
            max_increment,
            error_probability,
            ..self
        }
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for ProgressSettings {
    fn from(config: &TrackerConfig) -> Self {
        let (min_increment, max_increment) = config.increment_range();
        Self {
            min_increment,
            max_increment,
            error_probability: config.error_probability.clamp(0.0, 1.0),
            initial_time_remaining: config.initial_time_remaining(),
        }
    }
}

/// Point-in-time view of a job's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub tick: u64,
    pub steps: Vec<Step>,
    pub overall_progress: u8,
    pub time_remaining: u32,
    pub complete: bool,
}

impl ProgressSnapshot {
    pub fn time_remaining_display(&self) -> String {
        format_time_remaining(self.time_remaining)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step_id: String,
    pub message: String,
}

/// What a single tick changed
#[derive(Debug, Clone)]
pub struct TickReport {
    pub snapshot: ProgressSnapshot,
    pub failures: Vec<StepFailure>,
    /// True only on the tick that completed the last step
    pub completed_now: bool,
}

/// Dependency-gated step progression driven by ticks.
///
/// Step *i* leaves `Pending` only once step *i-1* is `Completed`. Overall
/// progress is a smoothed counter (+1 per tick, capped at 99) that jumps to
/// 100 on the completing tick; the countdown loses one unit per tick.
#[derive(Debug, Clone)]
pub struct ProgressModel {
    steps: Vec<Step>,
    settings: ProgressSettings,
    overall_progress: u8,
    time_remaining: u32,
    tick: u64,
    complete: bool,
}

impl ProgressModel {
    pub fn new(steps: Vec<Step>, settings: ProgressSettings) -> Self {
        let settings = settings.normalized();
        let time_remaining = settings.initial_time_remaining;
        Self {
            steps,
            settings,
            overall_progress: 0,
            time_remaining,
            tick: 0,
            complete: false,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn overall_progress(&self) -> u8 {
        self.overall_progress
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            tick: self.tick,
            steps: self.steps.clone(),
            overall_progress: self.overall_progress,
            time_remaining: self.time_remaining,
            complete: self.complete,
        }
    }

    fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// Move a pending step to processing, enforcing the predecessor gate
    pub fn begin_step(&mut self, index: usize) -> FlowResult<()> {
        if index >= self.steps.len() {
            return Err(FlowError::UnknownStep { index });
        }
        if index > 0 && self.steps[index - 1].status != StepStatus::Completed {
            return Err(FlowError::DependencyNotReady {
                step: self.steps[index].id.clone(),
                predecessor: self.steps[index - 1].id.clone(),
            });
        }
        if self.steps[index].status == StepStatus::Pending {
            self.steps[index].status = StepStatus::Processing;
            debug!(step = %self.steps[index].id, "Step started");
        }
        Ok(())
    }

    /// Advance the run by one tick
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickReport {
        if self.complete {
            return TickReport {
                snapshot: self.snapshot(),
                failures: Vec::new(),
                completed_now: false,
            };
        }

        self.tick += 1;
        let mut failures = Vec::new();

        for index in 0..self.steps.len() {
            if self.steps[index].status.is_inert() {
                continue;
            }
            if self.steps[index].status == StepStatus::Pending && self.begin_step(index).is_err() {
                continue;
            }

            if self.settings.error_probability > 0.0 && rng.random_bool(self.settings.error_probability) {
                let step = &mut self.steps[index];
                step.status = StepStatus::Error;
                step.message = Some(SIMULATED_FAILURE_MESSAGE.to_string());
                failures.push(StepFailure {
                    step_id: step.id.clone(),
                    message: SIMULATED_FAILURE_MESSAGE.to_string(),
                });
                continue;
            }

            let increment = rng.random_range(self.settings.min_increment..=self.settings.max_increment);
            let step = &mut self.steps[index];
            step.progress = step.progress.saturating_add(increment).min(100);
            if step.progress == 100 {
                step.status = StepStatus::Completed;
                debug!(step = %step.id, tick = self.tick, "Step completed");
            }
        }

        let completed_now = self.steps.iter().all(|s| s.status == StepStatus::Completed);
        if completed_now {
            self.complete = true;
            self.overall_progress = 100;
            self.time_remaining = 0;
        } else {
            self.overall_progress = (self.overall_progress + 1).min(OVERALL_CAP_BEFORE_COMPLETION);
            self.time_remaining = self.time_remaining.saturating_sub(1);
        }

        TickReport {
            snapshot: self.snapshot(),
            failures,
            completed_now,
        }
    }

    /// Put a non-completed step into `Error`. Returns the failure when the step was not already errored.
    pub fn fail_step(&mut self, step_id: &str, message: &str) -> Option<StepFailure> {
        let index = self.position(step_id)?;
        let step = &mut self.steps[index];
        if step.status.is_inert() {
            return None;
        }
        step.status = StepStatus::Error;
        step.message = Some(message.to_string());
        Some(StepFailure {
            step_id: step.id.clone(),
            message: message.to_string(),
        })
    }

    /// Send an errored step back to `Pending` with its progress cleared
    pub fn retry_step(&mut self, step_id: &str) -> bool {
        let Some(index) = self.position(step_id) else {
            return false;
        };
        let step = &mut self.steps[index];
        if step.status != StepStatus::Error {
            return false;
        }
        step.status = StepStatus::Pending;
        step.progress = 0;
        step.message = None;
        true
    }

    /// True when some step is errored and nothing else can move
    pub fn is_stalled(&self) -> bool {
        if self.complete {
            return false;
        }
        let has_error = self.steps.iter().any(|s| s.status == StepStatus::Error);
        let can_move = self.steps.iter().enumerate().any(|(i, s)| match s.status {
            StepStatus::Processing => true,
            StepStatus::Pending => i == 0 || self.steps[i - 1].status == StepStatus::Completed,
            _ => false,
        });
        has_error && !can_move
    }
}

/// `m:ss` rendering of a countdown in seconds
pub fn format_time_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
