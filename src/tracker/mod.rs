//! Job progress simulation: a pure, seedable [`ProgressModel`] and the
//! [`JobProgressTracker`] that drives it on a tokio interval.

pub mod progress;
pub mod runner;

pub use progress::{format_time_remaining, ProgressModel, ProgressSettings, ProgressSnapshot, StepFailure, TickReport};
pub use runner::{ChannelObserver, JobProgressTracker, TrackerEvent, TrackerHandle, TrackerObserver};
