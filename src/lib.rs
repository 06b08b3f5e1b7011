// Subdub Library - account provisioning and subtitle/dubbing job tracking
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod remote;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod tracker;
pub mod workflows;

// Re-export key types for easy access
pub use config::SubdubConfig;
pub use errors::{Field, FlowError, FlowResult, RemoteError, ValidationErrors};
pub use http::RateLimitedHttpClient;
pub use observability::{remote_metrics, RemoteApiMetrics, RemoteApiStats};
pub use remote::{DemoRemoteService, RemoteService, RemoteServiceClient};
pub use session::{RunOutcome, Session, SessionView, Stage};
pub use shutdown::ShutdownCoordinator;
pub use telemetry::{create_session_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use tracker::{JobProgressTracker, ProgressSnapshot, TrackerEvent, TrackerHandle, TrackerObserver};
pub use workflows::{ProvisioningState, ProvisioningWorkflow};
