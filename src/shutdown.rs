use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// Ctrl-C handling for interactive runs
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    trigger: Arc<watch::Sender<bool>>,
    signal: watch::Receiver<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    /// Coordinator that only fires when [`trigger`](Self::trigger) is called
    pub fn new() -> Self {
        let (trigger, signal) = watch::channel(false);
        Self {
            trigger: Arc::new(trigger),
            signal,
        }
    }

    /// Coordinator that also fires on Ctrl-C. Must be called inside a tokio runtime.
    pub fn install_signal_handlers() -> Self {
        let coordinator = Self::new();
        let trigger = Arc::clone(&coordinator.trigger);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, shutting down");
                    trigger.send_replace(true);
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
        info!("Installed Ctrl-C handler");
        coordinator
    }

    pub fn trigger(&self) {
        self.trigger.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn wait_for_shutdown(&mut self) {
        // The sender lives in self, so the channel cannot close under us.
        let _ = self.signal.wait_for(|triggered| *triggered).await;
    }

    /// Flush what the process has buffered before exit
    pub async fn shutdown_all_services() -> Result<()> {
        info!("Initiating graceful shutdown");

        timeout(Duration::from_secs(5), async {
            crate::observability::remote_metrics().log_stats();
            crate::telemetry::shutdown_telemetry();
        })
        .await
        .map_err(|_| anyhow::anyhow!("Timeout while flushing telemetry"))?;

        info!("Graceful shutdown completed");
        Ok(())
    }
}
