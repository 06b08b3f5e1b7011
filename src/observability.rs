use tracing::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Remote video service usage metrics
#[derive(Debug, Default)]
pub struct RemoteApiMetrics {
    pub total_requests: AtomicU64,
    pub transport_failures: AtomicU64,
    pub rejections: AtomicU64,
    pub demo_fallbacks: AtomicU64,
}

impl RemoteApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_demo_fallback(&self) {
        self.demo_fallbacks.fetch_add(1, Ordering::Relaxed);
        warn!("Remote service unreachable, serving demo fallback data");
    }

    pub fn get_stats(&self) -> RemoteApiStats {
        RemoteApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            demo_fallbacks: self.demo_fallbacks.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Remote API metrics: requests={}, transport_failures={}, rejections={}, demo_fallbacks={}",
            stats.total_requests,
            stats.transport_failures,
            stats.rejections,
            stats.demo_fallbacks
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteApiStats {
    pub total_requests: u64,
    pub transport_failures: u64,
    pub rejections: u64,
    pub demo_fallbacks: u64,
}

/// Global metrics instance
static REMOTE_METRICS: std::sync::LazyLock<RemoteApiMetrics> =
    std::sync::LazyLock::new(RemoteApiMetrics::new);

pub fn remote_metrics() -> &'static RemoteApiMetrics {
    &REMOTE_METRICS
}
