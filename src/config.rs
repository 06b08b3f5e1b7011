use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for subdub
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SubdubConfig {
    /// Remote video service settings
    pub remote: RemoteConfig,
    /// Job progress tracking settings
    pub tracker: TrackerConfig,
    /// Verification code policy
    pub verification: VerificationConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote API (signup, verify and process endpoints hang off it)
    pub base_url: String,
    /// Per-request timeout; a timeout counts as a transport failure
    pub timeout_seconds: u64,
    /// Substitute deterministic demo data when the service cannot be reached
    pub allow_demo_fallback: bool,
    /// Editor page for a project, the project id is appended
    pub project_url_base: String,
    /// Download endpoint for rendered outputs, the project id is appended
    pub download_url_base: String,
    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Interval between progress ticks
    pub tick_interval_ms: u64,
    /// Initial countdown, one tick per second of estimate
    pub estimated_time_minutes: u32,
    /// Smallest per-tick progress increment for a processing step
    pub min_increment: u8,
    /// Largest per-tick progress increment for a processing step
    pub max_increment: u8,
    /// Chance per tick that a processing step fails (simulation only)
    pub error_probability: f64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Failed verification attempts allowed before lockout (0 = unlimited)
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON structured logs instead of human-readable output
    pub json_logs: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kapwing.com/v1".to_string(),
            timeout_seconds: 30,
            allow_demo_fallback: true, // Keeps the flow usable while the service is down
            project_url_base: "https://www.kapwing.com/studio/editor".to_string(),
            download_url_base: "https://api.kapwing.com/v1/videos/download".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst_capacity: 10,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            estimated_time_minutes: 5,
            min_increment: 5,
            max_increment: 15,
            error_probability: 0.0,
            seed: None,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl TrackerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Countdown start in ticks
    pub fn initial_time_remaining(&self) -> u32 {
        self.estimated_time_minutes.saturating_mul(60)
    }

    /// Increment bounds with min <= max and max <= 100
    pub fn increment_range(&self) -> (u8, u8) {
        let max = self.max_increment.clamp(1, 100);
        let min = self.min_increment.clamp(1, max);
        (min, max)
    }
}

impl SubdubConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (subdub.toml, .subdub-rc)
    /// 3. Environment variables (prefixed with SUBDUB_, nested keys split on `__`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("subdub.toml").exists() {
            builder = builder.add_source(File::with_name("subdub"));
        }

        if Path::new(".subdub-rc").exists() {
            builder = builder.add_source(File::new(".subdub-rc", config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("SUBDUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load a single TOML file layered over the defaults, ignoring the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_policy() {
        let config = SubdubConfig::default();
        assert!(config.remote.allow_demo_fallback);
        assert_eq!(config.tracker.initial_time_remaining(), 300);
        assert_eq!(config.tracker.increment_range(), (5, 15));
        assert_eq!(config.verification.max_attempts, 5);
    }

    #[test]
    fn increment_range_is_normalised() {
        let tracker = TrackerConfig {
            min_increment: 40,
            max_increment: 200,
            ..TrackerConfig::default()
        };
        assert_eq!(tracker.increment_range(), (40, 100));

        let inverted = TrackerConfig {
            min_increment: 20,
            max_increment: 10,
            ..TrackerConfig::default()
        };
        assert_eq!(inverted.increment_range(), (10, 10));
    }

    #[test]
    fn zero_tick_interval_is_bumped_to_one_millisecond() {
        let tracker = TrackerConfig {
            tick_interval_ms: 0,
            ..TrackerConfig::default()
        };
        assert_eq!(tracker.tick_interval(), Duration::from_millis(1));
    }
}
