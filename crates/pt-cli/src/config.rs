//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pt_sampler::TrackerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the presence service.
    pub service_url: String,
    /// Presence service API token.
    pub api_token: Option<String>,
    /// Snapshot log, rewritten after every poll.
    pub snapshot_log_path: PathBuf,
    /// End-of-run report.
    pub report_path: PathBuf,
    /// Tracking window in seconds.
    pub window_secs: u64,
    /// Wait between polls in seconds.
    pub poll_interval_secs: u64,
    /// Upper bound on a single lookup in seconds.
    pub resolve_timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service_url", &self.service_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("snapshot_log_path", &self.snapshot_log_path)
            .field("report_path", &self.report_path)
            .field("window_secs", &self.window_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("resolve_timeout_secs", &self.resolve_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let tracker = TrackerConfig::default();
        Self {
            service_url: "http://127.0.0.1:8080".to_string(),
            api_token: None,
            snapshot_log_path: data_dir.join("snapshots.json"),
            report_path: data_dir.join("report.json"),
            window_secs: tracker.window.as_secs(),
            poll_interval_secs: tracker.poll_interval.as_secs(),
            resolve_timeout_secs: tracker.resolve_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (PT_*)
        figment = figment.merge(Env::prefixed("PT_"));

        figment.extract()
    }

    /// Non-empty API token, if configured.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub const fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            window: Duration::from_secs(self.window_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            resolve_timeout: Duration::from_secs(self.resolve_timeout_secs),
        }
    }
}

/// Returns the platform-specific config directory for pt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pt"))
}

/// Returns the platform-specific data directory for pt.
///
/// On Linux: `~/.local/share/pt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("pt"))
}
