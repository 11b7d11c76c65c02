//! Shared client configuration types.
//!
//! The CLI reads and writes `hubble.toml` using these types. Missing
//! sections and fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "hubble.toml";

/// Environment variable that overrides `[service] url`.
pub const SERVER_URL_ENV: &str = "HUBBLE_SERVER_URL";

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Top-level client configuration (persisted as `hubble.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HubbleConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSettings {
    /// Base address of the processing service; relative chart and
    /// download paths are resolved against it.
    #[serde(default = "default_service_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for short request/response calls. The processing stream
    /// itself is not bounded.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSettings {
    /// Where downloaded chart artifacts are written when no path is given.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default = "default_download_name")]
    pub download_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            download_name: default_download_name(),
        }
    }
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_download_dir() -> String {
    ".".to_string()
}

fn default_download_name() -> String {
    "timeline.png".to_string()
}

/// Replace blank or zero values left by hand-edited files with defaults.
///
/// Returns `true` when anything changed.
pub fn apply_fallbacks(config: &mut HubbleConfig) -> bool {
    let mut changed = false;
    if config.service.url.trim().is_empty() {
        config.service.url = default_service_url();
        changed = true;
    }
    if config.service.connect_timeout_secs == 0 {
        config.service.connect_timeout_secs = default_connect_timeout();
        changed = true;
    }
    if config.service.request_timeout_secs == 0 {
        config.service.request_timeout_secs = default_request_timeout();
        changed = true;
    }
    if config.output.download_name.trim().is_empty() {
        config.output.download_name = default_download_name();
        changed = true;
    }
    changed
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut HubbleConfig, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(SERVER_URL_ENV) {
        Some(url) if !url.trim().is_empty() => {
            config.service.url = url.trim().to_string();
            true
        }
        _ => false,
    }
}
