use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REFRESH_SECS: u64 = 60;
pub const DEFAULT_HEALTH_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Resolved client settings, built by the binary from CLI flags and
/// environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub refresh_interval: Duration,
    pub health_interval: Duration,
    pub lang: Option<String>,
    pub data_dir: PathBuf,
    pub auto_refresh: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            health_interval: Duration::from_secs(DEFAULT_HEALTH_SECS),
            lang: None,
            data_dir: default_data_dir(),
            auto_refresh: true,
        }
    }
}

impl ClientConfig {
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("finhot.log")
    }
}

/// Platform data directory, or `./.finhot` when none is known.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("finhot"))
        .unwrap_or_else(|| PathBuf::from(".finhot"))
}
