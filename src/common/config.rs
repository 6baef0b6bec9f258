//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Retry defaults for tests that do not declare their own
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Scheduler and reporting settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Retry defaults applied when a test has no `Retry` directive
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Maximum attempts before a wait condition times out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_delay_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    10
}

/// HTTP client settings
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Transport timeout for a single request, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent unless a test sets its own
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("marcus/{}", env!("CARGO_PKG_VERSION"))
}

/// Scheduler and reporting settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Worker bound for parallel mode (default: available parallelism)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Characters of response body shown on a status failure
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: None,
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_preview_chars() -> usize {
    500
}

impl RunnerConfig {
    /// Resolve the worker bound, falling back to CPU parallelism
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, &e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
