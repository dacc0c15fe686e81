//! Application configuration.
//!
//! Everything that used to be process-wide (API key, endpoint URLs, timeouts)
//! lives in one `AppConfig` value, built once at startup and handed to every
//! component that talks to the text-generation service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "CarSpec";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Vision model used for the primary photo analysis.
pub const DEFAULT_ANALYSIS_URL: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";
/// Text model used for gap research (engine + general).
pub const DEFAULT_RESEARCH_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
/// Text model used for section translation.
pub const DEFAULT_TRANSLATION_URL: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,carspec_lib=debug,tower_http=info"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════
// Timeouts & retry
// ═══════════════════════════════════════════════════════════

/// Timeouts for outbound text-generation calls.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// TCP connect timeout, applied to every call.
    pub connect: Duration,
    /// Response timeout for the primary photo analysis.
    pub analysis: Duration,
    /// Response timeout for research and translation calls.
    pub follow_up: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            analysis: Duration::from_secs(15),
            follow_up: Duration::from_secs(20),
        }
    }
}

/// Retry settings for the primary analysis call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// AppConfig
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub analysis_url: String,
    pub research_url: String,
    pub translation_url: String,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    /// Directory holding `history.json` and `collections.json`.
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Build a config with default endpoints around an API key.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            analysis_url: DEFAULT_ANALYSIS_URL.to_string(),
            research_url: DEFAULT_RESEARCH_URL.to_string(),
            translation_url: DEFAULT_TRANSLATION_URL.to_string(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            data_dir: app_data_dir(),
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000))),
        }
    }

    /// Load from the process environment (a `.env` file is honoured first).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Split out so tests do not
    /// have to mutate the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key.trim());

        if let Some(url) = lookup("CARSPEC_ANALYSIS_URL") {
            config.analysis_url = url;
        }
        if let Some(url) = lookup("CARSPEC_RESEARCH_URL") {
            config.research_url = url;
        }
        if let Some(url) = lookup("CARSPEC_TRANSLATION_URL") {
            config.translation_url = url;
        }
        if let Some(dir) = lookup("CARSPEC_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("CARSPEC_BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                var: "CARSPEC_BIND_ADDR",
                value: addr.clone(),
            })?;
        }
        if let Some(attempts) = lookup("CARSPEC_RETRY_ATTEMPTS") {
            config.retry.max_attempts = attempts
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "CARSPEC_RETRY_ATTEMPTS",
                    value: attempts.clone(),
                })?;
        }

        Ok(config)
    }

    /// API key with everything but the edges masked, for log lines.
    pub fn redacted_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 10 {
            return "*****".to_string();
        }
        let head: String = chars[..5].iter().collect();
        let tail: String = chars[chars.len() - 5..].iter().collect();
        format!("{head}...{tail}")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    pub fn collections_path(&self) -> PathBuf {
        self.data_dir.join("collections.json")
    }
}

/// Get the application data directory: ~/CarSpec/ (falls back to ./CarSpec
/// when no home directory can be determined).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "abc")])).unwrap();
        assert_eq!(config.analysis_url, DEFAULT_ANALYSIS_URL);
        assert_eq!(config.research_url, DEFAULT_RESEARCH_URL);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_base, Duration::from_millis(500));
        assert_eq!(config.timeouts.connect, Duration::from_secs(3));
        assert_eq!(config.timeouts.analysis, Duration::from_secs(15));
        assert_eq!(config.bind_addr.port(), 5000);
    }

    #[test]
    fn overrides_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("CARSPEC_RESEARCH_URL", "http://localhost:9000/research"),
            ("CARSPEC_DATA_DIR", "/tmp/carspec-test"),
            ("CARSPEC_BIND_ADDR", "127.0.0.1:8080"),
            ("CARSPEC_RETRY_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.research_url, "http://localhost:9000/research");
        assert_eq!(config.history_path(), PathBuf::from("/tmp/carspec-test/history.json"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn invalid_retry_attempts_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("CARSPEC_RETRY_ATTEMPTS", "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn redacted_key_hides_middle() {
        let config = AppConfig::new("AIzaSyA1234567890abcdef");
        assert_eq!(config.redacted_key(), "AIzaS...bcdef");
        assert_eq!(AppConfig::new("short").redacted_key(), "*****");
    }

    #[test]
    fn app_name_is_carspec() {
        assert_eq!(APP_NAME, "CarSpec");
        assert!(app_data_dir().ends_with("CarSpec"));
    }
}
