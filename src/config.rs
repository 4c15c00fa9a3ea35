//! Configuration module for the observation publisher.
//!
//! This module provides environment-based delivery configuration: endpoint,
//! station credentials, pacing, backlog and staleness policy, and the
//! retry contract. Configuration is immutable after construction; there is
//! no runtime reconfiguration.

use std::env;
use std::time::Duration;

/// Default upload endpoint of the Windy stations API.
const DEFAULT_SERVER_URL: &str = "https://stations.windy.com/api/v2/observation/update";

/// Default per-attempt HTTP timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per record.
const DEFAULT_MAX_TRIES: u32 = 3;

/// Default fixed wait between attempts in seconds.
const DEFAULT_RETRY_WAIT_SECS: u64 = 5;

/// Delivery configuration for the publisher.
///
/// All settings can be configured via environment variables:
/// - `WINDY_STATION_ID`: station identifier (required for uploads)
/// - `WINDY_STATION_PASSWORD`: station credential (required for uploads)
/// - `WINDY_SERVER_URL`: upload endpoint (default: Windy stations API)
/// - `WINDY_POST_INTERVAL_SECS`: minimum seconds between posts (default: unpaced)
/// - `WINDY_MAX_BACKLOG`: queue cap before oldest records are dropped (default: unlimited)
/// - `WINDY_STALE_SECS`: record age beyond which upload is skipped (default: never)
/// - `WINDY_TIMEOUT_SECS`: per-attempt HTTP timeout (default: 60)
/// - `WINDY_MAX_TRIES`: attempts per record (default: 3)
/// - `WINDY_RETRY_WAIT_SECS`: fixed wait between attempts (default: 5)
/// - `WINDY_SKIP_UPLOAD`: run the pipeline without network calls (default: false)
/// - `WINDY_LOG_SUCCESS` / `WINDY_LOG_FAILURE`: outcome logging (default: true)
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upload endpoint.
    pub server_url: String,

    /// Station identifier, sent as `stationId`.
    pub station_id: String,

    /// Station credential, sent as the final `PASSWORD` query field.
    pub station_password: String,

    /// Minimum spacing between posts, independent of queue depth.
    pub post_interval: Option<Duration>,

    /// Maximum number of queued records before the oldest are dropped.
    pub max_backlog: Option<usize>,

    /// Age beyond which a record is discarded without a network call.
    pub stale: Option<Duration>,

    /// Per-attempt HTTP timeout.
    pub timeout: Duration,

    /// Number of attempts per record before it is abandoned.
    pub max_tries: u32,

    /// Fixed wait between attempts (not exponential backoff).
    pub retry_wait: Duration,

    /// Run every step of the pipeline except the actual network call.
    pub skip_upload: bool,

    /// Log successful uploads at info level.
    pub log_success: bool,

    /// Log abandoned records at error level.
    pub log_failure: bool,
}

/// Error type for configuration loading failures.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub env_var: Option<String>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.env_var {
            Some(var) => write!(f, "Configuration error for {}: {}", var, self.message),
            None => write!(f, "Configuration error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Create a configuration with the given credentials and all defaults.
    pub fn new(station_id: impl Into<String>, station_password: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            station_password: station_password.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Missing credentials are not an error here: the publisher refuses to
    /// start its worker when they are empty, without failing the host
    /// process. Malformed numeric values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = env::var("WINDY_SERVER_URL")
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let station_id = env::var("WINDY_STATION_ID").unwrap_or_default();
        let station_password = env::var("WINDY_STATION_PASSWORD").unwrap_or_default();

        let post_interval = parse_opt_secs("WINDY_POST_INTERVAL_SECS")?.map(Duration::from_secs);
        let stale = parse_opt_secs("WINDY_STALE_SECS")?.map(Duration::from_secs);
        let max_backlog = parse_max_backlog()?;

        let timeout = Duration::from_secs(
            parse_opt_secs("WINDY_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
        );
        let retry_wait = Duration::from_secs(
            parse_opt_secs("WINDY_RETRY_WAIT_SECS")?.unwrap_or(DEFAULT_RETRY_WAIT_SECS),
        );
        let max_tries = parse_max_tries()?;

        let skip_upload = parse_flag("WINDY_SKIP_UPLOAD", false)?;
        let log_success = parse_flag("WINDY_LOG_SUCCESS", true)?;
        let log_failure = parse_flag("WINDY_LOG_FAILURE", true)?;

        Ok(Self {
            server_url,
            station_id,
            station_password,
            post_interval,
            max_backlog,
            stale,
            timeout,
            max_tries,
            retry_wait,
            skip_upload,
            log_success,
            log_failure,
        })
    }

    /// Whether both credentials required for uploading are present.
    pub fn has_credentials(&self) -> bool {
        !self.station_id.is_empty() && !self.station_password.is_empty()
    }
}

impl Default for Config {
    /// Default configuration with empty credentials.
    ///
    /// Useful for tests; a publisher built from it starts disabled until
    /// `station_id` and `station_password` are filled in.
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            station_id: String::new(),
            station_password: String::new(),
            post_interval: None,
            max_backlog: None,
            stale: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tries: DEFAULT_MAX_TRIES,
            retry_wait: Duration::from_secs(DEFAULT_RETRY_WAIT_SECS),
            skip_upload: false,
            log_success: true,
            log_failure: true,
        }
    }
}

/// Parse an optional non-negative seconds value from the environment.
fn parse_opt_secs(env_var: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(env_var) {
        Ok(value) => {
            let secs: u64 = value.parse().map_err(|_| ConfigError {
                message: format!("'{}' is not a valid number of seconds", value),
                env_var: Some(env_var.to_string()),
            })?;
            Ok(Some(secs))
        }
        Err(_) => Ok(None),
    }
}

/// Parse the backlog cap, requiring it to be at least 1 when set.
fn parse_max_backlog() -> Result<Option<usize>, ConfigError> {
    let env_var = "WINDY_MAX_BACKLOG";

    match env::var(env_var) {
        Ok(value) => {
            let max_backlog: usize = value.parse().map_err(|_| ConfigError {
                message: format!("'{}' is not a valid number", value),
                env_var: Some(env_var.to_string()),
            })?;

            if max_backlog == 0 {
                return Err(ConfigError {
                    message: "max backlog must be greater than 0".to_string(),
                    env_var: Some(env_var.to_string()),
                });
            }

            Ok(Some(max_backlog))
        }
        Err(_) => Ok(None),
    }
}

/// Parse the attempt count, requiring it to be at least 1.
fn parse_max_tries() -> Result<u32, ConfigError> {
    let env_var = "WINDY_MAX_TRIES";

    match env::var(env_var) {
        Ok(value) => {
            let max_tries: u32 = value.parse().map_err(|_| ConfigError {
                message: format!("'{}' is not a valid number", value),
                env_var: Some(env_var.to_string()),
            })?;

            if max_tries == 0 {
                return Err(ConfigError {
                    message: "max tries must be greater than 0".to_string(),
                    env_var: Some(env_var.to_string()),
                });
            }

            Ok(max_tries)
        }
        Err(_) => Ok(DEFAULT_MAX_TRIES),
    }
}

/// Parse a boolean flag; accepts 1/0, true/false, yes/no, on/off.
fn parse_flag(env_var: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(env_var) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError {
                message: format!("'{}' is not a valid boolean", value),
                env_var: Some(env_var.to_string()),
            }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    // The environment is process-global; serialize tests that touch it.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    // Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(val) => env::set_var(&self.key, val),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(
            config.server_url,
            "https://stations.windy.com/api/v2/observation/update"
        );
        assert!(config.station_id.is_empty());
        assert!(config.post_interval.is_none());
        assert!(config.max_backlog.is_none());
        assert!(config.stale.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_tries, 3);
        assert_eq!(config.retry_wait, Duration::from_secs(5));
        assert!(!config.skip_upload);
        assert!(config.log_success);
        assert!(config.log_failure);
    }

    #[test]
    fn test_config_new_fills_credentials() {
        let config = Config::new("5678", "123");
        assert_eq!(config.station_id, "5678");
        assert_eq!(config.station_password, "123");
        assert!(config.has_credentials());
        assert_eq!(config.max_tries, 3);
    }

    #[test]
    fn test_missing_credentials_detected() {
        let config = Config::default();
        assert!(!config.has_credentials());

        let config = Config::new("5678", "");
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);

        let config = Config::from_env().expect("Should load with defaults");
        assert_eq!(
            config.server_url,
            "https://stations.windy.com/api/v2/observation/update"
        );
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_tries, 3);
        assert!(config.max_backlog.is_none());
    }

    #[test]
    fn test_config_from_env_custom_values() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let _g1 = EnvGuard::set("WINDY_STATION_ID", "5678");
        let _g2 = EnvGuard::set("WINDY_STATION_PASSWORD", "123");
        let _g3 = EnvGuard::set("WINDY_SERVER_URL", "http://custom:9000/update/");
        let _g4 = EnvGuard::set("WINDY_POST_INTERVAL_SECS", "300");
        let _g5 = EnvGuard::set("WINDY_MAX_BACKLOG", "24");
        let _g6 = EnvGuard::set("WINDY_STALE_SECS", "600");
        let _g7 = EnvGuard::set("WINDY_SKIP_UPLOAD", "yes");

        let config = Config::from_env().expect("Should load custom values");
        assert_eq!(config.station_id, "5678");
        assert_eq!(config.station_password, "123");
        assert_eq!(config.server_url, "http://custom:9000/update"); // Trailing slash removed
        assert_eq!(config.post_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.max_backlog, Some(24));
        assert_eq!(config.stale, Some(Duration::from_secs(600)));
        assert!(config.skip_upload);
    }

    #[test]
    fn test_invalid_post_interval() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = EnvGuard::set("WINDY_POST_INTERVAL_SECS", "soon");

        let result = Config::from_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.message.contains("not a valid number"));
        assert_eq!(err.env_var.as_deref(), Some("WINDY_POST_INTERVAL_SECS"));
    }

    #[test]
    fn test_zero_max_backlog_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = EnvGuard::set("WINDY_MAX_BACKLOG", "0");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("greater than 0"));
    }

    #[test]
    fn test_zero_max_tries_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = EnvGuard::set("WINDY_MAX_TRIES", "0");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("greater than 0"));
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = EnvGuard::set("WINDY_LOG_SUCCESS", "maybe");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("not a valid boolean"));
    }

    #[test]
    fn test_flag_spellings() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);

        for (value, expected) in [("1", true), ("on", true), ("FALSE", false), ("no", false)] {
            let _guard = EnvGuard::set("WINDY_SKIP_UPLOAD", value);
            let config = Config::from_env().expect("flag should parse");
            assert_eq!(config.skip_upload, expected, "value {:?}", value);
        }
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError {
            message: "test error".to_string(),
            env_var: Some("TEST_VAR".to_string()),
        };
        assert_eq!(
            format!("{}", error),
            "Configuration error for TEST_VAR: test error"
        );

        let error_no_var = ConfigError {
            message: "general error".to_string(),
            env_var: None,
        };
        assert_eq!(
            format!("{}", error_no_var),
            "Configuration error: general error"
        );
    }
}
