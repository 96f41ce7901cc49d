//! Configuration management for the throttle.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, ThrottleError};
use crate::ratelimit::MAX_WINDOW_MS;

/// Prefix for environment overrides, e.g. `AGENDA_THROTTLE__LIMITS__LOGIN__MAX_ATTEMPTS`.
const ENV_PREFIX: &str = "AGENDA_THROTTLE";

/// Main configuration for the throttle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Per-action limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Background sweep configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limits for each throttled action class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Sign-in attempts
    #[serde(default = "default_login_limit")]
    pub login: LimitConfig,

    /// Generic calls to the backend
    #[serde(default = "default_api_limit")]
    pub api: LimitConfig,

    /// File uploads
    #[serde(default = "default_upload_limit")]
    pub upload: LimitConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            login: default_login_limit(),
            api: default_api_limit(),
            upload: default_upload_limit(),
        }
    }
}

/// A single fixed-window limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl LimitConfig {
    pub fn new(max_attempts: u32, window_ms: u64) -> Self {
        Self {
            max_attempts,
            window_ms,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ThrottleError::Config(format!(
                "limits.{}.max_attempts must be positive",
                name
            )));
        }
        if self.window_ms == 0 {
            return Err(ThrottleError::Config(format!(
                "limits.{}.window_ms must be positive",
                name
            )));
        }
        if self.window_ms > MAX_WINDOW_MS {
            return Err(ThrottleError::Config(format!(
                "limits.{}.window_ms must not exceed {}",
                name, MAX_WINDOW_MS
            )));
        }
        Ok(())
    }
}

fn default_login_limit() -> LimitConfig {
    // 5 attempts per 15 minutes
    LimitConfig::new(5, 15 * 60 * 1000)
}

fn default_api_limit() -> LimitConfig {
    LimitConfig::new(100, 60 * 1000)
}

fn default_upload_limit() -> LimitConfig {
    LimitConfig::new(10, 60 * 1000)
}

/// Background cleanup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Seconds between sweeps of expired records
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
        }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_cleanup_interval() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ThrottleConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading throttle configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ThrottleConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file layered under environment
    /// variables prefixed with `AGENDA_THROTTLE__`.
    ///
    /// Every field is seeded with its default first, so a source may set a
    /// single key such as `AGENDA_THROTTLE__LIMITS__LOGIN__MAX_ATTEMPTS`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ThrottleConfig::default();
        let mut builder = config::Config::builder();

        for (name, limit) in [
            ("login", &defaults.limits.login),
            ("api", &defaults.limits.api),
            ("upload", &defaults.limits.upload),
        ] {
            builder = builder
                .set_default(
                    format!("limits.{}.max_attempts", name),
                    i64::from(limit.max_attempts),
                )?
                .set_default(
                    format!("limits.{}.window_ms", name),
                    limit.window_ms as i64,
                )?;
        }
        builder = builder
            .set_default("cleanup.interval_secs", defaults.cleanup.interval_secs as i64)?
            .set_default("logging.level", defaults.logging.level.clone())?
            .set_default("logging.json", defaults.logging.json)?;

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Yaml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ThrottleConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits and intervals that would disable throttling.
    pub fn validate(&self) -> Result<()> {
        self.limits.login.validate("login")?;
        self.limits.api.validate("api")?;
        self.limits.upload.validate("upload")?;

        if self.cleanup.interval_secs == 0 {
            return Err(ThrottleError::Config(
                "cleanup.interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
