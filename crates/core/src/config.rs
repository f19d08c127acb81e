//! Environment-driven configuration for the generation pipeline.

use std::time::Duration;

use crate::error::CoreError;

/// Default prediction service base URL.
pub const DEFAULT_SERVICE_URL: &str = "https://homepage.replicate.com";
/// Default model identifier sent with every submission.
pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-schnell";
/// Default model version sent with every submission.
pub const DEFAULT_MODEL_VERSION: &str =
    "f2ab8a5bfe79f02f0789a146cf5e73d2a4ff2684a98c2b303d1e1ff3814271db";
/// Attempts launched per prompt.
pub const DEFAULT_FAN_OUT: usize = 3;
/// Seconds between status checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Seconds from submission before a pending job is abandoned.
pub const DEFAULT_DEADLINE_SECS: u64 = 60;
/// Per-request HTTP timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Upper bound for every configured duration (one day).
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Connection settings for the external prediction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL without trailing slash, e.g. `https://homepage.replicate.com`.
    pub base_url: String,
    pub model: String,
    pub version: String,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            version: DEFAULT_MODEL_VERSION.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub service: ServiceConfig,
    /// Attempts launched per prompt (N).
    pub fan_out: usize,
    pub poll_interval: Duration,
    /// Measured from submission of each job.
    pub deadline: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            fan_out: DEFAULT_FAN_OUT,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
        }
    }
}

impl GenerationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                          |
    /// |---------------------------------|----------------------------------|
    /// | `IMAGEGEN_SERVICE_URL`          | `https://homepage.replicate.com` |
    /// | `IMAGEGEN_MODEL`                | `black-forest-labs/flux-schnell` |
    /// | `IMAGEGEN_MODEL_VERSION`        | flux-schnell version hash        |
    /// | `IMAGEGEN_FAN_OUT`              | `3`                              |
    /// | `IMAGEGEN_POLL_INTERVAL_SECS`   | `5`                              |
    /// | `IMAGEGEN_DEADLINE_SECS`        | `60`                             |
    /// | `IMAGEGEN_REQUEST_TIMEOUT_SECS` | `30`                             |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to defaults; present but malformed values are
    /// errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("IMAGEGEN_SERVICE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let model = lookup("IMAGEGEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let version =
            lookup("IMAGEGEN_MODEL_VERSION").unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string());

        let fan_out = parse_or(&lookup, "IMAGEGEN_FAN_OUT", DEFAULT_FAN_OUT)?;
        let poll_interval_secs =
            parse_or(&lookup, "IMAGEGEN_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let deadline_secs = parse_or(&lookup, "IMAGEGEN_DEADLINE_SECS", DEFAULT_DEADLINE_SECS)?;
        let request_timeout_secs = parse_or(
            &lookup,
            "IMAGEGEN_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let config = Self {
            service: ServiceConfig {
                base_url,
                model,
                version,
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
            fan_out,
            poll_interval: Duration::from_secs(poll_interval_secs),
            deadline: Duration::from_secs(deadline_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.service.base_url.is_empty() {
            return Err(CoreError::Config {
                var: "IMAGEGEN_SERVICE_URL",
                reason: "must not be empty".into(),
            });
        }
        if self.fan_out == 0 {
            return Err(CoreError::Config {
                var: "IMAGEGEN_FAN_OUT",
                reason: "must be at least 1".into(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                var: "IMAGEGEN_POLL_INTERVAL_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        if self.deadline.is_zero() {
            return Err(CoreError::Config {
                var: "IMAGEGEN_DEADLINE_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        if self.service.request_timeout.is_zero() {
            return Err(CoreError::Config {
                var: "IMAGEGEN_REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let max = Duration::from_secs(MAX_DURATION_SECS);
        for (var, value) in [
            ("IMAGEGEN_POLL_INTERVAL_SECS", self.poll_interval),
            ("IMAGEGEN_DEADLINE_SECS", self.deadline),
            ("IMAGEGEN_REQUEST_TIMEOUT_SECS", self.service.request_timeout),
        ] {
            if value > max {
                return Err(CoreError::Config {
                    var,
                    reason: format!("must be at most {MAX_DURATION_SECS} seconds"),
                });
            }
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| CoreError::Config {
            var,
            reason: format!("'{raw}' is not valid: {e}"),
        }),
    }
}
