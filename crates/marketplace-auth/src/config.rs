//! # Authentication Configuration
//!
//! Loaded once at process start, validated, then moved into the gate.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MARKETPLACE_AUTH_MAX_AGE_SECS` | 600 |
//! | `MARKETPLACE_AUTH_MAX_FUTURE_SKEW_SECS` | 30 |
//! | `MARKETPLACE_ENVIRONMENT` | `production` |
//! | `MARKETPLACE_AUTH_ALLOW_DEV_BYPASS` | `false` |
//!
//! ## Security Requirements
//!
//! - The development bypass MUST NOT be enabled in production; asking for it
//!   there is a boot failure, not a warning.

use crate::domain::timestamp::ReplayWindow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable for the maximum signature age.
pub const ENV_MAX_AGE: &str = "MARKETPLACE_AUTH_MAX_AGE_SECS";
/// Environment variable for the tolerated future skew.
pub const ENV_MAX_FUTURE_SKEW: &str = "MARKETPLACE_AUTH_MAX_FUTURE_SKEW_SECS";
/// Environment variable naming the deployment environment.
pub const ENV_ENVIRONMENT: &str = "MARKETPLACE_ENVIRONMENT";
/// Environment variable requesting the development bypass.
pub const ENV_ALLOW_DEV_BYPASS: &str = "MARKETPLACE_AUTH_ALLOW_DEV_BYPASS";

/// Default maximum age of a signed request (10 minutes).
pub const DEFAULT_MAX_AGE_SECS: u64 = 600;
/// Default tolerated clock lead of a client (30 seconds).
pub const DEFAULT_MAX_FUTURE_SKEW_SECS: u64 = 30;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Live deployment. The bypass is never available.
    #[default]
    Production,
    /// Pre-release deployment.
    Staging,
    /// Local development.
    Development,
    /// Automated tests.
    Test,
}

impl Environment {
    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_ENVIRONMENT,
                value: s.to_string(),
            }),
        }
    }
}

/// Boot-time configuration failures. Fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// `max_message_age_secs` is zero.
    #[error("Maximum message age must be positive")]
    ZeroMaxAge,

    /// The future skew is not smaller than the maximum age.
    #[error("Future skew ({skew}s) must be smaller than maximum age ({max_age}s)")]
    SkewExceedsAge {
        /// Configured skew.
        skew: u64,
        /// Configured maximum age.
        max_age: u64,
    },

    /// Bypass requested in production.
    #[error(
        "SECURITY VIOLATION: development signature bypass requested in production. \
         Unset MARKETPLACE_AUTH_ALLOW_DEV_BYPASS or change MARKETPLACE_ENVIRONMENT."
    )]
    BypassInProduction,
}

/// Authentication gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Maximum message age in seconds.
    pub max_message_age_secs: u64,
    /// Maximum future timestamp skew in seconds.
    pub max_future_skew_secs: u64,
    /// Deployment environment.
    pub environment: Environment,
    /// Request the bypass sentinel (refused in production).
    pub allow_dev_bypass: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_message_age_secs: DEFAULT_MAX_AGE_SECS,
            max_future_skew_secs: DEFAULT_MAX_FUTURE_SKEW_SECS,
            environment: Environment::Production,
            allow_dev_bypass: false,
        }
    }
}

impl AuthConfig {
    /// Load from the process environment and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup and validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_AGE) {
            config.max_message_age_secs = parse_secs(ENV_MAX_AGE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_FUTURE_SKEW) {
            config.max_future_skew_secs = parse_secs(ENV_MAX_FUTURE_SKEW, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ENVIRONMENT) {
            config.environment = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_ALLOW_DEV_BYPASS) {
            config.allow_dev_bypass = parse_flag(ENV_ALLOW_DEV_BYPASS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent or insecure settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_age_secs == 0 {
            return Err(ConfigError::ZeroMaxAge);
        }
        if self.max_future_skew_secs >= self.max_message_age_secs {
            return Err(ConfigError::SkewExceedsAge {
                skew: self.max_future_skew_secs,
                max_age: self.max_message_age_secs,
            });
        }
        if self.allow_dev_bypass && self.environment == Environment::Production {
            return Err(ConfigError::BypassInProduction);
        }
        Ok(())
    }

    /// Whether the bypass sentinel is honored.
    pub fn bypass_active(&self) -> bool {
        self.allow_dev_bypass && self.environment != Environment::Production
    }

    /// Replay window described by this configuration.
    pub fn replay_window(&self) -> ReplayWindow {
        ReplayWindow::new(self.max_message_age_secs, self.max_future_skew_secs)
    }

    /// Test-environment config with the given window and no bypass.
    pub fn for_tests(max_message_age_secs: u64, max_future_skew_secs: u64) -> Self {
        Self {
            max_message_age_secs,
            max_future_skew_secs,
            environment: Environment::Test,
            allow_dev_bypass: false,
        }
    }
}

fn parse_secs(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
