//! Configuration loading and validation.
//!
//! Values are read from `KEYRULER_`-prefixed environment variables, e.g.
//! `KEYRULER_PROVIDER_TIMEOUT_MS=2000`. Missing variables take their defaults.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::provider::memory::{IssuePolicy, DEFAULT_MAX_USES};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "KEYRULER";

/// Validated codec and provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Per-call key provider timeout in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Maximum seals served by one key before a context gets a new key.
    #[serde(default = "default_max_seals_per_key")]
    pub max_seals_per_key: u64,

    /// Reuse one key per context (`true`) or mint a key per seal (`false`).
    #[serde(default = "default_key_reuse")]
    pub key_reuse: bool,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_provider_timeout_ms() -> u64 {
    5000
}
fn default_max_seals_per_key() -> u64 {
    DEFAULT_MAX_USES
}
fn default_key_reuse() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_provider_timeout_ms(),
            max_seals_per_key: default_max_seals_per_key(),
            key_reuse: default_key_reuse(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Provider timeout as a [`Duration`].
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Issue policy for [`InMemoryKeyProvider`](crate::provider::InMemoryKeyProvider).
    pub fn issue_policy(&self) -> IssuePolicy {
        if self.key_reuse {
            IssuePolicy::ReusePerContext {
                max_uses: self.max_seals_per_key,
            }
        } else {
            IssuePolicy::FreshPerCall
        }
    }

    fn validate(&self) -> Result<()> {
        if self.provider_timeout_ms == 0 {
            anyhow::bail!("KEYRULER_PROVIDER_TIMEOUT_MS must be > 0");
        }
        if self.max_seals_per_key == 0 {
            anyhow::bail!("KEYRULER_MAX_SEALS_PER_KEY must be > 0");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("KEYRULER_LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_provider_timeout_ms(), 5000);
        assert_eq!(default_max_seals_per_key(), 1 << 24);
        assert!(default_key_reuse());
        assert_eq!(default_log_level(), "info");
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            provider_timeout_ms: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_seals() {
        let cfg = Config {
            max_seals_per_key: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn issue_policy_follows_key_reuse() {
        let cfg = Config {
            max_seals_per_key: 10,
            ..Config::default()
        };
        assert_eq!(cfg.issue_policy(), IssuePolicy::ReusePerContext { max_uses: 10 });

        let cfg = Config {
            key_reuse: false,
            ..Config::default()
        };
        assert_eq!(cfg.issue_policy(), IssuePolicy::FreshPerCall);
    }

    #[test]
    fn provider_timeout_in_millis() {
        let cfg = Config {
            provider_timeout_ms: 250,
            ..Config::default()
        };
        assert_eq!(cfg.provider_timeout(), Duration::from_millis(250));
    }
}
