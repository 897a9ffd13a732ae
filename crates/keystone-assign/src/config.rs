//! Reconciler configuration.
//!
//! Holds the default domains used during resolution, the management policy,
//! and the settings of the `openstack` command runner. Configuration is loaded
//! from environment variables with defaults matching a stock Keystone
//! deployment.

use keystone_scope::DomainDefaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration shared by every reconciler built from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Domains and system target substituted for omitted attributes.
    pub defaults: DomainDefaults,

    /// When set, reconcilers only read; grants and revokes are skipped.
    pub do_not_manage: bool,

    /// Command runner settings.
    pub cli: CliConfig,
}

impl ReconcileConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables (unset and empty variables keep the default):
    /// - `KEYSTONE_DEFAULT_DOMAIN`: default for both principal and project domains (default: default)
    /// - `KEYSTONE_USER_DOMAIN`: default principal domain, overrides the above
    /// - `KEYSTONE_PROJECT_DOMAIN`: default project domain, overrides the above
    /// - `KEYSTONE_SYSTEM_SCOPE`: system scope target (default: all)
    /// - `KEYSTONE_DO_NOT_MANAGE`: read-only mode when `true` or `1` (default: false)
    /// - `OPENSTACK_CLI`: client program (default: openstack)
    /// - `OPENSTACK_CLI_MAX_ATTEMPTS`: attempts per call, counting the first (default: 3)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let default = Self::default();

        let mut defaults = var("KEYSTONE_DEFAULT_DOMAIN")
            .map(DomainDefaults::with_domain)
            .unwrap_or(default.defaults);
        if let Some(domain) = var("KEYSTONE_USER_DOMAIN") {
            defaults.principal_domain = domain;
        }
        if let Some(domain) = var("KEYSTONE_PROJECT_DOMAIN") {
            defaults.project_domain = domain;
        }
        if let Some(target) = var("KEYSTONE_SYSTEM_SCOPE") {
            defaults.system_scope = target;
        }

        Self {
            defaults,
            do_not_manage: var("KEYSTONE_DO_NOT_MANAGE")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(default.do_not_manage),
            cli: CliConfig {
                program: var("OPENSTACK_CLI").unwrap_or(default.cli.program),
                max_attempts: var("OPENSTACK_CLI_MAX_ATTEMPTS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.cli.max_attempts),
                initial_delay_ms: default.cli.initial_delay_ms,
                max_delay_ms: default.cli.max_delay_ms,
            },
        }
    }

    /// Validate that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("defaults.principal_domain", &self.defaults.principal_domain),
            ("defaults.project_domain", &self.defaults.project_domain),
            ("defaults.system_scope", &self.defaults.system_scope),
            ("cli.program", &self.cli.program),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        if self.cli.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cli.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for the `openstack` command runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Program to execute.
    pub program: String,

    /// Attempts per call, counting the first one.
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between retries, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: "openstack".to_string(),
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
        }
    }
}

impl CliConfig {
    /// Retry policy for transient command failures.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            exponential_base: 2.0,
        }
    }
}
