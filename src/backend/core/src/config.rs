//! Configuration for the access-control engine.
//!
//! Loaded from an optional file plus `WARDEN_`-prefixed environment
//! variables; the environment wins. Every knob has a safe default, so an
//! empty configuration yields a working engine.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Account lockout policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Consecutive failures at which the lock engages.
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// Cooldown length in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_cooldown_secs() -> u64 {
    900
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// Password complexity policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    #[serde(default = "default_true")]
    pub require_digit: bool,
    #[serde(default = "default_true")]
    pub require_symbol: bool,
}

fn default_min_length() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_symbol: true,
        }
    }
}

/// Audit pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Bound of the routine-event queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub password: PasswordPolicy,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl SecurityConfig {
    /// Load from `path` (if it exists) and the `WARDEN_` environment.
    ///
    /// Environment keys use `__` as the section separator, e.g.
    /// `WARDEN_LOCKOUT__MAX_FAILED_ATTEMPTS=3`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
