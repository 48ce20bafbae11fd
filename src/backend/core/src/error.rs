//! Error handling for the access-control engine.
//!
//! The error taxonomy follows one rule above all others: a failure to decide
//! is a decision to deny. `Context` and `PermissionDenied` are terminal
//! denials and must never be converted into an allow by any caller.
//!
//! Variants that reach end users are written so they cannot leak security
//! state: `PermissionDenied` never names the rule that failed,
//! `AccountLocked` reports remaining cooldown but not the failure count, and
//! `PolicyViolation` names the unmet password rule without echoing the
//! attempted password.

use metrics::counter;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::rbac::models::UserId;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Supporting Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a session context could not be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDenyReason {
    /// The principal does not exist in the identity store.
    UnknownPrincipal,
    /// The principal exists but is soft-deactivated.
    Inactive,
}

impl fmt::Display for ContextDenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPrincipal => write!(f, "unknown principal"),
            Self::Inactive => write!(f, "principal is inactive"),
        }
    }
}

/// The specific password-policy rule that was not met.
///
/// Callers surface this to guide the user; the attempted password itself is
/// never part of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    /// Shorter than the configured minimum length.
    TooShort { min: usize },
    /// No uppercase letter.
    MissingUppercase,
    /// No lowercase letter.
    MissingLowercase,
    /// No decimal digit.
    MissingDigit,
    /// No symbol (non-alphanumeric character).
    MissingSymbol,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::MissingUppercase => write!(f, "password must contain an uppercase letter"),
            Self::MissingLowercase => write!(f, "password must contain a lowercase letter"),
            Self::MissingDigit => write!(f, "password must contain a digit"),
            Self::MissingSymbol => write!(f, "password must contain a symbol"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for the access-control engine.
#[derive(Debug, Error)]
pub enum WardenError {
    /// A session context could not be established for the principal.
    ///
    /// Equivalent to total denial. Never treat this as "no restrictions".
    #[error("context denied for principal {principal}: {reason}")]
    Context {
        principal: UserId,
        reason: ContextDenyReason,
    },

    /// An authorization check failed.
    ///
    /// Deliberately generic: the message never reveals which rule or
    /// permission was evaluated.
    #[error("permission denied")]
    PermissionDenied,

    /// A password failed the complexity policy.
    #[error("password rejected: {0}")]
    PolicyViolation(PasswordRule),

    /// Login attempted while the account lockout cooldown is active.
    ///
    /// Carries the remaining cooldown, not the failure count, to avoid
    /// aiding brute-force calibration.
    #[error("account locked; retry after {retry_after_secs}s")]
    AccountLocked { retry_after_secs: u64 },

    /// Username/password pair did not verify.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A revoke (or lookup) referenced a grant or record that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique-constraint violation when creating a record.
    #[error("{entity} already exists: {value}")]
    Duplicate { entity: &'static str, value: String },

    /// A mutating operation received structurally invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// A durable audit write failed for a sensitive operation.
    ///
    /// The triggering operation must be aborted.
    #[error("audit write failed: {0}")]
    AuditFailed(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    /// Password hashing backend failure.
    #[error("password hashing failed")]
    Hashing(String),

    /// Catch-all for internal failures. Callers on access paths must treat
    /// this as deny, not allow.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for WardenError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes & Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging and alerting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Expected denials and user mistakes.
    Low,
    /// Operational conditions worth watching (lockouts, duplicates).
    Medium,
    /// Failures that break a security guarantee if ignored.
    High,
}

impl WardenError {
    /// Stable machine-readable code for API responses and log filtering.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Context { .. } => "CONTEXT_DENIED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PolicyViolation(_) => "POLICY_VIOLATION",
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Duplicate { .. } => "DUPLICATE_RECORD",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::AuditFailed(_) => "AUDIT_FAILED",
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::Hashing(_) => "HASHING_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Severity for log routing.
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PermissionDenied
            | Self::InvalidCredentials
            | Self::PolicyViolation(_)
            | Self::InvalidInput(_)
            | Self::NotFound { .. } => ErrorSeverity::Low,

            Self::Context { .. } | Self::AccountLocked { .. } | Self::Duplicate { .. } => {
                ErrorSeverity::Medium
            }

            Self::AuditFailed(_)
            | Self::Configuration(_)
            | Self::Hashing(_)
            | Self::Internal(_) => ErrorSeverity::High,
        }
    }

    /// Whether this error represents an access denial (as opposed to an
    /// operational failure).
    pub const fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::Context { .. }
                | Self::PermissionDenied
                | Self::AccountLocked { .. }
                | Self::InvalidCredentials
        )
    }

    /// Log this error at the level matching its severity and record metrics.
    pub fn log(&self) {
        counter!("warden_errors_total", "code" => self.code()).increment(1);

        match self.severity() {
            ErrorSeverity::High => {
                error!(code = self.code(), error = %self, "access-control error");
            }
            ErrorSeverity::Medium => {
                warn!(code = self.code(), error = %self, "access-control error");
            }
            ErrorSeverity::Low => {
                debug!(code = self.code(), error = %self, "access-control denial");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
