//! Identity data models: users, roles, permissions, and grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Strongly-typed role identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permission
// ═══════════════════════════════════════════════════════════════════════════════

/// The action verb a permission grants on its resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionVerb {
    Read,
    Write,
    Delete,
    Execute,
}

impl ActionVerb {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for ActionVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One granted capability: an action verb on a resource category.
///
/// Permission names follow the canonical `resource:action` format, e.g.
/// `sales:read` or `users:write`. The name is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission id.
    pub id: Uuid,
    /// Canonical unique name, `resource:action`.
    pub name: String,
    /// The resource category (e.g. "sales", "users").
    pub resource: String,
    /// The action this permission allows.
    pub action: ActionVerb,
}

impl Permission {
    /// Create a permission; the canonical name is derived from the parts.
    pub fn new(resource: impl Into<String>, action: ActionVerb) -> Self {
        let resource = resource.into();
        Self {
            id: Uuid::new_v4(),
            name: format!("{resource}:{action}"),
            resource,
            action,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role
// ═══════════════════════════════════════════════════════════════════════════════

/// A role groups a set of permissions under a named identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique role identifier.
    pub id: RoleId,
    /// Human-readable name (unique).
    pub name: String,
    /// Description of the role's purpose.
    pub description: String,
    /// Whether the role is active.
    pub active: bool,
    /// Whether this is a built-in seed role (cannot be deleted).
    pub is_seed: bool,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: RoleId::new(id),
            name: name.into(),
            description: description.into(),
            active: true,
            is_seed: false,
            created_at: Utc::now(),
        }
    }

    /// Mark this as a built-in seed role.
    pub fn seed(mut self) -> Self {
        self.is_seed = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// User
// ═══════════════════════════════════════════════════════════════════════════════

/// A durable user record.
///
/// Users are never hard-deleted; deactivation flips `active` so audit rows
/// keep a valid referent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 password hash (never the plaintext).
    pub password_hash: String,
    /// Soft-deletion flag.
    pub active: bool,
    pub email_verified: bool,
    /// Consecutive failed login attempts since the last success.
    pub failed_logins: u32,
    /// If set and in the future, the account is locked until this instant.
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            active: true,
            email_verified: false,
            failed_logins: 0,
            locked_until: None,
            last_login: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Whether the lockout cooldown is still running at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Grants
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata attached to a user↔role grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrant {
    /// Who performed the grant (None for bootstrap/seeding).
    pub assigned_by: Option<UserId>,
    pub assigned_at: DateTime<Utc>,
}

impl RoleGrant {
    pub fn new(assigned_by: Option<UserId>) -> Self {
        Self {
            assigned_by,
            assigned_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
