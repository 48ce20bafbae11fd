//! Session context: the resolved identity every access decision reads from.
//!
//! A `SessionContext` is built once per request from the identity store, not
//! from caller-supplied claims. Role and territory claims arriving with a
//! request are treated as hints only; the store is authoritative, and any
//! divergence is logged. Permissions are resolved at build time so checks on
//! the hot path are set lookups, never store reads.

use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ContextDenyReason, Result, WardenError};
use crate::rbac::models::{RoleId, UserId};
use crate::rbac::roles::ADMIN_OVERRIDE;
use crate::rbac::store::IdentityStore;
use crate::scope::store::AssignmentStore;

// ═══════════════════════════════════════════════════════════════════════════════
// Session Context
// ═══════════════════════════════════════════════════════════════════════════════

/// The resolved identity of one authenticated principal.
///
/// Immutable once built. Holds everything the permission evaluator and the
/// row filter need, so neither touches the stores during evaluation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub principal: UserId,
    pub username: String,
    /// Active roles resolved from the store at build time.
    pub roles: Vec<RoleId>,
    /// Union of permission names across the active roles.
    permissions: HashSet<String>,
    /// Primary territory, if any territory assignment is active.
    pub territory: Option<String>,
    /// Cached result of the admin-override permission check.
    is_admin: bool,
}

impl SessionContext {
    /// Whether the context holds the named permission.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    /// Whether the context holds the administrative row-filter override.
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Number of resolved permissions (diagnostics only).
    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Request Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of a background process acting without a user session.
#[derive(Debug, Clone)]
pub struct SystemContext {
    /// Name of the process, recorded in audit entries.
    pub process: String,
}

impl SystemContext {
    pub fn new(process: impl Into<String>) -> Self {
        Self {
            process: process.into(),
        }
    }
}

/// The identity under which an operation runs.
///
/// System identity is a distinct variant rather than an absent user context,
/// so "no context" can never be confused with "trusted process". Code that
/// receives a `RequestContext` must match on it; there is no way to treat a
/// missing user as a bypass.
#[derive(Debug, Clone)]
pub enum RequestContext {
    /// An authenticated user session.
    User(SessionContext),
    /// A trusted background process (scheduled jobs, replication).
    System(SystemContext),
}

impl RequestContext {
    pub fn user(ctx: SessionContext) -> Self {
        Self::User(ctx)
    }

    pub fn system(process: impl Into<String>) -> Self {
        Self::System(SystemContext::new(process))
    }

    /// The user session, if this is a user request.
    pub fn session(&self) -> Option<&SessionContext> {
        match self {
            Self::User(ctx) => Some(ctx),
            Self::System(_) => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Context Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds session contexts from the authoritative stores.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    identities: Arc<IdentityStore>,
    assignments: Arc<AssignmentStore>,
}

impl ContextBuilder {
    pub fn new(identities: Arc<IdentityStore>, assignments: Arc<AssignmentStore>) -> Self {
        Self {
            identities,
            assignments,
        }
    }

    /// Resolve a session context for a principal.
    ///
    /// `claimed_roles` and `claimed_territory` are what the transport layer
    /// says the principal has (token claims, headers). They are never trusted:
    /// the store's answer wins, and divergence is logged as a warning since it
    /// usually means a stale token or a tampering attempt.
    ///
    /// Fails with `Context` if the principal is unknown or deactivated. That
    /// failure is a denial; callers must not fall back to any default scope.
    pub fn build(
        &self,
        principal: UserId,
        claimed_roles: &[RoleId],
        claimed_territory: Option<&str>,
    ) -> Result<SessionContext> {
        let user = self.identities.get_user(&principal).ok_or_else(|| {
            counter!("warden_context_denied_total", "reason" => "unknown").increment(1);
            WardenError::Context {
                principal,
                reason: ContextDenyReason::UnknownPrincipal,
            }
        })?;

        if !user.active {
            counter!("warden_context_denied_total", "reason" => "inactive").increment(1);
            return Err(WardenError::Context {
                principal,
                reason: ContextDenyReason::Inactive,
            });
        }

        let roles = self.identities.roles_of(&principal);
        let permissions = self.identities.permissions_of_roles(&roles);
        let territory = self.assignments.primary_territory(&principal);

        self.check_claims(&user.username, &roles, territory.as_deref(), claimed_roles, claimed_territory);

        let is_admin = permissions.contains(ADMIN_OVERRIDE);
        debug!(
            principal = %principal,
            username = %user.username,
            roles = roles.len(),
            permissions = permissions.len(),
            is_admin,
            "session context built"
        );

        Ok(SessionContext {
            principal,
            username: user.username,
            roles,
            permissions,
            territory,
            is_admin,
        })
    }

    /// Compare caller-supplied claims against the store's resolution.
    fn check_claims(
        &self,
        username: &str,
        resolved_roles: &[RoleId],
        resolved_territory: Option<&str>,
        claimed_roles: &[RoleId],
        claimed_territory: Option<&str>,
    ) {
        let resolved: HashSet<&RoleId> = resolved_roles.iter().collect();
        for claimed in claimed_roles {
            if !resolved.contains(claimed) {
                counter!("warden_claim_divergence_total", "kind" => "role").increment(1);
                warn!(
                    username,
                    claimed_role = %claimed,
                    "claimed role not held per identity store; ignoring claim"
                );
            }
        }

        if let Some(claimed) = claimed_territory {
            if resolved_territory != Some(claimed) {
                counter!("warden_claim_divergence_total", "kind" => "territory").increment(1);
                warn!(
                    username,
                    claimed_territory = claimed,
                    resolved_territory = resolved_territory.unwrap_or("none"),
                    "claimed territory diverges from assignments; ignoring claim"
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
