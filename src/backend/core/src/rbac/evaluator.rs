//! Permission evaluation against a resolved session context.
//!
//! Checks read only the permission set cached on the context. The evaluator
//! fails closed: anything it cannot positively confirm is a denial.

use metrics::counter;
use tracing::debug;

use crate::context::SessionContext;
use crate::error::{Result, WardenError};

use super::roles::ADMIN_OVERRIDE;

/// Stateless permission evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Whether the context holds the named permission.
    pub fn has_permission(&self, ctx: &SessionContext, permission: &str) -> bool {
        let allowed = ctx.has_permission(permission);
        counter!(
            "warden_permission_checks_total",
            "outcome" => if allowed { "allow" } else { "deny" }
        )
        .increment(1);
        if !allowed {
            debug!(
                principal = %ctx.principal,
                permission,
                "permission check denied"
            );
        }
        allowed
    }

    /// Whether the context holds the administrative override.
    pub fn is_admin(&self, ctx: &SessionContext) -> bool {
        self.has_permission(ctx, ADMIN_OVERRIDE)
    }

    /// Require a permission, failing with `PermissionDenied` when absent.
    ///
    /// The returned error is generic on purpose; it never names the
    /// permission that was checked.
    pub fn require_permission(&self, ctx: &SessionContext, permission: &str) -> Result<()> {
        if self.has_permission(ctx, permission) {
            Ok(())
        } else {
            Err(WardenError::PermissionDenied)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
