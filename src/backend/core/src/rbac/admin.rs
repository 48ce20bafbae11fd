//! Administrative surface: grant and revoke operations gated by permission
//! checks on the acting session.
//!
//! The stores themselves are unguarded by design (bootstrap and tests drive
//! them directly); everything exposed to an authenticated caller goes
//! through here.

use std::sync::Arc;
use tracing::info;

use crate::context::SessionContext;
use crate::error::Result;
use crate::scope::store::AssignmentStore;

use super::evaluator::PermissionEvaluator;
use super::models::{Permission, Role, RoleId, UserId};
use super::store::IdentityStore;

/// Permission-gated administration of identities and assignments.
#[derive(Debug, Clone)]
pub struct Administration {
    identities: Arc<IdentityStore>,
    assignments: Arc<AssignmentStore>,
    evaluator: PermissionEvaluator,
}

impl Administration {
    pub fn new(identities: Arc<IdentityStore>, assignments: Arc<AssignmentStore>) -> Self {
        Self {
            identities,
            assignments,
            evaluator: PermissionEvaluator::new(),
        }
    }

    /// Create a role. Requires `roles:write`.
    pub fn create_role(&self, actor: &SessionContext, role: Role) -> Result<()> {
        self.evaluator.require_permission(actor, "roles:write")?;
        let role_id = role.id.clone();
        self.identities.create_role(role)?;
        info!(actor = %actor.principal, role_id = %role_id, "role created by administrator");
        Ok(())
    }

    /// Create a permission. Requires `roles:write`.
    pub fn create_permission(
        &self,
        actor: &SessionContext,
        permission: Permission,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "roles:write")?;
        self.identities.create_permission(permission)
    }

    /// Grant a permission to a role. Requires `roles:write`.
    pub fn grant_permission(
        &self,
        actor: &SessionContext,
        role_id: &RoleId,
        permission_name: &str,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "roles:write")?;
        self.identities.grant_permission(role_id, permission_name)?;
        info!(actor = %actor.principal, role_id = %role_id, permission = permission_name, "permission granted by administrator");
        Ok(())
    }

    /// Revoke a permission from a role. Requires `roles:write`.
    pub fn revoke_permission(
        &self,
        actor: &SessionContext,
        role_id: &RoleId,
        permission_name: &str,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "roles:write")?;
        self.identities.revoke_permission(role_id, permission_name)
    }

    /// Grant a role to a user. Requires `roles:write`.
    pub fn grant_role(
        &self,
        actor: &SessionContext,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "roles:write")?;
        self.identities
            .grant_role(user_id, role_id, Some(actor.principal))?;
        info!(actor = %actor.principal, user_id = %user_id, role_id = %role_id, "role granted by administrator");
        Ok(())
    }

    /// Revoke a role from a user. Requires `roles:write`.
    pub fn revoke_role(
        &self,
        actor: &SessionContext,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "roles:write")?;
        self.identities.revoke_role(user_id, role_id)
    }

    /// Soft-deactivate a user. Requires `users:write`.
    pub fn deactivate_user(&self, actor: &SessionContext, user_id: &UserId) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.identities.deactivate_user(user_id)
    }

    /// Assign a user to a territory. Requires `users:write`.
    pub fn assign_territory(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        territory: &str,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.assignments.assign_territory(user_id, territory)
    }

    /// Remove a user's territory assignment. Requires `users:write`.
    pub fn unassign_territory(
        &self,
        actor: &SessionContext,
        user_id: &UserId,
        territory: &str,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.assignments.unassign_territory(user_id, territory)
    }

    /// Grant explicit access to one resource row. Requires `users:write`.
    pub fn assign_resource(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        entity: &str,
        key: &str,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.assignments.assign_resource(user_id, entity, key)
    }

    /// Remove an explicit resource grant. Requires `users:write`.
    pub fn unassign_resource(
        &self,
        actor: &SessionContext,
        user_id: &UserId,
        entity: &str,
        key: &str,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.assignments.unassign_resource(user_id, entity, key)
    }

    /// Record a direct reporting edge. Requires `users:write`.
    pub fn add_report(
        &self,
        actor: &SessionContext,
        manager: UserId,
        report: UserId,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.assignments.add_report(manager, report)
    }

    /// Remove a direct reporting edge. Requires `users:write`.
    pub fn remove_report(
        &self,
        actor: &SessionContext,
        manager: &UserId,
        report: &UserId,
    ) -> Result<()> {
        self.evaluator.require_permission(actor, "users:write")?;
        self.assignments.remove_report(manager, report)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
