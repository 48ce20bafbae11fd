//! Identity store: durable records of users, roles, permissions, and their
//! many-to-many mappings.
//!
//! Grant operations are idempotent: granting an already-held role or
//! permission is a logged no-op, never an error. Revoking a grant that does
//! not exist fails with `NotFound` so callers can detect stale assumptions.
//! Thread-safe via `DashMap`.

use dashmap::DashMap;
use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, WardenError};

use super::models::{Permission, Role, RoleGrant, RoleId, User, UserId};
use super::roles::SeedRole;

/// The central identity store.
///
/// Clones share the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    users: Arc<DashMap<UserId, User>>,
    /// Username → user id (usernames are unique).
    username_index: Arc<DashMap<String, UserId>>,
    /// Email → user id (emails are unique).
    email_index: Arc<DashMap<String, UserId>>,
    roles: Arc<DashMap<RoleId, Role>>,
    /// Permissions keyed by canonical unique name.
    permissions: Arc<DashMap<String, Permission>>,
    /// User → held roles with grant metadata. Map semantics give the
    /// uniqueness invariant for free.
    user_roles: Arc<DashMap<UserId, HashMap<RoleId, RoleGrant>>>,
    /// Role → granted permission names.
    role_permissions: Arc<DashMap<RoleId, HashSet<String>>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the five seed roles and their
    /// default permission sets.
    pub fn with_seed_roles() -> Self {
        let store = Self::new();
        store.seed_defaults();
        store
    }

    /// Install the seed roles and their permission grants. Safe to call more
    /// than once; existing records are left untouched.
    pub fn seed_defaults(&self) {
        for seed in SeedRole::all() {
            let role = seed.to_role();
            let role_id = role.id.clone();
            self.roles.entry(role_id.clone()).or_insert(role);

            let mut granted = self.role_permissions.entry(role_id).or_default();
            for perm in seed.permissions() {
                let name = perm.name.clone();
                self.permissions.entry(name.clone()).or_insert(perm);
                granted.insert(name);
            }
        }
        info!(roles = SeedRole::all().len(), "seed roles installed");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a user. Fails with `Duplicate` if the username or email is
    /// already taken.
    pub fn create_user(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<User> {
        let user = User::new(username, email, password_hash);

        if self.username_index.contains_key(&user.username) {
            return Err(WardenError::Duplicate {
                entity: "user",
                value: user.username,
            });
        }
        if self.email_index.contains_key(&user.email) {
            return Err(WardenError::Duplicate {
                entity: "user",
                value: user.email,
            });
        }

        self.username_index
            .insert(user.username.clone(), user.id);
        self.email_index.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Soft-deactivate a user. The record stays so audit rows keep a valid
    /// referent; hard deletion is not supported.
    pub fn deactivate_user(&self, user_id: &UserId) -> Result<()> {
        self.with_user_mut(user_id, |user| {
            user.active = false;
            user.modified_at = chrono::Utc::now();
        })?;
        info!(user_id = %user_id, "user deactivated");
        Ok(())
    }

    pub fn get_user(&self, user_id: &UserId) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn find_by_username(&self, username: &str) -> Option<User> {
        let id = *self.username_index.get(username)?;
        self.get_user(&id)
    }

    /// Apply a mutation to a user record under the store's shard lock.
    ///
    /// The closure runs while the entry is exclusively held, so
    /// read-modify-write sequences (the failed-login counter in particular)
    /// are serializable: two racing updates cannot both observe the same
    /// starting value.
    pub fn with_user_mut<R>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&mut User) -> R,
    ) -> Result<R> {
        match self.users.get_mut(user_id) {
            Some(mut entry) => Ok(f(entry.value_mut())),
            None => Err(WardenError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles & permissions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_role(&self, role: Role) -> Result<()> {
        if self.roles.contains_key(&role.id) {
            return Err(WardenError::Duplicate {
                entity: "role",
                value: role.id.to_string(),
            });
        }
        debug!(role_id = %role.id, "role created");
        self.roles.insert(role.id.clone(), role);
        Ok(())
    }

    pub fn get_role(&self, role_id: &RoleId) -> Option<Role> {
        self.roles.get(role_id).map(|r| r.clone())
    }

    pub fn create_permission(&self, permission: Permission) -> Result<()> {
        if self.permissions.contains_key(&permission.name) {
            return Err(WardenError::Duplicate {
                entity: "permission",
                value: permission.name,
            });
        }
        debug!(permission = %permission.name, "permission created");
        self.permissions.insert(permission.name.clone(), permission);
        Ok(())
    }

    pub fn get_permission(&self, name: &str) -> Option<Permission> {
        self.permissions.get(name).map(|p| p.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a role to a user. Granting an already-held role is a no-op.
    pub fn grant_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        assigned_by: Option<UserId>,
    ) -> Result<()> {
        if !self.users.contains_key(user_id) {
            return Err(WardenError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
        if !self.roles.contains_key(role_id) {
            return Err(WardenError::NotFound {
                entity: "role",
                id: role_id.to_string(),
            });
        }

        let mut held = self.user_roles.entry(*user_id).or_default();
        if held.contains_key(role_id) {
            counter!("warden_duplicate_grants_total", "kind" => "role").increment(1);
            debug!(user_id = %user_id, role_id = %role_id, "duplicate role grant ignored");
            return Ok(());
        }
        held.insert(role_id.clone(), RoleGrant::new(assigned_by));
        info!(user_id = %user_id, role_id = %role_id, "role granted");
        Ok(())
    }

    /// Revoke a role from a user. Fails with `NotFound` if the grant does
    /// not exist.
    pub fn revoke_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<()> {
        let removed = self
            .user_roles
            .get_mut(user_id)
            .map(|mut held| held.remove(role_id).is_some())
            .unwrap_or(false);

        if !removed {
            return Err(WardenError::NotFound {
                entity: "role grant",
                id: format!("{user_id}/{role_id}"),
            });
        }
        info!(user_id = %user_id, role_id = %role_id, "role revoked");
        Ok(())
    }

    /// Grant a permission to a role. Idempotent on duplicates.
    pub fn grant_permission(&self, role_id: &RoleId, permission_name: &str) -> Result<()> {
        if !self.roles.contains_key(role_id) {
            return Err(WardenError::NotFound {
                entity: "role",
                id: role_id.to_string(),
            });
        }
        if !self.permissions.contains_key(permission_name) {
            return Err(WardenError::NotFound {
                entity: "permission",
                id: permission_name.to_string(),
            });
        }

        let mut granted = self.role_permissions.entry(role_id.clone()).or_default();
        if !granted.insert(permission_name.to_string()) {
            counter!("warden_duplicate_grants_total", "kind" => "permission").increment(1);
            debug!(role_id = %role_id, permission = permission_name, "duplicate permission grant ignored");
        }
        Ok(())
    }

    /// Revoke a permission from a role. Fails with `NotFound` if absent.
    pub fn revoke_permission(&self, role_id: &RoleId, permission_name: &str) -> Result<()> {
        let removed = self
            .role_permissions
            .get_mut(role_id)
            .map(|mut granted| granted.remove(permission_name))
            .unwrap_or(false);

        if !removed {
            return Err(WardenError::NotFound {
                entity: "permission grant",
                id: format!("{role_id}/{permission_name}"),
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution (read side)
    // ─────────────────────────────────────────────────────────────────────────

    /// Active roles currently held by a user.
    pub fn roles_of(&self, user_id: &UserId) -> Vec<RoleId> {
        let Some(held) = self.user_roles.get(user_id) else {
            return Vec::new();
        };
        held.keys()
            .filter(|role_id| {
                self.roles
                    .get(*role_id)
                    .map(|r| r.active)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Union of permission names across a set of roles.
    pub fn permissions_of_roles(&self, role_ids: &[RoleId]) -> HashSet<String> {
        let mut perms = HashSet::new();
        for role_id in role_ids {
            if let Some(granted) = self.role_permissions.get(role_id) {
                perms.extend(granted.iter().cloned());
            }
        }
        perms
    }

    /// Union of permission names a user holds through all active roles.
    pub fn permissions_of(&self, user_id: &UserId) -> HashSet<String> {
        self.permissions_of_roles(&self.roles_of(user_id))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
