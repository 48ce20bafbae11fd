//! Seed roles with default permission sets.
//!
//! Five tiers ship out of the box, from unrestricted to read-only:
//!
//! | Role       | Description                                                   |
//! |------------|---------------------------------------------------------------|
//! | SuperAdmin | Unrestricted; every permission including the override         |
//! | Admin      | Row-filter override; manages users, roles, and data           |
//! | Manager    | Read/write on business data; sees direct reports' rows        |
//! | PowerUser  | Read on business data plus report execution and sales writes  |
//! | Viewer     | Read-only on business data                                    |
//!
//! The model supports arbitrary additional roles; these are only the seeds.

use super::models::{ActionVerb, Permission, Role};

/// Reserved administrative-override permission name.
///
/// Holding this permission, through any role, is the single condition the
/// row filter engine checks for its bypass. Keying the bypass on a permission
/// rather than a role name means renaming a role can never silently widen or
/// narrow visibility.
pub const ADMIN_OVERRIDE: &str = "system:execute";

/// Business-data resource categories used by the seed permission sets.
const DATA_RESOURCES: &[&str] = &["sales", "customers", "inventory", "analytics"];

/// Seed role templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedRole {
    SuperAdmin,
    Admin,
    Manager,
    PowerUser,
    Viewer,
}

impl SeedRole {
    /// The role identifier string.
    pub fn id(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "superadmin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::PowerUser => "poweruser",
            Self::Viewer => "viewer",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SuperAdmin",
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::PowerUser => "PowerUser",
            Self::Viewer => "Viewer",
        }
    }

    /// Description recorded on the role row.
    pub fn description(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Unrestricted access to every resource and operation",
            Self::Admin => "Administers users and roles; bypasses row filtering",
            Self::Manager => "Reads and writes business data for their scope",
            Self::PowerUser => "Reads business data and runs reports",
            Self::Viewer => "Read-only access to business data",
        }
    }

    /// Default permission set for this tier.
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Self::SuperAdmin => {
                let mut perms = Vec::new();
                for resource in DATA_RESOURCES
                    .iter()
                    .chain(["users", "roles", "audit", "system"].iter())
                {
                    for action in [
                        ActionVerb::Read,
                        ActionVerb::Write,
                        ActionVerb::Delete,
                        ActionVerb::Execute,
                    ] {
                        perms.push(Permission::new(*resource, action));
                    }
                }
                perms
            }
            Self::Admin => {
                let mut perms = Vec::new();
                for resource in DATA_RESOURCES {
                    perms.push(Permission::new(*resource, ActionVerb::Read));
                    perms.push(Permission::new(*resource, ActionVerb::Write));
                    perms.push(Permission::new(*resource, ActionVerb::Delete));
                }
                perms.push(Permission::new("users", ActionVerb::Read));
                perms.push(Permission::new("users", ActionVerb::Write));
                perms.push(Permission::new("roles", ActionVerb::Read));
                perms.push(Permission::new("roles", ActionVerb::Write));
                perms.push(Permission::new("audit", ActionVerb::Read));
                // The row-filter bypass.
                perms.push(Permission::new("system", ActionVerb::Execute));
                perms
            }
            Self::Manager => {
                let mut perms = Vec::new();
                for resource in DATA_RESOURCES {
                    perms.push(Permission::new(*resource, ActionVerb::Read));
                    perms.push(Permission::new(*resource, ActionVerb::Write));
                }
                perms.push(Permission::new("users", ActionVerb::Read));
                perms.push(Permission::new("analytics", ActionVerb::Execute));
                perms
            }
            Self::PowerUser => {
                let mut perms = Vec::new();
                for resource in DATA_RESOURCES {
                    perms.push(Permission::new(*resource, ActionVerb::Read));
                }
                perms.push(Permission::new("sales", ActionVerb::Write));
                perms.push(Permission::new("analytics", ActionVerb::Execute));
                perms
            }
            Self::Viewer => DATA_RESOURCES
                .iter()
                .map(|r| Permission::new(*r, ActionVerb::Read))
                .collect(),
        }
    }

    /// Build the `Role` record for this tier.
    pub fn to_role(&self) -> Role {
        Role::new(self.id(), self.name(), self.description()).seed()
    }

    /// All seed tiers, most to least privileged.
    pub fn all() -> Vec<SeedRole> {
        vec![
            Self::SuperAdmin,
            Self::Admin,
            Self::Manager,
            Self::PowerUser,
            Self::Viewer,
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
