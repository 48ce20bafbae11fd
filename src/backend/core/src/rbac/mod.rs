//! Role-based access control: identities, roles, permissions, and checks.
//!
//! The model is the classic three-level one: users hold roles, roles hold
//! permissions, and a user's effective permission set is the union across
//! their active roles. Checks are resolved against a session context built
//! from the authoritative store, never against caller-supplied claims.

pub mod admin;
pub mod evaluator;
pub mod models;
pub mod roles;
pub mod store;

pub use admin::Administration;
pub use evaluator::PermissionEvaluator;
pub use models::{ActionVerb, Permission, Role, RoleGrant, RoleId, User, UserId};
pub use roles::{SeedRole, ADMIN_OVERRIDE};
pub use store::IdentityStore;
