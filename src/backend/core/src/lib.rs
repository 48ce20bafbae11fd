//! # Warden Core
//!
//! An embeddable access-control engine combining role-based permission
//! checks, row-level data filtering, and access auditing.
//!
//! ## Architecture
//!
//! - **rbac**: users, roles, permissions, and the evaluator that checks
//!   them against a session context
//! - **scope**: the assignments that widen row visibility (territories,
//!   explicit resource grants, the reporting hierarchy)
//! - **context**: resolved per-request identity, built from the stores
//!   rather than caller claims
//! - **rls**: the row filter engine and its predicate compiler
//! - **account**: credentials, password policy, and login lockout
//! - **audit**: the dual-path access log
//!
//! ## Security posture
//!
//! Every decision path fails closed. A context that cannot be established, a
//! permission that cannot be confirmed, or a row no rule matches is a
//! denial; errors never widen visibility.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_core::prelude::*;
//!
//! # #[tokio::main] async fn main() -> warden_core::Result<()> {
//! let identities = Arc::new(IdentityStore::with_seed_roles());
//! let assignments = Arc::new(AssignmentStore::new());
//!
//! let user = identities.create_user("alice", "alice@example.com", "hash")?;
//! identities.grant_role(&user.id, &RoleId::new("viewer"), None)?;
//! assignments.assign_territory(user.id, "West")?;
//!
//! let session = ContextBuilder::new(identities, assignments.clone())
//!     .build(user.id, &[], None)?;
//! let engine = RowFilterEngine::new(assignments);
//!
//! let row = RowDescriptor::new("sales", "S-1001").in_territory("West");
//! assert!(engine.evaluate(&RequestContext::user(session), &row).is_visible());
//! # Ok(()) }
//! ```

pub mod account;
pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod rbac;
pub mod rls;
pub mod scope;
pub mod telemetry;

pub use error::{Result, WardenError};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::account::AccountService;
    pub use crate::audit::{AccessType, AuditEntry, AuditLogger, AuditSink, MemorySink};
    pub use crate::config::SecurityConfig;
    pub use crate::context::{ContextBuilder, RequestContext, SessionContext};
    pub use crate::error::{Result, WardenError};
    pub use crate::rbac::{
        Administration, IdentityStore, Permission, PermissionEvaluator, Role, RoleId, User,
        UserId,
    };
    pub use crate::rls::{
        FilterDecision, PredicateCompiler, RowDescriptor, RowFilterEngine, RowPredicate,
        ScopeRule,
    };
    pub use crate::scope::AssignmentStore;
}
