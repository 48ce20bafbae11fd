//! Data-scope models: the assignments that drive row-level filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::rbac::models::UserId;

/// A user's membership in a sales territory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryAssignment {
    pub user_id: UserId,
    /// Territory name, e.g. "West" or "EMEA-North".
    pub territory: String,
    /// Inactive assignments are kept for history but never match.
    pub active: bool,
    /// When the assignment took effect; the most recent active assignment
    /// is the user's primary territory.
    pub effective_from: DateTime<Utc>,
}

impl TerritoryAssignment {
    pub fn new(user_id: UserId, territory: impl Into<String>) -> Self {
        Self {
            user_id,
            territory: territory.into(),
            active: true,
            effective_from: Utc::now(),
        }
    }
}

/// An explicit grant of one resource row to one user.
///
/// The narrowest scope instrument: it names a single row key within an
/// entity, e.g. customer `CUST-0042`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAssignment {
    pub user_id: UserId,
    /// Entity the key belongs to, e.g. "customers".
    pub entity: String,
    /// The row's business key.
    pub key: String,
    pub active: bool,
    pub assigned_at: DateTime<Utc>,
}

impl ResourceAssignment {
    pub fn new(user_id: UserId, entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user_id,
            entity: entity.into(),
            key: key.into(),
            active: true,
            assigned_at: Utc::now(),
        }
    }
}

/// A direct reporting edge: `report` reports to `manager`.
///
/// Visibility through the hierarchy is one edge deep. A manager sees their
/// direct reports' rows but not their reports' reports; transitive closure
/// is deliberately not computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub manager: UserId,
    pub report: UserId,
    pub active: bool,
    pub established_at: DateTime<Utc>,
}

impl HierarchyEdge {
    pub fn new(manager: UserId, report: UserId) -> Self {
        Self {
            manager,
            report,
            active: true,
            established_at: Utc::now(),
        }
    }
}

/// Summary of everything in a user's data scope, for diagnostics and the
/// predicate compiler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataScope {
    /// Active territory names, sorted.
    pub territories: BTreeSet<String>,
    /// Active `(entity, key)` resource grants, sorted.
    pub resources: BTreeSet<(String, String)>,
    /// Direct reports.
    pub reports: Vec<UserId>,
}

impl DataScope {
    /// True when every scope instrument is empty. Such a user sees only
    /// their own rows.
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty() && self.resources.is_empty() && self.reports.is_empty()
    }
}
