//! Assignment store: territory memberships, explicit resource grants, and
//! hierarchy edges.
//!
//! The same grant contract as the identity store applies: duplicate
//! assignments are logged no-ops, removals of absent assignments fail with
//! `NotFound`. Point lookups (`has_resource`, `has_report`) are the row
//! filter's hot path and stay O(1).

use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, WardenError};
use crate::rbac::models::UserId;

use super::models::{DataScope, HierarchyEdge, ResourceAssignment, TerritoryAssignment};

/// Store of everything that widens a user's row visibility beyond self-rows.
#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    /// User → territory assignments, history included.
    territories: Arc<DashMap<UserId, Vec<TerritoryAssignment>>>,
    /// `(user, entity, key)` → explicit resource grant.
    resources: Arc<DashMap<(UserId, String, String), ResourceAssignment>>,
    /// `(manager, report)` → direct reporting edge.
    hierarchy: Arc<DashMap<(UserId, UserId), HierarchyEdge>>,
    /// Manager → direct reports, denormalized for `reports_of`.
    reports_index: Arc<DashMap<UserId, Vec<UserId>>>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Territories
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign a user to a territory. Re-assigning an already-active territory
    /// is a no-op.
    pub fn assign_territory(&self, user_id: UserId, territory: &str) -> Result<()> {
        let mut held = self.territories.entry(user_id).or_default();
        if held.iter().any(|t| t.active && t.territory == territory) {
            counter!("warden_duplicate_grants_total", "kind" => "territory").increment(1);
            debug!(user_id = %user_id, territory, "duplicate territory assignment ignored");
            return Ok(());
        }
        held.push(TerritoryAssignment::new(user_id, territory));
        info!(user_id = %user_id, territory, "territory assigned");
        Ok(())
    }

    /// Deactivate a territory assignment. The record is kept for history.
    pub fn unassign_territory(&self, user_id: &UserId, territory: &str) -> Result<()> {
        let deactivated = self
            .territories
            .get_mut(user_id)
            .map(|mut held| {
                let mut hit = false;
                for t in held.iter_mut() {
                    if t.active && t.territory == territory {
                        t.active = false;
                        hit = true;
                    }
                }
                hit
            })
            .unwrap_or(false);

        if !deactivated {
            return Err(WardenError::NotFound {
                entity: "territory assignment",
                id: format!("{user_id}/{territory}"),
            });
        }
        info!(user_id = %user_id, territory, "territory unassigned");
        Ok(())
    }

    /// Active territory names for a user.
    pub fn territories_of(&self, user_id: &UserId) -> Vec<String> {
        self.territories
            .get(user_id)
            .map(|held| {
                held.iter()
                    .filter(|t| t.active)
                    .map(|t| t.territory.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The user's primary territory: the most recently effective active
    /// assignment.
    pub fn primary_territory(&self, user_id: &UserId) -> Option<String> {
        self.territories.get(user_id).and_then(|held| {
            held.iter()
                .filter(|t| t.active)
                .max_by_key(|t| t.effective_from)
                .map(|t| t.territory.clone())
        })
    }

    /// Whether the user has an active assignment to the territory.
    pub fn in_territory(&self, user_id: &UserId, territory: &str) -> bool {
        self.territories
            .get(user_id)
            .map(|held| held.iter().any(|t| t.active && t.territory == territory))
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a user explicit access to one resource row.
    pub fn assign_resource(&self, user_id: UserId, entity: &str, key: &str) -> Result<()> {
        let map_key = (user_id, entity.to_string(), key.to_string());
        if let Some(existing) = self.resources.get(&map_key) {
            if existing.active {
                counter!("warden_duplicate_grants_total", "kind" => "resource").increment(1);
                debug!(user_id = %user_id, entity, key, "duplicate resource assignment ignored");
                return Ok(());
            }
        }
        self.resources
            .insert(map_key, ResourceAssignment::new(user_id, entity, key));
        info!(user_id = %user_id, entity, key, "resource assigned");
        Ok(())
    }

    /// Deactivate an explicit resource grant.
    pub fn unassign_resource(&self, user_id: &UserId, entity: &str, key: &str) -> Result<()> {
        let map_key = (*user_id, entity.to_string(), key.to_string());
        let deactivated = self
            .resources
            .get_mut(&map_key)
            .map(|mut grant| {
                let was_active = grant.active;
                grant.active = false;
                was_active
            })
            .unwrap_or(false);

        if !deactivated {
            return Err(WardenError::NotFound {
                entity: "resource assignment",
                id: format!("{user_id}/{entity}/{key}"),
            });
        }
        info!(user_id = %user_id, entity, key, "resource unassigned");
        Ok(())
    }

    /// Point lookup: does the user hold an active grant for this row?
    pub fn has_resource(&self, user_id: &UserId, entity: &str, key: &str) -> bool {
        self.resources
            .get(&(*user_id, entity.to_string(), key.to_string()))
            .map(|grant| grant.active)
            .unwrap_or(false)
    }

    /// All active `(entity, key)` grants for a user. Walks the map; meant for
    /// scope summaries and predicate compilation, not the per-row path.
    pub fn resources_of(&self, user_id: &UserId) -> Vec<(String, String)> {
        self.resources
            .iter()
            .filter(|entry| entry.key().0 == *user_id && entry.value().active)
            .map(|entry| (entry.key().1.clone(), entry.key().2.clone()))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hierarchy
    // ─────────────────────────────────────────────────────────────────────────

    /// Record that `report` reports directly to `manager`.
    pub fn add_report(&self, manager: UserId, report: UserId) -> Result<()> {
        if manager == report {
            return Err(WardenError::InvalidInput(
                "a user cannot report to themselves",
            ));
        }
        let edge_key = (manager, report);
        if self
            .hierarchy
            .get(&edge_key)
            .map(|e| e.active)
            .unwrap_or(false)
        {
            counter!("warden_duplicate_grants_total", "kind" => "hierarchy").increment(1);
            debug!(manager = %manager, report = %report, "duplicate hierarchy edge ignored");
            return Ok(());
        }
        self.hierarchy
            .insert(edge_key, HierarchyEdge::new(manager, report));
        self.reports_index.entry(manager).or_default().push(report);
        info!(manager = %manager, report = %report, "hierarchy edge added");
        Ok(())
    }

    /// Deactivate a reporting edge.
    pub fn remove_report(&self, manager: &UserId, report: &UserId) -> Result<()> {
        let deactivated = self
            .hierarchy
            .get_mut(&(*manager, *report))
            .map(|mut edge| {
                let was_active = edge.active;
                edge.active = false;
                was_active
            })
            .unwrap_or(false);

        if !deactivated {
            return Err(WardenError::NotFound {
                entity: "hierarchy edge",
                id: format!("{manager}/{report}"),
            });
        }
        if let Some(mut reports) = self.reports_index.get_mut(manager) {
            reports.retain(|r| r != report);
        }
        info!(manager = %manager, report = %report, "hierarchy edge removed");
        Ok(())
    }

    /// Point lookup: does `report` report directly to `manager`?
    ///
    /// One edge only. Visibility never chains through intermediate managers.
    pub fn has_report(&self, manager: &UserId, report: &UserId) -> bool {
        self.hierarchy
            .get(&(*manager, *report))
            .map(|edge| edge.active)
            .unwrap_or(false)
    }

    /// Direct reports of a manager.
    pub fn reports_of(&self, manager: &UserId) -> Vec<UserId> {
        self.reports_index
            .get(manager)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Summary
    // ─────────────────────────────────────────────────────────────────────────

    /// Everything currently in a user's data scope.
    pub fn scope_of(&self, user_id: &UserId) -> DataScope {
        DataScope {
            territories: self.territories_of(user_id).into_iter().collect(),
            resources: self.resources_of(user_id).into_iter().collect(),
            reports: self.reports_of(user_id),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_territory_assign_unassign() {
        let store = AssignmentStore::new();
        let user = UserId::new();

        store.assign_territory(user, "West").unwrap();
        assert!(store.in_territory(&user, "West"));
        assert!(!store.in_territory(&user, "East"));

        store.unassign_territory(&user, "West").unwrap();
        assert!(!store.in_territory(&user, "West"));

        // History is kept but never matches.
        let err = store.unassign_territory(&user, "West").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_primary_territory_is_most_recent() {
        let store = AssignmentStore::new();
        let user = UserId::new();

        store.assign_territory(user, "West").unwrap();
        // Make the second assignment strictly later.
        {
            let mut held = store.territories.get_mut(&user).unwrap();
            held[0].effective_from = Utc::now() - chrono::Duration::days(30);
        }
        store.assign_territory(user, "East").unwrap();

        assert_eq!(store.primary_territory(&user).as_deref(), Some("East"));

        store.unassign_territory(&user, "East").unwrap();
        assert_eq!(store.primary_territory(&user).as_deref(), Some("West"));
    }

    #[test]
    fn test_duplicate_territory_is_noop() {
        let store = AssignmentStore::new();
        let user = UserId::new();

        store.assign_territory(user, "West").unwrap();
        store.assign_territory(user, "West").unwrap();
        assert_eq!(store.territories_of(&user), vec!["West"]);
    }

    #[test]
    fn test_resource_grant_round_trip() {
        let store = AssignmentStore::new();
        let user = UserId::new();

        store.assign_resource(user, "customers", "CUST-0042").unwrap();
        assert!(store.has_resource(&user, "customers", "CUST-0042"));
        assert!(!store.has_resource(&user, "customers", "CUST-0001"));
        assert!(!store.has_resource(&user, "sales", "CUST-0042"));

        store
            .unassign_resource(&user, "customers", "CUST-0042")
            .unwrap();
        assert!(!store.has_resource(&user, "customers", "CUST-0042"));
    }

    #[test]
    fn test_reactivating_resource_after_unassign() {
        let store = AssignmentStore::new();
        let user = UserId::new();

        store.assign_resource(user, "customers", "C1").unwrap();
        store.unassign_resource(&user, "customers", "C1").unwrap();
        store.assign_resource(user, "customers", "C1").unwrap();
        assert!(store.has_resource(&user, "customers", "C1"));
    }

    #[test]
    fn test_hierarchy_is_direct_only() {
        let store = AssignmentStore::new();
        let top = UserId::new();
        let mid = UserId::new();
        let leaf = UserId::new();

        store.add_report(top, mid).unwrap();
        store.add_report(mid, leaf).unwrap();

        assert!(store.has_report(&top, &mid));
        assert!(store.has_report(&mid, &leaf));
        // No transitive closure.
        assert!(!store.has_report(&top, &leaf));
    }

    #[test]
    fn test_self_edge_rejected() {
        let store = AssignmentStore::new();
        let user = UserId::new();
        let err = store.add_report(user, user).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(!store.has_report(&user, &user));
    }

    #[test]
    fn test_remove_report_and_not_found() {
        let store = AssignmentStore::new();
        let manager = UserId::new();
        let report = UserId::new();

        store.add_report(manager, report).unwrap();
        store.remove_report(&manager, &report).unwrap();
        assert!(!store.has_report(&manager, &report));
        assert!(store.reports_of(&manager).is_empty());

        let err = store.remove_report(&manager, &report).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_scope_summary() {
        let store = AssignmentStore::new();
        let manager = UserId::new();
        let report = UserId::new();

        store.assign_territory(manager, "West").unwrap();
        store.assign_resource(manager, "customers", "C1").unwrap();
        store.add_report(manager, report).unwrap();

        let scope = store.scope_of(&manager);
        assert!(scope.territories.contains("West"));
        assert!(scope
            .resources
            .contains(&("customers".to_string(), "C1".to_string())));
        assert_eq!(scope.reports, vec![report]);
        assert!(!scope.is_empty());

        assert!(store.scope_of(&report).is_empty());
    }
}
