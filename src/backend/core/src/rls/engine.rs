//! The row filter: authoritative per-row visibility decisions.
//!
//! Rules are evaluated in a fixed order and the first match wins. The order
//! is part of the security contract because the matched rule is recorded in
//! audit entries; reordering would rewrite the audit story even where the
//! allow/deny outcome is unchanged.
//!
//! 1. Administrative override (the context holds the bypass permission)
//! 2. Self-row (the row's owner is the principal)
//! 3. Explicit resource assignment for the row's entity and key
//! 4. Direct hierarchy edge to the row's owner
//! 5. Territory match between principal and row
//! 6. System process (non-user request context)
//! 7. Denied

use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::context::RequestContext;
use crate::rbac::models::UserId;
use crate::scope::store::AssignmentStore;

// ═══════════════════════════════════════════════════════════════════════════════
// Row Descriptor
// ═══════════════════════════════════════════════════════════════════════════════

/// The scope-relevant attributes of one data row.
///
/// Callers project their rows into this shape; the engine never sees the
/// rest of the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDescriptor {
    /// Entity the row belongs to, e.g. "customers" or "sales".
    pub entity: String,
    /// The row's business key.
    pub key: String,
    /// Owning user, if the entity tracks ownership.
    pub owner: Option<UserId>,
    /// Territory the row is attributed to, if any.
    pub territory: Option<String>,
}

impl RowDescriptor {
    pub fn new(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            key: key.into(),
            owner: None,
            territory: None,
        }
    }

    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn in_territory(mut self, territory: impl Into<String>) -> Self {
        self.territory = Some(territory.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decisions
// ═══════════════════════════════════════════════════════════════════════════════

/// The rule that granted visibility. Numbered by evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRule {
    AdminOverride,
    SelfRow,
    ResourceAssignment,
    Hierarchy,
    Territory,
    SystemProcess,
}

impl ScopeRule {
    /// Position in the evaluation order, 1-based.
    pub const fn rule_number(&self) -> u8 {
        match self {
            Self::AdminOverride => 1,
            Self::SelfRow => 2,
            Self::ResourceAssignment => 3,
            Self::Hierarchy => 4,
            Self::Territory => 5,
            Self::SystemProcess => 6,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AdminOverride => "admin_override",
            Self::SelfRow => "self_row",
            Self::ResourceAssignment => "resource_assignment",
            Self::Hierarchy => "hierarchy",
            Self::Territory => "territory",
            Self::SystemProcess => "system_process",
        }
    }
}

impl fmt::Display for ScopeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of evaluating one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// The row is visible; carries the rule that matched.
    Visible(ScopeRule),
    /// No rule matched.
    Denied,
}

impl FilterDecision {
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible(_))
    }

    /// The matching rule, if visible.
    pub fn rule(&self) -> Option<ScopeRule> {
        match self {
            Self::Visible(rule) => Some(*rule),
            Self::Denied => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// The authoritative row filter.
#[derive(Debug, Clone)]
pub struct RowFilterEngine {
    assignments: Arc<AssignmentStore>,
}

impl RowFilterEngine {
    pub fn new(assignments: Arc<AssignmentStore>) -> Self {
        Self { assignments }
    }

    /// Evaluate one row against a request context. First matching rule wins.
    pub fn evaluate(&self, ctx: &RequestContext, row: &RowDescriptor) -> FilterDecision {
        let decision = self.evaluate_inner(ctx, row);
        counter!(
            "warden_row_decisions_total",
            "outcome" => match decision.rule() {
                Some(rule) => rule.as_str(),
                None => "denied",
            }
        )
        .increment(1);
        decision
    }

    fn evaluate_inner(&self, ctx: &RequestContext, row: &RowDescriptor) -> FilterDecision {
        let session = match ctx {
            RequestContext::User(session) => session,
            RequestContext::System(system) => {
                // Rules 1-5 are user rules; a system identity reaches rule 6
                // directly.
                trace!(process = %system.process, entity = %row.entity, "system context row access");
                return FilterDecision::Visible(ScopeRule::SystemProcess);
            }
        };

        if session.is_admin() {
            return FilterDecision::Visible(ScopeRule::AdminOverride);
        }

        if row.owner == Some(session.principal) {
            return FilterDecision::Visible(ScopeRule::SelfRow);
        }

        if self
            .assignments
            .has_resource(&session.principal, &row.entity, &row.key)
        {
            return FilterDecision::Visible(ScopeRule::ResourceAssignment);
        }

        if let Some(owner) = row.owner {
            if self.assignments.has_report(&session.principal, &owner) {
                return FilterDecision::Visible(ScopeRule::Hierarchy);
            }
        }

        if let Some(territory) = &row.territory {
            if self.assignments.in_territory(&session.principal, territory) {
                return FilterDecision::Visible(ScopeRule::Territory);
            }
        }

        FilterDecision::Denied
    }

    /// Filter a batch of rows, keeping visible ones with their matched rule.
    pub fn filter<'a>(
        &self,
        ctx: &RequestContext,
        rows: impl IntoIterator<Item = &'a RowDescriptor>,
    ) -> Vec<(&'a RowDescriptor, ScopeRule)> {
        rows.into_iter()
            .filter_map(|row| match self.evaluate(ctx, row) {
                FilterDecision::Visible(rule) => Some((row, rule)),
                FilterDecision::Denied => None,
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
