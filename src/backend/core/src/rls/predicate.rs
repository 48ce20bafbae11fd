//! Predicate compilation: a user's row scope as a pushdown filter.
//!
//! The per-row engine is the authority; the predicate is an optimization for
//! callers that want to push filtering into a query instead of fetching and
//! discarding. A compiled predicate must accept exactly the rows the engine
//! would show, so the two are kept behaviorally equivalent and tested as
//! such.
//!
//! The compiled form is a small expression tree. `matches` evaluates it
//! in-process; `to_sql` renders it as a WHERE fragment for SQL backends.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::rbac::models::UserId;
use crate::scope::store::AssignmentStore;

use super::engine::RowDescriptor;

/// Column names the SQL rendering targets.
#[derive(Debug, Clone)]
pub struct SqlColumns {
    pub owner: &'static str,
    pub key: &'static str,
    pub territory: &'static str,
}

impl Default for SqlColumns {
    fn default() -> Self {
        Self {
            owner: "owner_id",
            key: "row_key",
            territory: "territory",
        }
    }
}

/// A compiled row-visibility predicate for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPredicate {
    /// Every row matches (admin override, system process).
    True,
    /// No row matches.
    False,
    /// The row's owner is one of these users (self plus direct reports).
    OwnerIn(BTreeSet<UserId>),
    /// The row's key is one of these explicitly assigned keys.
    KeyIn(BTreeSet<String>),
    /// The row's territory is one of these.
    TerritoryIn(BTreeSet<String>),
    /// Any branch matching makes the row visible.
    Or(Vec<RowPredicate>),
}

impl RowPredicate {
    /// Evaluate against a row descriptor.
    pub fn matches(&self, row: &RowDescriptor) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::OwnerIn(owners) => row.owner.is_some_and(|o| owners.contains(&o)),
            Self::KeyIn(keys) => keys.contains(&row.key),
            Self::TerritoryIn(territories) => row
                .territory
                .as_deref()
                .is_some_and(|t| territories.contains(t)),
            Self::Or(branches) => branches.iter().any(|b| b.matches(row)),
        }
    }

    /// Render as a SQL WHERE fragment.
    ///
    /// `1=1` and `1=0` stand in for the trivial predicates so the fragment
    /// can always be spliced after `WHERE` or `AND`.
    pub fn to_sql(&self, cols: &SqlColumns) -> String {
        match self {
            Self::True => "1=1".to_string(),
            Self::False => "1=0".to_string(),
            Self::OwnerIn(owners) => in_list(
                cols.owner,
                owners.iter().map(|o| o.to_string()),
            ),
            Self::KeyIn(keys) => in_list(cols.key, keys.iter().cloned()),
            Self::TerritoryIn(territories) => {
                in_list(cols.territory, territories.iter().cloned())
            }
            Self::Or(branches) => {
                let parts: Vec<String> = branches.iter().map(|b| b.to_sql(cols)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }

    /// Drop empty branches and collapse trivial trees.
    fn simplify(self) -> Self {
        match self {
            Self::Or(branches) => {
                let mut kept: Vec<RowPredicate> = branches
                    .into_iter()
                    .map(Self::simplify)
                    .filter(|b| *b != Self::False)
                    .collect();
                if kept.iter().any(|b| *b == Self::True) {
                    return Self::True;
                }
                match kept.len() {
                    0 => Self::False,
                    1 => kept.remove(0),
                    _ => Self::Or(kept),
                }
            }
            Self::OwnerIn(owners) if owners.is_empty() => Self::False,
            Self::KeyIn(keys) if keys.is_empty() => Self::False,
            Self::TerritoryIn(territories) if territories.is_empty() => Self::False,
            other => other,
        }
    }
}

fn in_list(column: &str, values: impl Iterator<Item = String>) -> String {
    let quoted: Vec<String> = values
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect();
    format!("{column} IN ({})", quoted.join(", "))
}

/// Compiles predicates from the assignment store.
#[derive(Debug, Clone)]
pub struct PredicateCompiler {
    assignments: Arc<AssignmentStore>,
}

impl PredicateCompiler {
    pub fn new(assignments: Arc<AssignmentStore>) -> Self {
        Self { assignments }
    }

    /// Compile the visibility predicate for one entity under a context.
    ///
    /// The branches mirror the engine's rules: owner-in (self plus direct
    /// reports), key-in (explicit grants for this entity), territory-in.
    /// Admin and system contexts compile to the trivially-true predicate.
    pub fn compile(&self, ctx: &RequestContext, entity: &str) -> RowPredicate {
        let session = match ctx {
            RequestContext::User(session) => session,
            RequestContext::System(_) => return RowPredicate::True,
        };
        if session.is_admin() {
            return RowPredicate::True;
        }

        let mut owners: BTreeSet<UserId> = BTreeSet::new();
        owners.insert(session.principal);
        owners.extend(self.assignments.reports_of(&session.principal));

        let keys: BTreeSet<String> = self
            .assignments
            .resources_of(&session.principal)
            .into_iter()
            .filter(|(e, _)| e == entity)
            .map(|(_, key)| key)
            .collect();

        let territories: BTreeSet<String> = self
            .assignments
            .territories_of(&session.principal)
            .into_iter()
            .collect();

        RowPredicate::Or(vec![
            RowPredicate::OwnerIn(owners),
            RowPredicate::KeyIn(keys),
            RowPredicate::TerritoryIn(territories),
        ])
        .simplify()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
