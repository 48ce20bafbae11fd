//! Data-scope assignments: territories, explicit resource grants, and the
//! reporting hierarchy.

pub mod models;
pub mod store;

pub use models::{DataScope, HierarchyEdge, ResourceAssignment, TerritoryAssignment};
pub use store::AssignmentStore;
