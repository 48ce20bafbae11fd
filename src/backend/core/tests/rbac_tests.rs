//! Role and permission management flows.

use proptest::prelude::*;
use std::sync::Arc;
use warden_core::prelude::*;
use warden_core::rbac::ADMIN_OVERRIDE;

struct Harness {
    identities: Arc<IdentityStore>,
    assignments: Arc<AssignmentStore>,
    admin: Administration,
}

impl Harness {
    fn new() -> Self {
        let identities = Arc::new(IdentityStore::with_seed_roles());
        let assignments = Arc::new(AssignmentStore::new());
        Self {
            identities: identities.clone(),
            assignments: assignments.clone(),
            admin: Administration::new(identities, assignments),
        }
    }

    fn session(&self, name: &str, role: &str) -> SessionContext {
        let user = self
            .identities
            .create_user(name, format!("{name}@example.com"), "hash")
            .unwrap();
        self.identities
            .grant_role(&user.id, &RoleId::new(role), None)
            .unwrap();
        ContextBuilder::new(self.identities.clone(), self.assignments.clone())
            .build(user.id, &[], None)
            .unwrap()
    }
}

#[test]
fn test_grant_changes_take_effect_on_next_context() {
    let h = Harness::new();
    let actor = h.session("root", "admin");
    let target = h
        .identities
        .create_user("bob", "bob@example.com", "hash")
        .unwrap();

    let builder = ContextBuilder::new(h.identities.clone(), h.assignments.clone());
    let before = builder.build(target.id, &[], None).unwrap();
    assert!(!before.has_permission("sales:read"));

    h.admin
        .grant_role(&actor, &target.id, &RoleId::new("viewer"))
        .unwrap();

    let after = builder.build(target.id, &[], None).unwrap();
    assert!(after.has_permission("sales:read"));
    assert!(!after.has_permission(ADMIN_OVERRIDE));
}

#[test]
fn test_admin_gating_is_fail_closed() {
    let h = Harness::new();
    let low = h.session("low", "poweruser");
    let target = h
        .identities
        .create_user("bob", "bob@example.com", "hash")
        .unwrap();

    let err = h
        .admin
        .grant_role(&low, &target.id, &RoleId::new("admin"))
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
    assert!(h.identities.roles_of(&target.id).is_empty());

    let err = h
        .admin
        .assign_territory(&low, target.id, "West")
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
}

#[test]
fn test_claimed_roles_are_ignored() {
    let h = Harness::new();
    let user = h
        .identities
        .create_user("eve", "eve@example.com", "hash")
        .unwrap();
    h.identities
        .grant_role(&user.id, &RoleId::new("viewer"), None)
        .unwrap();

    // Claims say admin; the store says viewer. The store wins.
    let ctx = ContextBuilder::new(h.identities.clone(), h.assignments.clone())
        .build(user.id, &[RoleId::new("superadmin")], Some("West"))
        .unwrap();
    assert!(!ctx.is_admin());
    assert_eq!(ctx.territory, None);

    let eval = PermissionEvaluator::new();
    assert!(eval.require_permission(&ctx, "users:write").is_err());
}

#[test]
fn test_revoking_admin_role_drops_override() {
    let h = Harness::new();
    let user = h
        .identities
        .create_user("ops", "ops@example.com", "hash")
        .unwrap();
    h.identities
        .grant_role(&user.id, &RoleId::new("admin"), None)
        .unwrap();
    h.identities
        .grant_role(&user.id, &RoleId::new("viewer"), None)
        .unwrap();

    let builder = ContextBuilder::new(h.identities.clone(), h.assignments.clone());
    assert!(builder.build(user.id, &[], None).unwrap().is_admin());

    h.identities
        .revoke_role(&user.id, &RoleId::new("admin"))
        .unwrap();
    let ctx = builder.build(user.id, &[], None).unwrap();
    assert!(!ctx.is_admin());
    assert!(ctx.has_permission("sales:read"));
}

proptest! {
    /// After any interleaving of grants and revokes, the effective
    /// permission set is exactly the union over the roles still held.
    #[test]
    fn prop_permissions_are_union_of_held_roles(
        ops in proptest::collection::vec((0usize..5, any::<bool>()), 0..20),
    ) {
        let h = Harness::new();
        let user = h.identities
            .create_user("prop", "prop@example.com", "hash")
            .unwrap();

        let roles = ["superadmin", "admin", "manager", "poweruser", "viewer"];
        let mut held = std::collections::HashSet::new();

        for (idx, grant) in ops {
            let role = RoleId::new(roles[idx]);
            if grant {
                h.identities.grant_role(&user.id, &role, None).unwrap();
                held.insert(roles[idx]);
            } else if held.remove(roles[idx]) {
                h.identities.revoke_role(&user.id, &role).unwrap();
            } else {
                // Revoking a role that is not held must fail, not corrupt.
                prop_assert!(h.identities.revoke_role(&user.id, &role).is_err());
            }
        }

        let expected: std::collections::HashSet<String> = held
            .iter()
            .flat_map(|name| {
                h.identities
                    .permissions_of_roles(&[RoleId::new(*name)])
                    .into_iter()
            })
            .collect();
        prop_assert_eq!(h.identities.permissions_of(&user.id), expected);
    }
}
