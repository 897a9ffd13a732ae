//! Reconciliation tests against an in-memory identity service.
//!
//! The fake service keeps the assigned roles of a single target and records
//! every call, so the tests can check both the resulting state and the exact
//! sequence of grants and revokes.
//!
//! Scenarios:
//! 1. Absent target: exists → create
//! 2. Present target: set_roles computes and applies the delta
//! 3. Destroy revokes every current role
//! 4. Failures abort the batch and surface unchanged
//! 5. Read-only policy issues no grants or revokes

use std::cell::RefCell;
use std::collections::BTreeSet;

use keystone_assign::{
    Action, AssignError, AssignmentState, CommandError, CommandErrorKind, Declaration, Ensure,
    IdentityAttribute, Invoke, Outcome, ReconcileConfig, Record, ResourceKind, RoleAssignment,
    RoleSet,
};
use keystone_scope::{DeclaredAttributes, ScopeKind};

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
struct Call {
    resource: ResourceKind,
    action: Action,
    args: Vec<String>,
}

/// In-memory identity service holding the roles of one target.
#[derive(Debug, Default)]
struct FakeKeystone {
    /// Roles currently assigned.
    assigned: RefCell<BTreeSet<String>>,
    /// Every call received, in order.
    calls: RefCell<Vec<Call>>,
    /// Fail calls with this action and role name.
    fail_on: RefCell<Option<(Action, String, CommandErrorKind)>>,
}

impl FakeKeystone {
    fn with_roles(roles: &[&str]) -> Self {
        let fake = Self::default();
        fake.assigned
            .borrow_mut()
            .extend(roles.iter().map(|r| r.to_string()));
        fake
    }

    fn fail_on(&self, action: Action, role: &str, kind: CommandErrorKind) {
        *self.fail_on.borrow_mut() = Some((action, role.to_string(), kind));
    }

    fn assigned(&self) -> Vec<String> {
        self.assigned.borrow().iter().cloned().collect()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn calls_for(&self, action: Action) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.resource == ResourceKind::Role && c.action == action)
            .collect()
    }

    fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl Invoke for FakeKeystone {
    fn invoke(
        &self,
        resource: ResourceKind,
        action: Action,
        args: &[String],
    ) -> Result<Vec<Record>, CommandError> {
        self.calls.borrow_mut().push(Call {
            resource,
            action,
            args: args.to_vec(),
        });

        if let Some((fail_action, role, kind)) = self.fail_on.borrow().clone() {
            if fail_action == action && args.first() == Some(&role) {
                return Err(CommandError::new(
                    kind,
                    format!("openstack {} {} {}", resource, action, args.join(" ")),
                    "You are not authorized to perform the requested action. (HTTP 403)",
                ));
            }
        }

        match (resource, action) {
            (ResourceKind::RoleAssignment, Action::List) => Ok(self
                .assigned
                .borrow()
                .iter()
                .map(|role| {
                    Record::new()
                        .with("Role", role.as_str())
                        .with("User", "bob@Default")
                        .with("Group", "")
                        .with("Project", "alpha@Default")
                        .with("Domain", "")
                        .with("System", "")
                })
                .collect()),
            (ResourceKind::Role, Action::Add) => {
                self.assigned.borrow_mut().insert(args[0].clone());
                Ok(Vec::new())
            }
            (ResourceKind::Role, Action::Remove) => {
                if self.assigned.borrow_mut().remove(&args[0]) {
                    Ok(Vec::new())
                } else {
                    Err(CommandError::new(
                        CommandErrorKind::NotFound,
                        "openstack role remove",
                        "Role assignment could not be found",
                    ))
                }
            }
            _ => panic!("unexpected call {} {}", resource, action),
        }
    }
}

fn bob_on_alpha() -> DeclaredAttributes {
    DeclaredAttributes::user("bob").project("alpha")
}

fn target_args() -> Vec<String> {
    [
        "--project",
        "alpha",
        "--project-domain",
        "default",
        "--user",
        "bob",
        "--user-domain",
        "default",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn assignment<'a>(
    fake: &'a FakeKeystone,
    roles: &[&str],
) -> RoleAssignment<&'a FakeKeystone> {
    RoleAssignment::from_declared(
        fake,
        &ReconcileConfig::default(),
        &bob_on_alpha(),
        roles.iter().copied(),
    )
    .unwrap()
}

fn set(roles: &[&str]) -> RoleSet {
    roles.iter().copied().collect()
}

// ============================================================================
// Scenario 1: absent target
// ============================================================================

#[test]
fn exists_queries_with_names_and_target_args() {
    let fake = FakeKeystone::default();
    let mut assignment = assignment(&fake, &["admin"]);

    assert!(!assignment.exists().unwrap());
    assert_eq!(assignment.state(), &AssignmentState::Absent);

    let mut expected = vec!["--names".to_string()];
    expected.extend(target_args());
    assert_eq!(
        fake.calls(),
        vec![Call {
            resource: ResourceKind::RoleAssignment,
            action: Action::List,
            args: expected,
        }]
    );
}

#[test]
fn create_grants_admin_to_bob_on_alpha() {
    let fake = FakeKeystone::default();
    let mut assignment = assignment(&fake, &["admin"]);

    assert!(!assignment.exists().unwrap());
    fake.clear_calls();
    assignment.create().unwrap();

    let mut expected = vec!["admin".to_string()];
    expected.extend(target_args());
    assert_eq!(
        fake.calls(),
        vec![Call {
            resource: ResourceKind::Role,
            action: Action::Add,
            args: expected,
        }]
    );
    assert_eq!(assignment.roles(), Some(&set(&["admin"])));
}

#[test]
fn create_grants_each_desired_role_once() {
    let fake = FakeKeystone::default();
    let mut assignment = assignment(&fake, &["a", "b", "a"]);

    assignment.exists().unwrap();
    assignment.create().unwrap();

    assert_eq!(fake.calls_for(Action::Add).len(), 2);
    assert!(fake.calls_for(Action::Remove).is_empty());
    assert_eq!(fake.assigned(), vec!["a", "b"]);
}

#[test]
fn create_without_roles_does_nothing() {
    let fake = FakeKeystone::default();
    let mut assignment = assignment(&fake, &[]);

    assert!(!assignment.exists().unwrap());
    assignment.create().unwrap();

    assert_eq!(fake.calls().len(), 1);
    assert_eq!(assignment.state(), &AssignmentState::Absent);
}

// ============================================================================
// Scenario 2: present target
// ============================================================================

#[test]
fn exists_caches_exactly_the_returned_roles() {
    let fake = FakeKeystone::with_roles(&["admin", "viewer"]);
    let mut assignment = assignment(&fake, &[]);

    assert!(assignment.exists().unwrap());
    assert_eq!(assignment.roles(), Some(&set(&["admin", "viewer"])));
}

#[test]
fn set_roles_adds_member_and_removes_viewer() {
    let fake = FakeKeystone::with_roles(&["admin", "viewer"]);
    let mut assignment = assignment(&fake, &["admin", "member"]);

    assignment.exists().unwrap();
    fake.clear_calls();
    let delta = assignment.set_roles(["admin", "member"]).unwrap();

    assert_eq!(delta.add, set(&["member"]));
    assert_eq!(delta.remove, set(&["viewer"]));

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].action, Action::Add);
    assert_eq!(calls[0].args[0], "member");
    assert_eq!(calls[1].action, Action::Remove);
    assert_eq!(calls[1].args[0], "viewer");
    assert_eq!(&calls[1].args[1..], target_args().as_slice());

    assert_eq!(fake.assigned(), vec!["admin", "member"]);
}

#[test]
fn set_roles_is_idempotent() {
    let fake = FakeKeystone::with_roles(&["admin", "viewer"]);

    let mut first = assignment(&fake, &["admin", "member"]);
    first.exists().unwrap();
    let applied = first.set_roles(["admin", "member"]).unwrap();
    assert!(!applied.is_empty());

    // A new pass re-reads the service
    let mut second = assignment(&fake, &["admin", "member"]);
    second.exists().unwrap();
    fake.clear_calls();
    let delta = second.set_roles(["admin", "member"]).unwrap();

    assert!(delta.add.is_empty());
    assert!(delta.remove.is_empty());
    assert!(fake.calls().is_empty());
}

#[test]
fn set_roles_queries_when_state_is_unknown() {
    let fake = FakeKeystone::with_roles(&["viewer"]);
    let mut assignment = assignment(&fake, &[]);

    let delta = assignment.set_roles(["viewer", "member"]).unwrap();

    assert_eq!(delta.add, set(&["member"]));
    assert!(delta.remove.is_empty());
    assert_eq!(fake.calls()[0].action, Action::List);
}

#[test]
fn set_roles_to_empty_revokes_everything() {
    let fake = FakeKeystone::with_roles(&["admin", "member"]);
    let mut assignment = assignment(&fake, &["admin", "member"]);

    assignment.exists().unwrap();
    let delta = assignment.set_roles(Vec::<String>::new()).unwrap();

    assert_eq!(delta.remove, set(&["admin", "member"]));
    assert_eq!(assignment.state(), &AssignmentState::Absent);
    assert!(fake.assigned().is_empty());
}

#[test]
fn role_names_are_case_sensitive() {
    let fake = FakeKeystone::with_roles(&["Admin"]);
    let mut assignment = assignment(&fake, &["admin"]);

    assignment.exists().unwrap();
    let delta = assignment.set_roles(["admin"]).unwrap();

    assert_eq!(delta.add, set(&["admin"]));
    assert_eq!(delta.remove, set(&["Admin"]));
}

// ============================================================================
// Scenario 3: destroy
// ============================================================================

#[test]
fn destroy_revokes_every_current_role() {
    let fake = FakeKeystone::with_roles(&["a", "b"]);
    let mut assignment = assignment(&fake, &["a"]);

    assignment.exists().unwrap();
    fake.clear_calls();
    assignment.destroy().unwrap();

    let revoked: BTreeSet<String> = fake
        .calls_for(Action::Remove)
        .into_iter()
        .map(|c| c.args[0].clone())
        .collect();
    assert_eq!(fake.calls().len(), 2);
    assert_eq!(
        revoked,
        ["a", "b"].iter().map(|s| s.to_string()).collect::<BTreeSet<String>>()
    );
    assert_eq!(assignment.state(), &AssignmentState::Absent);
}

#[test]
fn destroy_on_unknown_state_queries_first() {
    let fake = FakeKeystone::with_roles(&["a"]);
    let mut assignment = assignment(&fake, &[]);

    assignment.destroy().unwrap();

    let actions: Vec<_> = fake.calls().into_iter().map(|c| c.action).collect();
    assert_eq!(actions, vec![Action::List, Action::Remove]);
    assert!(fake.assigned().is_empty());
}

#[test]
fn revoking_an_already_revoked_role_is_not_an_error() {
    let fake = FakeKeystone::with_roles(&["a", "b"]);
    let mut assignment = assignment(&fake, &[]);

    assignment.exists().unwrap();
    // Someone else revoked "a" between the query and the destroy
    fake.assigned.borrow_mut().remove("a");

    assignment.destroy().unwrap();
    assert!(fake.assigned().is_empty());
}

// ============================================================================
// Scenario 4: failures
// ============================================================================

#[test]
fn failed_grant_aborts_the_batch() {
    let fake = FakeKeystone::default();
    fake.fail_on(Action::Add, "b", CommandErrorKind::Failed);
    let mut assignment = assignment(&fake, &["a", "b", "c"]);

    assignment.exists().unwrap();
    let err = assignment.create().unwrap_err();

    match err {
        AssignError::Command(ref inner) => {
            assert_eq!(inner.kind, CommandErrorKind::Failed);
            assert!(inner.message.contains("HTTP 403"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    let granted: Vec<_> = fake
        .calls_for(Action::Add)
        .into_iter()
        .map(|c| c.args[0].clone())
        .collect();
    assert_eq!(granted, vec!["a", "b"]);
    assert_eq!(fake.assigned(), vec!["a"]);
}

#[test]
fn failed_revoke_still_leaves_target_absent() {
    let fake = FakeKeystone::with_roles(&["a", "b"]);
    fake.fail_on(Action::Remove, "a", CommandErrorKind::Failed);
    let mut assignment = assignment(&fake, &[]);

    assignment.exists().unwrap();
    assert!(assignment.destroy().is_err());
    assert_eq!(assignment.state(), &AssignmentState::Absent);
}

#[test]
fn failed_query_propagates() {
    let failing = FailingList;
    let mut assignment = RoleAssignment::from_declared(
        &failing,
        &ReconcileConfig::default(),
        &bob_on_alpha(),
        ["admin"],
    )
    .unwrap();

    let err = assignment.exists().unwrap_err();
    assert_eq!(
        err.command_error().map(|e| e.kind),
        Some(CommandErrorKind::Transient)
    );
    assert_eq!(assignment.state(), &AssignmentState::Unknown);
}

struct FailingList;

impl Invoke for FailingList {
    fn invoke(&self, _: ResourceKind, _: Action, _: &[String]) -> Result<Vec<Record>, CommandError> {
        Err(CommandError::new(
            CommandErrorKind::Transient,
            "openstack role assignment list",
            "Unable to establish connection",
        ))
    }
}

// ============================================================================
// Scenario 5: policy, accessors and full passes
// ============================================================================

#[test]
fn unmanaged_reconciler_only_reads() {
    let fake = FakeKeystone::with_roles(&["viewer"]);
    let config = ReconcileConfig {
        do_not_manage: true,
        ..ReconcileConfig::default()
    };
    let mut assignment =
        RoleAssignment::from_declared(&fake, &config, &bob_on_alpha(), ["admin"]).unwrap();

    assert!(assignment.exists().unwrap());
    assignment.create().unwrap();
    assert!(assignment.set_roles(["admin"]).unwrap().is_empty());
    assignment.destroy().unwrap();

    assert!(fake.calls_for(Action::Add).is_empty());
    assert!(fake.calls_for(Action::Remove).is_empty());
    assert_eq!(fake.assigned(), vec!["viewer"]);
}

#[test]
fn accessors_fall_back_to_declared_values() {
    let fake = FakeKeystone::with_roles(&["admin"]);
    let mut assignment = assignment(&fake, &["admin"]);

    assert_eq!(assignment.principal(), Some("bob"));
    assert_eq!(assignment.principal_domain(), Some("default"));
    assert_eq!(assignment.scope(), Some("alpha"));
    assert_eq!(assignment.scope_domain(), Some("default"));
    assert_eq!(assignment.scope_kind(), ScopeKind::Project);
    assert_eq!(assignment.attribute(IdentityAttribute::ScopeKind), Some("project"));

    assignment.exists().unwrap();
    assert_eq!(assignment.principal(), Some("bob"));
    assert_eq!(assignment.principal_domain(), Some("Default"));
    assert_eq!(assignment.scope_domain(), Some("Default"));
}

#[test]
fn system_scope_never_carries_domain_arguments() {
    let fake = FakeKeystone::default();
    let mut assignment = RoleAssignment::from_declared(
        &fake,
        &ReconcileConfig::default(),
        &DeclaredAttributes::user("bob").system(""),
        ["reader"],
    )
    .unwrap();

    assignment.exists().unwrap();
    assignment.create().unwrap();

    for call in fake.calls() {
        assert!(!call.args.iter().any(|a| a == "--project-domain" || a == "--project"));
        assert!(call.args.windows(2).any(|w| w[0] == "--system" && w[1] == "all"));
    }
    assert_eq!(assignment.scope_domain(), None);
}

#[test]
fn apply_converges_in_one_pass() {
    let fake = FakeKeystone::default();

    let mut first = assignment(&fake, &["admin", "member"]);
    assert_eq!(
        first.apply(Ensure::Present).unwrap(),
        Outcome::Created(set(&["admin", "member"]))
    );

    let mut second = assignment(&fake, &["admin", "member"]);
    assert_eq!(second.apply(Ensure::Present).unwrap(), Outcome::Unchanged);

    let mut third = assignment(&fake, &["admin"]);
    match third.apply(Ensure::Present).unwrap() {
        Outcome::Updated(delta) => assert_eq!(delta.remove, set(&["member"])),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let mut fourth = assignment(&fake, &[]);
    assert_eq!(
        fourth.apply(Ensure::Absent).unwrap(),
        Outcome::Destroyed(set(&["admin"]))
    );
    assert!(fake.assigned().is_empty());
}

#[test]
fn prepared_declarations_reconcile_independently() {
    let fake = FakeKeystone::default();
    let declarations = vec![Declaration::new("bob-alpha", bob_on_alpha(), ["admin"])];

    let prepared = keystone_assign::prepare(&&fake, &ReconcileConfig::default(), &declarations)
        .unwrap();
    assert!(fake.calls().is_empty());

    for (ensure, mut assignment) in prepared {
        assignment.apply(ensure).unwrap();
    }
    assert_eq!(fake.assigned(), vec!["admin"]);
}

#[test]
fn unmanaged_set_roles_keeps_declared_roles() {
    let fake = FakeKeystone::with_roles(&["viewer"]);
    let config = ReconcileConfig {
        do_not_manage: true,
        ..ReconcileConfig::default()
    };
    let mut assignment =
        RoleAssignment::from_declared(&fake, &config, &bob_on_alpha(), ["admin"]).unwrap();

    assert!(assignment.set_roles(["member"]).unwrap().is_empty());
    assert_eq!(assignment.desired(), &set(&["admin"]));
    assert_eq!(assignment.roles(), Some(&set(&["viewer"])));
}

#[test]
fn blank_default_domain_is_rejected_before_any_call() {
    let fake = FakeKeystone::default();
    let mut config = ReconcileConfig::default();
    config.defaults.principal_domain = String::new();

    let err = RoleAssignment::from_declared(&fake, &config, &bob_on_alpha(), ["admin"])
        .unwrap_err();

    assert!(matches!(err, AssignError::Config(_)));
    assert!(err.to_string().contains("defaults.principal_domain"));
    assert!(fake.calls().is_empty());
}

/// Reports one role held by group `ops` on domain `Admin`.
struct GroupOnDomain;

impl Invoke for GroupOnDomain {
    fn invoke(&self, resource: ResourceKind, action: Action, _: &[String]) -> Result<Vec<Record>, CommandError> {
        assert_eq!((resource, action), (ResourceKind::RoleAssignment, Action::List));
        Ok(vec![Record::new()
            .with("Role", "reader")
            .with("User", "")
            .with("Group", "ops")
            .with("Project", "")
            .with("Domain", "Admin")
            .with("System", "")])
    }
}

#[test]
fn live_identity_for_group_on_domain() {
    let mut assignment = RoleAssignment::from_declared(
        GroupOnDomain,
        &ReconcileConfig::default(),
        &DeclaredAttributes::group("ops").domain("admin"),
        ["reader"],
    )
    .unwrap();

    assert!(assignment.exists().unwrap());
    assert_eq!(assignment.roles(), Some(&set(&["reader"])));
    assert_eq!(assignment.principal(), Some("ops"));
    assert_eq!(assignment.principal_domain(), Some("default"));
    assert_eq!(assignment.scope(), Some("Admin"));
    assert_eq!(assignment.scope_domain(), None);
    assert_eq!(assignment.scope_kind(), ScopeKind::Domain);
}
