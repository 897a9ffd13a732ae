//! Role assignment reconciliation.
//!
//! A [`RoleAssignment`] owns the state of one resolved target for one pass:
//!
//! ```text
//!            exists()
//! Unknown ─────────────→ Absent ──create()──→ Present(desired)
//!    │                     ↑
//!    │ exists()            │ destroy()
//!    ↓                     │
//! Present(current) ────────┘
//!    │
//!    └─ set_roles(desired) → Present(desired)   (grants first, then revokes)
//! ```
//!
//! Calls inside a batch stop at the first failure and the collaborator's error
//! is returned unchanged. Whatever was already applied stays applied; the next
//! pass re-reads the service and converges.

use std::collections::HashMap;

use keystone_scope::{resolve, AssignmentTarget, DeclaredAttributes, PrincipalKind, ScopeKind, TargetKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::command::{Action, Invoke, Record, ResourceKind};
use crate::config::ReconcileConfig;
use crate::error::AssignResult;
use crate::roles::{RoleDelta, RoleSet};

/// What the reconciler currently knows about its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssignmentState {
    /// Not queried yet in this pass
    #[default]
    Unknown,

    /// No roles are assigned
    Absent,

    /// At least one role is assigned
    Present(RoleSet),
}

impl AssignmentState {
    /// Roles known to be assigned, if the target is present.
    pub fn roles(&self) -> Option<&RoleSet> {
        match self {
            AssignmentState::Present(roles) => Some(roles),
            _ => None,
        }
    }
}

/// Identity attributes readable from a reconciler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IdentityAttribute {
    /// Principal name
    Principal,
    /// Principal's domain
    PrincipalDomain,
    /// Scope name (system target for system scope)
    Scope,
    /// Project domain
    ScopeDomain,
    /// Scope kind
    ScopeKind,
}

/// Desired lifecycle state of an assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Ensure {
    /// The desired roles should be assigned
    Present,
    /// No roles should be assigned
    Absent,
}

/// What one call to [`RoleAssignment::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do
    Unchanged,
    /// Roles granted to a previously absent target
    Created(RoleSet),
    /// Existing roles adjusted
    Updated(RoleDelta),
    /// All roles revoked
    Destroyed(RoleSet),
    /// Changes were needed but the configuration forbids making them
    Skipped,
}

/// Reconciles the roles of one assignment target.
#[derive(Debug)]
pub struct RoleAssignment<I> {
    invoker: I,
    target: AssignmentTarget,
    key: TargetKey,
    args: Vec<String>,
    desired: RoleSet,
    state: AssignmentState,
    live: HashMap<IdentityAttribute, String>,
    do_not_manage: bool,
}

impl<I: Invoke> RoleAssignment<I> {
    /// Create a reconciler for an already resolved target.
    pub fn new(invoker: I, config: &ReconcileConfig, target: AssignmentTarget, desired: RoleSet) -> Self {
        Self {
            invoker,
            key: target.key(),
            args: target.command_args(),
            target,
            desired,
            state: AssignmentState::Unknown,
            live: HashMap::new(),
            do_not_manage: config.do_not_manage,
        }
    }

    /// Validate `config`, resolve declared attributes and role names, then
    /// create a reconciler.
    pub fn from_declared<S: Into<String>>(
        invoker: I,
        config: &ReconcileConfig,
        declared: &DeclaredAttributes,
        roles: impl IntoIterator<Item = S>,
    ) -> AssignResult<Self> {
        config.validate()?;
        let target = resolve(declared, &config.defaults)?;
        let desired = RoleSet::declared(roles)?;
        Ok(Self::new(invoker, config, target, desired))
    }

    /// The resolved target.
    pub fn target(&self) -> &AssignmentTarget {
        &self.target
    }

    /// Canonical key of the target.
    pub fn key(&self) -> &TargetKey {
        &self.key
    }

    /// Current state.
    pub fn state(&self) -> &AssignmentState {
        &self.state
    }

    /// Declared roles.
    pub fn desired(&self) -> &RoleSet {
        &self.desired
    }

    /// Roles cached by the last query, if the target is present.
    pub fn roles(&self) -> Option<&RoleSet> {
        self.state.roles()
    }

    /// Read an identity attribute.
    ///
    /// Returns the value reported by the service during [`exists`](Self::exists)
    /// when one was seen, and the declared value otherwise.
    pub fn attribute(&self, attribute: IdentityAttribute) -> Option<&str> {
        if let Some(live) = self.live.get(&attribute) {
            return Some(live.as_str());
        }
        match attribute {
            IdentityAttribute::Principal => Some(&self.target.principal.name),
            IdentityAttribute::PrincipalDomain => Some(&self.target.principal.domain),
            IdentityAttribute::Scope => Some(self.target.scope.name()),
            IdentityAttribute::ScopeDomain => self.target.scope.domain(),
            IdentityAttribute::ScopeKind => Some(self.target.scope.kind().as_str()),
        }
    }

    /// Principal name.
    pub fn principal(&self) -> Option<&str> {
        self.attribute(IdentityAttribute::Principal)
    }

    /// Principal's domain.
    pub fn principal_domain(&self) -> Option<&str> {
        self.attribute(IdentityAttribute::PrincipalDomain)
    }

    /// Scope name.
    pub fn scope(&self) -> Option<&str> {
        self.attribute(IdentityAttribute::Scope)
    }

    /// Project domain; `None` for domain and system scopes.
    pub fn scope_domain(&self) -> Option<&str> {
        self.attribute(IdentityAttribute::ScopeDomain)
    }

    /// Scope kind.
    pub fn scope_kind(&self) -> ScopeKind {
        self.target.scope.kind()
    }

    /// Query the service for this target's assignments.
    ///
    /// Moves to `Absent` when nothing matches and to `Present` otherwise,
    /// caching the returned role names.
    #[instrument(skip(self), fields(target = %self.key))]
    pub fn exists(&mut self) -> AssignResult<bool> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push("--names".to_string());
        args.extend(self.args.iter().cloned());

        let records = self
            .invoker
            .invoke(ResourceKind::RoleAssignment, Action::List, &args)?;

        if records.is_empty() {
            debug!("No role assignments found");
            self.state = AssignmentState::Absent;
            self.live.clear();
            return Ok(false);
        }

        let roles: RoleSet = records.iter().filter_map(|r| r.get("role")).collect();
        debug!(roles = roles.len(), "Found role assignments");
        self.cache_live_identity(&records[0]);
        self.state = AssignmentState::Present(roles);
        Ok(true)
    }

    /// Grant every desired role. Does nothing when no roles are desired.
    #[instrument(skip(self), fields(target = %self.key))]
    pub fn create(&mut self) -> AssignResult<()> {
        if self.desired.is_empty() {
            debug!("No roles declared, nothing to create");
            return Ok(());
        }
        if self.skip_unmanaged("create") {
            return Ok(());
        }
        if let AssignmentState::Present(_) = self.state {
            warn!("Creating an assignment that already exists");
        }

        for role in self.desired.iter() {
            self.grant(role)?;
        }

        self.state = AssignmentState::Present(self.desired.clone());
        Ok(())
    }

    /// Revoke every role currently assigned.
    ///
    /// The state is `Absent` afterwards even if a revoke failed. When the
    /// state is still unknown the service is queried first.
    #[instrument(skip(self), fields(target = %self.key))]
    pub fn destroy(&mut self) -> AssignResult<()> {
        if self.skip_unmanaged("destroy") {
            return Ok(());
        }
        if self.state == AssignmentState::Unknown {
            self.exists()?;
        }

        let current = match std::mem::replace(&mut self.state, AssignmentState::Absent) {
            AssignmentState::Present(roles) => roles,
            _ => RoleSet::new(),
        };

        let result = current.iter().try_for_each(|role| self.revoke(role));
        self.live.clear();
        result
    }

    /// Move the assigned roles to `desired`.
    ///
    /// Grants missing roles first, then revokes extra ones, one call per role.
    /// Returns the delta that was applied; an unmanaged reconciler applies
    /// nothing and returns an empty delta.
    #[instrument(skip_all, fields(target = %self.key))]
    pub fn set_roles<S: Into<String>>(
        &mut self,
        desired: impl IntoIterator<Item = S>,
    ) -> AssignResult<RoleDelta> {
        let desired = RoleSet::declared(desired)?;
        if self.state == AssignmentState::Unknown {
            self.exists()?;
        }

        let delta = self.delta_to(&desired);
        if !delta.is_empty() && self.skip_unmanaged("roles=") {
            return Ok(RoleDelta::default());
        }
        self.desired = desired;
        if delta.is_empty() {
            debug!("Roles already match");
            return Ok(delta);
        }

        info!(add = delta.add.len(), remove = delta.remove.len(), "Updating roles");
        for role in delta.add.iter() {
            self.grant(role)?;
        }
        for role in delta.remove.iter() {
            self.revoke(role)?;
        }

        self.state = if self.desired.is_empty() {
            AssignmentState::Absent
        } else {
            AssignmentState::Present(self.desired.clone())
        };
        Ok(delta)
    }

    /// Delta from the cached current roles to `desired`.
    ///
    /// An absent or unqueried target counts as having no roles.
    pub fn delta_to(&self, desired: &RoleSet) -> RoleDelta {
        let empty = RoleSet::new();
        RoleDelta::between(self.roles().unwrap_or(&empty), desired)
    }

    /// Run one full pass towards `ensure`.
    ///
    /// Queries the service, then creates, updates or destroys as needed.
    pub fn apply(&mut self, ensure: Ensure) -> AssignResult<Outcome> {
        let exists = self.exists()?;

        match (ensure, exists) {
            (Ensure::Present, false) => {
                if self.desired.is_empty() {
                    return Ok(Outcome::Unchanged);
                }
                if self.do_not_manage {
                    self.skip_unmanaged("create");
                    return Ok(Outcome::Skipped);
                }
                self.create()?;
                Ok(Outcome::Created(self.desired.clone()))
            }
            (Ensure::Present, true) => {
                let desired = self.desired.clone();
                let pending = self.delta_to(&desired);
                if pending.is_empty() {
                    return Ok(Outcome::Unchanged);
                }
                if self.do_not_manage {
                    self.skip_unmanaged("roles=");
                    return Ok(Outcome::Skipped);
                }
                let applied = self.set_roles(desired.iter())?;
                Ok(Outcome::Updated(applied))
            }
            (Ensure::Absent, false) => Ok(Outcome::Unchanged),
            (Ensure::Absent, true) => {
                if self.do_not_manage {
                    self.skip_unmanaged("destroy");
                    return Ok(Outcome::Skipped);
                }
                let revoked = self.roles().cloned().unwrap_or_default();
                self.destroy()?;
                Ok(Outcome::Destroyed(revoked))
            }
        }
    }

    fn grant(&self, role: &str) -> AssignResult<()> {
        info!(role, "Granting role");
        let args = self.role_args(role);
        if let Err(err) = self.invoker.invoke(ResourceKind::Role, Action::Add, &args) {
            error!(role, error = %err, "Failed to grant role");
            return Err(err.into());
        }
        Ok(())
    }

    fn revoke(&self, role: &str) -> AssignResult<()> {
        info!(role, "Revoking role");
        let args = self.role_args(role);
        match self.invoker.invoke(ResourceKind::Role, Action::Remove, &args) {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(role, "Role already revoked");
                Ok(())
            }
            Err(err) => {
                error!(role, error = %err, "Failed to revoke role");
                Err(err.into())
            }
        }
    }

    fn role_args(&self, role: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(role.to_string());
        args.extend(self.args.iter().cloned());
        args
    }

    fn skip_unmanaged(&self, operation: &str) -> bool {
        if self.do_not_manage {
            warn!(operation, "Role assignments are not managed, skipping");
        }
        self.do_not_manage
    }

    fn cache_live_identity(&mut self, record: &Record) {
        self.live.clear();

        let principal_field = match self.target.principal.kind {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
        };
        if let Some(value) = record.get(principal_field) {
            let (name, domain) = split_qualified(value);
            self.live.insert(IdentityAttribute::Principal, name.to_string());
            if let Some(domain) = domain {
                self.live.insert(IdentityAttribute::PrincipalDomain, domain.to_string());
            }
        }

        if let Some(value) = record.get(self.target.scope.kind().as_str()) {
            let (name, domain) = split_qualified(value);
            self.live.insert(IdentityAttribute::Scope, name.to_string());
            if let (ScopeKind::Project, Some(domain)) = (self.target.scope.kind(), domain) {
                self.live.insert(IdentityAttribute::ScopeDomain, domain.to_string());
            }
        }
    }
}

/// Split a name-resolved `name@domain` value.
///
/// Only project and principal columns are qualified; the split happens at the
/// last `@` so names containing `@` (such as e-mail user names) survive.
fn split_qualified(value: &str) -> (&str, Option<&str>) {
    match value.rsplit_once('@') {
        Some((name, domain)) if !name.is_empty() && !domain.is_empty() => (name, Some(domain)),
        _ => (value, None),
    }
}
