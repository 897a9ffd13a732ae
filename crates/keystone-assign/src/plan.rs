//! Preparing a set of declared assignments.
//!
//! All declarations are resolved and checked for collisions up front, so a
//! duplicate declaration fails the configuration before any call is made.

use keystone_scope::{check_declarations, DeclaredAttributes};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::Invoke;
use crate::config::ReconcileConfig;
use crate::error::AssignResult;
use crate::reconciler::{Ensure, RoleAssignment};
use crate::roles::RoleSet;

/// A declared role assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declaration {
    /// Label used in conflict reports, usually the resource title.
    pub label: String,

    /// Principal and scope attributes.
    #[serde(flatten)]
    pub attributes: DeclaredAttributes,

    /// Roles the principal should hold on the scope.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Whether the assignment should exist.
    #[serde(default = "default_ensure")]
    pub ensure: Ensure,
}

fn default_ensure() -> Ensure {
    Ensure::Present
}

impl Declaration {
    /// Declare an assignment that should be present with `roles`.
    pub fn new<S: Into<String>>(
        label: impl Into<String>,
        attributes: DeclaredAttributes,
        roles: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            label: label.into(),
            attributes,
            roles: roles.into_iter().map(Into::into).collect(),
            ensure: Ensure::Present,
        }
    }

    /// Declare an assignment that should be absent.
    pub fn absent(label: impl Into<String>, attributes: DeclaredAttributes) -> Self {
        Self {
            label: label.into(),
            attributes,
            roles: Vec::new(),
            ensure: Ensure::Absent,
        }
    }
}

/// Resolve and collision-check every declaration, then build one reconciler
/// per declaration, paired with its desired lifecycle state.
///
/// Nothing is sent to the identity service.
pub fn prepare<I: Invoke + Clone>(
    invoker: &I,
    config: &ReconcileConfig,
    declarations: &[Declaration],
) -> AssignResult<Vec<(Ensure, RoleAssignment<I>)>> {
    config.validate()?;

    let labelled: Vec<(String, DeclaredAttributes)> = declarations
        .iter()
        .map(|d| (d.label.clone(), d.attributes.clone()))
        .collect();
    let targets = check_declarations(&labelled, &config.defaults)?;

    let mut prepared = Vec::with_capacity(targets.len());
    for (declaration, target) in declarations.iter().zip(targets) {
        let desired = RoleSet::declared(declaration.roles.iter().cloned())?;
        prepared.push((
            declaration.ensure,
            RoleAssignment::new(invoker.clone(), config, target, desired),
        ));
    }

    info!(assignments = prepared.len(), "Prepared role assignments");
    Ok(prepared)
}
