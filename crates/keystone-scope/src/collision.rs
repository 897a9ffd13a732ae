//! Collision detection across declarations
//!
//! Two declarations may spell the same assignment differently, for example
//! once with an explicit default domain and once without. They must be
//! reported as a conflict before anything is sent to the identity service.

use std::collections::{BTreeMap, HashSet};

use crate::defaults::DomainDefaults;
use crate::error::{ResolveError, ResolveResult};
use crate::target::{resolve, AssignmentTarget, DeclaredAttributes, TargetKey};

/// Check whether `new_key` is already claimed by another declaration.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use keystone_scope::{detect_collision, resolve, DeclaredAttributes, DomainDefaults};
///
/// let defaults = DomainDefaults::default();
/// let first = resolve(&DeclaredAttributes::user("bob").project("alpha"), &defaults).unwrap();
/// let second = resolve(
///     &DeclaredAttributes::user("bob").project("alpha").project_domain("default"),
///     &defaults,
/// )
/// .unwrap();
///
/// let mut existing = HashSet::new();
/// existing.insert(first.key());
/// assert!(detect_collision(&existing, &second.key()));
/// ```
pub fn detect_collision(existing: &HashSet<TargetKey>, new_key: &TargetKey) -> bool {
    existing.contains(new_key)
}

/// Resolve every declaration and reject duplicates.
///
/// Each declaration is labelled (typically with its resource title) so that a
/// conflict can name both sides. This is meant to run once over the whole
/// configuration before any reconciliation starts.
///
/// # Errors
///
/// The first resolution error encountered, or [`ResolveError::Conflict`] for
/// the first pair of declarations sharing a key.
///
/// # Examples
///
/// ```
/// use keystone_scope::{check_declarations, DeclaredAttributes, DomainDefaults};
///
/// let declared = vec![
///     ("bob-alpha".to_string(), DeclaredAttributes::user("bob").project("alpha")),
///     ("bob-beta".to_string(), DeclaredAttributes::user("bob").project("beta")),
/// ];
/// let targets = check_declarations(&declared, &DomainDefaults::default()).unwrap();
/// assert_eq!(targets.len(), 2);
/// ```
pub fn check_declarations(
    declared: &[(String, DeclaredAttributes)],
    defaults: &DomainDefaults,
) -> ResolveResult<Vec<AssignmentTarget>> {
    let mut claimed: BTreeMap<TargetKey, &str> = BTreeMap::new();
    let mut targets = Vec::with_capacity(declared.len());

    for (label, attributes) in declared {
        let target = resolve(attributes, defaults)?;
        let key = target.key();

        if let Some(first) = claimed.get(&key) {
            tracing::error!(
                first = %first,
                second = %label,
                key = %key,
                "Duplicate role assignment declaration"
            );
            return Err(ResolveError::Conflict {
                first: first.to_string(),
                second: label.clone(),
                key: key.to_string(),
            });
        }

        tracing::debug!(label = %label, key = %key, "Resolved role assignment target");
        claimed.insert(key, label.as_str());
        targets.push(target);
    }

    Ok(targets)
}
