//! Role sets and deltas.
//!
//! Role names compare by exact, case-sensitive string equality. Sets are kept
//! sorted so calls are issued in a stable order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use keystone_scope::role::is_valid_name;
use keystone_scope::{ResolveError, ResolveResult};

/// A set of role names.
///
/// # Examples
///
/// ```
/// use keystone_assign::RoleSet;
///
/// let roles: RoleSet = ["member", "admin", "member"].into_iter().collect();
/// assert_eq!(roles.len(), 2);
/// assert!(roles.contains("admin"));
/// assert!(!roles.contains("Admin"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Create an empty role set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a role set from declared names, rejecting blank ones.
    pub fn declared<I, S>(names: I) -> ResolveResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.into();
            if !is_valid_name(&name) {
                return Err(ResolveError::InvalidName {
                    kind: "role",
                    value: name,
                });
            }
            set.insert(name);
        }
        Ok(Self(set))
    }

    /// Add a role. Returns false if it was already present.
    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        self.0.insert(role.into())
    }

    /// Check if a role is present.
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Iterate over role names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Roles in `self` that are not in `other`.
    pub fn difference(&self, other: &RoleSet) -> RoleSet {
        RoleSet(self.0.difference(&other.0).cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        RoleSet(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Grants and revokes needed to move from one role set to another.
///
/// `add` and `remove` are always disjoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleDelta {
    /// Roles to grant
    pub add: RoleSet,

    /// Roles to revoke
    pub remove: RoleSet,
}

impl RoleDelta {
    /// Compute the delta from `current` to `desired`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_assign::{RoleDelta, RoleSet};
    ///
    /// let current: RoleSet = ["admin", "viewer"].into_iter().collect();
    /// let desired: RoleSet = ["admin", "member"].into_iter().collect();
    /// let delta = RoleDelta::between(&current, &desired);
    ///
    /// assert_eq!(delta.add.iter().collect::<Vec<_>>(), vec!["member"]);
    /// assert_eq!(delta.remove.iter().collect::<Vec<_>>(), vec!["viewer"]);
    /// ```
    pub fn between(current: &RoleSet, desired: &RoleSet) -> Self {
        Self {
            add: desired.difference(current),
            remove: current.difference(desired),
        }
    }

    /// Check if nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Number of calls needed to apply the delta.
    pub fn len(&self) -> usize {
        self.add.len() + self.remove.len()
    }
}
