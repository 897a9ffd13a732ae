//! Role declarations
//!
//! A role is identified by its name; the identity service assigns the id.

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// A declared Keystone role.
///
/// # Examples
///
/// ```
/// use keystone_scope::Role;
///
/// let role = Role::new("member").unwrap();
/// assert_eq!(role.name(), "member");
/// assert!(Role::new("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Role {
    name: String,

    /// Opaque id, only ever filled from service output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl Role {
    /// Declare a role. The name must contain a non-whitespace character.
    pub fn new(name: impl Into<String>) -> ResolveResult<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ResolveError::InvalidName {
                kind: "role",
                value: name,
            });
        }
        Ok(Self { name, id: None })
    }

    /// A role as reported by the identity service, id included.
    pub fn observed(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }

    /// Role name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service-assigned id, if known.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Always fails: the id belongs to the identity service.
    pub fn set_id(&mut self, _id: impl Into<String>) -> ResolveResult<()> {
        Err(ResolveError::ReadOnlyAttribute("id"))
    }
}

/// Check a role name: at least one non-whitespace character.
pub fn is_valid_name(name: &str) -> bool {
    name.chars().any(|c| !c.is_whitespace())
}
