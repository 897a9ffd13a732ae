//! # Keystone Scope
//!
//! Identity resolution for Keystone role assignments.
//!
//! ## Overview
//!
//! A role assignment grants roles to a principal on a scope. The same
//! assignment can be declared with different literal spellings (an omitted
//! domain versus the explicit default domain), so every declaration is first
//! resolved into a canonical target:
//!
//! ```text
//! DeclaredAttributes ──resolve──→ AssignmentTarget ──key──→ TargetKey
//!   principal                        Principal              (scope kind,
//!   principal_domain?                  kind/name/domain      scope name,
//!   project? project_domain?         Scope                   scope domain,
//!   domain?                            Project/Domain/        principal kind,
//!   system?                            System                 principal name,
//!                                                             principal domain)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use keystone_scope::{check_declarations, DeclaredAttributes, DomainDefaults};
//!
//! let declared = vec![
//!     ("bob-alpha".to_string(), DeclaredAttributes::user("bob").project("alpha")),
//!     (
//!         "bob-alpha-again".to_string(),
//!         DeclaredAttributes::user("bob").project("alpha").project_domain("default"),
//!     ),
//! ];
//!
//! let err = check_declarations(&declared, &DomainDefaults::default()).unwrap_err();
//! assert!(err.is_conflict());
//! ```
//!
//! ## Integration with keystone-assign
//!
//! `keystone-assign` takes the resolved targets and reconciles their roles
//! against the identity service.

pub mod collision;
pub mod defaults;
pub mod error;
pub mod role;
pub mod scope;
pub mod target;

// Re-export main types for convenience
pub use collision::{check_declarations, detect_collision};
pub use defaults::{DomainDefaults, DEFAULT_DOMAIN, DEFAULT_SYSTEM_SCOPE};
pub use error::{ResolveError, ResolveResult};
pub use role::Role;
pub use scope::{Principal, PrincipalKind, Scope, ScopeKind};
pub use target::{resolve, AssignmentTarget, DeclaredAttributes, TargetKey};
