//! # Keystone Assign
//!
//! Reconciles declared Keystone role assignments against the live identity
//! service, talking to it only through the `openstack` command line client.
//!
//! ## Overview
//!
//! The keystone-assign crate handles:
//! - **Reconciliation**: `exists`, `create`, `destroy` and `set_roles` for one
//!   resolved target, issuing the minimal grants and revokes
//! - **Planning**: resolving and collision-checking all declarations before
//!   any call is made
//! - **Commands**: the [`Invoke`] collaborator interface and its `openstack`
//!   implementation
//! - **Configuration**: default domains, management policy, runner settings
//!
//! ## Architecture
//!
//! ```text
//! Declaration ──prepare──→ RoleAssignment ──exists/create/destroy/set_roles──→ Invoke
//!   (keystone-scope resolves       │                                          │
//!    and collision-checks)         └─ RoleSet / RoleDelta                     └─ OpenstackCli
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keystone_assign::{OpenstackCli, ReconcileConfig, RoleAssignment};
//! use keystone_scope::DeclaredAttributes;
//!
//! let config = ReconcileConfig::from_env();
//! let cli = OpenstackCli::from_config(&config.cli);
//!
//! let mut assignment = RoleAssignment::from_declared(
//!     &cli,
//!     &config,
//!     &DeclaredAttributes::user("bob").project("alpha"),
//!     ["admin", "member"],
//! )?;
//!
//! if !assignment.exists()? {
//!     assignment.create()?;
//! } else {
//!     assignment.set_roles(["admin", "member"])?;
//! }
//! # Ok::<(), keystone_assign::AssignError>(())
//! ```
//!
//! ## Failure Model
//!
//! A failed call stops the batch it belongs to and its error is returned as
//! is. There is no rollback: the next pass queries the service again and
//! applies whatever is still missing.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod retry;
pub mod roles;

// Re-export main types for convenience
pub use cli::OpenstackCli;
pub use command::{Action, CommandError, CommandErrorKind, Invoke, Record, ResourceKind};
pub use config::{CliConfig, ConfigError, ReconcileConfig};
pub use error::{AssignError, AssignResult};
pub use plan::{prepare, Declaration};
pub use reconciler::{AssignmentState, Ensure, IdentityAttribute, Outcome, RoleAssignment};
pub use retry::RetryConfig;
pub use roles::{RoleDelta, RoleSet};
