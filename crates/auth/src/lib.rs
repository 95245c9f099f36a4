//! `warden-auth` — pure role-based authorization domain.
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines
//! the records, the decision rules and the storage ports.

pub mod assignment;
pub mod authorize;
pub mod error;
pub mod permissions;
pub mod requirement;
pub mod roles;
pub mod store;

pub use assignment::{AssignmentKey, UserRoleAssignment};
pub use authorize::{
    AccessOutcome, AuthorizationExplanation, Decision, DenialKind, DenialReason,
    EffectivePermissionSet, authorize, explain,
};
pub use error::{RbacError, RbacResult};
pub use permissions::{Action, CheckMode, Permission, PermissionCode};
pub use requirement::{
    OperationMatcher, RegistryError, Requirement, RequirementRegistry, RequirementRegistryBuilder,
    RequirementRule,
};
pub use roles::{NewRole, Role, RoleCode, RolePatch, SystemRole};
pub use store::{AssignmentStore, PermissionCatalog, RoleStore};
