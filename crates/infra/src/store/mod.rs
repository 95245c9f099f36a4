//! In-memory implementations of the storage ports (tests/dev).
//!
//! Production deployments swap these for database-backed implementations of
//! the same traits; uniqueness is then enforced by the database.

mod assignments;
mod catalog;
mod roles;

pub use assignments::InMemoryAssignmentStore;
pub use catalog::InMemoryPermissionCatalog;
pub use roles::InMemoryRoleStore;

use warden_auth::RbacError;

pub(crate) fn poisoned<T>(_: T) -> RbacError {
    RbacError::storage("lock poisoned")
}
