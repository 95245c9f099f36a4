//! RBAC error taxonomy.

use thiserror::Error;

use warden_core::DomainError;

pub type RbacResult<T> = Result<T, RbacError>;

/// Errors raised by the catalog, the stores and the resolver.
///
/// DENY is never an error; it is a [`crate::Decision`] value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RbacError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    #[error("system role '{0}' cannot be deleted or have its identity changed")]
    SystemRoleImmutable(String),

    #[error("role '{0}' is inactive")]
    RoleInactive(String),

    #[error("role '{role}' still has {assignees} active assignment(s)")]
    RoleInUse { role: String, assignees: usize },

    /// Backend failure while computing a decision. Callers must treat it as DENY.
    #[error("authorization resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Failure reported by a storage backend outside of an authorize call.
    #[error("storage error: {0}")]
    Storage(String),
}

impl RbacError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            RbacError::NotFound { .. } => "not_found",
            RbacError::DuplicateCode(_) => "duplicate_code",
            RbacError::InvalidPermission(_) => "invalid_permission",
            RbacError::SystemRoleImmutable(_) => "system_role_immutable",
            RbacError::RoleInactive(_) => "role_inactive",
            RbacError::RoleInUse { .. } => "role_in_use",
            RbacError::ResolutionFailed(_) => "resolution_failed",
            RbacError::Validation(_) => "validation_error",
            RbacError::Storage(_) => "storage_error",
        }
    }
}

impl From<DomainError> for RbacError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}
