//! `warden-core` — shared building blocks.
//!
//! Pure primitives only (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{OrganizationId, RoleId, UserId};
