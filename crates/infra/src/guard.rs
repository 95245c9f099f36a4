//! Operation-level guard: the single entry point for route protection.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use warden_auth::{AccessOutcome, RequirementRegistry};
use warden_core::{OrganizationId, UserId};

use crate::resolver::AuthorizationResolver;

#[derive(Clone)]
pub struct RouteGuard {
    registry: Arc<RequirementRegistry>,
    resolver: Arc<AuthorizationResolver>,
}

impl RouteGuard {
    pub fn new(registry: Arc<RequirementRegistry>, resolver: Arc<AuthorizationResolver>) -> Self {
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &RequirementRegistry {
        &self.registry
    }

    /// `Public` when no rule matches; otherwise the fail-closed decision.
    pub fn check_access(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        operation_id: &str,
        now: DateTime<Utc>,
    ) -> AccessOutcome {
        let Some(requirement) = self.registry.resolve(operation_id) else {
            return AccessOutcome::Public;
        };

        self.resolver
            .decide(
                user_id,
                organization_id,
                &requirement.resource,
                requirement.action,
                now,
            )
            .into()
    }
}
