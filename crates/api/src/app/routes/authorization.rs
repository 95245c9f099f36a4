//! Decision endpoints and user role assignment.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;

use warden_auth::RbacError;
use warden_core::{RoleId, UserId};
use warden_infra::AccessControl;

use crate::app::dto::{
    AssignRolesRequest, CheckRequest, CheckResponse, GuardRequest, GuardResponse, ScopeQuery,
};
use crate::app::errors;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/check", post(check))
        .route("/explain", post(explain))
        .route("/guard", post(guard))
        .route("/cache/stats", get(cache_stats))
        .route("/users/:user_id/permissions", get(user_permissions))
        .route("/users/:user_id/roles", get(user_roles).post(assign_roles))
        .route("/users/:user_id/roles/:role_id", delete(revoke_role))
}

// ─────────────────────────────────────────────────────────────────────────────
// Decisions
// ─────────────────────────────────────────────────────────────────────────────

/// POST /authorization/check - Allow/deny for (user, organization, resource, action)
///
/// A backend failure answers `authorized: false`, never an error status.
pub async fn check(
    Extension(access): Extension<Arc<AccessControl>>,
    Json(req): Json<CheckRequest>,
) -> axum::response::Response {
    let decision = access.decide(
        req.user_id,
        req.organization_id,
        &req.resource,
        req.action,
        Utc::now(),
    );

    tracing::debug!(
        user_id = %req.user_id,
        organization_id = ?req.organization_id,
        resource = %req.resource,
        action = %req.action,
        ?decision,
        "authorization check"
    );

    (
        StatusCode::OK,
        Json(CheckResponse {
            authorized: decision.is_allowed(),
        }),
    )
        .into_response()
}

/// POST /authorization/explain - Why a check would be allowed or denied
pub async fn explain(
    Extension(access): Extension<Arc<AccessControl>>,
    Json(req): Json<CheckRequest>,
) -> axum::response::Response {
    match access.explain(
        req.user_id,
        req.organization_id,
        &req.resource,
        req.action,
        Utc::now(),
    ) {
        Ok(explanation) => (StatusCode::OK, Json(explanation)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// POST /authorization/guard - Route guard outcome for an operation id
pub async fn guard(
    Extension(access): Extension<Arc<AccessControl>>,
    Json(req): Json<GuardRequest>,
) -> axum::response::Response {
    let outcome = access.check_access(
        req.user_id,
        req.organization_id,
        &req.operation_id,
        Utc::now(),
    );
    (StatusCode::OK, Json(GuardResponse { outcome })).into_response()
}

/// GET /authorization/cache/stats - Effective-permission cache counters
pub async fn cache_stats(Extension(access): Extension<Arc<AccessControl>>) -> impl IntoResponse {
    Json(access.cache_stats())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// GET /authorization/users/:user_id/permissions - Effective permissions in a scope
pub async fn user_permissions(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(user_id): Path<UserId>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(scope) = match scope {
        Ok(scope) => scope,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    match access.effective_permissions(user_id, scope.organization_id, Utc::now()) {
        Ok(set) => (StatusCode::OK, Json(set.permissions.clone())).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// GET /authorization/users/:user_id/roles - Roles reachable in a scope
pub async fn user_roles(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(user_id): Path<UserId>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(scope) = match scope {
        Ok(scope) => scope,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    match access.user_roles(user_id, scope.organization_id, Utc::now()) {
        Ok(roles) => (StatusCode::OK, Json(roles)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// POST /authorization/users/:user_id/roles - Assign roles (idempotent)
pub async fn assign_roles(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<AssignRolesRequest>,
) -> axum::response::Response {
    if req.role_ids.is_empty() {
        return errors::rbac_error_to_response(RbacError::validation("roleIds must not be empty"));
    }

    let now = Utc::now();
    if req.expires_at.is_some_and(|at| at <= now) {
        return errors::rbac_error_to_response(RbacError::validation(
            "expiresAt must be in the future",
        ));
    }

    match access.assign_roles(user_id, &req.role_ids, req.organization_id, req.expires_at, now) {
        Ok(roles) => (StatusCode::OK, Json(roles)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// DELETE /authorization/users/:user_id/roles/:role_id - Revoke an assignment
///
/// Revoking an assignment that does not exist still answers 204.
pub async fn revoke_role(
    Extension(access): Extension<Arc<AccessControl>>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(scope) = match scope {
        Ok(scope) => scope,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    match access.revoke_role(user_id, role_id, scope.organization_id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}
