//! Role administration.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use warden_auth::{NewRole, RoleCode, RolePatch};
use warden_core::RoleId;
use warden_infra::AccessControl;

use crate::app::dto::{CreateRoleRequest, DeleteRoleQuery};
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:role_id", get(get_role).patch(update_role).delete(delete_role))
}

/// GET /roles - List every role with its permission codes
pub async fn list_roles(Extension(access): Extension<Arc<AccessControl>>) -> axum::response::Response {
    match access.roles() {
        Ok(roles) => (StatusCode::OK, Json(roles)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// POST /roles - Create a custom role
pub async fn create_role(
    Extension(access): Extension<Arc<AccessControl>>,
    Json(req): Json<CreateRoleRequest>,
) -> axum::response::Response {
    let code = match RoleCode::parse(req.code) {
        Ok(code) => code,
        Err(e) => return errors::rbac_error_to_response(e),
    };

    let mut role = NewRole::custom(code, req.name);
    role.description = req.description;
    role.is_active = req.is_active;

    match access.create_role(role, &req.permissions, Utc::now()) {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// GET /roles/:role_id
pub async fn get_role(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(role_id): Path<RoleId>,
) -> impl IntoResponse {
    match access.role(role_id) {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// PATCH /roles/:role_id - Partial update; invalidates every assignee's cache
pub async fn update_role(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(role_id): Path<RoleId>,
    Json(patch): Json<RolePatch>,
) -> axum::response::Response {
    match access.update_role(role_id, patch, Utc::now()) {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// DELETE /roles/:role_id?force=true - Delete a custom role
///
/// Without `force` a role that still has live assignments answers 409.
pub async fn delete_role(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(role_id): Path<RoleId>,
    query: Result<Query<DeleteRoleQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    match access.delete_role(role_id, query.force, Utc::now()) {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}
