//! Permission catalog administration.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use warden_auth::{Permission, PermissionCode};
use warden_infra::AccessControl;

use crate::app::dto::{CreatePermissionRequest, PermissionQuery};
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_permissions).post(register_permission))
        .route("/:code", get(get_permission))
        .route("/:code/deactivate", post(deactivate_permission))
}

/// GET /permissions - List the catalog, or filter by `?resource=&action=`
pub async fn list_permissions(
    Extension(access): Extension<Arc<AccessControl>>,
    query: Result<Query<PermissionQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let result = match (query.resource, query.action) {
        (Some(resource), Some(action)) => access.find_permissions(&resource, action),
        (None, None) => access.permissions(),
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "resource and action must be given together",
            );
        }
    };

    match result {
        Ok(permissions) => (StatusCode::OK, Json(permissions)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// POST /permissions - Register a permission
pub async fn register_permission(
    Extension(access): Extension<Arc<AccessControl>>,
    Json(req): Json<CreatePermissionRequest>,
) -> axum::response::Response {
    let mut permission = Permission::new(req.code, req.resource, req.action);
    permission.description = req.description;

    match access.register_permission(permission) {
        Ok(p) => (StatusCode::CREATED, Json(p)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// GET /permissions/:code
pub async fn get_permission(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match access.permission(&PermissionCode::from(code)) {
        Ok(p) => (StatusCode::OK, Json(p)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}

/// POST /permissions/:code/deactivate - Soft-disable a permission everywhere
pub async fn deactivate_permission(
    Extension(access): Extension<Arc<AccessControl>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    match access.deactivate_permission(&PermissionCode::from(code)) {
        Ok(p) => (StatusCode::OK, Json(p)).into_response(),
        Err(e) => errors::rbac_error_to_response(e),
    }
}
