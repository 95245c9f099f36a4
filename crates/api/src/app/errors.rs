use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use warden_auth::RbacError;

pub fn rbac_error_to_response(err: RbacError) -> axum::response::Response {
    let status = match &err {
        RbacError::NotFound { .. } => StatusCode::NOT_FOUND,
        RbacError::DuplicateCode(_) => StatusCode::CONFLICT,
        RbacError::InvalidPermission(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RbacError::SystemRoleImmutable(_) => StatusCode::FORBIDDEN,
        RbacError::RoleInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RbacError::RoleInUse { .. } => StatusCode::CONFLICT,
        RbacError::Validation(_) => StatusCode::BAD_REQUEST,
        RbacError::ResolutionFailed(_) | RbacError::Storage(_) => {
            tracing::error!(error = %err, "storage backend failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, err.code(), err.to_string())
}

/// Malformed query strings answer with the same JSON body as every other
/// client error.
pub fn query_rejection_to_response(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
