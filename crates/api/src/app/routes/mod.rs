use axum::Router;

pub mod authorization;
pub mod permissions;
pub mod roles;
pub mod system;

/// Router for every RBAC endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/authorization", authorization::router())
        .nest("/permissions", permissions::router())
        .nest("/roles", roles::router())
}
