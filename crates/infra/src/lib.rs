//! Infrastructure layer: in-memory stores, the effective-permission cache,
//! the resolver and the route guard.

pub mod access_control;
pub mod cache;
pub mod guard;
pub mod resolver;
pub mod seed;
pub mod store;

mod integration_tests;

pub use access_control::AccessControl;
pub use cache::{CacheConfig, CacheKey, CacheStats, EffectivePermissionCache};
pub use guard::RouteGuard;
pub use resolver::AuthorizationResolver;
