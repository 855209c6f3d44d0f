//! Database-driven endpoint authorization for DocuVault.
//!
//! Role grants per (HTTP method, route template) live in the permission
//! store; requests are resolved through an in-memory TTL cache by the
//! [`EndpointAuthorizer`], and administrators mutate grants through the
//! [`PermissionAdmin`] service, which validates, audits, and invalidates the
//! cache after every change.
//!
//! The subsystem is fail-closed throughout: an endpoint with no configured
//! roles is inaccessible to everyone, and a store failure on the read path
//! degrades to a deny rather than an error.

pub mod admin;
pub mod cache;
pub mod error;
pub mod model;
pub mod policy;
pub mod resolver;
pub mod store;
pub mod validation;

pub use admin::PermissionAdmin;
pub use cache::{CacheStats, RoleSetCache, DEFAULT_CACHE_TTL};
pub use error::{AuthzError, AuthzResult};
pub use model::{
    AuditLogEntry, AuditLogFilter, ChangeType, Endpoint, EndpointMetadata, NewEndpoint,
    RolePermission,
};
pub use policy::{AccessPolicy, CallerClaims, PolicyParseError};
pub use resolver::EndpointAuthorizer;
pub use store::PermissionStore;
pub use validation::{validate_role_names, RoleRuleViolation, MAX_ROLE_NAME_LEN};
