//! Error taxonomy for the authorization subsystem.

use thiserror::Error;

pub type AuthzResult<T> = Result<T, AuthzError>;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// Referenced endpoint id does not exist.
    #[error("Endpoint {0} not found")]
    NotFound(i64),

    /// One or more administrative validation rules violated; every message
    /// is collected, not just the first.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An active endpoint with this (method, route) pair already exists.
    #[error("Endpoint {method} {route} is already registered")]
    DuplicateEndpoint { method: String, route: String },

    /// Underlying persistence failure. Read paths absorb this into a deny
    /// inside the resolver; write paths surface it.
    #[error("Permission store error")]
    Store(#[from] sqlx::Error),

    /// The store did not answer within the configured bound.
    #[error("Permission store timed out")]
    StoreTimeout,
}
