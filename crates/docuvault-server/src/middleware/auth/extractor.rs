//! Authentication extractors for handlers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::types::AuthUser;
use crate::error::ApiError;

/// Extractor for authenticated user (required).
pub struct Auth(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(Auth)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Extractor that requires the baseline access claim.
pub struct AccessUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AccessUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)?;

        if user.has_access {
            Ok(AccessUser(user))
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Extractor that requires the administrative override claim.
pub struct SuperUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for SuperUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)?;

        if user.is_super_user {
            Ok(SuperUser(user))
        } else {
            Err(ApiError::InsufficientPermissions)
        }
    }
}
