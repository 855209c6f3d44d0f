//! Authentication middleware layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use super::{jwt::decode_token, types::AuthUser};
use crate::error::ApiError;

/// Authentication layer configuration.
#[derive(Clone)]
pub struct AuthLayer {
    jwt_secret: Arc<String>,
}

impl AuthLayer {
    /// Create new auth layer.
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret: Arc::new(jwt_secret),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            jwt_secret: self.jwt_secret.clone(),
        }
    }
}

/// Authentication middleware service.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    jwt_secret: Arc<String>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let jwt_secret = self.jwt_secret.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = match extract_token(&req) {
                Ok(token) => token,
                Err(err) => return Ok(err.into_response()),
            };

            let claims = match decode_token(&token, &jwt_secret) {
                Ok(claims) => claims,
                Err(err) => return Ok(ApiError::from(err).into_response()),
            };

            if claims.is_expired() {
                return Ok(ApiError::TokenExpired.into_response());
            }

            let Some(auth_user) = AuthUser::from_claims(&claims) else {
                return Ok(ApiError::InvalidToken.into_response());
            };

            req.extensions_mut().insert(auth_user);
            inner.call(req).await
        })
    }
}

fn extract_token(req: &Request<Body>) -> Result<String, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::Unauthorized)?;

    let auth_str = auth_header.to_str().map_err(|_| ApiError::InvalidToken)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(ApiError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_from_bearer_header() {
        let req = Request::builder()
            .header("Authorization", "Bearer test_token")
            .body(Body::empty())
            .unwrap();

        let token = extract_token(&req).unwrap();
        assert_eq!(token, "test_token");
    }

    #[test]
    fn extract_token_missing_header() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let result = extract_token(&req);
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn extract_token_wrong_scheme() {
        let req = Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let result = extract_token(&req);
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }
}
