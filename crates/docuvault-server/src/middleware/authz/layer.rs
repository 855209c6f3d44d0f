//! Dynamic endpoint authorization middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use docuvault_authz::{AccessPolicy, EndpointAuthorizer};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Policy applied by [`EndpointAuthzLayer`].
///
/// `Fixed` evaluates one concrete policy. `ForTemplate` looks up the
/// registered route template with the live request method, so a single
/// layer can guard a route that serves several HTTP methods.
#[derive(Debug, Clone)]
pub enum RoutePolicy {
    Fixed(AccessPolicy),
    ForTemplate(String),
}

/// Authorization layer over the dynamic permission store.
#[derive(Clone)]
pub struct EndpointAuthzLayer {
    authorizer: Arc<EndpointAuthorizer>,
    policy: RoutePolicy,
}

impl EndpointAuthzLayer {
    pub fn new(authorizer: Arc<EndpointAuthorizer>, policy: AccessPolicy) -> Self {
        Self {
            authorizer,
            policy: RoutePolicy::Fixed(policy),
        }
    }

    /// Guard a route template, resolving the method from each request.
    pub fn for_template(authorizer: Arc<EndpointAuthorizer>, template: impl Into<String>) -> Self {
        Self {
            authorizer,
            policy: RoutePolicy::ForTemplate(template.into()),
        }
    }
}

impl<S> Layer<S> for EndpointAuthzLayer {
    type Service = EndpointAuthzMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EndpointAuthzMiddleware {
            inner,
            authorizer: self.authorizer.clone(),
            policy: self.policy.clone(),
        }
    }
}

#[derive(Clone)]
pub struct EndpointAuthzMiddleware<S> {
    inner: S,
    authorizer: Arc<EndpointAuthorizer>,
    policy: RoutePolicy,
}

impl<S> Service<Request<Body>> for EndpointAuthzMiddleware<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let authorizer = self.authorizer.clone();
        let policy = self.policy.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(auth_user) = req.extensions().get::<AuthUser>().cloned() else {
                warn!("authorization check without authentication");
                return Ok(ApiError::Unauthorized.into_response());
            };

            let policy = match policy {
                RoutePolicy::Fixed(policy) => policy,
                RoutePolicy::ForTemplate(route) => AccessPolicy::Endpoint {
                    method: req.method().as_str().to_string(),
                    route,
                },
            };

            let allowed = policy
                .evaluate(&authorizer, &auth_user.caller_claims())
                .await;

            if !allowed {
                warn!(
                    user_id = %auth_user.id,
                    policy = %policy.name(),
                    "authorization denied"
                );
                return Ok(ApiError::InsufficientPermissions.into_response());
            }

            inner.call(req).await
        })
    }
}
