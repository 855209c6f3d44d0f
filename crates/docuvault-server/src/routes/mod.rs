//! Route configuration for the DocuVault API server.

mod internal;
mod permissions;
mod records;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Router};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{middleware::auth::AuthLayer, state::AppState};

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Common middleware stack applied to all routes. The timeout sits
    // innermost so it wraps the routes' plain body type.
    let common_middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)) // 2MB limit
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let auth = AuthLayer::new(state.auth.jwt_secret.clone());

    // Everything under /api requires a valid token; per-endpoint grants are
    // enforced by the authorization layers inside the nested routers.
    let api = Router::new()
        .nest("/v1/permissions", permissions::router())
        .merge(records::router(Arc::clone(&state.authorizer)))
        .layer(auth);

    Router::new()
        .nest("/api", api)
        .nest("/internal", internal::router())
        .fallback(fallback_handler)
        .layer(common_middleware)
        .with_state(state)
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({
            "success": false,
            "error": {
                "code": "not_found",
                "message": "The requested resource was not found"
            }
        })),
    )
}
