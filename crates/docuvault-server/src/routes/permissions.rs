//! Permission administration routes.
//!
//! Everything here except `/check` requires the super-user claim. `/check`
//! is available to any caller with baseline access so clients can ask
//! what the current grants allow them.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use docuvault_authz::{
    AuditLogEntry, AuditLogFilter, Endpoint, EndpointMetadata, NewEndpoint,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::{AccessUser, SuperUser},
    response::{ApiResponse, Created},
    state::AppState,
};

/// Create the permissions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check", get(check_access))
        .route("/endpoints", get(list_endpoints).post(create_endpoint))
        .route("/endpoints/:id", get(get_endpoint).put(update_metadata))
        .route("/endpoints/:id/deactivate", post(deactivate_endpoint))
        .route("/endpoints/:id/reactivate", post(reactivate_endpoint))
        .route("/endpoints/:id/roles", get(get_roles).post(update_roles))
        .route("/roles", get(list_roles))
        .route("/audit", get(audit_log))
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/cache/stats", get(cache_stats))
        .route("/validate", post(validate_roles))
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    method: String,
    route: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    has_access: bool,
    allowed_roles: Vec<String>,
    user_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Report whether the caller would be allowed through the named endpoint.
///
/// This handler never fails: malformed input and store trouble both come
/// back as `hasAccess: false` with an explanatory message.
async fn check_access(
    State(state): State<AppState>,
    AccessUser(user): AccessUser,
    Query(query): Query<CheckQuery>,
) -> Json<ApiResponse<CheckResponse>> {
    if query.method.trim().is_empty() || query.route.trim().is_empty() {
        return Json(ApiResponse::success(CheckResponse {
            has_access: false,
            allowed_roles: Vec::new(),
            user_roles: user.roles,
            error: Some("method and route must be non-empty".to_string()),
        }));
    }

    let method = query.method.to_uppercase();
    let allowed_roles = state
        .authorizer
        .get_allowed_roles(&method, &query.route)
        .await;

    let has_access =
        !allowed_roles.is_empty() && user.roles.iter().any(|r| allowed_roles.contains(r));

    // An empty role set is either an endpoint with no grants, a route nobody
    // registered, or a degraded store lookup. The caller gets told which.
    let error = if allowed_roles.is_empty() {
        match state.admin.endpoint_for_route(&method, &query.route).await {
            Ok(Some(_)) => None,
            Ok(None) => Some(format!(
                "No active endpoint is registered for {method} {}",
                query.route
            )),
            Err(err) => Some(format!("Permission lookup failed: {err}")),
        }
    } else {
        None
    };

    Json(ApiResponse::success(CheckResponse {
        has_access,
        allowed_roles,
        user_roles: user.roles,
        error,
    }))
}

async fn list_endpoints(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
) -> ApiResult<ApiResponse<Vec<Endpoint>>> {
    let endpoints = state.admin.endpoints().await?;
    Ok(ApiResponse::success(endpoints))
}

async fn get_endpoint(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<Endpoint>> {
    let endpoint = state.admin.endpoint(id).await?;
    Ok(ApiResponse::success(endpoint))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEndpointRequest {
    http_method: String,
    route: String,
    endpoint_name: String,
    description: Option<String>,
    category: Option<String>,
}

async fn create_endpoint(
    State(state): State<AppState>,
    SuperUser(user): SuperUser,
    Json(body): Json<CreateEndpointRequest>,
) -> ApiResult<Created<Endpoint>> {
    if body.http_method.trim().is_empty() || body.route.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "httpMethod and route must be non-empty".to_string(),
        ));
    }

    let new = NewEndpoint {
        http_method: body.http_method.to_uppercase(),
        route: body.route,
        endpoint_name: body.endpoint_name,
        description: body.description,
        category: body.category,
    };

    let endpoint = state.admin.create_endpoint(&new, &user.name).await?;
    Ok(Created(ApiResponse::success(endpoint)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMetadataRequest {
    endpoint_name: String,
    description: Option<String>,
    category: Option<String>,
}

async fn update_metadata(
    State(state): State<AppState>,
    SuperUser(user): SuperUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMetadataRequest>,
) -> ApiResult<ApiResponse<Endpoint>> {
    let meta = EndpointMetadata {
        endpoint_name: body.endpoint_name,
        description: body.description,
        category: body.category,
    };

    state
        .admin
        .update_endpoint_metadata(id, &meta, &user.name)
        .await?;
    let endpoint = state.admin.endpoint(id).await?;
    Ok(ApiResponse::success(endpoint))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeReasonRequest {
    #[serde(default)]
    change_reason: Option<String>,
}

async fn deactivate_endpoint(
    State(state): State<AppState>,
    SuperUser(user): SuperUser,
    Path(id): Path<i64>,
    Json(body): Json<ChangeReasonRequest>,
) -> ApiResult<ApiResponse<()>> {
    state
        .admin
        .deactivate_endpoint(id, &user.name, body.change_reason.as_deref())
        .await?;
    Ok(ApiResponse::message_only("Endpoint deactivated"))
}

async fn reactivate_endpoint(
    State(state): State<AppState>,
    SuperUser(user): SuperUser,
    Path(id): Path<i64>,
    Json(body): Json<ChangeReasonRequest>,
) -> ApiResult<ApiResponse<()>> {
    state
        .admin
        .reactivate_endpoint(id, &user.name, body.change_reason.as_deref())
        .await?;
    Ok(ApiResponse::message_only("Endpoint reactivated"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointRolesResponse {
    endpoint_id: i64,
    role_names: Vec<String>,
}

async fn get_roles(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<EndpointRolesResponse>> {
    let role_names = state.admin.roles_for_endpoint(id).await?;
    Ok(ApiResponse::success(EndpointRolesResponse {
        endpoint_id: id,
        role_names,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRolesRequest {
    role_names: Vec<String>,
    #[serde(default)]
    change_reason: Option<String>,
}

async fn update_roles(
    State(state): State<AppState>,
    SuperUser(user): SuperUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRolesRequest>,
) -> ApiResult<ApiResponse<EndpointRolesResponse>> {
    state
        .admin
        .update_roles(
            id,
            &body.role_names,
            &user.name,
            body.change_reason.as_deref(),
        )
        .await?;

    let role_names = state.admin.roles_for_endpoint(id).await?;
    Ok(ApiResponse::success_with_message(
        EndpointRolesResponse {
            endpoint_id: id,
            role_names,
        },
        "Role grants updated",
    ))
}

async fn list_roles(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
) -> ApiResult<ApiResponse<Vec<String>>> {
    let roles = state.admin.distinct_roles().await?;
    Ok(ApiResponse::success(roles))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditQuery {
    endpoint_id: Option<i64>,
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
}

async fn audit_log(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
    Query(query): Query<AuditQuery>,
) -> ApiResult<ApiResponse<Vec<AuditLogEntry>>> {
    let filter = AuditLogFilter {
        endpoint_id: query.endpoint_id,
        from: query.from_date,
        to: query.to_date,
    };
    let entries = state.admin.audit_log(&filter).await?;
    Ok(ApiResponse::success(entries))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateResponse {
    entries_dropped: usize,
}

async fn invalidate_cache(
    State(state): State<AppState>,
    SuperUser(user): SuperUser,
) -> ApiResult<ApiResponse<InvalidateResponse>> {
    let entries_dropped = state.authorizer.invalidate_cache();
    tracing::info!(user = %user.name, entries_dropped, "permission cache flushed manually");
    Ok(ApiResponse::success(InvalidateResponse { entries_dropped }))
}

async fn cache_stats(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
) -> ApiResult<ApiResponse<docuvault_authz::CacheStats>> {
    Ok(ApiResponse::success(state.authorizer.cache_stats()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    endpoint_id: i64,
    role_names: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    is_valid: bool,
    validation_errors: Vec<String>,
}

/// Dry-run role set validation. Reports every violation without mutating
/// anything.
async fn validate_roles(
    State(state): State<AppState>,
    SuperUser(_): SuperUser,
    Json(body): Json<ValidateRequest>,
) -> ApiResult<ApiResponse<ValidateResponse>> {
    let validation_errors = state
        .admin
        .validate_roles(body.endpoint_id, &body.role_names)
        .await?;
    Ok(ApiResponse::success(ValidateResponse {
        is_valid: validation_errors.is_empty(),
        validation_errors,
    }))
}
