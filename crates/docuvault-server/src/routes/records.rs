//! Record routes guarded by the dynamic permission store.
//!
//! Each route is wrapped in an [`EndpointAuthzLayer`] keyed by the same
//! template string that the registry stores, so grants administered at
//! runtime take effect here without code changes. The handler bodies are
//! thin; the interesting behavior is the guard in front of them.

use std::sync::Arc;

use axum::{
    extract::Path,
    routing::{get, put},
    Json, Router,
};
use docuvault_authz::EndpointAuthorizer;
use serde_json::{json, Value};

use crate::{middleware::authz::EndpointAuthzLayer, response::ApiResponse, state::AppState};

/// Create the record routes router.
pub fn router(authorizer: Arc<EndpointAuthorizer>) -> Router<AppState> {
    let guard = |template: &str| EndpointAuthzLayer::for_template(Arc::clone(&authorizer), template);

    Router::new()
        .route(
            "/documents",
            get(list_documents)
                .post(create_document)
                .route_layer(guard("/api/documents")),
        )
        .route(
            "/documents/:id",
            get(get_document)
                .put(update_document)
                .delete(delete_document)
                .route_layer(guard("/api/documents/{id}")),
        )
        .route(
            "/counterparties",
            get(list_counterparties)
                .post(create_counterparty)
                .route_layer(guard("/api/counterparties")),
        )
        .route(
            "/counterparties/:id",
            get(get_counterparty)
                .put(update_counterparty)
                .delete(delete_counterparty)
                .route_layer(guard("/api/counterparties/{id}")),
        )
        .route(
            "/document-types",
            get(list_document_types)
                .post(create_document_type)
                .route_layer(guard("/api/document-types")),
        )
        .route(
            "/document-types/:id",
            put(update_document_type)
                .delete(delete_document_type)
                .route_layer(guard("/api/document-types/{id}")),
        )
}

async fn list_documents() -> ApiResponse<Vec<Value>> {
    ApiResponse::success(Vec::new())
}

async fn get_document(Path(id): Path<i64>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "documentId": id }))
}

async fn create_document(Json(body): Json<Value>) -> ApiResponse<Value> {
    ApiResponse::success(body)
}

async fn update_document(Path(id): Path<i64>, Json(body): Json<Value>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "documentId": id, "document": body }))
}

async fn delete_document(Path(id): Path<i64>) -> ApiResponse<()> {
    ApiResponse::message_only(format!("Document {id} deleted"))
}

async fn list_counterparties() -> ApiResponse<Vec<Value>> {
    ApiResponse::success(Vec::new())
}

async fn get_counterparty(Path(id): Path<i64>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "counterpartyId": id }))
}

async fn create_counterparty(Json(body): Json<Value>) -> ApiResponse<Value> {
    ApiResponse::success(body)
}

async fn update_counterparty(Path(id): Path<i64>, Json(body): Json<Value>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "counterpartyId": id, "counterparty": body }))
}

async fn delete_counterparty(Path(id): Path<i64>) -> ApiResponse<()> {
    ApiResponse::message_only(format!("Counterparty {id} deleted"))
}

async fn list_document_types() -> ApiResponse<Vec<Value>> {
    ApiResponse::success(Vec::new())
}

async fn create_document_type(Json(body): Json<Value>) -> ApiResponse<Value> {
    ApiResponse::success(body)
}

async fn update_document_type(Path(id): Path<i64>, Json(body): Json<Value>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "documentTypeId": id, "documentType": body }))
}

async fn delete_document_type(Path(id): Path<i64>) -> ApiResponse<()> {
    ApiResponse::message_only(format!("Document type {id} deleted"))
}
