//! Persisted types of the permission store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One registered (HTTP method, route template) pair.
///
/// The route is the literal template as registered, parameter placeholders
/// included (`/api/documents/{id}`), never a resolved request path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub endpoint_id: i64,
    pub http_method: String,
    pub route: String,
    pub endpoint_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

/// One (endpoint, role name) grant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub permission_id: i64,
    pub endpoint_id: i64,
    pub role_name: String,
}

/// Immutable record of one administrative mutation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub audit_id: i64,
    pub endpoint_id: Option<i64>,
    pub changed_by: String,
    pub change_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_reason: Option<String>,
    pub changed_on: DateTime<Utc>,
}

/// Tags written into the audit log's `change_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    RolePermissionUpdate,
    EndpointCreated,
    EndpointDeactivated,
    EndpointReactivated,
    EndpointMetadataUpdate,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RolePermissionUpdate => "RolePermissionUpdate",
            Self::EndpointCreated => "EndpointCreated",
            Self::EndpointDeactivated => "EndpointDeactivated",
            Self::EndpointReactivated => "EndpointReactivated",
            Self::EndpointMetadataUpdate => "EndpointMetadataUpdate",
        }
    }
}

/// Registration request for a new endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEndpoint {
    pub http_method: String,
    pub route: String,
    pub endpoint_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Updatable endpoint metadata; the (method, route) key is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetadata {
    pub endpoint_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Filter for audit trail queries; all bounds optional.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub endpoint_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
