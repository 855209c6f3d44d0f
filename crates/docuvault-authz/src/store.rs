//! Durable permission store over SQLite.
//!
//! Every multi-row mutation runs in one transaction and writes exactly one
//! audit row before committing; a failure at any step rolls the whole change
//! back, so partial permission state is never observable.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::error::{AuthzError, AuthzResult};
use crate::model::{
    AuditLogEntry, AuditLogFilter, ChangeType, Endpoint, EndpointMetadata, NewEndpoint,
};

/// Data access for the endpoint registry, role grants, and audit log.
#[derive(Clone)]
pub struct PermissionStore {
    pool: SqlitePool,
}

impl PermissionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Distinct role names granted on the active endpoint matching
    /// (method, route) exactly. Empty when the endpoint is unknown, inactive,
    /// or has no grants: absence of configuration is a deny, not an error.
    #[instrument(skip(self))]
    pub async fn get_allowed_roles(&self, method: &str, route: &str) -> AuthzResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT p.role_name
             FROM endpoint_role_permission p
             JOIN endpoint_registry e ON e.endpoint_id = p.endpoint_id
             WHERE e.http_method = ?1 AND e.route = ?2 AND e.is_active = 1
             ORDER BY p.role_name",
        )
        .bind(method)
        .bind(route)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// The active registration for (method, route), if one exists.
    pub async fn find_endpoint(&self, method: &str, route: &str) -> AuthzResult<Option<Endpoint>> {
        let endpoint = sqlx::query_as::<_, Endpoint>(
            "SELECT endpoint_id, http_method, route, endpoint_name, description,
                    category, is_active, created_on, modified_on
             FROM endpoint_registry
             WHERE http_method = ?1 AND route = ?2 AND is_active = 1",
        )
        .bind(method)
        .bind(route)
        .fetch_optional(&self.pool)
        .await?;

        Ok(endpoint)
    }

    pub async fn get_endpoint(&self, endpoint_id: i64) -> AuthzResult<Option<Endpoint>> {
        let endpoint = sqlx::query_as::<_, Endpoint>(
            "SELECT endpoint_id, http_method, route, endpoint_name, description,
                    category, is_active, created_on, modified_on
             FROM endpoint_registry WHERE endpoint_id = ?1",
        )
        .bind(endpoint_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(endpoint)
    }

    /// Full registry, grouped the way the admin UI displays it.
    pub async fn list_endpoints(&self) -> AuthzResult<Vec<Endpoint>> {
        let endpoints = sqlx::query_as::<_, Endpoint>(
            "SELECT endpoint_id, http_method, route, endpoint_name, description,
                    category, is_active, created_on, modified_on
             FROM endpoint_registry
             ORDER BY category, route, http_method",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(endpoints)
    }

    pub async fn roles_for_endpoint(&self, endpoint_id: i64) -> AuthzResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT role_name FROM endpoint_role_permission
             WHERE endpoint_id = ?1 ORDER BY role_name",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Every role name assigned anywhere, for admin autocomplete.
    pub async fn list_distinct_roles(&self) -> AuthzResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT role_name FROM endpoint_role_permission ORDER BY role_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Register a new endpoint; one audit row in the same transaction.
    #[instrument(skip(self, new), fields(method = %new.http_method, route = %new.route))]
    pub async fn create_endpoint(
        &self,
        new: &NewEndpoint,
        changed_by: &str,
    ) -> AuthzResult<Endpoint> {
        let mut tx = self.pool.begin().await?;

        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT endpoint_id FROM endpoint_registry
             WHERE http_method = ?1 AND route = ?2 AND is_active = 1",
        )
        .bind(&new.http_method)
        .bind(&new.route)
        .fetch_optional(&mut *tx)
        .await?;

        if duplicate.is_some() {
            return Err(AuthzError::DuplicateEndpoint {
                method: new.http_method.clone(),
                route: new.route.clone(),
            });
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO endpoint_registry
             (http_method, route, endpoint_name, description, category, is_active, created_on, modified_on)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
        )
        .bind(&new.http_method)
        .bind(&new.route)
        .bind(&new.endpoint_name)
        .bind(&new.description)
        .bind(&new.category)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let endpoint_id = result.last_insert_rowid();

        insert_audit(
            &mut tx,
            Some(endpoint_id),
            changed_by,
            ChangeType::EndpointCreated,
            None,
            Some(format!("{} {}", new.http_method, new.route)),
            None,
            now,
        )
        .await?;

        tx.commit().await?;
        debug!(endpoint_id, "Endpoint registered");

        self.get_endpoint(endpoint_id)
            .await?
            .ok_or(AuthzError::NotFound(endpoint_id))
    }

    /// Update display metadata only; the (method, route) key never changes.
    #[instrument(skip(self, meta))]
    pub async fn update_endpoint_metadata(
        &self,
        endpoint_id: i64,
        meta: &EndpointMetadata,
        changed_by: &str,
    ) -> AuthzResult<()> {
        let mut tx = self.pool.begin().await?;

        let old = fetch_endpoint(&mut tx, endpoint_id)
            .await?
            .ok_or(AuthzError::NotFound(endpoint_id))?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE endpoint_registry
             SET endpoint_name = ?2, description = ?3, category = ?4, modified_on = ?5
             WHERE endpoint_id = ?1",
        )
        .bind(endpoint_id)
        .bind(&meta.endpoint_name)
        .bind(&meta.description)
        .bind(&meta.category)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            Some(endpoint_id),
            changed_by,
            ChangeType::EndpointMetadataUpdate,
            Some(metadata_snapshot(
                &old.endpoint_name,
                old.category.as_deref(),
                old.description.as_deref(),
            )),
            Some(metadata_snapshot(
                &meta.endpoint_name,
                meta.category.as_deref(),
                meta.description.as_deref(),
            )),
            None,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete. The row survives so audit entries keep a valid reference.
    #[instrument(skip(self))]
    pub async fn deactivate_endpoint(
        &self,
        endpoint_id: i64,
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        self.set_active(endpoint_id, false, changed_by, reason).await
    }

    #[instrument(skip(self))]
    pub async fn reactivate_endpoint(
        &self,
        endpoint_id: i64,
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        self.set_active(endpoint_id, true, changed_by, reason).await
    }

    async fn set_active(
        &self,
        endpoint_id: i64,
        active: bool,
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        let mut tx = self.pool.begin().await?;

        let endpoint = fetch_endpoint(&mut tx, endpoint_id)
            .await?
            .ok_or(AuthzError::NotFound(endpoint_id))?;

        if endpoint.is_active == active {
            // Already in the requested state; nothing to record.
            return Ok(());
        }

        if active {
            // Reactivation must not collide with an active registration that
            // took over the (method, route) pair in the meantime.
            let clash = sqlx::query_scalar::<_, i64>(
                "SELECT endpoint_id FROM endpoint_registry
                 WHERE http_method = ?1 AND route = ?2 AND is_active = 1 AND endpoint_id != ?3",
            )
            .bind(&endpoint.http_method)
            .bind(&endpoint.route)
            .bind(endpoint_id)
            .fetch_optional(&mut *tx)
            .await?;

            if clash.is_some() {
                return Err(AuthzError::DuplicateEndpoint {
                    method: endpoint.http_method.clone(),
                    route: endpoint.route.clone(),
                });
            }
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE endpoint_registry SET is_active = ?2, modified_on = ?3 WHERE endpoint_id = ?1",
        )
        .bind(endpoint_id)
        .bind(active)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let (change_type, old_state, new_state) = if active {
            (ChangeType::EndpointReactivated, "Inactive", "Active")
        } else {
            (ChangeType::EndpointDeactivated, "Active", "Inactive")
        };

        insert_audit(
            &mut tx,
            Some(endpoint_id),
            changed_by,
            change_type,
            Some(old_state.to_string()),
            Some(new_state.to_string()),
            reason,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace the endpoint's entire grant set atomically.
    ///
    /// Delete-all-then-insert, never an incremental patch: after commit the
    /// stored set exactly matches this submission. The audit row snapshots
    /// the sorted old and new role lists.
    #[instrument(skip(self, new_roles))]
    pub async fn replace_role_permissions(
        &self,
        endpoint_id: i64,
        new_roles: &[String],
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        let mut tx = self.pool.begin().await?;

        fetch_endpoint(&mut tx, endpoint_id)
            .await?
            .ok_or(AuthzError::NotFound(endpoint_id))?;

        let mut old_roles = sqlx::query_scalar::<_, String>(
            "SELECT role_name FROM endpoint_role_permission WHERE endpoint_id = ?1",
        )
        .bind(endpoint_id)
        .fetch_all(&mut *tx)
        .await?;
        old_roles.sort();

        sqlx::query("DELETE FROM endpoint_role_permission WHERE endpoint_id = ?1")
            .bind(endpoint_id)
            .execute(&mut *tx)
            .await?;

        let mut sorted_new: Vec<String> = new_roles.to_vec();
        sorted_new.sort();

        for role in &sorted_new {
            sqlx::query(
                "INSERT INTO endpoint_role_permission (endpoint_id, role_name) VALUES (?1, ?2)",
            )
            .bind(endpoint_id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        }

        let now = Utc::now();
        sqlx::query("UPDATE endpoint_registry SET modified_on = ?2 WHERE endpoint_id = ?1")
            .bind(endpoint_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        insert_audit(
            &mut tx,
            Some(endpoint_id),
            changed_by,
            ChangeType::RolePermissionUpdate,
            Some(role_snapshot(&old_roles)),
            Some(role_snapshot(&sorted_new)),
            reason,
            now,
        )
        .await?;

        tx.commit().await?;
        debug!(endpoint_id, roles = sorted_new.len(), "Role grants replaced");
        Ok(())
    }

    /// Audit trail, newest first.
    pub async fn list_audit_log(&self, filter: &AuditLogFilter) -> AuthzResult<Vec<AuditLogEntry>> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT audit_id, endpoint_id, changed_by, change_type, old_value,
                    new_value, change_reason, changed_on
             FROM permission_change_audit_log
             WHERE (?1 IS NULL OR endpoint_id = ?1)
               AND (?2 IS NULL OR changed_on >= ?2)
               AND (?3 IS NULL OR changed_on <= ?3)
             ORDER BY changed_on DESC, audit_id DESC",
        )
        .bind(filter.endpoint_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

async fn fetch_endpoint(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    endpoint_id: i64,
) -> Result<Option<Endpoint>, sqlx::Error> {
    sqlx::query_as::<_, Endpoint>(
        "SELECT endpoint_id, http_method, route, endpoint_name, description,
                category, is_active, created_on, modified_on
         FROM endpoint_registry WHERE endpoint_id = ?1",
    )
    .bind(endpoint_id)
    .fetch_optional(&mut **tx)
    .await
}

#[allow(clippy::too_many_arguments)]
async fn insert_audit(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    endpoint_id: Option<i64>,
    changed_by: &str,
    change_type: ChangeType,
    old_value: Option<String>,
    new_value: Option<String>,
    reason: Option<&str>,
    changed_on: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO permission_change_audit_log
         (endpoint_id, changed_by, change_type, old_value, new_value, change_reason, changed_on)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(endpoint_id)
    .bind(changed_by)
    .bind(change_type.as_str())
    .bind(old_value)
    .bind(new_value)
    .bind(reason)
    .bind(changed_on)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn role_snapshot(roles: &[String]) -> String {
    if roles.is_empty() {
        "(none)".to_string()
    } else {
        roles.join(", ")
    }
}

fn metadata_snapshot(name: &str, category: Option<&str>, description: Option<&str>) -> String {
    format!(
        "name={name}; category={}; description={}",
        category.unwrap_or("-"),
        description.unwrap_or("-"),
    )
}
