//! Administrator-facing management service.
//!
//! Combines validation, the permission store, and cache invalidation into
//! atomic user-facing operations. The order is fixed: validate, then the
//! transactional store mutation, then cache invalidation. Invalidating
//! before the commit is visible would let a concurrent reader repopulate the
//! cache with the old role set.

use std::future::Future;
use std::sync::Arc;

use tokio::time::timeout;
use tracing::info;

use crate::error::{AuthzError, AuthzResult};
use crate::model::{AuditLogEntry, AuditLogFilter, Endpoint, EndpointMetadata, NewEndpoint};
use crate::resolver::EndpointAuthorizer;
use crate::store::PermissionStore;
use crate::validation::validate_role_names;

pub struct PermissionAdmin {
    store: PermissionStore,
    authorizer: Arc<EndpointAuthorizer>,
}

impl PermissionAdmin {
    pub fn new(store: PermissionStore, authorizer: Arc<EndpointAuthorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Run a store operation under the configured store timeout.
    ///
    /// Mutations must not hang a management request indefinitely; a store
    /// that stops responding surfaces as [`AuthzError::StoreTimeout`].
    async fn bounded<T, F>(&self, op: F) -> AuthzResult<T>
    where
        F: Future<Output = AuthzResult<T>>,
    {
        match timeout(self.authorizer.store_timeout(), op).await {
            Ok(result) => result,
            Err(_) => Err(AuthzError::StoreTimeout),
        }
    }

    /// Replace an endpoint's role grants.
    ///
    /// Missing endpoints surface as [`AuthzError::NotFound`]; rule violations
    /// as [`AuthzError::Validation`] carrying every message at once. No store
    /// mutation happens on either.
    pub async fn update_roles(
        &self,
        endpoint_id: i64,
        new_roles: &[String],
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        if self.bounded(self.store.get_endpoint(endpoint_id)).await?.is_none() {
            return Err(AuthzError::NotFound(endpoint_id));
        }

        let violations = validate_role_names(new_roles);
        if !violations.is_empty() {
            return Err(AuthzError::Validation(
                violations.iter().map(ToString::to_string).collect(),
            ));
        }

        self.bounded(self.store.replace_role_permissions(
            endpoint_id,
            new_roles,
            changed_by,
            reason,
        ))
        .await?;

        let dropped = self.authorizer.invalidate_cache();
        info!(
            endpoint_id,
            changed_by,
            roles = new_roles.len(),
            cache_dropped = dropped,
            "Role grants updated"
        );
        Ok(())
    }

    /// Dry-run validation: the complete rule list, existence included, with
    /// nothing mutated.
    pub async fn validate_roles(
        &self,
        endpoint_id: i64,
        roles: &[String],
    ) -> AuthzResult<Vec<String>> {
        let mut errors: Vec<String> = validate_role_names(roles)
            .iter()
            .map(ToString::to_string)
            .collect();

        if self.store.get_endpoint(endpoint_id).await?.is_none() {
            errors.push(format!("Endpoint {endpoint_id} does not exist"));
        }

        Ok(errors)
    }

    pub async fn create_endpoint(
        &self,
        new: &NewEndpoint,
        changed_by: &str,
    ) -> AuthzResult<Endpoint> {
        let endpoint = self.bounded(self.store.create_endpoint(new, changed_by)).await?;
        self.authorizer.invalidate_cache();
        Ok(endpoint)
    }

    pub async fn update_endpoint_metadata(
        &self,
        endpoint_id: i64,
        meta: &EndpointMetadata,
        changed_by: &str,
    ) -> AuthzResult<()> {
        self.bounded(self.store.update_endpoint_metadata(endpoint_id, meta, changed_by))
            .await?;
        self.authorizer.invalidate_cache();
        Ok(())
    }

    pub async fn deactivate_endpoint(
        &self,
        endpoint_id: i64,
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        self.bounded(self.store.deactivate_endpoint(endpoint_id, changed_by, reason))
            .await?;
        self.authorizer.invalidate_cache();
        Ok(())
    }

    pub async fn reactivate_endpoint(
        &self,
        endpoint_id: i64,
        changed_by: &str,
        reason: Option<&str>,
    ) -> AuthzResult<()> {
        self.bounded(self.store.reactivate_endpoint(endpoint_id, changed_by, reason))
            .await?;
        self.authorizer.invalidate_cache();
        Ok(())
    }

    pub async fn endpoint(&self, endpoint_id: i64) -> AuthzResult<Endpoint> {
        self.store
            .get_endpoint(endpoint_id)
            .await?
            .ok_or(AuthzError::NotFound(endpoint_id))
    }

    /// The active registration guarding (method, route), if any.
    pub async fn endpoint_for_route(
        &self,
        method: &str,
        route: &str,
    ) -> AuthzResult<Option<Endpoint>> {
        self.store.find_endpoint(method, route).await
    }

    pub async fn endpoints(&self) -> AuthzResult<Vec<Endpoint>> {
        self.store.list_endpoints().await
    }

    pub async fn roles_for_endpoint(&self, endpoint_id: i64) -> AuthzResult<Vec<String>> {
        // Distinguish "no grants" from "no such endpoint".
        self.endpoint(endpoint_id).await?;
        self.store.roles_for_endpoint(endpoint_id).await
    }

    pub async fn distinct_roles(&self) -> AuthzResult<Vec<String>> {
        self.store.list_distinct_roles().await
    }

    pub async fn audit_log(&self, filter: &AuditLogFilter) -> AuthzResult<Vec<AuditLogEntry>> {
        self.store.list_audit_log(filter).await
    }

    pub fn authorizer(&self) -> &Arc<EndpointAuthorizer> {
        &self.authorizer
    }
}
