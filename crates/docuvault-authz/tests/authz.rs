//! End-to-end tests of the authorization core against in-memory SQLite.

use std::sync::Arc;
use std::time::Duration;

use docuvault_authz::{
    AccessPolicy, AuditLogFilter, AuthzError, CallerClaims, EndpointAuthorizer, EndpointMetadata,
    NewEndpoint, PermissionAdmin, PermissionStore, RoleSetCache,
};
use docuvault_database::{migrations, DatabasePool, Migrator, PoolConfig};
use sqlx::SqlitePool;

async fn setup() -> (SqlitePool, Arc<EndpointAuthorizer>, PermissionAdmin) {
    let pool = DatabasePool::new(PoolConfig::in_memory())
        .await
        .unwrap()
        .into_pool();
    Migrator::new(pool.clone()).run(&migrations()).await.unwrap();

    let store = PermissionStore::new(pool.clone());
    let authorizer = Arc::new(EndpointAuthorizer::new(
        store.clone(),
        RoleSetCache::default(),
    ));
    let admin = PermissionAdmin::new(store, authorizer.clone());

    (pool, authorizer, admin)
}

fn roles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

async fn register(admin: &PermissionAdmin, method: &str, route: &str) -> i64 {
    let endpoint = admin
        .create_endpoint(
            &NewEndpoint {
                http_method: method.to_string(),
                route: route.to_string(),
                endpoint_name: format!("{method} {route}"),
                description: None,
                category: Some("Test".to_string()),
            },
            "tester",
        )
        .await
        .unwrap();
    endpoint.endpoint_id
}

#[tokio::test]
async fn unconfigured_endpoint_denies_everyone() {
    let (_pool, authorizer, admin) = setup().await;
    register(&admin, "GET", "/api/reports").await;

    // No grants at all: even a caller holding a role literally named
    // "SuperUser" is denied until the endpoint is configured.
    for caller in [roles(&["Reader"]), roles(&["SuperUser"]), roles(&["admin"])] {
        assert!(
            !authorizer
                .check_access("GET", "/api/reports", &caller)
                .await
        );
    }
}

#[tokio::test]
async fn unknown_route_denies_without_error() {
    let (_pool, authorizer, _admin) = setup().await;

    assert!(
        !authorizer
            .check_access("GET", "/api/nowhere", &roles(&["Reader"]))
            .await
    );
    assert!(authorizer.get_allowed_roles("GET", "/api/nowhere").await.is_empty());
}

#[tokio::test]
async fn route_matching_is_exact_string() {
    let (_pool, authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/reports/{id}").await;
    admin
        .update_roles(id, &roles(&["Reader"]), "tester", None)
        .await
        .unwrap();

    // The template and a resolved path are independent lookups.
    assert!(
        authorizer
            .check_access("GET", "/api/reports/{id}", &roles(&["Reader"]))
            .await
    );
    assert!(
        !authorizer
            .check_access("GET", "/api/reports/42", &roles(&["Reader"]))
            .await
    );
}

#[tokio::test]
async fn intersection_semantics() {
    let (_pool, authorizer, admin) = setup().await;
    let id = register(&admin, "POST", "/api/reports").await;
    admin
        .update_roles(id, &roles(&["Reader", "Publisher"]), "tester", None)
        .await
        .unwrap();

    assert!(
        authorizer
            .check_access("POST", "/api/reports", &roles(&["Publisher", "Auditor"]))
            .await
    );
    assert!(
        !authorizer
            .check_access("POST", "/api/reports", &roles(&["Auditor"]))
            .await
    );
}

#[tokio::test]
async fn next_check_after_update_sees_new_roles() {
    let (_pool, authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;
    admin
        .update_roles(id, &roles(&["Reader"]), "tester", None)
        .await
        .unwrap();

    // Warm the cache with the old set.
    assert!(
        authorizer
            .check_access("GET", "/api/invoices", &roles(&["Reader"]))
            .await
    );

    admin
        .update_roles(id, &roles(&["Auditor"]), "tester", None)
        .await
        .unwrap();

    // Invalidation is synchronous with the update's completion.
    assert!(
        !authorizer
            .check_access("GET", "/api/invoices", &roles(&["Reader"]))
            .await
    );
    assert!(
        authorizer
            .check_access("GET", "/api/invoices", &roles(&["Auditor"]))
            .await
    );
}

#[tokio::test]
async fn role_replacement_is_total() {
    let (_pool, _authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;

    admin
        .update_roles(id, &roles(&["Reader", "Publisher"]), "tester", None)
        .await
        .unwrap();
    admin
        .update_roles(id, &roles(&["SuperUser"]), "tester", None)
        .await
        .unwrap();

    assert_eq!(
        admin.roles_for_endpoint(id).await.unwrap(),
        roles(&["SuperUser"])
    );
}

#[tokio::test]
async fn one_audit_row_per_update_with_ordered_snapshots() {
    let (_pool, _authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;

    let baseline = admin
        .audit_log(&AuditLogFilter {
            endpoint_id: Some(id),
            ..Default::default()
        })
        .await
        .unwrap()
        .len();

    admin
        .update_roles(id, &roles(&["Reader"]), "alice", None)
        .await
        .unwrap();
    admin
        .update_roles(id, &roles(&["Publisher", "Reader"]), "bob", Some("expand"))
        .await
        .unwrap();
    admin
        .update_roles(id, &roles(&["Auditor"]), "carol", None)
        .await
        .unwrap();

    let entries = admin
        .audit_log(&AuditLogFilter {
            endpoint_id: Some(id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), baseline + 3);

    // Newest first; snapshots chain: each old_value equals the previous
    // new_value.
    let updates: Vec<_> = entries
        .iter()
        .filter(|e| e.change_type == "RolePermissionUpdate")
        .collect();
    assert_eq!(updates.len(), 3);

    assert_eq!(updates[0].changed_by, "carol");
    assert_eq!(updates[0].old_value.as_deref(), Some("Publisher, Reader"));
    assert_eq!(updates[0].new_value.as_deref(), Some("Auditor"));

    assert_eq!(updates[1].changed_by, "bob");
    assert_eq!(updates[1].old_value.as_deref(), Some("Reader"));
    assert_eq!(updates[1].new_value.as_deref(), Some("Publisher, Reader"));
    assert_eq!(updates[1].change_reason.as_deref(), Some("expand"));

    assert_eq!(updates[2].changed_by, "alice");
    assert_eq!(updates[2].old_value.as_deref(), Some("(none)"));
    assert_eq!(updates[2].new_value.as_deref(), Some("Reader"));
}

#[tokio::test]
async fn validation_collects_every_error_and_mutates_nothing() {
    let (_pool, _authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;
    admin
        .update_roles(id, &roles(&["Reader"]), "tester", None)
        .await
        .unwrap();

    let bad = vec![
        "Reader".to_string(),
        "Reader".to_string(),
        "".to_string(),
        "x".repeat(51),
    ];

    match admin.update_roles(id, &bad, "tester", None).await {
        Err(AuthzError::Validation(errors)) => assert!(errors.len() >= 3),
        other => panic!("expected validation failure, got {other:?}"),
    }

    // The prior grant set is untouched.
    assert_eq!(
        admin.roles_for_endpoint(id).await.unwrap(),
        roles(&["Reader"])
    );
}

#[tokio::test]
async fn empty_role_set_is_rejected_leaving_grants_in_effect() {
    let (_pool, authorizer, admin) = setup().await;

    // Seeded scenario: DELETE /api/documents/{id} is granted to SuperUser.
    assert!(
        !authorizer
            .check_access("DELETE", "/api/documents/{id}", &roles(&["Reader"]))
            .await
    );
    assert!(
        authorizer
            .check_access("DELETE", "/api/documents/{id}", &roles(&["SuperUser"]))
            .await
    );

    let endpoints = admin.endpoints().await.unwrap();
    let id = endpoints
        .iter()
        .find(|e| e.http_method == "DELETE" && e.route == "/api/documents/{id}")
        .unwrap()
        .endpoint_id;

    match admin.update_roles(id, &[], "tester", None).await {
        Err(AuthzError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("At least one role")));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    // Behavior unchanged.
    assert!(
        !authorizer
            .check_access("DELETE", "/api/documents/{id}", &roles(&["Reader"]))
            .await
    );
    assert!(
        authorizer
            .check_access("DELETE", "/api/documents/{id}", &roles(&["SuperUser"]))
            .await
    );
}

#[tokio::test]
async fn update_roles_on_missing_endpoint_is_not_found() {
    let (_pool, _authorizer, admin) = setup().await;

    let result = admin
        .update_roles(999_999, &roles(&["Reader"]), "tester", None)
        .await;
    assert!(matches!(result, Err(AuthzError::NotFound(999_999))));
}

#[tokio::test]
async fn dry_run_validation_reports_missing_endpoint() {
    let (_pool, _authorizer, admin) = setup().await;

    let errors = admin
        .validate_roles(999_999, &roles(&["Reader"]))
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("does not exist"));

    let id = register(&admin, "GET", "/api/invoices").await;
    let errors = admin.validate_roles(id, &roles(&["Reader"])).await.unwrap();
    assert!(errors.is_empty());
}

#[tokio::test]
async fn deactivated_endpoint_no_longer_resolves() {
    let (_pool, authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;
    admin
        .update_roles(id, &roles(&["Reader"]), "tester", None)
        .await
        .unwrap();

    assert!(
        authorizer
            .check_access("GET", "/api/invoices", &roles(&["Reader"]))
            .await
    );

    admin
        .deactivate_endpoint(id, "tester", Some("retired"))
        .await
        .unwrap();

    assert!(
        !authorizer
            .check_access("GET", "/api/invoices", &roles(&["Reader"]))
            .await
    );

    admin.reactivate_endpoint(id, "tester", None).await.unwrap();

    assert!(
        authorizer
            .check_access("GET", "/api/invoices", &roles(&["Reader"]))
            .await
    );
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (_pool, _authorizer, admin) = setup().await;
    register(&admin, "GET", "/api/invoices").await;

    let result = admin
        .create_endpoint(
            &NewEndpoint {
                http_method: "GET".to_string(),
                route: "/api/invoices".to_string(),
                endpoint_name: "dup".to_string(),
                description: None,
                category: None,
            },
            "tester",
        )
        .await;

    assert!(matches!(
        result,
        Err(AuthzError::DuplicateEndpoint { .. })
    ));
}

#[tokio::test]
async fn metadata_update_is_audited() {
    let (_pool, _authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;

    admin
        .update_endpoint_metadata(
            id,
            &EndpointMetadata {
                endpoint_name: "Invoice listing".to_string(),
                description: Some("Paged invoice list".to_string()),
                category: Some("Invoices".to_string()),
            },
            "alice",
        )
        .await
        .unwrap();

    let entries = admin
        .audit_log(&AuditLogFilter {
            endpoint_id: Some(id),
            ..Default::default()
        })
        .await
        .unwrap();

    let meta = entries
        .iter()
        .find(|e| e.change_type == "EndpointMetadataUpdate")
        .unwrap();
    assert!(meta.new_value.as_deref().unwrap().contains("Invoice listing"));

    let endpoint = admin.endpoint(id).await.unwrap();
    assert_eq!(endpoint.endpoint_name, "Invoice listing");
    assert_eq!(endpoint.category.as_deref(), Some("Invoices"));
}

#[tokio::test]
async fn store_failure_degrades_to_deny() {
    let (pool, authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;
    admin
        .update_roles(id, &roles(&["Reader"]), "tester", None)
        .await
        .unwrap();

    pool.close().await;

    // Closed pool: the lookup fails, the check denies instead of erroring.
    assert!(
        !authorizer
            .check_access("GET", "/api/invoices", &roles(&["Reader"]))
            .await
    );
}

#[tokio::test]
async fn admin_writes_are_bounded_by_the_store_timeout() {
    let pool = DatabasePool::new(PoolConfig::in_memory())
        .await
        .unwrap()
        .into_pool();
    Migrator::new(pool.clone()).run(&migrations()).await.unwrap();

    let store = PermissionStore::new(pool.clone());
    let authorizer = Arc::new(
        EndpointAuthorizer::new(store.clone(), RoleSetCache::default())
            .with_store_timeout(Duration::ZERO),
    );
    let admin = PermissionAdmin::new(store, authorizer);

    // A zero budget elapses before the store can answer, so the mutation
    // surfaces the timeout instead of hanging the management call.
    let result = admin.update_roles(1, &roles(&["Reader"]), "tester", None).await;
    assert!(matches!(result, Err(AuthzError::StoreTimeout)));
}

#[tokio::test]
async fn policy_evaluation_matches_resolver_and_claims() {
    let (_pool, authorizer, admin) = setup().await;
    let id = register(&admin, "GET", "/api/invoices").await;
    admin
        .update_roles(id, &roles(&["Reader"]), "tester", None)
        .await
        .unwrap();

    let reader = roles(&["Reader"]);
    let caller = CallerClaims {
        roles: &reader,
        has_access: true,
        is_super_user: false,
    };

    assert!(
        AccessPolicy::endpoint("GET", "/api/invoices")
            .evaluate(&authorizer, &caller)
            .await
    );
    assert!(AccessPolicy::HasAccess.evaluate(&authorizer, &caller).await);
    assert!(!AccessPolicy::SuperUser.evaluate(&authorizer, &caller).await);
}

#[tokio::test]
async fn cache_serves_hits_until_invalidated() {
    // Short-TTL authorizer to exercise expiry without waiting 30 minutes.
    let pool = DatabasePool::new(PoolConfig::in_memory())
        .await
        .unwrap()
        .into_pool();
    Migrator::new(pool.clone()).run(&migrations()).await.unwrap();
    let store = PermissionStore::new(pool);
    let authorizer = EndpointAuthorizer::new(store, RoleSetCache::new(Duration::from_millis(50)));

    let first = authorizer.get_allowed_roles("GET", "/api/documents").await;
    assert_eq!(first, roles(&["Publisher", "Reader"]));

    let stats = authorizer.cache_stats();
    assert_eq!(stats.misses, 1);

    let second = authorizer.get_allowed_roles("GET", "/api/documents").await;
    assert_eq!(second, first);
    assert_eq!(authorizer.cache_stats().hits, 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let third = authorizer.get_allowed_roles("GET", "/api/documents").await;
    assert_eq!(third, first);
    // Expired entry counted as a second miss.
    assert_eq!(authorizer.cache_stats().misses, 2);
}
