//! Embedded schema migrations.
//!
//! Migrations are compiled into the binary and applied in version order, each
//! inside its own transaction, with a tracking table recording what has run.
//! Checksums guard against an already-applied migration being edited.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

use crate::pool::PoolError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} checksum mismatch: database has {applied}, code has {expected}")]
    ChecksumMismatch {
        version: i64,
        applied: String,
        expected: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// One versioned migration: an ordered list of statements applied atomically.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub statements: Vec<String>,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, statements: &[&str]) -> Self {
        Self::from_statements(
            version,
            name,
            statements.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn from_statements(
        version: i64,
        name: impl Into<String>,
        statements: Vec<String>,
    ) -> Self {
        let checksum = Self::compute_checksum(&statements);
        Self {
            version,
            name: name.into(),
            statements,
            checksum,
        }
    }

    fn compute_checksum(statements: &[String]) -> String {
        let mut hasher = Sha256::new();
        for statement in statements {
            hasher.update(statement.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Applies pending migrations against a pool.
pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn init(&self) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _docuvault_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                checksum TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Highest applied migration version, if any.
    pub async fn current_version(&self) -> Result<Option<i64>, MigrationError> {
        self.init().await?;

        let row = sqlx::query("SELECT MAX(version) AS version FROM _docuvault_migrations")
            .fetch_one(&self.pool)
            .await?;

        let version: Option<i64> = row.try_get("version").unwrap_or(None);
        Ok(version)
    }

    /// Apply every pending migration in version order.
    ///
    /// Returns the number of migrations applied.
    pub async fn run(&self, migrations: &[Migration]) -> Result<u32, MigrationError> {
        self.init().await?;

        let mut ordered: Vec<&Migration> = migrations.iter().collect();
        ordered.sort_by_key(|m| m.version);

        let mut applied = 0;
        for migration in ordered {
            if let Some(recorded) = self.applied_checksum(migration.version).await? {
                if recorded != migration.checksum {
                    return Err(MigrationError::ChecksumMismatch {
                        version: migration.version,
                        applied: recorded,
                        expected: migration.checksum.clone(),
                    });
                }
                debug!(version = migration.version, "Migration already applied");
                continue;
            }

            self.apply(migration).await?;
            applied += 1;
        }

        if applied > 0 {
            info!(applied, "Database migrations applied");
        }
        Ok(applied)
    }

    async fn applied_checksum(&self, version: i64) -> Result<Option<String>, MigrationError> {
        let row = sqlx::query("SELECT checksum FROM _docuvault_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("checksum")))
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        debug!(version = migration.version, name = %migration.name, "Applying migration");

        let mut tx = self.pool.begin().await?;

        for statement in &migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            "INSERT INTO _docuvault_migrations (version, name, checksum, applied_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(migration.version)
        .bind(&migration.name)
        .bind(&migration.checksum)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// The full migration set for the DocuVault schema.
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "permission_store_schema",
            &[
                r#"
                CREATE TABLE endpoint_registry (
                    endpoint_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    http_method TEXT NOT NULL,
                    route TEXT NOT NULL,
                    endpoint_name TEXT NOT NULL,
                    description TEXT,
                    category TEXT,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_on TEXT NOT NULL,
                    modified_on TEXT NOT NULL
                )
                "#,
                // (method, route) must be unique among *active* endpoints; a
                // deactivated row may be superseded by a fresh registration.
                r#"
                CREATE UNIQUE INDEX ux_endpoint_method_route_active
                    ON endpoint_registry (http_method, route)
                    WHERE is_active = 1
                "#,
                r#"
                CREATE TABLE endpoint_role_permission (
                    permission_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    endpoint_id INTEGER NOT NULL
                        REFERENCES endpoint_registry (endpoint_id),
                    role_name TEXT NOT NULL
                )
                "#,
                r#"
                CREATE INDEX ix_role_permission_endpoint
                    ON endpoint_role_permission (endpoint_id)
                "#,
                r#"
                CREATE TABLE permission_change_audit_log (
                    audit_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    endpoint_id INTEGER
                        REFERENCES endpoint_registry (endpoint_id),
                    changed_by TEXT NOT NULL,
                    change_type TEXT NOT NULL,
                    old_value TEXT,
                    new_value TEXT,
                    change_reason TEXT,
                    changed_on TEXT NOT NULL
                )
                "#,
                r#"
                CREATE INDEX ix_audit_endpoint
                    ON permission_change_audit_log (endpoint_id)
                "#,
                r#"
                CREATE INDEX ix_audit_changed_on
                    ON permission_change_audit_log (changed_on)
                "#,
            ],
        ),
        Migration::from_statements(
            2,
            "seed_endpoint_catalog",
            vec![
                seed_endpoint_sql("GET", "/api/documents", "List documents", "Documents"),
                seed_endpoint_sql("POST", "/api/documents", "Create document", "Documents"),
                seed_endpoint_sql("GET", "/api/documents/{id}", "Get document", "Documents"),
                seed_endpoint_sql("PUT", "/api/documents/{id}", "Update document", "Documents"),
                seed_endpoint_sql("DELETE", "/api/documents/{id}", "Delete document", "Documents"),
                seed_endpoint_sql("GET", "/api/counterparties", "List counterparties", "Counterparties"),
                seed_endpoint_sql("POST", "/api/counterparties", "Create counterparty", "Counterparties"),
                seed_endpoint_sql("GET", "/api/counterparties/{id}", "Get counterparty", "Counterparties"),
                seed_endpoint_sql("PUT", "/api/counterparties/{id}", "Update counterparty", "Counterparties"),
                seed_endpoint_sql("DELETE", "/api/counterparties/{id}", "Delete counterparty", "Counterparties"),
                seed_endpoint_sql("GET", "/api/document-types", "List document types", "DocumentTypes"),
                seed_endpoint_sql("POST", "/api/document-types", "Create document type", "DocumentTypes"),
                seed_endpoint_sql("PUT", "/api/document-types/{id}", "Update document type", "DocumentTypes"),
                seed_endpoint_sql("DELETE", "/api/document-types/{id}", "Delete document type", "DocumentTypes"),
                // Worked example: everything else stays fail-closed until an
                // administrator assigns roles.
                seed_grant_sql("GET", "/api/documents", "Reader"),
                seed_grant_sql("GET", "/api/documents", "Publisher"),
                seed_grant_sql("GET", "/api/documents/{id}", "Reader"),
                seed_grant_sql("GET", "/api/documents/{id}", "Publisher"),
                seed_grant_sql("DELETE", "/api/documents/{id}", "SuperUser"),
            ],
        ),
    ]
}

fn seed_endpoint_sql(method: &str, route: &str, name: &str, category: &str) -> String {
    format!(
        "INSERT INTO endpoint_registry \
         (http_method, route, endpoint_name, description, category, is_active, created_on, modified_on) \
         VALUES ('{method}', '{route}', '{name}', NULL, '{category}', 1, \
         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))"
    )
}

fn seed_grant_sql(method: &str, route: &str, role: &str) -> String {
    format!(
        "INSERT INTO endpoint_role_permission (endpoint_id, role_name) \
         SELECT endpoint_id, '{role}' FROM endpoint_registry \
         WHERE http_method = '{method}' AND route = '{route}' AND is_active = 1"
    )
}
