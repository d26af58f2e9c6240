//! Postgres-backed implementation of the back-office store.
//!
//! # What this module is
//! Implements [`BackOfficeStore`] using Postgres (via `sqlx`) as the durable,
//! shared store for roles and profile mappings, and reads the reference
//! registry tables (`enquiries`, `users`, `profiles`) that other services own.
//!
//! # Key invariants
//! - Each entity has a storage primary key (`id`) and a separate, unique
//!   business key (`role_id` / `mapping_id`).
//! - Business-key allocation and the entity insert run in one transaction.
//! - `business_key_sequences` holds the highest sequence issued per day
//!   prefix and is only ever incremented.
//!
//! # Allocation protocol
//! Inside the create transaction:
//! 1) read the greatest well-formed key under today's prefix (regex anchored,
//!    so malformed legacy suffixes are skipped) and derive a seed from it
//! 2) upsert the day's counter row with
//!    `GREATEST(last_value + 1, seed)` and read back the reserved value
//! 3) insert the entity with the rendered key and commit
//!
//! Step 2 takes a row lock on the counter, so concurrent allocators for the
//! same day queue behind each other instead of reading the same maximum.
//! If the insert fails the transaction rolls back and the counter with it.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`.
//! - Database URLs may contain credentials; they are never logged.
//! - Dynamic SQL is limited to a fixed, internal allowlist of table names.
use super::{BackOfficeStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{
    NewProfileMapping, NewRole, Permission, ProfileKind, ProfileMapping, ProfileMappingFilter,
    ProfileMappingPatch, ProfileRef, Role, RoleName, RolePatch,
};
use crate::sequence::{self, DayPrefix, KeyPrefix};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;

/// Durable back-office store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use backoffice::config::PostgresConfig;
/// use backoffice::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for the `roles` table.
#[derive(Debug, Clone, FromRow)]
struct DbRole {
    role_id: String,
    role_name: String,
    description: String,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row shape for the `profile_mappings` table.
#[derive(Debug, Clone, FromRow)]
struct DbProfileMapping {
    mapping_id: String,
    enquiry_id: String,
    profile_type: String,
    profile_id: String,
    profile_type_ref: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ROLE_COLUMNS: &str = "role_id, role_name, description, permissions, created_at, updated_at";
const MAPPING_COLUMNS: &str = "mapping_id, enquiry_id, profile_type, profile_id, profile_type_ref, created_by, created_at, updated_at";

impl PostgresStore {
    /// Connect to Postgres and run migrations.
    ///
    /// # Errors
    /// - Connection, migration, or pool setup failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations, for tests that manage the schema.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // `acquire_timeout` bounds how long a request waits for a pooled
        // connection; fail fast rather than hang on an unavailable database.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        let store = Self { pool };
        store.refresh_counts().await?;
        Ok(store)
    }

    async fn refresh_counts(&self) -> StoreResult<()> {
        let roles = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await?;
        let mappings = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profile_mappings")
            .fetch_one(&self.pool)
            .await?;
        metrics::gauge!("backoffice_roles_total").set(roles as f64);
        metrics::gauge!("backoffice_profile_mappings_total").set(mappings as f64);
        Ok(())
    }

    /// Refresh the count gauges after a committed write.
    ///
    /// The write has already landed, so a failed count is logged and the
    /// caller still reports success.
    async fn refresh_counts_after_write(&self) {
        if let Err(err) = self.refresh_counts().await {
            tracing::warn!(error = %err, "failed to refresh backoffice count gauges");
        }
    }
}

/// Reserve the next business key for `day` inside `tx`.
///
/// The caller must insert the entity in the same transaction; a rollback
/// releases the reservation.
async fn allocate_key(tx: &mut Transaction<'_, Postgres>, day: &DayPrefix) -> StoreResult<String> {
    // Table and column come from this fixed match, never from input.
    let latest_query = match day.prefix() {
        KeyPrefix::Role => {
            "SELECT role_id FROM roles WHERE role_id ~ $1 ORDER BY role_id DESC LIMIT 1"
        }
        KeyPrefix::ProfileMapping => {
            "SELECT mapping_id FROM profile_mappings WHERE mapping_id ~ $1 ORDER BY mapping_id DESC LIMIT 1"
        }
    };
    let latest = sqlx::query_scalar::<_, String>(latest_query)
        .bind(day.key_pattern())
        .fetch_optional(&mut **tx)
        .await?;
    let stored_max = latest.as_deref().and_then(|key| day.parse_sequence(key));
    let seed = sequence::next_sequence(None, stored_max);

    let reserved = sqlx::query_scalar::<_, i32>(
        r#"INSERT INTO business_key_sequences (day_prefix, last_value) VALUES ($1, $2)
           ON CONFLICT (day_prefix) DO UPDATE
           SET last_value = GREATEST(business_key_sequences.last_value + 1, EXCLUDED.last_value)
           RETURNING last_value"#,
    )
    .bind(day.as_str())
    .bind(i32::try_from(seed).map_err(|err| StoreError::Unexpected(err.into()))?)
    .fetch_one(&mut **tx)
    .await?;
    let reserved = u32::try_from(reserved).map_err(|err| StoreError::Unexpected(err.into()))?;
    Ok(sequence::issue(day, reserved)?)
}

#[async_trait]
impl BackOfficeStore for PostgresStore {
    // -----------------------------
    // Roles
    // -----------------------------

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY role_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(role_from_db).collect()
    }

    async fn get_role(&self, role_id: &str) -> StoreResult<Role> {
        let row = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE role_id = $1"
        ))
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("role {role_id}")))?;
        role_from_db(row)
    }

    async fn create_role(&self, role: NewRole, now: DateTime<Utc>) -> StoreResult<Role> {
        let mut tx = self.pool.begin().await?;
        let day = DayPrefix::new(KeyPrefix::Role, now);
        let role_id = allocate_key(&mut tx, &day).await?;
        let created = role.into_role(role_id, now);

        let insert = sqlx::query(
            r#"INSERT INTO roles (role_id, role_name, description, permissions, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&created.role_id)
        .bind(created.role_name.as_str())
        .bind(&created.description)
        .bind(permission_tokens(&created.permissions))
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await;
        if let Err(err) = insert {
            return Err(role_write_error(err, created.role_name));
        }

        tx.commit().await?;
        sequence::record_issued(KeyPrefix::Role);
        self.refresh_counts_after_write().await;
        Ok(created)
    }

    async fn patch_role(
        &self,
        role_id: &str,
        patch: RolePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Role> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE role_id = $1 FOR UPDATE"
        ))
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("role {role_id}")))?;
        let mut role = role_from_db(row)?;
        patch.apply(&mut role, now);

        let update = sqlx::query(
            r#"UPDATE roles SET role_name = $2, description = $3, permissions = $4, updated_at = $5
               WHERE role_id = $1"#,
        )
        .bind(&role.role_id)
        .bind(role.role_name.as_str())
        .bind(&role.description)
        .bind(permission_tokens(&role.permissions))
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await;
        if let Err(err) = update {
            return Err(role_write_error(err, role.role_name));
        }

        tx.commit().await?;
        Ok(role)
    }

    async fn delete_role(&self, role_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE role_id = $1")
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }
        self.refresh_counts_after_write().await;
        Ok(())
    }

    // -----------------------------
    // Profile mappings
    // -----------------------------

    async fn list_profile_mappings(
        &self,
        filter: &ProfileMappingFilter,
    ) -> StoreResult<Vec<ProfileMapping>> {
        let rows = sqlx::query_as::<_, DbProfileMapping>(&format!(
            r#"SELECT {MAPPING_COLUMNS} FROM profile_mappings
               WHERE ($1::TEXT IS NULL OR enquiry_id = $1)
                 AND ($2::TEXT IS NULL OR profile_type = $2)
               ORDER BY mapping_id"#
        ))
        .bind(filter.enquiry_id.as_deref())
        .bind(filter.profile_type.map(ProfileKind::tag))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(mapping_from_db).collect()
    }

    async fn get_profile_mapping(&self, mapping_id: &str) -> StoreResult<ProfileMapping> {
        let row = sqlx::query_as::<_, DbProfileMapping>(&format!(
            "SELECT {MAPPING_COLUMNS} FROM profile_mappings WHERE mapping_id = $1"
        ))
        .bind(mapping_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("profile mapping {mapping_id}")))?;
        mapping_from_db(row)
    }

    async fn create_profile_mapping(
        &self,
        mapping: NewProfileMapping,
        now: DateTime<Utc>,
    ) -> StoreResult<ProfileMapping> {
        let mut tx = self.pool.begin().await?;
        let day = DayPrefix::new(KeyPrefix::ProfileMapping, now);
        let mapping_id = allocate_key(&mut tx, &day).await?;
        let created = mapping.into_mapping(mapping_id, now);

        let insert = sqlx::query(
            r#"INSERT INTO profile_mappings
               (mapping_id, enquiry_id, profile_type, profile_id, profile_type_ref, created_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&created.mapping_id)
        .bind(&created.enquiry_id)
        .bind(created.profile_type.tag())
        .bind(&created.profile_id)
        .bind(&created.profile_type_ref)
        .bind(&created.created_by)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict(format!(
                    "business key {} exists",
                    created.mapping_id
                )));
            }
            return Err(StoreError::Unexpected(err.into()));
        }

        tx.commit().await?;
        sequence::record_issued(KeyPrefix::ProfileMapping);
        self.refresh_counts_after_write().await;
        Ok(created)
    }

    async fn patch_profile_mapping(
        &self,
        mapping_id: &str,
        patch: ProfileMappingPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<ProfileMapping> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, DbProfileMapping>(&format!(
            "SELECT {MAPPING_COLUMNS} FROM profile_mappings WHERE mapping_id = $1 FOR UPDATE"
        ))
        .bind(mapping_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("profile mapping {mapping_id}")))?;
        let mut mapping = mapping_from_db(row)?;
        patch.apply(&mut mapping, now);

        sqlx::query(
            r#"UPDATE profile_mappings
               SET enquiry_id = $2, profile_type = $3, profile_id = $4, profile_type_ref = $5, updated_at = $6
               WHERE mapping_id = $1"#,
        )
        .bind(&mapping.mapping_id)
        .bind(&mapping.enquiry_id)
        .bind(mapping.profile_type.tag())
        .bind(&mapping.profile_id)
        .bind(&mapping.profile_type_ref)
        .bind(mapping.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(mapping)
    }

    async fn delete_profile_mapping(&self, mapping_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM profile_mappings WHERE mapping_id = $1")
            .bind(mapping_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile mapping {mapping_id}")));
        }
        self.refresh_counts_after_write().await;
        Ok(())
    }

    // -----------------------------
    // Reference registry
    // -----------------------------

    async fn enquiry_exists(&self, enquiry_id: &str) -> StoreResult<bool> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM enquiries WHERE enquiry_id = $1)")
                .bind(enquiry_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn user_exists(&self, user_id: &str) -> StoreResult<bool> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn profile_exists(&self, profile: &ProfileRef) -> StoreResult<bool> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE profile_type_ref = $1 AND profile_id = $2)",
        )
        .bind(profile.collection())
        .bind(profile.id())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

fn role_write_error(err: sqlx::Error, role_name: RoleName) -> StoreError {
    if !is_unique_violation(&err) {
        return StoreError::Unexpected(err.into());
    }
    match violated_constraint(&err) {
        Some("roles_role_name_key") => StoreError::Conflict(format!("role name {role_name} exists")),
        _ => StoreError::Conflict("role business key exists".into()),
    }
}

fn permission_tokens(permissions: &[Permission]) -> Vec<String> {
    permissions
        .iter()
        .map(|permission| permission.as_str().to_string())
        .collect()
}

fn role_from_db(row: DbRole) -> StoreResult<Role> {
    let role_name = RoleName::from_str(&row.role_name)
        .map_err(|err| StoreError::Unexpected(anyhow!(err)))?;
    let permissions = row
        .permissions
        .iter()
        .map(|token| Permission::from_str(token))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| StoreError::Unexpected(anyhow!(err)))?;
    Ok(Role {
        role_id: row.role_id,
        role_name,
        description: row.description,
        permissions,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn mapping_from_db(row: DbProfileMapping) -> StoreResult<ProfileMapping> {
    let profile_type = ProfileKind::from_tag(&row.profile_type)
        .ok_or_else(|| anyhow!("invalid profile_type: {}", row.profile_type))?;
    Ok(ProfileMapping {
        mapping_id: row.mapping_id,
        enquiry_id: row.enquiry_id,
        profile_type,
        profile_id: row.profile_id,
        profile_type_ref: row.profile_type_ref,
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Store over a pool that never gets a connection: nothing listens on port 1.
    fn unreachable_store() -> PostgresStore {
        let options = PgConnectOptions::from_str("postgres://backoffice@127.0.0.1:1/backoffice")
            .expect("connect options");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(options);
        PostgresStore { pool }
    }

    #[tokio::test]
    async fn failed_gauge_refresh_does_not_fail_a_committed_write() {
        let store = unreachable_store();
        assert!(store.refresh_counts().await.is_err());
        tokio::time::timeout(Duration::from_secs(5), store.refresh_counts_after_write())
            .await
            .expect("refresh returns after logging");
    }

    fn db_role(role_name: &str, permissions: &[&str]) -> DbRole {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        DbRole {
            role_id: "ROLE-20261016-0001".to_string(),
            role_name: role_name.to_string(),
            description: "desc".to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn role_rows_parse_closed_sets() {
        let role = role_from_db(db_role("Sales Executive", &["enquiries.view"])).expect("parse");
        assert_eq!(role.role_name, RoleName::SalesExecutive);
        assert_eq!(role.permissions, vec![Permission::EnquiriesView]);

        assert!(role_from_db(db_role("Janitor", &[])).is_err());
        assert!(role_from_db(db_role("Viewer", &["roles.fly"])).is_err());
    }

    #[test]
    fn mapping_rows_reject_unknown_profile_type() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let row = DbProfileMapping {
            mapping_id: "MAP-20261016-0001".to_string(),
            enquiry_id: "enq".to_string(),
            profile_type: "warranty".to_string(),
            profile_id: "p".to_string(),
            profile_type_ref: "JobProfile".to_string(),
            created_by: "u".to_string(),
            created_at: at,
            updated_at: at,
        };
        assert!(mapping_from_db(row.clone()).is_err());
        let row = DbProfileMapping {
            profile_type: "job".to_string(),
            ..row
        };
        assert_eq!(
            mapping_from_db(row).expect("parse").profile_type,
            ProfileKind::Job
        );
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
        assert!(violated_constraint(&err).is_none());
        assert!(matches!(
            role_write_error(sqlx::Error::RowNotFound, RoleName::Admin),
            StoreError::Unexpected(_)
        ));
    }

    #[test]
    fn permissions_render_as_tokens() {
        assert_eq!(
            permission_tokens(&[Permission::RolesView, Permission::JobsManage]),
            vec!["roles.view".to_string(), "jobs.manage".to_string()]
        );
    }
}
