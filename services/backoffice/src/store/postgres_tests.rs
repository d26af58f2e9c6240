//! Postgres store tests against a real database.
//!
//! # Purpose
//! Exercise the Postgres-backed store with real SQL to verify the schema,
//! migrations, CRUD paths, and transactional business-key allocation.
//!
//! # Key invariants
//! - Tests use a dedicated schema to avoid cross-test contamination.
//! - Migrations are run once per schema.
//! - Reset logic truncates tables to a clean baseline.
//!
//! # How to use
//! Point `BACKOFFICE_TEST_DATABASE_URL` (or `DATABASE_URL`) at a scratch
//! database and run `cargo test -p backoffice --features pg-tests`. Without a
//! URL the tests return early.
#![cfg(feature = "pg-tests")]

use super::postgres::PostgresStore;
use super::{BackOfficeStore, StoreError};
use crate::config;
use crate::model::{
    NewProfileMapping, NewRole, Permission, ProfileKind, ProfileMappingFilter,
    ProfileMappingPatch, ProfileRef, RoleName, RolePatch,
};
use chrono::{DateTime, TimeZone, Utc};
use serial_test::serial;
use sqlx::Connection;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

static PG_SCHEMA: tokio::sync::OnceCell<String> = tokio::sync::OnceCell::const_new();
static PG_SCHEMA_READY: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();
static PG_MIGRATED: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

static MIGRATOR: Migrator = sqlx::migrate!();

fn pg_url() -> Option<String> {
    let url = std::env::var("BACKOFFICE_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok();
    if url.is_none() {
        eprintln!("skipping pg-tests: no database url configured");
    }
    url
}

async fn test_schema_name() -> String {
    PG_SCHEMA
        .get_or_init(|| async {
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            format!("backoffice_test_{}_{}", std::process::id(), nanos)
        })
        .await
        .clone()
}

fn url_with_schema(base_url: &str, schema: &str) -> String {
    let encoded = format!("-csearch_path%3D{schema}");
    if base_url.contains('?') {
        format!("{base_url}&options={encoded}")
    } else {
        format!("{base_url}?options={encoded}")
    }
}

async fn ensure_schema(base_url: &str) -> Result<String, sqlx::Error> {
    let schema = test_schema_name().await;
    let schema_clone = schema.clone();
    PG_SCHEMA_READY
        .get_or_try_init(|| async move {
            let mut conn = sqlx::PgConnection::connect(base_url).await?;
            let create_sql = format!(r#"CREATE SCHEMA IF NOT EXISTS "{schema_clone}""#);
            sqlx::query(&create_sql).execute(&mut conn).await?;
            Ok::<_, sqlx::Error>(())
        })
        .await?;
    Ok(schema)
}

async fn run_migrations_once(url: &str) -> Result<(), sqlx::Error> {
    PG_MIGRATED
        .get_or_try_init(|| async move {
            let mut conn = sqlx::PgConnection::connect(url).await?;
            MIGRATOR.run(&mut conn).await?;
            conn.close().await?;
            Ok::<_, sqlx::Error>(())
        })
        .await?;
    Ok(())
}

async fn reset_db(url: &str, schema: &str) -> Result<(), sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    let schema_ident = format!(r#""{schema}""#);
    let truncate = format!(
        "TRUNCATE {schema_ident}.roles, {schema_ident}.profile_mappings, \
         {schema_ident}.business_key_sequences, {schema_ident}.enquiries, \
         {schema_ident}.users, {schema_ident}.profiles RESTART IDENTITY",
    );
    sqlx::query(&truncate).execute(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Fresh, migrated, empty store, or `None` when no database is configured.
async fn fresh_store() -> anyhow::Result<Option<(PostgresStore, String)>> {
    let Some(url) = pg_url() else {
        return Ok(None);
    };
    let schema = ensure_schema(&url).await?;
    let url = url_with_schema(&url, &schema);
    run_migrations_once(&url).await?;
    reset_db(&url, &schema).await?;
    let pg_cfg = config::PostgresConfig {
        url: url.clone(),
        max_connections: 8,
        acquire_timeout_ms: 10_000,
    };
    let store = PostgresStore::connect_without_migrations(&pg_cfg).await?;
    Ok(Some((store, url)))
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

fn job_mapping(enquiry: &str) -> NewProfileMapping {
    NewProfileMapping {
        enquiry_id: enquiry.to_string(),
        profile: ProfileRef::Job("job-1".to_string()),
        created_by: "user-1".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn postgres_store_full_roundtrip() -> anyhow::Result<()> {
    let Some((store, url)) = fresh_store().await? else {
        return Ok(());
    };

    let admin = store
        .create_role(NewRole::new(RoleName::Admin, "root", None), at(16, 9))
        .await?;
    assert_eq!(admin.role_id, "ROLE-20261016-0001");
    assert_eq!(admin.permissions.len(), Permission::ALL.len());

    let err = store
        .create_role(NewRole::new(RoleName::Admin, "again", None), at(16, 9))
        .await
        .expect_err("duplicate role name");
    assert!(matches!(err, StoreError::Conflict(_)));

    let viewer = store
        .create_role(NewRole::new(RoleName::Viewer, "viewers", None), at(16, 10))
        .await?;
    assert_eq!(viewer.role_id, "ROLE-20261016-0002");

    let patched = store
        .patch_role(
            &viewer.role_id,
            RolePatch {
                permissions: Some(vec![Permission::ReportsView]),
                ..RolePatch::default()
            },
            at(16, 11),
        )
        .await?;
    assert_eq!(patched.permissions, vec![Permission::ReportsView]);
    assert_eq!(patched.updated_at, at(16, 11));
    assert_eq!(store.get_role(&viewer.role_id).await?, patched);
    assert_eq!(store.list_roles().await?.len(), 2);

    let mapping = store
        .create_profile_mapping(job_mapping("enq-1"), at(16, 9))
        .await?;
    assert_eq!(mapping.mapping_id, "MAP-20261016-0001");
    let moved = store
        .patch_profile_mapping(
            &mapping.mapping_id,
            ProfileMappingPatch {
                profile: Some(ProfileRef::Amc("amc-3".to_string())),
                ..ProfileMappingPatch::default()
            },
            at(16, 12),
        )
        .await?;
    assert_eq!(moved.profile_type, ProfileKind::Amc);
    assert_eq!(moved.profile_type_ref, "AmcProfile");
    let filtered = store
        .list_profile_mappings(&ProfileMappingFilter {
            enquiry_id: Some("enq-1".to_string()),
            profile_type: Some(ProfileKind::Amc),
        })
        .await?;
    assert_eq!(filtered.len(), 1);

    store.delete_profile_mapping(&mapping.mapping_id).await?;
    assert!(matches!(
        store.get_profile_mapping(&mapping.mapping_id).await,
        Err(StoreError::NotFound(_))
    ));
    store.delete_role(&viewer.role_id).await?;
    assert!(matches!(
        store.delete_role(&viewer.role_id).await,
        Err(StoreError::NotFound(_))
    ));

    store.health_check().await?;
    assert!(store.is_durable());
    assert_eq!(store.backend_name(), "postgres");

    let _ = PostgresStore::connect(&config::PostgresConfig {
        url,
        max_connections: 2,
        acquire_timeout_ms: 10_000,
    })
    .await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn postgres_allocation_skips_malformed_and_deleted_keys() -> anyhow::Result<()> {
    let Some((store, url)) = fresh_store().await? else {
        return Ok(());
    };
    let pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;
    for (role_id, role_name) in [
        ("ROLE-20261016-0042", "Support"),
        ("ROLE-20261016-9x9x", "Accountant"),
    ] {
        sqlx::query(
            r#"INSERT INTO roles (role_id, role_name, description, permissions, created_at, updated_at)
               VALUES ($1, $2, '', '{}', now(), now())"#,
        )
        .bind(role_id)
        .bind(role_name)
        .execute(&pool)
        .await?;
    }
    pool.close().await;

    let next = store
        .create_role(NewRole::new(RoleName::Manager, "managers", None), at(16, 9))
        .await?;
    assert_eq!(next.role_id, "ROLE-20261016-0043");
    store.delete_role(&next.role_id).await?;
    let after_delete = store
        .create_role(NewRole::new(RoleName::Manager, "managers", None), at(16, 10))
        .await?;
    assert_eq!(after_delete.role_id, "ROLE-20261016-0044");

    let tomorrow = store
        .create_role(NewRole::new(RoleName::Viewer, "viewers", None), at(17, 0))
        .await?;
    assert_eq!(tomorrow.role_id, "ROLE-20261017-0001");
    Ok(())
}

#[tokio::test]
#[serial]
async fn postgres_concurrent_creates_get_distinct_keys() -> anyhow::Result<()> {
    let Some((store, _url)) = fresh_store().await? else {
        return Ok(());
    };
    let store = Arc::new(store);
    let mut tasks = Vec::new();
    for n in 0..24 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .create_profile_mapping(job_mapping(&format!("enq-{n}")), at(16, 9))
                .await
                .map(|mapping| mapping.mapping_id)
        }));
    }
    let mut ids = HashSet::new();
    for task in tasks {
        assert!(ids.insert(task.await??));
    }
    let expected: HashSet<String> = (1..=24).map(|n| format!("MAP-20261016-{n:04}")).collect();
    assert_eq!(ids, expected);
    Ok(())
}

#[tokio::test]
#[serial]
async fn postgres_reference_registry_lookups() -> anyhow::Result<()> {
    let Some((store, url)) = fresh_store().await? else {
        return Ok(());
    };
    let pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;
    sqlx::query("INSERT INTO enquiries (enquiry_id) VALUES ('enq-1')")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO users (user_id) VALUES ('user-1')")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO profiles (profile_type_ref, profile_id) VALUES ('JobProfile', 'job-1')")
        .execute(&pool)
        .await?;
    pool.close().await;

    assert!(store.enquiry_exists("enq-1").await?);
    assert!(!store.enquiry_exists("enq-2").await?);
    assert!(store.user_exists("user-1").await?);
    assert!(
        store
            .profile_exists(&ProfileRef::Job("job-1".to_string()))
            .await?
    );
    assert!(
        !store
            .profile_exists(&ProfileRef::Info("job-1".to_string()))
            .await?
    );
    Ok(())
}
