//! Persistence layer for roles and profile mappings.
//!
//! # Purpose
//! Defines the [`BackOfficeStore`] trait used by the HTTP handlers and the
//! shared error type. Two backends implement it: [`memory::InMemoryStore`]
//! and [`postgres::PostgresStore`].
//!
//! # Key invariants
//! - `create_*` allocates the business key and inserts the record as one
//!   atomic unit; concurrent creates for the same day never share a key.
//! - Allocation failures abort the create; nothing is persisted.
//! - Business keys are never reissued, even after the record is deleted.
use crate::model::{
    NewProfileMapping, NewRole, ProfileMapping, ProfileMappingFilter, ProfileMappingPatch,
    ProfileRef, Role, RolePatch,
};
use crate::sequence::SequenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod postgres;
#[cfg(test)]
mod postgres_tests;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Exhausted(#[from] SequenceError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait BackOfficeStore: Send + Sync {
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn get_role(&self, role_id: &str) -> StoreResult<Role>;
    /// Allocate a `ROLE-YYYYMMDD-NNNN` key for `now`'s UTC day and insert.
    async fn create_role(&self, role: NewRole, now: DateTime<Utc>) -> StoreResult<Role>;
    async fn patch_role(
        &self,
        role_id: &str,
        patch: RolePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Role>;
    async fn delete_role(&self, role_id: &str) -> StoreResult<()>;

    async fn list_profile_mappings(
        &self,
        filter: &ProfileMappingFilter,
    ) -> StoreResult<Vec<ProfileMapping>>;
    async fn get_profile_mapping(&self, mapping_id: &str) -> StoreResult<ProfileMapping>;
    /// Allocate a `MAP-YYYYMMDD-NNNN` key for `now`'s UTC day and insert.
    async fn create_profile_mapping(
        &self,
        mapping: NewProfileMapping,
        now: DateTime<Utc>,
    ) -> StoreResult<ProfileMapping>;
    async fn patch_profile_mapping(
        &self,
        mapping_id: &str,
        patch: ProfileMappingPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<ProfileMapping>;
    async fn delete_profile_mapping(&self, mapping_id: &str) -> StoreResult<()>;

    async fn enquiry_exists(&self, enquiry_id: &str) -> StoreResult<bool>;
    async fn user_exists(&self, user_id: &str) -> StoreResult<bool>;
    async fn profile_exists(&self, profile: &ProfileRef) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
