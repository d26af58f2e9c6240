//! In-memory implementation of the back-office store.
//!
//! # Purpose
//! Implements [`BackOfficeStore`] with `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: each entity kind lives in one table
//!   behind one write lock. The per-day high-water marks live inside the same
//!   table, so allocating a business key and inserting the record happen in
//!   one critical section.
//! - **No multi-node coordination**: multiple instances each have independent
//!   state and independent sequences.
//!
//! # Reference registry
//! Enquiries, users, and profile documents are owned elsewhere. Tests and
//! local runs register them through [`InMemoryStore::register_enquiry`],
//! [`InMemoryStore::register_user`], and [`InMemoryStore::register_profile`].
use super::{BackOfficeStore, StoreError, StoreResult};
use crate::model::{
    NewProfileMapping, NewRole, ProfileKind, ProfileMapping, ProfileMappingFilter,
    ProfileMappingPatch, ProfileRef, Role, RolePatch,
};
use crate::sequence::{self, DayPrefix, KeyPrefix};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Records of one entity kind keyed by business key, plus the highest
/// sequence ever issued per day prefix.
///
/// `high_water` is never lowered by deletes, which keeps deleted keys from
/// being reissued later the same day.
#[derive(Debug)]
struct KeyedTable<T> {
    prefix: KeyPrefix,
    rows: HashMap<String, T>,
    high_water: HashMap<String, u32>,
}

impl<T> KeyedTable<T> {
    fn new(prefix: KeyPrefix) -> Self {
        Self {
            prefix,
            rows: HashMap::new(),
            high_water: HashMap::new(),
        }
    }

    /// Allocate the next key for `now`'s day. Callers must insert under the
    /// same write guard so the key cannot be handed out twice.
    fn allocate(&mut self, now: DateTime<Utc>) -> StoreResult<(DayPrefix, u32, String)> {
        let day = DayPrefix::new(self.prefix, now);
        let stored_max = day.max_sequence(self.rows.keys().map(String::as_str));
        let high_water = self.high_water.get(day.as_str()).copied();
        let (sequence, key) = sequence::allocate(&day, high_water, stored_max)?;
        if self.rows.contains_key(&key) {
            return Err(StoreError::Conflict(format!("business key {key} exists")));
        }
        Ok((day, sequence, key))
    }

    fn commit(&mut self, day: DayPrefix, sequence: u32, key: String, row: T) {
        self.high_water.insert(day.as_str().to_string(), sequence);
        self.rows.insert(key, row);
        sequence::record_issued(self.prefix);
    }
}

pub struct InMemoryStore {
    roles: Arc<RwLock<KeyedTable<Role>>>,
    profile_mappings: Arc<RwLock<KeyedTable<ProfileMapping>>>,
    enquiries: Arc<RwLock<HashSet<String>>>,
    users: Arc<RwLock<HashSet<String>>>,
    /// Registered profile documents keyed by `(kind, profile_id)`.
    profiles: Arc<RwLock<HashSet<(ProfileKind, String)>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            roles: Arc::new(RwLock::new(KeyedTable::new(KeyPrefix::Role))),
            profile_mappings: Arc::new(RwLock::new(KeyedTable::new(KeyPrefix::ProfileMapping))),
            enquiries: Arc::new(RwLock::new(HashSet::new())),
            users: Arc::new(RwLock::new(HashSet::new())),
            profiles: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn register_enquiry(&self, enquiry_id: impl Into<String>) {
        self.enquiries.write().await.insert(enquiry_id.into());
    }

    pub async fn register_user(&self, user_id: impl Into<String>) {
        self.users.write().await.insert(user_id.into());
    }

    pub async fn register_profile(&self, profile: &ProfileRef) {
        self.profiles
            .write()
            .await
            .insert((profile.kind(), profile.id().to_string()));
    }

    /// Seed a record with an arbitrary business key, bypassing allocation.
    ///
    /// Used to reproduce legacy rows (for example malformed suffixes) in tests.
    pub async fn import_role(&self, role: Role) {
        self.roles
            .write()
            .await
            .rows
            .insert(role.role_id.clone(), role);
    }
}

fn sorted_by_key<T: Clone>(rows: &HashMap<String, T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    let mut keys: Vec<&String> = rows.keys().collect();
    keys.sort();
    keys.into_iter()
        .filter_map(|key| rows.get(key))
        .filter(|row| keep(row))
        .cloned()
        .collect()
}

#[async_trait]
impl BackOfficeStore for InMemoryStore {
    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(sorted_by_key(&self.roles.read().await.rows, |_| true))
    }

    async fn get_role(&self, role_id: &str) -> StoreResult<Role> {
        self.roles
            .read()
            .await
            .rows
            .get(role_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("role {role_id}")))
    }

    async fn create_role(&self, role: NewRole, now: DateTime<Utc>) -> StoreResult<Role> {
        // Name uniqueness, allocation, and insert share one write guard.
        let mut table = self.roles.write().await;
        if table
            .rows
            .values()
            .any(|existing| existing.role_name == role.role_name)
        {
            return Err(StoreError::Conflict(format!(
                "role name {} exists",
                role.role_name
            )));
        }
        let (day, sequence, role_id) = table.allocate(now)?;
        let created = role.into_role(role_id.clone(), now);
        table.commit(day, sequence, role_id, created.clone());
        metrics::gauge!("backoffice_roles_total").set(table.rows.len() as f64);
        Ok(created)
    }

    async fn patch_role(
        &self,
        role_id: &str,
        patch: RolePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Role> {
        let mut table = self.roles.write().await;
        if let Some(role_name) = patch.role_name {
            let taken = table
                .rows
                .values()
                .any(|existing| existing.role_name == role_name && existing.role_id != role_id);
            if taken {
                return Err(StoreError::Conflict(format!("role name {role_name} exists")));
            }
        }
        let role = table
            .rows
            .get_mut(role_id)
            .ok_or_else(|| StoreError::NotFound(format!("role {role_id}")))?;
        patch.apply(role, now);
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: &str) -> StoreResult<()> {
        let mut table = self.roles.write().await;
        if table.rows.remove(role_id).is_none() {
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }
        metrics::gauge!("backoffice_roles_total").set(table.rows.len() as f64);
        Ok(())
    }

    async fn list_profile_mappings(
        &self,
        filter: &ProfileMappingFilter,
    ) -> StoreResult<Vec<ProfileMapping>> {
        Ok(sorted_by_key(
            &self.profile_mappings.read().await.rows,
            |mapping| filter.matches(mapping),
        ))
    }

    async fn get_profile_mapping(&self, mapping_id: &str) -> StoreResult<ProfileMapping> {
        self.profile_mappings
            .read()
            .await
            .rows
            .get(mapping_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("profile mapping {mapping_id}")))
    }

    async fn create_profile_mapping(
        &self,
        mapping: NewProfileMapping,
        now: DateTime<Utc>,
    ) -> StoreResult<ProfileMapping> {
        let mut table = self.profile_mappings.write().await;
        let (day, sequence, mapping_id) = table.allocate(now)?;
        let created = mapping.into_mapping(mapping_id.clone(), now);
        table.commit(day, sequence, mapping_id, created.clone());
        metrics::gauge!("backoffice_profile_mappings_total").set(table.rows.len() as f64);
        Ok(created)
    }

    async fn patch_profile_mapping(
        &self,
        mapping_id: &str,
        patch: ProfileMappingPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<ProfileMapping> {
        let mut table = self.profile_mappings.write().await;
        let mapping = table
            .rows
            .get_mut(mapping_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile mapping {mapping_id}")))?;
        patch.apply(mapping, now);
        Ok(mapping.clone())
    }

    async fn delete_profile_mapping(&self, mapping_id: &str) -> StoreResult<()> {
        let mut table = self.profile_mappings.write().await;
        if table.rows.remove(mapping_id).is_none() {
            return Err(StoreError::NotFound(format!("profile mapping {mapping_id}")));
        }
        metrics::gauge!("backoffice_profile_mappings_total").set(table.rows.len() as f64);
        Ok(())
    }

    async fn enquiry_exists(&self, enquiry_id: &str) -> StoreResult<bool> {
        Ok(self.enquiries.read().await.contains(enquiry_id))
    }

    async fn user_exists(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.users.read().await.contains(user_id))
    }

    async fn profile_exists(&self, profile: &ProfileRef) -> StoreResult<bool> {
        Ok(self
            .profiles
            .read()
            .await
            .contains(&(profile.kind(), profile.id().to_string())))
    }

    async fn health_check(&self) -> StoreResult<()> {
        // Nothing external to probe.
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
