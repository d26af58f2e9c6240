//! Role records and their create/patch inputs.
use super::{Permission, RoleName, normalize_permissions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Role {
    #[schema(example = "ROLE-20261016-0001")]
    pub role_id: String,
    #[schema(value_type = String, example = "Admin")]
    pub role_name: RoleName,
    pub description: String,
    #[schema(value_type = Vec<String>)]
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new role; the business key is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRole {
    pub role_name: RoleName,
    pub description: String,
    pub permissions: Vec<Permission>,
}

impl NewRole {
    /// Build a role input, applying the role's default permissions when the
    /// caller supplied none. An explicit list, even an empty one, wins.
    pub fn new(
        role_name: RoleName,
        description: impl Into<String>,
        permissions: Option<Vec<Permission>>,
    ) -> Self {
        let permissions = match permissions {
            Some(explicit) => normalize_permissions(explicit),
            None => role_name.default_permissions(),
        };
        Self {
            role_name,
            description: description.into(),
            permissions,
        }
    }

    /// Materialize the stored record once a business key has been allocated.
    pub fn into_role(self, role_id: String, now: DateTime<Utc>) -> Role {
        Role {
            role_id,
            role_name: self.role_name,
            description: self.description,
            permissions: self.permissions,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolePatch {
    pub role_name: Option<RoleName>,
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.role_name.is_none() && self.description.is_none() && self.permissions.is_none()
    }

    /// Apply the present fields and refresh `updated_at`. `role_id` and
    /// `created_at` are never touched.
    pub fn apply(self, role: &mut Role, now: DateTime<Utc>) {
        if let Some(role_name) = self.role_name {
            role.role_name = role_name;
        }
        if let Some(description) = self.description {
            role.description = description;
        }
        if let Some(permissions) = self.permissions {
            role.permissions = normalize_permissions(permissions);
        }
        role.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn explicit_empty_permissions_override_admin_default() {
        let role = NewRole::new(RoleName::Admin, "root", Some(Vec::new()));
        assert!(role.permissions.is_empty());
        let role = NewRole::new(RoleName::Admin, "root", None);
        assert_eq!(role.permissions, Permission::ALL.to_vec());
    }

    #[test]
    fn patch_refreshes_updated_at_only() {
        let created = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap();
        let mut role = NewRole::new(RoleName::Viewer, "read only", None)
            .into_role("ROLE-20260501-0001".to_string(), created);
        RolePatch {
            permissions: Some(vec![Permission::ReportsView, Permission::ReportsView]),
            ..RolePatch::default()
        }
        .apply(&mut role, later);
        assert_eq!(role.role_id, "ROLE-20260501-0001");
        assert_eq!(role.permissions, vec![Permission::ReportsView]);
        assert_eq!(role.created_at, created);
        assert_eq!(role.updated_at, later);
    }
}
