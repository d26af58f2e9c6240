//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes of the back-office REST API and its OpenAPI
//! schema. Every response carries a `success` flag; successful bodies put the
//! record (or list) under `data`, list bodies add `count`.
//!
//! Request fields are optional at the serde level so handlers can name the
//! missing or invalid field in a `validation_error` instead of surfacing a
//! generic deserialization failure.
use crate::model::{ProfileMapping, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleCreateRequest {
    #[schema(example = "Sales Executive")]
    pub role_name: Option<String>,
    pub description: Option<String>,
    /// JSON array of permission tokens. Omit to use the role's defaults.
    #[schema(value_type = Option<Vec<String>>)]
    pub permissions: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct RolePatchRequest {
    pub role_name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub permissions: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProfileMappingCreateRequest {
    pub enquiry_id: Option<String>,
    #[schema(example = "job")]
    pub profile_type: Option<String>,
    pub profile_id: Option<String>,
    #[schema(example = "JobProfile")]
    pub profile_type_ref: Option<String>,
    pub created_by: Option<String>,
}

/// Partial update. Any subset of the profile triple may be sent; missing
/// parts are taken from the stored mapping before validation.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ProfileMappingPatchRequest {
    pub enquiry_id: Option<String>,
    pub profile_type: Option<String>,
    pub profile_id: Option<String>,
    pub profile_type_ref: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfileMappingQuery {
    pub enquiry_id: Option<String>,
    pub profile_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleResponse {
    pub success: bool,
    pub data: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProfileMappingResponse {
    pub success: bool,
    pub data: ProfileMapping,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProfileMappingListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ProfileMapping>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProfileKindEntry {
    pub profile_type: String,
    pub profile_type_ref: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionCatalog {
    pub permissions: Vec<String>,
    pub role_names: Vec<String>,
    pub profile_kinds: Vec<ProfileKindEntry>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionCatalogResponse {
    pub success: bool,
    /// Number of permission tokens in the catalog.
    pub count: usize,
    pub data: PermissionCatalog,
}

impl RoleResponse {
    pub fn new(data: Role) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl RoleListResponse {
    pub fn new(data: Vec<Role>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

impl ProfileMappingResponse {
    pub fn new(data: ProfileMapping) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl ProfileMappingListResponse {
    pub fn new(data: Vec<ProfileMapping>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

impl DeleteResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
