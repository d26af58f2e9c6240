//! OpenAPI schema aggregation for the back-office API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for docs
//! and client generation.
use crate::api::{
    catalog, profile_mappings, roles, system,
    types::{
        DeleteResponse, ErrorResponse, HealthStatus, PermissionCatalog,
        PermissionCatalogResponse, ProfileKindEntry, ProfileMappingCreateRequest,
        ProfileMappingListResponse, ProfileMappingPatchRequest, ProfileMappingResponse,
        RoleCreateRequest, RoleListResponse, RolePatchRequest, RoleResponse, SystemInfo,
    },
};
use crate::model::{ProfileKind, ProfileMapping, Role};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "backoffice",
        version = "v1",
        description = "Back-office roles and enquiry profile mappings HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        catalog::permission_catalog,
        roles::list_roles,
        roles::create_role,
        roles::get_role,
        roles::patch_role,
        roles::delete_role,
        profile_mappings::list_profile_mappings,
        profile_mappings::list_enquiry_profile_mappings,
        profile_mappings::create_profile_mapping,
        profile_mappings::get_profile_mapping,
        profile_mappings::patch_profile_mapping,
        profile_mappings::delete_profile_mapping
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        DeleteResponse,
        PermissionCatalog,
        PermissionCatalogResponse,
        ProfileKindEntry,
        Role,
        RoleCreateRequest,
        RolePatchRequest,
        RoleResponse,
        RoleListResponse,
        ProfileKind,
        ProfileMapping,
        ProfileMappingCreateRequest,
        ProfileMappingPatchRequest,
        ProfileMappingResponse,
        ProfileMappingListResponse
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "catalog", description = "Permission catalog"),
        (name = "roles", description = "Role management"),
        (name = "profile-mappings", description = "Enquiry profile mappings")
    )
)]
pub struct ApiDoc;
