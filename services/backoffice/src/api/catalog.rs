//! Static catalog endpoint: permission tokens, role names, and profile kinds.
use crate::api::types::{PermissionCatalog, PermissionCatalogResponse, ProfileKindEntry};
use crate::model::{Permission, ProfileKind, RoleName};
use axum::Json;

#[utoipa::path(
    get,
    path = "/v1/permissions",
    tag = "catalog",
    responses(
        (status = 200, description = "Permission catalog and closed value sets", body = PermissionCatalogResponse)
    )
)]
/// Return the permission catalog in catalog order, with the role labels and
/// profile kinds clients need to build valid requests.
pub(crate) async fn permission_catalog() -> Json<PermissionCatalogResponse> {
    let permissions: Vec<String> = Permission::ALL
        .iter()
        .map(|permission| permission.as_str().to_string())
        .collect();
    let role_names = RoleName::ALL
        .iter()
        .map(|name| name.as_str().to_string())
        .collect();
    let profile_kinds = ProfileKind::ALL
        .into_iter()
        .map(|kind| ProfileKindEntry {
            profile_type: kind.tag().to_string(),
            profile_type_ref: kind.collection().to_string(),
        })
        .collect();
    Json(PermissionCatalogResponse {
        success: true,
        count: permissions.len(),
        data: PermissionCatalog {
            permissions,
            role_names,
            profile_kinds,
        },
    })
}
