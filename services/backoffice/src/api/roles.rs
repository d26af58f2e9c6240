//! Role API handlers.
//!
//! # Purpose
//! Implements role CRUD. New roles receive a `ROLE-YYYYMMDD-NNNN` business
//! key from the store at insert time; the date comes from the injected clock.
use crate::api::error::{
    ApiError, api_internal, api_json_rejection, api_store_error, api_validation_error,
};
use crate::api::types::{
    DeleteResponse, ErrorResponse, RoleCreateRequest, RoleListResponse, RolePatchRequest,
    RoleResponse,
};
use crate::api::validation;
use crate::app::AppState;
use crate::model::{NewRole, RolePatch};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "roles",
    responses(
        (status = 200, description = "List roles ordered by role_id", body = RoleListResponse)
    )
)]
pub(crate) async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<RoleListResponse>, ApiError> {
    let roles = state
        .store
        .list_roles()
        .await
        .map_err(|err| api_internal("failed to list roles", &err))?;
    Ok(Json(RoleListResponse::new(roles)))
}

#[utoipa::path(
    post,
    path = "/v1/roles",
    tag = "roles",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid role payload", body = ErrorResponse),
        (status = 409, description = "Role name already taken", body = ErrorResponse),
        (status = 503, description = "No business keys left for today", body = ErrorResponse)
    )
)]
pub(crate) async fn create_role(
    State(state): State<AppState>,
    payload: Result<Json<RoleCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(api_json_rejection)?;
    let role_name = validation::role_name(&validation::required("role_name", body.role_name)?)?;
    let description = validation::required("description", body.description)?;
    let permissions = body.permissions.map(validation::permissions).transpose()?;

    let role = NewRole::new(role_name, description, permissions);
    match state.store.create_role(role, state.clock.now()).await {
        Ok(created) => {
            tracing::info!(role_id = %created.role_id, role_name = %created.role_name, "role created");
            Ok((StatusCode::CREATED, Json(RoleResponse::new(created))))
        }
        Err(err) => Err(api_store_error("role", "create", err)),
    }
}

#[utoipa::path(
    get,
    path = "/v1/roles/{role_id}",
    tag = "roles",
    params(
        ("role_id" = String, Path, description = "Role business key")
    ),
    responses(
        (status = 200, description = "Fetch role", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub(crate) async fn get_role(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoleResponse>, ApiError> {
    match state.store.get_role(&role_id).await {
        Ok(role) => Ok(Json(RoleResponse::new(role))),
        Err(err) => Err(api_store_error("role", "fetch", err)),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/roles/{role_id}",
    tag = "roles",
    params(
        ("role_id" = String, Path, description = "Role business key")
    ),
    request_body = RolePatchRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 400, description = "Invalid role payload", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Role name already taken", body = ErrorResponse)
    )
)]
pub(crate) async fn patch_role(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<RolePatchRequest>, JsonRejection>,
) -> Result<Json<RoleResponse>, ApiError> {
    let Json(body) = payload.map_err(api_json_rejection)?;
    let patch = RolePatch {
        role_name: validation::non_blank("role_name", body.role_name)?
            .map(|name| validation::role_name(&name))
            .transpose()?,
        description: validation::non_blank("description", body.description)?,
        permissions: body.permissions.map(validation::permissions).transpose()?,
    };
    if patch.is_empty() {
        return Err(api_validation_error(
            "at least one of role_name, description, permissions is required",
        ));
    }
    match state.store.patch_role(&role_id, patch, state.clock.now()).await {
        Ok(updated) => Ok(Json(RoleResponse::new(updated))),
        Err(err) => Err(api_store_error("role", "update", err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{role_id}",
    tag = "roles",
    params(
        ("role_id" = String, Path, description = "Role business key")
    ),
    responses(
        (status = 200, description = "Role deleted", body = DeleteResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub(crate) async fn delete_role(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match state.store.delete_role(&role_id).await {
        Ok(()) => {
            tracing::info!(role_id = %role_id, "role deleted");
            Ok(Json(DeleteResponse::new("role deleted")))
        }
        Err(err) => Err(api_store_error("role", "delete", err)),
    }
}
