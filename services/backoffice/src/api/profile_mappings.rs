//! Profile-mapping API handlers.
//!
//! # Purpose
//! Implements CRUD for enquiry-to-profile links. Each write resolves the
//! `profile_type` / `profile_type_ref` / `profile_id` triple into a typed
//! [`ProfileRef`](crate::model::ProfileRef) and, unless reference checks are
//! disabled, verifies the enquiry, user, and profile document exist.
use crate::api::error::{
    ApiError, api_internal, api_json_rejection, api_store_error, api_validation_error,
};
use crate::api::types::{
    DeleteResponse, ErrorResponse, ProfileMappingCreateRequest, ProfileMappingListResponse,
    ProfileMappingPatchRequest, ProfileMappingQuery, ProfileMappingResponse,
};
use crate::api::{ensure_enquiry_exists, ensure_profile_exists, ensure_user_exists, validation};
use crate::app::AppState;
use crate::model::{NewProfileMapping, ProfileMappingFilter, ProfileMappingPatch};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

fn filter_from_query(
    enquiry_id: Option<String>,
    query: ProfileMappingQuery,
) -> Result<ProfileMappingFilter, ApiError> {
    Ok(ProfileMappingFilter {
        enquiry_id: enquiry_id.or(query.enquiry_id),
        profile_type: query
            .profile_type
            .as_deref()
            .map(validation::profile_kind)
            .transpose()?,
    })
}

#[utoipa::path(
    get,
    path = "/v1/profile-mappings",
    tag = "profile-mappings",
    params(
        ("enquiry_id" = Option<String>, Query, description = "Only mappings of this enquiry"),
        ("profile_type" = Option<String>, Query, description = "Only mappings of this profile tag")
    ),
    responses(
        (status = 200, description = "List profile mappings ordered by mapping_id", body = ProfileMappingListResponse),
        (status = 400, description = "Unknown profile_type", body = ErrorResponse)
    )
)]
pub(crate) async fn list_profile_mappings(
    Query(query): Query<ProfileMappingQuery>,
    State(state): State<AppState>,
) -> Result<Json<ProfileMappingListResponse>, ApiError> {
    let filter = filter_from_query(None, query)?;
    let items = state
        .store
        .list_profile_mappings(&filter)
        .await
        .map_err(|err| api_internal("failed to list profile mappings", &err))?;
    Ok(Json(ProfileMappingListResponse::new(items)))
}

#[utoipa::path(
    get,
    path = "/v1/enquiries/{enquiry_id}/profile-mappings",
    tag = "profile-mappings",
    params(
        ("enquiry_id" = String, Path, description = "Enquiry identifier"),
        ("profile_type" = Option<String>, Query, description = "Only mappings of this profile tag")
    ),
    responses(
        (status = 200, description = "Profile mappings of one enquiry", body = ProfileMappingListResponse),
        (status = 404, description = "Enquiry not found", body = ErrorResponse)
    )
)]
pub(crate) async fn list_enquiry_profile_mappings(
    Path(enquiry_id): Path<String>,
    Query(query): Query<ProfileMappingQuery>,
    State(state): State<AppState>,
) -> Result<Json<ProfileMappingListResponse>, ApiError> {
    ensure_enquiry_exists(&state, &enquiry_id).await?;
    let filter = filter_from_query(Some(enquiry_id), query)?;
    let items = state
        .store
        .list_profile_mappings(&filter)
        .await
        .map_err(|err| api_internal("failed to list profile mappings", &err))?;
    Ok(Json(ProfileMappingListResponse::new(items)))
}

#[utoipa::path(
    post,
    path = "/v1/profile-mappings",
    tag = "profile-mappings",
    request_body = ProfileMappingCreateRequest,
    responses(
        (status = 201, description = "Profile mapping created", body = ProfileMappingResponse),
        (status = 400, description = "Invalid mapping payload", body = ErrorResponse),
        (status = 404, description = "Referenced enquiry, user, or profile not found", body = ErrorResponse),
        (status = 503, description = "No business keys left for today", body = ErrorResponse)
    )
)]
pub(crate) async fn create_profile_mapping(
    State(state): State<AppState>,
    payload: Result<Json<ProfileMappingCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(api_json_rejection)?;
    let enquiry_id = validation::required("enquiry_id", body.enquiry_id)?;
    let profile_type = validation::required("profile_type", body.profile_type)?;
    let profile_type_ref = validation::required("profile_type_ref", body.profile_type_ref)?;
    let profile_id = validation::required("profile_id", body.profile_id)?;
    let created_by = validation::required("created_by", body.created_by)?;
    let profile = validation::profile_ref(&profile_type, &profile_type_ref, &profile_id)?;

    ensure_enquiry_exists(&state, &enquiry_id).await?;
    ensure_user_exists(&state, &created_by).await?;
    ensure_profile_exists(&state, &profile).await?;

    let mapping = NewProfileMapping {
        enquiry_id,
        profile,
        created_by,
    };
    match state
        .store
        .create_profile_mapping(mapping, state.clock.now())
        .await
    {
        Ok(created) => {
            tracing::info!(
                mapping_id = %created.mapping_id,
                enquiry_id = %created.enquiry_id,
                profile_type = created.profile_type.tag(),
                "profile mapping created"
            );
            Ok((StatusCode::CREATED, Json(ProfileMappingResponse::new(created))))
        }
        Err(err) => Err(api_store_error("profile mapping", "create", err)),
    }
}

#[utoipa::path(
    get,
    path = "/v1/profile-mappings/{mapping_id}",
    tag = "profile-mappings",
    params(
        ("mapping_id" = String, Path, description = "Profile mapping business key")
    ),
    responses(
        (status = 200, description = "Fetch profile mapping", body = ProfileMappingResponse),
        (status = 404, description = "Profile mapping not found", body = ErrorResponse)
    )
)]
pub(crate) async fn get_profile_mapping(
    Path(mapping_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProfileMappingResponse>, ApiError> {
    match state.store.get_profile_mapping(&mapping_id).await {
        Ok(mapping) => Ok(Json(ProfileMappingResponse::new(mapping))),
        Err(err) => Err(api_store_error("profile mapping", "fetch", err)),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/profile-mappings/{mapping_id}",
    tag = "profile-mappings",
    params(
        ("mapping_id" = String, Path, description = "Profile mapping business key")
    ),
    request_body = ProfileMappingPatchRequest,
    responses(
        (status = 200, description = "Profile mapping updated", body = ProfileMappingResponse),
        (status = 400, description = "Invalid mapping payload", body = ErrorResponse),
        (status = 404, description = "Mapping or referenced record not found", body = ErrorResponse)
    )
)]
pub(crate) async fn patch_profile_mapping(
    Path(mapping_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<ProfileMappingPatchRequest>, JsonRejection>,
) -> Result<Json<ProfileMappingResponse>, ApiError> {
    let Json(body) = payload.map_err(api_json_rejection)?;
    let enquiry_id = validation::non_blank("enquiry_id", body.enquiry_id)?;
    let profile_type = validation::non_blank("profile_type", body.profile_type)?;
    let profile_type_ref = validation::non_blank("profile_type_ref", body.profile_type_ref)?;
    let profile_id = validation::non_blank("profile_id", body.profile_id)?;

    let profile = if profile_type.is_some() || profile_type_ref.is_some() || profile_id.is_some() {
        // Fill the untouched parts of the triple from the stored mapping,
        // then validate the result as a whole.
        let current = state
            .store
            .get_profile_mapping(&mapping_id)
            .await
            .map_err(|err| api_store_error("profile mapping", "fetch", err))?;
        let profile_type = profile_type.unwrap_or_else(|| current.profile_type.tag().to_string());
        let profile_type_ref = profile_type_ref.unwrap_or(current.profile_type_ref);
        let profile_id = profile_id.unwrap_or(current.profile_id);
        Some(validation::profile_ref(
            &profile_type,
            &profile_type_ref,
            &profile_id,
        )?)
    } else {
        None
    };

    let patch = ProfileMappingPatch {
        enquiry_id,
        profile,
    };
    if patch.is_empty() {
        return Err(api_validation_error(
            "at least one of enquiry_id, profile_type, profile_type_ref, profile_id is required",
        ));
    }
    if let Some(enquiry_id) = patch.enquiry_id.as_deref() {
        ensure_enquiry_exists(&state, enquiry_id).await?;
    }
    if let Some(profile) = patch.profile.as_ref() {
        ensure_profile_exists(&state, profile).await?;
    }

    match state
        .store
        .patch_profile_mapping(&mapping_id, patch, state.clock.now())
        .await
    {
        Ok(updated) => Ok(Json(ProfileMappingResponse::new(updated))),
        Err(err) => Err(api_store_error("profile mapping", "update", err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/profile-mappings/{mapping_id}",
    tag = "profile-mappings",
    params(
        ("mapping_id" = String, Path, description = "Profile mapping business key")
    ),
    responses(
        (status = 200, description = "Profile mapping deleted", body = DeleteResponse),
        (status = 404, description = "Profile mapping not found", body = ErrorResponse)
    )
)]
pub(crate) async fn delete_profile_mapping(
    Path(mapping_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match state.store.delete_profile_mapping(&mapping_id).await {
        Ok(()) => {
            tracing::info!(mapping_id = %mapping_id, "profile mapping deleted");
            Ok(Json(DeleteResponse::new("profile mapping deleted")))
        }
        Err(err) => Err(api_store_error("profile mapping", "delete", err)),
    }
}
