//! Back-office HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and shared helpers that verify referenced
//! enquiries, users, and profile documents exist before a mapping is written.
pub mod catalog;
pub mod error;
pub mod openapi;
pub mod profile_mappings;
pub mod roles;
pub mod system;
pub mod types;
mod validation;

use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::app::AppState;
use crate::model::ProfileRef;

pub(crate) async fn ensure_enquiry_exists(
    state: &AppState,
    enquiry_id: &str,
) -> Result<(), ApiError> {
    if !state.verify_references {
        return Ok(());
    }
    let exists = state
        .store
        .enquiry_exists(enquiry_id)
        .await
        .map_err(|err| api_internal("failed to check enquiry existence", &err))?;
    if !exists {
        return Err(api_not_found(&format!("enquiry {enquiry_id} not found")));
    }
    Ok(())
}

pub(crate) async fn ensure_user_exists(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    if !state.verify_references {
        return Ok(());
    }
    let exists = state
        .store
        .user_exists(user_id)
        .await
        .map_err(|err| api_internal("failed to check user existence", &err))?;
    if !exists {
        return Err(api_not_found(&format!("user {user_id} not found")));
    }
    Ok(())
}

pub(crate) async fn ensure_profile_exists(
    state: &AppState,
    profile: &ProfileRef,
) -> Result<(), ApiError> {
    if !state.verify_references {
        return Ok(());
    }
    let exists = state
        .store
        .profile_exists(profile)
        .await
        .map_err(|err| api_internal("failed to check profile existence", &err))?;
    if !exists {
        return Err(api_not_found(&format!(
            "{} {} not found",
            profile.collection(),
            profile.id()
        )));
    }
    Ok(())
}
