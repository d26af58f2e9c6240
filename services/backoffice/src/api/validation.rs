//! Request field validation shared by the role and profile-mapping handlers.
//!
//! Every failure is a 400 `validation_error` whose message names the field.
use crate::api::error::{ApiError, api_validation_error};
use crate::model::{Permission, ProfileKind, ProfileRef, RoleName};
use serde_json::Value;
use std::str::FromStr;

/// Require a present, non-blank string; returns it trimmed.
pub(crate) fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(api_validation_error(&format!("{field} is required"))),
    }
}

/// Patch fields may be absent, but a present value must not be blank.
pub(crate) fn non_blank(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        Some(value) => required(field, Some(value)).map(Some),
    }
}

pub(crate) fn role_name(value: &str) -> Result<RoleName, ApiError> {
    RoleName::from_str(value).map_err(|_| {
        let allowed: Vec<&str> = RoleName::ALL.iter().map(|name| name.as_str()).collect();
        api_validation_error(&format!(
            "role_name must be one of {} (got {value})",
            allowed.join(", ")
        ))
    })
}

/// Parse a `permissions` payload: a JSON array of catalog tokens.
///
/// All unknown tokens are reported together.
pub(crate) fn permissions(value: Value) -> Result<Vec<Permission>, ApiError> {
    let Value::Array(items) = value else {
        return Err(api_validation_error("permissions must be an array"));
    };
    let mut parsed = Vec::with_capacity(items.len());
    let mut unknown = Vec::new();
    for item in items {
        match item {
            Value::String(token) => match Permission::from_str(&token) {
                Ok(permission) => parsed.push(permission),
                Err(_) => unknown.push(token),
            },
            other => unknown.push(other.to_string()),
        }
    }
    if !unknown.is_empty() {
        return Err(api_validation_error(&format!(
            "unknown permissions: {}",
            unknown.join(", ")
        )));
    }
    Ok(parsed)
}

pub(crate) fn profile_kind(value: &str) -> Result<ProfileKind, ApiError> {
    ProfileKind::from_tag(value).ok_or_else(|| {
        api_validation_error(&format!(
            "profile_type must be one of project, product, amc, complaint, info, job, site_visit (got {value})"
        ))
    })
}

pub(crate) fn profile_ref(
    profile_type: &str,
    profile_type_ref: &str,
    profile_id: &str,
) -> Result<ProfileRef, ApiError> {
    ProfileRef::from_parts(profile_type, profile_type_ref, profile_id)
        .map_err(|err| api_validation_error(&err.to_string()))
}
