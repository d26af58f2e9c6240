//! Back-office HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::clock::Clock;
use crate::observability;
use crate::store::BackOfficeStore;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub store: Arc<dyn BackOfficeStore + Send + Sync>,
    /// Source of `now` for business-key dates and timestamps.
    pub clock: Arc<dyn Clock>,
    pub verify_references: bool,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/v1/system/info", get(api::system::system_info))
        .route("/v1/system/health", get(api::system::system_health))
        .route("/v1/permissions", get(api::catalog::permission_catalog))
        .route(
            "/v1/roles",
            get(api::roles::list_roles).post(api::roles::create_role),
        )
        .route(
            "/v1/roles/:role_id",
            get(api::roles::get_role)
                .patch(api::roles::patch_role)
                .delete(api::roles::delete_role),
        )
        .route(
            "/v1/profile-mappings",
            get(api::profile_mappings::list_profile_mappings)
                .post(api::profile_mappings::create_profile_mapping),
        )
        .route(
            "/v1/profile-mappings/:mapping_id",
            get(api::profile_mappings::get_profile_mapping)
                .patch(api::profile_mappings::patch_profile_mapping)
                .delete(api::profile_mappings::delete_profile_mapping),
        )
        .route(
            "/v1/enquiries/:enquiry_id/profile-mappings",
            get(api::profile_mappings::list_enquiry_profile_mappings),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
