//! OpenAPI documentation configuration.

use crate::controllers::cache_controller::InvalidateRequest;
use crate::controllers::health_controller::HealthResponse;
use crate::responses::RemovedResponse;
use pulse_core::{CacheEntry, ErrorResponse, InvalidationMode, JobPhase, JobRunLog, JobRunStatus, JobState};
use pulse_jobs::RefreshReport;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Path of the generated document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI documentation for the Pulse API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pulse Cache API",
        version = "1.0.0",
        description = "Aggregate cache maintenance and refresh job history",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        crate::controllers::cache_controller::refresh_cache,
        crate::controllers::cache_controller::cleanup_expired,
        crate::controllers::cache_controller::invalidate,
        crate::controllers::cache_controller::get_entry,
        crate::controllers::jobs_controller::list_runs,
        crate::controllers::jobs_controller::list_states,
        crate::controllers::jobs_controller::get_state,
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::readiness_check,
        crate::controllers::health_controller::liveness_check,
    ),
    components(
        schemas(
            ErrorResponse,
            CacheEntry,
            InvalidationMode,
            InvalidateRequest,
            RemovedResponse,
            RefreshReport,
            JobRunStatus,
            JobRunLog,
            JobPhase,
            JobState,
            HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "cache", description = "Cache maintenance endpoints"),
        (name = "jobs", description = "Job history endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Security addon for the shared-secret bearer check.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Shared refresh secret"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_endpoints() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/cache/refresh"));
        assert!(paths.iter().any(|p| p.as_str() == "/jobs/{name}/state"));
        assert!(paths.iter().any(|p| p.as_str() == "/jobs/states"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
