//! OpenAPI specification builder using utoipa.

use axum::Json;
use utoipa::OpenApi;

use crate::controller::{Navigation, StepLink, StepView};
use crate::rest::dto::{
    FieldRulesResponse, FormResponse, HealthResponse, RedirectResponse, StatusResponse,
    StepResponse, WizardResponse, WizardSummary,
};
use crate::rest::error::{ErrorResponse, ValidationErrorResponse};

/// OpenAPI documentation for the wizard REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wizard API",
        version = "0.1.0",
        description = "Inspect loaded wizards. Wizard pages themselves are served at each wizard's route: GET renders a step as StepView, POST submits it.",
        license(name = "MIT")
    ),
    paths(
        // Health endpoints
        crate::rest::routes::health::health,
        crate::rest::routes::health::status,
        // Wizard endpoints
        crate::rest::routes::wizards::list,
        crate::rest::routes::wizards::get_one,
        crate::rest::routes::wizards::get_step,
    ),
    components(
        schemas(
            HealthResponse,
            StatusResponse,
            WizardSummary,
            WizardResponse,
            StepResponse,
            FormResponse,
            FieldRulesResponse,
            ErrorResponse,
            // Page responses
            StepView,
            Navigation,
            StepLink,
            RedirectResponse,
            ValidationErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check and status endpoints"),
        (name = "Wizards", description = "Loaded wizard definitions"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

/// Serve the OpenAPI document
pub async fn spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
