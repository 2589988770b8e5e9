//! Wizard definition endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::rest::dto::{StepResponse, WizardResponse, WizardSummary};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// List all loaded wizards
#[utoipa::path(
    get,
    path = "/api/v1/wizards",
    tag = "Wizards",
    responses(
        (status = 200, description = "List of wizards", body = Vec<WizardSummary>)
    )
)]
pub async fn list(State(state): State<ApiState>) -> Json<Vec<WizardSummary>> {
    Json(
        state
            .registry
            .iter()
            .map(|graph| WizardSummary::from(graph.as_ref()))
            .collect(),
    )
}

/// Get a single wizard by page
#[utoipa::path(
    get,
    path = "/api/v1/wizards/{page}",
    tag = "Wizards",
    params(
        ("page" = String, Path, description = "Wizard page identifier")
    ),
    responses(
        (status = 200, description = "Wizard details", body = WizardResponse),
        (status = 404, description = "Wizard not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(page): Path<String>,
) -> Result<Json<WizardResponse>, ApiError> {
    let graph = state
        .registry
        .get(&page)
        .ok_or_else(|| ApiError::NotFound(format!("Wizard '{}' not found", page)))?;

    Ok(Json(WizardResponse::from(graph.as_ref())))
}

/// Get one step of a wizard
#[utoipa::path(
    get,
    path = "/api/v1/wizards/{page}/steps/{step}",
    tag = "Wizards",
    params(
        ("page" = String, Path, description = "Wizard page identifier"),
        ("step" = String, Path, description = "Step identifier")
    ),
    responses(
        (status = 200, description = "Step details", body = StepResponse),
        (status = 404, description = "Wizard or step not found", body = ErrorResponse)
    )
)]
pub async fn get_step(
    State(state): State<ApiState>,
    Path((page, step)): Path<(String, String)>,
) -> Result<Json<StepResponse>, ApiError> {
    let graph = state
        .registry
        .get(&page)
        .ok_or_else(|| ApiError::NotFound(format!("Wizard '{}' not found", page)))?;

    let (_, found) = graph.find_by_identifier(&step).ok_or_else(|| {
        ApiError::NotFound(format!("Step '{}' not found in '{}'", step, page))
    })?;

    Ok(Json(StepResponse::new(&graph, found)))
}
