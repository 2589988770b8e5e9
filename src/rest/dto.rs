//! Data Transfer Objects for the REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::steps::{FormSpec, Step, StepGraph};

// =============================================================================
// Health DTOs
// =============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Service status with registry info
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub wizard_count: usize,
    pub session_backend: String,
}

// =============================================================================
// Wizard DTOs
// =============================================================================

/// Summary response for listing wizards
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WizardSummary {
    pub page: String,
    pub title: String,
    pub route: String,
    pub step_count: usize,
}

impl From<&StepGraph> for WizardSummary {
    fn from(graph: &StepGraph) -> Self {
        Self {
            page: graph.page().to_string(),
            title: graph.title().to_string(),
            route: graph.route().as_str().to_string(),
            step_count: graph.len(),
        }
    }
}

/// Full wizard description
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WizardResponse {
    pub page: String,
    pub title: String,
    pub route: String,
    pub session_key: String,
    pub steps: Vec<StepResponse>,
}

impl From<&StepGraph> for WizardResponse {
    fn from(graph: &StepGraph) -> Self {
        Self {
            page: graph.page().to_string(),
            title: graph.title().to_string(),
            route: graph.route().as_str().to_string(),
            session_key: graph.session_key(),
            steps: graph
                .steps()
                .iter()
                .map(|step| StepResponse::new(graph, step))
                .collect(),
        }
    }
}

/// One step of a wizard
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepResponse {
    pub position: usize,
    pub step: String,
    pub name: String,
    pub url: String,
    pub validate_prev_steps: bool,
    pub keep_session: bool,
    pub forms: Vec<FormResponse>,
}

impl StepResponse {
    pub fn new(graph: &StepGraph, step: &Step) -> Self {
        Self {
            position: step.position,
            step: step.id.clone(),
            name: step.name.clone(),
            url: graph.url_for(step),
            validate_prev_steps: step.validate_prev_steps,
            keep_session: step.keep_session,
            forms: step
                .forms
                .iter()
                .map(|(handler, form)| FormResponse::new(handler, form))
                .collect(),
        }
    }
}

/// A form handler and what it validates
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormResponse {
    pub handler: String,
    pub fields: Vec<FieldRulesResponse>,
    pub extra_validators: Vec<String>,
}

impl FormResponse {
    fn new(handler: &str, form: &FormSpec) -> Self {
        Self {
            handler: handler.to_string(),
            fields: form
                .ruleset
                .iter()
                .map(|rules| FieldRulesResponse {
                    field: rules.field.clone(),
                    rules: rules.rules.iter().map(|r| r.name().to_string()).collect(),
                })
                .collect(),
            extra_validators: form.extras.iter().map(|e| e.name().to_string()).collect(),
        }
    }
}

/// Rule names applied to one field
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldRulesResponse {
    pub field: String,
    pub rules: Vec<String>,
}

// =============================================================================
// Page DTOs
// =============================================================================

/// Redirect instruction returned to asynchronous requests
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedirectResponse {
    pub redirect: String,
}
