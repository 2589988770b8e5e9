//! Derived navigation data for a step: neighbours and render view

use serde::Serialize;
use utoipa::ToSchema;

use crate::steps::StepGraph;
use crate::validation::FieldMap;

/// Neighbour URLs and display name of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub step_next: Option<String>,
    pub step_prev: Option<String>,
    pub step_current_name: String,
}

impl Navigation {
    pub fn resolve(graph: &StepGraph, position: usize) -> Self {
        Self {
            step_next: graph.next(position).map(|step| graph.url_for(step)),
            step_prev: graph.prev(position).map(|step| graph.url_for(step)),
            step_current_name: graph
                .get(position)
                .map(|step| step.name.clone())
                .unwrap_or_default(),
        }
    }
}

/// One entry of the step list shown alongside every render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StepLink {
    pub step: String,
    pub name: String,
    pub url: String,
}

impl StepLink {
    pub fn all(graph: &StepGraph) -> Vec<Self> {
        graph
            .steps()
            .iter()
            .map(|step| Self {
                step: step.id.clone(),
                name: step.name.clone(),
                url: graph.url_for(step),
            })
            .collect()
    }
}

/// Everything a view needs to render the current step
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    /// Identifier of the rendered step
    pub step_current: String,
    #[serde(flatten)]
    pub navigation: Navigation,
    pub steps: Vec<StepLink>,
    /// Accumulated validated values
    #[schema(value_type = Object)]
    pub fields: FieldMap,
    /// Values of earlier steps, re-validated when the step asks for it
    #[schema(value_type = Object)]
    pub prev_validations_data: FieldMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{DefinitionFormat, WizardDefinition};
    use crate::validation::ExtraValidatorRegistry;

    fn graph() -> StepGraph {
        let def = WizardDefinition::parse(
            "page: p\nroute: /p/:step?\nsteps: [{step: a, name: First}, {step: b}, {step: c}]\n",
            DefinitionFormat::Yaml,
        )
        .unwrap();
        StepGraph::compile(&def, &ExtraValidatorRegistry::new()).unwrap()
    }

    #[test]
    fn test_navigation_at_the_ends() {
        let graph = graph();

        let first = Navigation::resolve(&graph, 0);
        assert_eq!(first.step_prev, None);
        assert_eq!(first.step_next.as_deref(), Some("/p/b"));
        assert_eq!(first.step_current_name, "First");

        let last = Navigation::resolve(&graph, 2);
        assert_eq!(last.step_prev.as_deref(), Some("/p/b"));
        assert_eq!(last.step_next, None);
    }

    #[test]
    fn test_view_serializes_flat_camel_case() {
        let graph = graph();
        let view = StepView {
            step_current: "b".to_string(),
            navigation: Navigation::resolve(&graph, 1),
            steps: StepLink::all(&graph),
            fields: FieldMap::new(),
            prev_validations_data: FieldMap::new(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["stepCurrent"], "b");
        assert_eq!(json["stepNext"], "/p/c");
        assert_eq!(json["stepCurrentName"], "b");
        assert_eq!(json["steps"][0]["url"], "/p/a");
        assert!(json["prevValidationsData"].is_object());
    }
}
