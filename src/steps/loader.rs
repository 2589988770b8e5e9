//! Filesystem loading for wizard definitions

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::graph::StepGraph;
use super::schema::{DefinitionFormat, WizardDefinition};
use crate::error::ConfigurationError;
use crate::validation::ExtraValidatorRegistry;

/// Every compiled wizard, keyed by page
#[derive(Debug, Clone, Default)]
pub struct WizardRegistry {
    wizards: BTreeMap<String, Arc<StepGraph>>,
}

impl WizardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add one definition
    pub fn register(
        &mut self,
        definition: &WizardDefinition,
        extras: &ExtraValidatorRegistry,
    ) -> Result<Arc<StepGraph>, ConfigurationError> {
        let graph = StepGraph::compile(definition, extras)?;
        if self.wizards.contains_key(graph.page()) {
            return Err(ConfigurationError::DuplicateWizard(graph.page().to_string()));
        }
        let base = graph.route().base();
        if self.wizards.values().any(|other| other.route().base() == base) {
            return Err(ConfigurationError::DuplicateRoute(base.to_string()));
        }
        let graph = Arc::new(graph);
        self.wizards
            .insert(graph.page().to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    /// Load every `*.json`, `*.yaml`, `*.yml` and `*.toml` file in `dir`
    ///
    /// A missing directory yields an empty registry. Any invalid definition
    /// fails the whole load.
    pub fn load_dir(dir: &Path, extras: &ExtraValidatorRegistry) -> Result<Self> {
        let mut registry = Self::new();

        if !dir.exists() {
            debug!("Definitions directory does not exist: {}", dir.display());
            return Ok(registry);
        }

        let mut paths = fs::read_dir(dir)
            .with_context(|| format!("Failed to read definitions directory: {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        for path in paths {
            if path.is_dir() || DefinitionFormat::from_path(&path).is_none() {
                continue;
            }

            let definition = WizardDefinition::from_file(&path)?;
            let graph = registry
                .register(&definition, extras)
                .with_context(|| format!("Invalid wizard in {}", path.display()))?;
            debug!(
                "Loaded wizard '{}' ({} steps) from {}",
                graph.page(),
                graph.len(),
                path.display()
            );
        }

        info!("Loaded {} wizard definitions", registry.len());
        Ok(registry)
    }

    pub fn get(&self, page: &str) -> Option<Arc<StepGraph>> {
        self.wizards.get(page).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<StepGraph>> {
        self.wizards.values()
    }

    pub fn len(&self) -> usize {
        self.wizards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wizards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_dir_mixed_formats() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "signup.yaml",
            "route: /signup/:step?\nsteps: [{step: a}, {step: b}]\n",
        );
        write(
            dir.path(),
            "quote.json",
            r#"{"page": "quote", "route": "/quote/:step?", "steps": [{"step": "car"}]}"#,
        );
        write(dir.path(), "README.md", "not a wizard");

        let registry =
            WizardRegistry::load_dir(dir.path(), &ExtraValidatorRegistry::with_builtins())
                .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("signup").unwrap().len(), 2);
        assert_eq!(registry.get("quote").unwrap().steps()[0].id, "car");
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = WizardRegistry::load_dir(
            &dir.path().join("nope"),
            &ExtraValidatorRegistry::with_builtins(),
        )
        .unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_definition_fails_load() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.yaml", "route: /bad\nsteps: [{step: a}]\n");

        let err = WizardRegistry::load_dir(dir.path(), &ExtraValidatorRegistry::with_builtins())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("step placeholder"));
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let extras = ExtraValidatorRegistry::with_builtins();
        let definition = WizardDefinition::parse(
            "page: p\nroute: /p/:step?\nsteps: [{step: a}]\n",
            DefinitionFormat::Yaml,
        )
        .unwrap();

        let mut registry = WizardRegistry::new();
        registry.register(&definition, &extras).unwrap();
        assert_eq!(
            registry.register(&definition, &extras).unwrap_err(),
            ConfigurationError::DuplicateWizard("p".to_string())
        );
    }

    #[test]
    fn test_shared_route_rejected() {
        let extras = ExtraValidatorRegistry::with_builtins();
        let mut registry = WizardRegistry::new();
        for page in ["one", "two"] {
            let definition = WizardDefinition::parse(
                &format!("page: {}\nroute: /shared/:step?\nsteps: [{{step: a}}]\n", page),
                DefinitionFormat::Yaml,
            )
            .unwrap();
            let result = registry.register(&definition, &extras);
            if page == "two" {
                assert_eq!(
                    result.unwrap_err(),
                    ConfigurationError::DuplicateRoute("/shared".to_string())
                );
            }
        }
    }

    #[test]
    fn test_route_under_api_rejected() {
        let definition = WizardDefinition::parse(
            "page: p\nroute: /api/v1/wizards/:step?\nsteps: [{step: a}]\n",
            DefinitionFormat::Yaml,
        )
        .unwrap();
        let err = WizardRegistry::new()
            .register(&definition, &ExtraValidatorRegistry::with_builtins())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidRoute { .. }));
    }
}
