//! Schema definitions for wizard definition files

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::validation::RuleExpr;

/// A wizard as declared in a definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardDefinition {
    /// Page identity; the session key is derived from it
    #[serde(default)]
    pub page: String,
    /// Route template with a `:step?` placeholder, e.g. `/signup/:step?`
    pub route: String,
    /// Human readable title
    #[serde(default)]
    pub title: Option<String>,
    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<StepSchema>,
}

/// One step of a wizard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepSchema {
    /// Stable identifier used in URLs; empty means the key was missing
    #[serde(default)]
    pub step: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Form handler name → form
    #[serde(default)]
    pub forms: BTreeMap<String, FormSchema>,
    /// Replay validation of every earlier step before this one is used
    #[serde(default, rename = "validatePrevSteps", alias = "validate_prev_steps")]
    pub validate_prev_steps: bool,
    /// Keep the session when this is the final step
    #[serde(
        default,
        rename = "keepSession",
        alias = "keep_session",
        alias = "keep_sesion"
    )]
    pub keep_session: bool,
}

impl StepSchema {
    /// Display name, falling back to the identifier
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.step
        } else {
            &self.name
        }
    }
}

/// Validation contract of one form within a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSchema {
    /// Field → rule expression
    #[serde(default)]
    pub validation: BTreeMap<String, RuleExpr>,
    /// `field.rule` or `rule` → message
    #[serde(default)]
    pub validation_messages: BTreeMap<String, String>,
    /// Names of registered extra validators, run in order
    #[serde(default)]
    pub extra_validation: ExtraNames,
}

/// One extra validator name or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraNames {
    One(String),
    Many(Vec<String>),
}

impl Default for ExtraNames {
    fn default() -> Self {
        ExtraNames::Many(Vec::new())
    }
}

impl ExtraNames {
    pub fn names(&self) -> Vec<&str> {
        match self {
            ExtraNames::One(name) => vec![name.as_str()],
            ExtraNames::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Definition file formats, picked by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Json,
    Yaml,
    Toml,
}

impl DefinitionFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(DefinitionFormat::Json),
            "yaml" | "yml" => Some(DefinitionFormat::Yaml),
            "toml" => Some(DefinitionFormat::Toml),
            _ => None,
        }
    }
}

impl WizardDefinition {
    /// Parse a definition from text in the given format
    pub fn parse(contents: &str, format: DefinitionFormat) -> Result<Self> {
        let definition = match format {
            DefinitionFormat::Json => {
                serde_json::from_str(contents).context("Failed to parse JSON definition")?
            }
            DefinitionFormat::Yaml => {
                serde_yaml::from_str(contents).context("Failed to parse YAML definition")?
            }
            DefinitionFormat::Toml => {
                toml::from_str(contents).context("Failed to parse TOML definition")?
            }
        };
        Ok(definition)
    }

    /// Read and parse a definition file; the page defaults to the file stem
    pub fn from_file(path: &Path) -> Result<Self> {
        let Some(format) = DefinitionFormat::from_path(path) else {
            bail!("Unsupported definition file: {}", path.display());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut definition = Self::parse(&contents, format)
            .with_context(|| format!("Invalid definition in {}", path.display()))?;

        if definition.page.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                definition.page = stem.to_string();
            }
        }
        Ok(definition)
    }
}
