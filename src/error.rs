//! Error types for the wizard engine.
//!
//! Configuration problems are fatal and surface while definitions are loaded.
//! Everything a user can cause at request time (bad input, skipping ahead) is
//! an outcome of the controller, not an error.

use thiserror::Error;

/// Problems in a wizard definition. Never recovered from at runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("route '{0}' must contain the step placeholder ':step?'")]
    MissingStepPlaceholder(String),

    #[error("route '{route}' is invalid: {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("step at position {0} is missing the 'step' key")]
    MissingStepKey(usize),

    #[error("step identifier '{0}' must be a single URL path segment")]
    InvalidStepIdentifier(String),

    #[error("step identifier '{0}' is declared more than once")]
    DuplicateStep(String),

    #[error("wizard '{0}' has no steps")]
    NoSteps(String),

    #[error("wizard definition is missing the 'page' key")]
    MissingPage,

    #[error("unknown validation rule '{rule}' on field '{field}'")]
    UnknownRule { field: String, rule: String },

    #[error("rule '{rule}' on field '{field}' has an invalid argument: {reason}")]
    InvalidRuleArgument {
        field: String,
        rule: String,
        reason: String,
    },

    #[error("unknown extra validator '{0}'")]
    UnknownExtraValidator(String),

    #[error("wizard '{0}' is defined more than once")]
    DuplicateWizard(String),

    #[error("route '{0}' is used by more than one wizard")]
    DuplicateRoute(String),
}

/// Errors returned by the engine and its session plumbing
#[derive(Error, Debug)]
pub enum WizardError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("session storage failed: {0}")]
    Session(String),

    #[error("step form '{handler}' is not declared on step '{step}'")]
    UnknownForm { step: String, handler: String },
}

impl From<std::io::Error> for WizardError {
    fn from(err: std::io::Error) -> Self {
        WizardError::Session(err.to_string())
    }
}

impl From<serde_json::Error> for WizardError {
    fn from(err: serde_json::Error) -> Self {
        WizardError::Session(format!("JSON error: {}", err))
    }
}
