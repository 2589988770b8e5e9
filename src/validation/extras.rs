//! Extra validators: post-validation hooks referenced by name from definitions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::{FieldMap, ValidationContext};
use crate::error::ConfigurationError;

/// Hook signature: `(context, submitted data, accumulator) -> fields to merge`
pub type ExtraValidatorFn =
    dyn Fn(&mut ValidationContext, &FieldMap, &FieldMap) -> Option<FieldMap> + Send + Sync;

/// A registered extra validator and the name it was declared under
#[derive(Clone)]
pub struct ExtraValidator {
    name: String,
    func: Arc<ExtraValidatorFn>,
}

impl ExtraValidator {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ValidationContext, &FieldMap, &FieldMap) -> Option<FieldMap>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        ctx: &mut ValidationContext,
        data: &FieldMap,
        accumulator: &FieldMap,
    ) -> Option<FieldMap> {
        (self.func)(ctx, data, accumulator)
    }
}

impl fmt::Debug for ExtraValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Named extra validators available to definition files
#[derive(Debug, Clone, Default)]
pub struct ExtraValidatorRegistry {
    validators: HashMap<String, ExtraValidator>,
}

impl ExtraValidatorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `trim` and `timestamp` validators
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ExtraValidator::new("trim", trim));
        registry.register(ExtraValidator::new("timestamp", timestamp));
        registry
    }

    /// Register (or replace) a validator under its name
    pub fn register(&mut self, validator: ExtraValidator) {
        self.validators
            .insert(validator.name().to_string(), validator);
    }

    pub fn get(&self, name: &str) -> Result<ExtraValidator, ConfigurationError> {
        self.validators
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownExtraValidator(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Trimmed copies of submitted string fields that the form declares
fn trim(ctx: &mut ValidationContext, data: &FieldMap, _acc: &FieldMap) -> Option<FieldMap> {
    let trimmed: FieldMap = ctx
        .declared_fields()
        .iter()
        .filter_map(|field| match data.get(field) {
            Some(Value::String(s)) => Some((field.clone(), Value::String(s.trim().to_string()))),
            _ => None,
        })
        .collect();

    (!trimmed.is_empty()).then_some(trimmed)
}

fn timestamp(_ctx: &mut ValidationContext, _data: &FieldMap, _acc: &FieldMap) -> Option<FieldMap> {
    let mut out = FieldMap::new();
    out.insert(
        "validated_at".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    Some(out)
}
