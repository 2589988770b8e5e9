//! Validation messages: built-in defaults plus per-form overrides.

use std::collections::BTreeMap;

/// How a size rule measured the value, which picks the message wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeKind {
    Numeric,
    String,
    Array,
}

/// Message overrides keyed by `field.rule` or `rule`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Messages {
    overrides: BTreeMap<String, String>,
}

impl Messages {
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn merge(&mut self, other: &Messages) {
        self.overrides.extend(
            other
                .overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Render the message for `rule` failing on `field`
    pub fn render(
        &self,
        field: &str,
        rule: &str,
        size_kind: Option<SizeKind>,
        params: &[(&str, String)],
    ) -> String {
        let template = self
            .overrides
            .get(&format!("{}.{}", field, rule))
            .or_else(|| self.overrides.get(rule))
            .map(String::as_str)
            .unwrap_or_else(|| default_message(rule, size_kind));

        let mut message = template.replace(":attribute", &attribute_name(field));
        // Longest placeholders first so ':values' is not eaten by ':value'
        let mut params: Vec<&(&str, String)> = params.iter().collect();
        params.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
        for (name, value) in params {
            message = message.replace(&format!(":{}", name), value);
        }
        message
    }
}

/// `first_name` reads as "first name" in messages
pub fn attribute_name(field: &str) -> String {
    field.replace('_', " ")
}

fn default_message(rule: &str, size_kind: Option<SizeKind>) -> &'static str {
    match (rule, size_kind) {
        ("required", _) => "The :attribute field is required.",
        ("present", _) => "The :attribute field must be present.",
        ("filled", _) => "The :attribute field must have a value.",
        ("accepted", _) => "The :attribute must be accepted.",
        ("string", _) => "The :attribute must be a string.",
        ("numeric", _) => "The :attribute must be a number.",
        ("integer", _) => "The :attribute must be an integer.",
        ("boolean", _) => "The :attribute field must be true or false.",
        ("array", _) => "The :attribute must be an array.",
        ("email", _) => "The :attribute must be a valid email address.",
        ("alpha", _) => "The :attribute may only contain letters.",
        ("alpha_num", _) => "The :attribute may only contain letters and numbers.",
        ("alpha_dash", _) => {
            "The :attribute may only contain letters, numbers, dashes and underscores."
        }
        ("date", _) => "The :attribute is not a valid date.",
        ("min", Some(SizeKind::Numeric)) => "The :attribute must be at least :min.",
        ("min", Some(SizeKind::Array)) => "The :attribute must have at least :min items.",
        ("min", _) => "The :attribute must be at least :min characters.",
        ("max", Some(SizeKind::Numeric)) => "The :attribute may not be greater than :max.",
        ("max", Some(SizeKind::Array)) => "The :attribute may not have more than :max items.",
        ("max", _) => "The :attribute may not be greater than :max characters.",
        ("between", Some(SizeKind::Numeric)) => "The :attribute must be between :min and :max.",
        ("between", Some(SizeKind::Array)) => {
            "The :attribute must have between :min and :max items."
        }
        ("between", _) => "The :attribute must be between :min and :max characters.",
        ("size", Some(SizeKind::Numeric)) => "The :attribute must be :size.",
        ("size", Some(SizeKind::Array)) => "The :attribute must contain :size items.",
        ("size", _) => "The :attribute must be :size characters.",
        ("digits", _) => "The :attribute must be :digits digits.",
        ("in", _) | ("not_in", _) => "The selected :attribute is invalid.",
        ("same", _) => "The :attribute and :other must match.",
        ("different", _) => "The :attribute and :other must be different.",
        ("confirmed", _) => "The :attribute confirmation does not match.",
        ("required_if", _) => "The :attribute field is required when :other is :value.",
        ("required_with", _) => "The :attribute field is required when :values is present.",
        _ => "The :attribute format is invalid.",
    }
}

/// Format a rule bound without a trailing `.0` for whole numbers
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
