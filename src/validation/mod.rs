//! Validation engine for wizard forms.
//!
//! Base rules run first; any failure rejects the submission without touching
//! the extra validators. On success the extra validators run in declared order,
//! each merging its output into the accumulator (right-hand side wins). An
//! extra validator may also reject the submission by adding field errors to the
//! context.

pub mod extras;
pub mod messages;
pub mod rules;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub use extras::{ExtraValidator, ExtraValidatorRegistry};
pub use messages::Messages;
pub use rules::{FieldRules, Rule, RuleExpr, Ruleset};

use messages::{attribute_name, format_number, SizeKind};

/// Flat field-name → value map, as submitted and as accumulated
pub type FieldMap = serde_json::Map<String, Value>;

/// Field-name → messages for every failing field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+[^\s]*$").expect("valid url regex")
});

/// Handed to extra validators so they can inspect the form and add errors
#[derive(Debug, Clone)]
pub struct ValidationContext {
    declared: Vec<String>,
    messages: Messages,
    errors: FieldErrors,
}

impl ValidationContext {
    pub fn new(declared: Vec<String>, messages: Messages) -> Self {
        Self {
            declared,
            messages,
            errors: FieldErrors::new(),
        }
    }

    /// Field names declared by the ruleset being validated
    pub fn declared_fields(&self) -> &[String] {
        &self.declared
    }

    /// Message overrides of the form being validated
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn fails(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Result of a successful validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    /// Accumulator after every extra validator merged its output
    pub fields: FieldMap,
    /// What the last extra validator returned, if anything
    pub returned: Option<FieldMap>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Invalid(FieldErrors),
    Valid(Validated),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }
}

/// Validate `data` with an empty accumulator
pub fn validate(
    data: &FieldMap,
    ruleset: &Ruleset,
    messages: &Messages,
    extras: &[ExtraValidator],
) -> ValidationOutcome {
    validate_with(data, ruleset, messages, extras, FieldMap::new())
}

/// Validate `data`, threading `accumulator` through the extra validators
pub fn validate_with(
    data: &FieldMap,
    ruleset: &Ruleset,
    messages: &Messages,
    extras: &[ExtraValidator],
    accumulator: FieldMap,
) -> ValidationOutcome {
    let errors = check_rules(data, ruleset, messages);
    if !errors.is_empty() {
        return ValidationOutcome::Invalid(errors);
    }
    apply_extras(data, ruleset, messages, extras, accumulator)
}

/// Run the extra validators alone, as after a successful rule check
pub fn apply_extras(
    data: &FieldMap,
    ruleset: &Ruleset,
    messages: &Messages,
    extras: &[ExtraValidator],
    mut accumulator: FieldMap,
) -> ValidationOutcome {
    let mut ctx = ValidationContext::new(
        ruleset.field_names().map(str::to_string).collect(),
        messages.clone(),
    );
    let mut returned = None;

    for extra in extras {
        let result = extra.call(&mut ctx, data, &accumulator);
        if let Some(fields) = &result {
            for (key, value) in fields {
                accumulator.insert(key.clone(), value.clone());
            }
        }
        tracing::trace!(validator = extra.name(), merged = result.is_some(), "extra validator ran");
        returned = result;
    }

    if ctx.fails() {
        return ValidationOutcome::Invalid(ctx.errors);
    }

    ValidationOutcome::Valid(Validated {
        fields: accumulator,
        returned,
    })
}

/// Run the base rules only
pub fn check_rules(data: &FieldMap, ruleset: &Ruleset, messages: &Messages) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for rules in ruleset.iter() {
        let failures = check_field(data, rules, messages);
        if !failures.is_empty() {
            errors.insert(rules.field.clone(), failures);
        }
    }
    errors
}

fn check_field(data: &FieldMap, rules: &FieldRules, messages: &Messages) -> Vec<String> {
    let field = rules.field.as_str();
    let value = data.get(field);

    if value.is_none() && rules.has("sometimes") {
        return Vec::new();
    }
    if matches!(value, Some(Value::Null)) && rules.has("nullable") {
        return rules
            .rules
            .iter()
            .filter(|r| r.is_implicit())
            .filter_map(|r| check_rule(data, rules, r, value, messages))
            .collect();
    }

    let empty = is_empty(value);
    rules
        .rules
        .iter()
        .filter(|r| !r.is_marker())
        .filter(|r| !empty || r.is_implicit())
        .filter_map(|r| check_rule(data, rules, r, value, messages))
        .collect()
}

/// Returns the failure message, or `None` when the rule passes
fn check_rule(
    data: &FieldMap,
    rules: &FieldRules,
    rule: &Rule,
    value: Option<&Value>,
    messages: &Messages,
) -> Option<String> {
    let field = rules.field.as_str();
    let fail = |params: &[(&str, String)]| Some(messages.render(field, rule.name(), None, params));
    let text = value.and_then(as_text);

    match rule {
        Rule::Nullable | Rule::Sometimes => None,
        Rule::Required => is_empty(value).then(|| fail(&[])).flatten(),
        Rule::Present => value.is_none().then(|| fail(&[])).flatten(),
        Rule::Filled => (value.is_some() && is_empty(value)).then(|| fail(&[])).flatten(),
        Rule::Accepted => (!value.is_some_and(is_accepted)).then(|| fail(&[])).flatten(),
        Rule::RequiredIf { field: other, value: expected } => {
            let matches = data
                .get(other)
                .and_then(as_text)
                .is_some_and(|v| &v == expected);
            (matches && is_empty(value))
                .then(|| {
                    fail(&[
                        ("other", attribute_name(other)),
                        ("value", expected.clone()),
                    ])
                })
                .flatten()
        }
        Rule::RequiredWith(other) => (!is_empty(data.get(other)) && is_empty(value))
            .then(|| fail(&[("values", attribute_name(other))]))
            .flatten(),
        Rule::String => (!matches!(value, Some(Value::String(_)))).then(|| fail(&[])).flatten(),
        Rule::Numeric => (!value.is_some_and(|v| as_number(v).is_some()))
            .then(|| fail(&[]))
            .flatten(),
        Rule::Integer => (!value.is_some_and(is_integer)).then(|| fail(&[])).flatten(),
        Rule::Boolean => (!value.is_some_and(is_boolean)).then(|| fail(&[])).flatten(),
        Rule::Array => (!matches!(value, Some(Value::Array(_)))).then(|| fail(&[])).flatten(),
        Rule::Email => (!text.as_deref().is_some_and(|t| EMAIL_RE.is_match(t)))
            .then(|| fail(&[]))
            .flatten(),
        Rule::Url => (!text.as_deref().is_some_and(|t| URL_RE.is_match(t)))
            .then(|| fail(&[]))
            .flatten(),
        Rule::Alpha => (!text
            .as_deref()
            .is_some_and(|t| t.chars().all(char::is_alphabetic)))
        .then(|| fail(&[]))
        .flatten(),
        Rule::AlphaNum => (!text
            .as_deref()
            .is_some_and(|t| t.chars().all(char::is_alphanumeric)))
        .then(|| fail(&[]))
        .flatten(),
        Rule::AlphaDash => (!text.as_deref().is_some_and(|t| {
            t.chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        }))
        .then(|| fail(&[]))
        .flatten(),
        Rule::Date => (!text
            .as_deref()
            .is_some_and(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").is_ok()))
        .then(|| fail(&[]))
        .flatten(),
        Rule::Min(min) => check_size(rules, rule, value, messages, |n| n >= *min, &[("min", *min)]),
        Rule::Max(max) => check_size(rules, rule, value, messages, |n| n <= *max, &[("max", *max)]),
        Rule::Between(lo, hi) => check_size(
            rules,
            rule,
            value,
            messages,
            |n| n >= *lo && n <= *hi,
            &[("min", *lo), ("max", *hi)],
        ),
        Rule::Size(size) => check_size(
            rules,
            rule,
            value,
            messages,
            |n| (n - *size).abs() < f64::EPSILON,
            &[("size", *size)],
        ),
        Rule::Digits(count) => (!text.as_deref().is_some_and(|t| {
            t.len() == *count && t.chars().all(|c| c.is_ascii_digit())
        }))
        .then(|| fail(&[("digits", count.to_string())]))
        .flatten(),
        Rule::In(allowed) => (!text.as_deref().is_some_and(|t| allowed.iter().any(|a| a == t)))
            .then(|| fail(&[("values", allowed.join(", "))]))
            .flatten(),
        Rule::NotIn(denied) => text
            .as_deref()
            .is_some_and(|t| denied.iter().any(|d| d == t))
            .then(|| fail(&[("values", denied.join(", "))]))
            .flatten(),
        Rule::Regex(re) => (!text.as_deref().is_some_and(|t| re.is_match(t)))
            .then(|| fail(&[]))
            .flatten(),
        Rule::Same(other) => (data.get(other) != value)
            .then(|| fail(&[("other", attribute_name(other))]))
            .flatten(),
        Rule::Different(other) => (data.get(other) == value)
            .then(|| fail(&[("other", attribute_name(other))]))
            .flatten(),
        Rule::Confirmed => (data.get(&format!("{}_confirmation", field)) != value)
            .then(|| fail(&[]))
            .flatten(),
    }
}

fn check_size(
    rules: &FieldRules,
    rule: &Rule,
    value: Option<&Value>,
    messages: &Messages,
    accept: impl Fn(f64) -> bool,
    bounds: &[(&str, f64)],
) -> Option<String> {
    let measured = value.and_then(|v| measure(v, rules.is_numeric()));
    let kind = measured.map(|(_, kind)| kind);
    if measured.is_some_and(|(n, _)| accept(n)) {
        return None;
    }
    let params: Vec<(&str, String)> = bounds
        .iter()
        .map(|(name, n)| (*name, format_number(*n)))
        .collect();
    Some(messages.render(&rules.field, rule.name(), kind, &params))
}

/// Size of a value: its number when the field is numeric, otherwise its length
fn measure(value: &Value, numeric: bool) -> Option<(f64, SizeKind)> {
    match value {
        Value::Number(n) => n.as_f64().map(|n| (n, SizeKind::Numeric)),
        Value::String(s) if numeric => s
            .trim()
            .parse::<f64>()
            .ok()
            .map(|n| (n, SizeKind::Numeric)),
        Value::String(s) => Some((s.chars().count() as f64, SizeKind::String)),
        Value::Array(items) => Some((items.len() as f64, SizeKind::Array)),
        _ => None,
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        _ => false,
    }
}

/// Scalar values as text, for the string-shaped rules
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => n.as_i64().is_some_and(|n| n == 0 || n == 1),
        Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

fn is_accepted(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.as_str(), "yes" | "on" | "1" | "true"),
        _ => false,
    }
}
