//! Rule expressions and their compiled form.
//!
//! A field's rules are written either as a pipe-separated string
//! (`"required|email|max:255"`) or as a list of single rules, which is the only
//! way to use a `regex:` pattern containing `|`.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Rule expression as it appears in a definition file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleExpr {
    Pipe(String),
    List(Vec<String>),
}

impl RuleExpr {
    /// Split the expression into individual `name[:args]` rules
    pub fn parts(&self) -> Vec<&str> {
        match self {
            RuleExpr::Pipe(s) => s
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect(),
            RuleExpr::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

impl From<&str> for RuleExpr {
    fn from(value: &str) -> Self {
        RuleExpr::Pipe(value.to_string())
    }
}

/// A single compiled validation rule
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Nullable,
    Sometimes,
    Present,
    Filled,
    String,
    Numeric,
    Integer,
    Boolean,
    Array,
    Accepted,
    Email,
    Url,
    Alpha,
    AlphaNum,
    AlphaDash,
    Date,
    Min(f64),
    Max(f64),
    Between(f64, f64),
    Size(f64),
    Digits(usize),
    In(Vec<String>),
    NotIn(Vec<String>),
    Regex(Regex),
    Same(String),
    Different(String),
    Confirmed,
    RequiredIf { field: String, value: String },
    RequiredWith(String),
}

impl Rule {
    /// Rule name used for message lookup
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Nullable => "nullable",
            Rule::Sometimes => "sometimes",
            Rule::Present => "present",
            Rule::Filled => "filled",
            Rule::String => "string",
            Rule::Numeric => "numeric",
            Rule::Integer => "integer",
            Rule::Boolean => "boolean",
            Rule::Array => "array",
            Rule::Accepted => "accepted",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Alpha => "alpha",
            Rule::AlphaNum => "alpha_num",
            Rule::AlphaDash => "alpha_dash",
            Rule::Date => "date",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Between(..) => "between",
            Rule::Size(_) => "size",
            Rule::Digits(_) => "digits",
            Rule::In(_) => "in",
            Rule::NotIn(_) => "not_in",
            Rule::Regex(_) => "regex",
            Rule::Same(_) => "same",
            Rule::Different(_) => "different",
            Rule::Confirmed => "confirmed",
            Rule::RequiredIf { .. } => "required_if",
            Rule::RequiredWith(_) => "required_with",
        }
    }

    /// Implicit rules run even when the value is absent or empty
    pub fn is_implicit(&self) -> bool {
        matches!(
            self,
            Rule::Required
                | Rule::Present
                | Rule::Filled
                | Rule::Accepted
                | Rule::RequiredIf { .. }
                | Rule::RequiredWith(_)
        )
    }

    /// Marker rules only change how other rules are applied
    pub fn is_marker(&self) -> bool {
        matches!(self, Rule::Nullable | Rule::Sometimes)
    }

    /// Other field this rule reads when checking `field`
    pub fn referenced_field(&self, field: &str) -> Option<String> {
        match self {
            Rule::Same(other) | Rule::Different(other) | Rule::RequiredWith(other) => {
                Some(other.clone())
            }
            Rule::RequiredIf { field: other, .. } => Some(other.clone()),
            Rule::Confirmed => Some(format!("{}_confirmation", field)),
            _ => None,
        }
    }

    /// Parse one `name[:args]` rule for `field`
    pub fn parse(field: &str, raw: &str) -> Result<Self, ConfigurationError> {
        let (name, args) = match raw.split_once(':') {
            Some((name, args)) => (name.trim(), Some(args)),
            None => (raw.trim(), None),
        };

        let invalid = |reason: &str| ConfigurationError::InvalidRuleArgument {
            field: field.to_string(),
            rule: name.to_string(),
            reason: reason.to_string(),
        };
        let arg = || args.filter(|a| !a.is_empty()).ok_or_else(|| invalid("missing argument"));
        let number = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| invalid(&format!("'{}' is not a number", s.trim())))
        };
        let list = |s: &str| -> Vec<String> { s.split(',').map(|v| v.trim().to_string()).collect() };

        let rule = match name {
            "required" => Rule::Required,
            "nullable" => Rule::Nullable,
            "sometimes" => Rule::Sometimes,
            "present" => Rule::Present,
            "filled" => Rule::Filled,
            "string" => Rule::String,
            "numeric" => Rule::Numeric,
            "integer" => Rule::Integer,
            "boolean" => Rule::Boolean,
            "array" => Rule::Array,
            "accepted" => Rule::Accepted,
            "email" => Rule::Email,
            "url" => Rule::Url,
            "alpha" => Rule::Alpha,
            "alpha_num" => Rule::AlphaNum,
            "alpha_dash" => Rule::AlphaDash,
            "date" => Rule::Date,
            "confirmed" => Rule::Confirmed,
            "min" => Rule::Min(number(arg()?)?),
            "max" => Rule::Max(number(arg()?)?),
            "size" => Rule::Size(number(arg()?)?),
            "between" => {
                let (lo, hi) = arg()?
                    .split_once(',')
                    .ok_or_else(|| invalid("expected 'min,max'"))?;
                let (lo, hi) = (number(lo)?, number(hi)?);
                if lo > hi {
                    return Err(invalid("min is greater than max"));
                }
                Rule::Between(lo, hi)
            }
            "digits" => Rule::Digits(
                arg()?
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("expected a digit count"))?,
            ),
            "in" => Rule::In(list(arg()?)),
            "not_in" => Rule::NotIn(list(arg()?)),
            "regex" => {
                let pattern = arg()?;
                let pattern = strip_delimiters(pattern);
                Rule::Regex(Regex::new(pattern).map_err(|e| invalid(&e.to_string()))?)
            }
            "same" => Rule::Same(arg()?.trim().to_string()),
            "different" => Rule::Different(arg()?.trim().to_string()),
            "required_with" => Rule::RequiredWith(arg()?.trim().to_string()),
            "required_if" => {
                let (other, value) = arg()?
                    .split_once(',')
                    .ok_or_else(|| invalid("expected 'field,value'"))?;
                Rule::RequiredIf {
                    field: other.trim().to_string(),
                    value: value.trim().to_string(),
                }
            }
            _ => {
                return Err(ConfigurationError::UnknownRule {
                    field: field.to_string(),
                    rule: name.to_string(),
                })
            }
        };

        Ok(rule)
    }
}

/// Accept `/pattern/` as well as a bare pattern
fn strip_delimiters(pattern: &str) -> &str {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        &pattern[1..pattern.len() - 1]
    } else {
        pattern
    }
}

/// Compiled rules for one field
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub field: String,
    pub rules: Vec<Rule>,
}

impl FieldRules {
    pub fn parse(field: &str, expr: &RuleExpr) -> Result<Self, ConfigurationError> {
        let rules = expr
            .parts()
            .into_iter()
            .map(|part| Rule::parse(field, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            field: field.to_string(),
            rules,
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name() == name)
    }

    /// Whether sizes compare the numeric value rather than the length
    pub fn is_numeric(&self) -> bool {
        self.has("numeric") || self.has("integer")
    }
}

/// Ordered set of field rules for a form.
///
/// Merging follows map semantics: a field declared again replaces the earlier
/// declaration in place.
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    fields: Vec<FieldRules>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `(field, expression)` pairs
    pub fn compile<'a, I>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (&'a String, &'a RuleExpr)>,
    {
        let mut ruleset = Ruleset::new();
        for (field, expr) in entries {
            ruleset.insert(FieldRules::parse(field, expr)?);
        }
        Ok(ruleset)
    }

    pub fn insert(&mut self, rules: FieldRules) {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.field == rules.field) {
            *existing = rules;
        } else {
            self.fields.push(rules);
        }
    }

    pub fn merge(&mut self, other: &Ruleset) {
        for rules in &other.fields {
            self.insert(rules.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRules> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.field.as_str())
    }

    /// Declared fields followed by the undeclared fields their rules read,
    /// such as `password_confirmation`
    pub fn stored_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.field_names().map(str::to_string).collect();
        for rules in &self.fields {
            for other in rules
                .rules
                .iter()
                .filter_map(|rule| rule.referenced_field(&rules.field))
            {
                if !fields.contains(&other) {
                    fields.push(other);
                }
            }
        }
        fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_expression_parts() {
        let expr = RuleExpr::from("required| email |max:255");
        assert_eq!(expr.parts(), vec!["required", "email", "max:255"]);
    }

    #[test]
    fn test_list_expression_keeps_pipes_in_regex() {
        let expr = RuleExpr::List(vec!["required".to_string(), "regex:/^(a|b)$/".to_string()]);
        let rules = FieldRules::parse("choice", &expr).unwrap();
        assert_eq!(rules.rules.len(), 2);
        match &rules.rules[1] {
            Rule::Regex(re) => {
                assert!(re.is_match("a"));
                assert!(!re.is_match("c"));
            }
            other => panic!("expected regex rule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_arguments() {
        assert!(matches!(Rule::parse("age", "min:18").unwrap(), Rule::Min(m) if m == 18.0));
        assert!(matches!(
            Rule::parse("age", "between:1,9").unwrap(),
            Rule::Between(lo, hi) if lo == 1.0 && hi == 9.0
        ));
        assert!(matches!(Rule::parse("pin", "digits:4").unwrap(), Rule::Digits(4)));
        match Rule::parse("plan", "in:basic, pro").unwrap() {
            Rule::In(values) => assert_eq!(values, vec!["basic", "pro"]),
            other => panic!("unexpected {:?}", other),
        }
        match Rule::parse("other", "required_if:kind,company").unwrap() {
            Rule::RequiredIf { field, value } => {
                assert_eq!(field, "kind");
                assert_eq!(value, "company");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_rule_is_configuration_error() {
        let err = Rule::parse("email", "emale").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownRule {
                field: "email".to_string(),
                rule: "emale".to_string()
            }
        );
    }

    #[test]
    fn test_bad_arguments_are_configuration_errors() {
        assert!(matches!(
            Rule::parse("age", "min"),
            Err(ConfigurationError::InvalidRuleArgument { .. })
        ));
        assert!(matches!(
            Rule::parse("age", "max:ten"),
            Err(ConfigurationError::InvalidRuleArgument { .. })
        ));
        assert!(matches!(
            Rule::parse("age", "between:9,1"),
            Err(ConfigurationError::InvalidRuleArgument { .. })
        ));
        assert!(matches!(
            Rule::parse("code", "regex:(unclosed"),
            Err(ConfigurationError::InvalidRuleArgument { .. })
        ));
    }

    #[test]
    fn test_ruleset_merge_replaces_field() {
        let mut first = Ruleset::new();
        first.insert(FieldRules::parse("name", &RuleExpr::from("required")).unwrap());
        first.insert(FieldRules::parse("email", &RuleExpr::from("email")).unwrap());

        let mut second = Ruleset::new();
        second.insert(FieldRules::parse("name", &RuleExpr::from("required|min:3")).unwrap());

        first.merge(&second);
        let names: Vec<&str> = first.field_names().collect();
        assert_eq!(names, vec!["name", "email"]);
        assert_eq!(first.iter().next().unwrap().rules.len(), 2);
    }

    #[test]
    fn test_stored_fields_include_referenced_fields() {
        let mut ruleset = Ruleset::new();
        ruleset.insert(FieldRules::parse("password", &RuleExpr::from("required|confirmed")).unwrap());
        ruleset.insert(FieldRules::parse("email", &RuleExpr::from("required_with:name")).unwrap());
        ruleset.insert(FieldRules::parse("name", &RuleExpr::from("different:nick")).unwrap());

        assert_eq!(
            ruleset.stored_fields(),
            vec!["password", "email", "name", "password_confirmation", "nick"]
        );
    }
}
