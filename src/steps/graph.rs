//! Compiled, immutable step sequence of one wizard

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::ConfigurationError;
use crate::steps::route::{is_path_segment, RouteTemplate};
use crate::steps::schema::{FormSchema, StepSchema, WizardDefinition};
use crate::validation::{ExtraValidator, ExtraValidatorRegistry, Messages, Ruleset};

/// Validation contract of one form: rules, message overrides and extra validators
#[derive(Debug, Clone, Default)]
pub struct FormSpec {
    pub ruleset: Ruleset,
    pub messages: Messages,
    pub extras: Vec<ExtraValidator>,
}

impl FormSpec {
    fn compile(
        schema: &FormSchema,
        registry: &ExtraValidatorRegistry,
    ) -> Result<Self, ConfigurationError> {
        let extras = schema
            .extra_validation
            .names()
            .into_iter()
            .map(|name| registry.get(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ruleset: Ruleset::compile(&schema.validation)?,
            messages: Messages::new(schema.validation_messages.clone()),
            extras,
        })
    }

    /// Append another form's contract; later declarations win
    pub fn merge(&mut self, other: &FormSpec) {
        self.ruleset.merge(&other.ruleset);
        self.messages.merge(&other.messages);
        self.extras.extend(other.extras.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.ruleset.is_empty() && self.extras.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub position: usize,
    pub id: String,
    pub name: String,
    pub forms: BTreeMap<String, FormSpec>,
    pub validate_prev_steps: bool,
    pub keep_session: bool,
}

impl Step {
    fn compile(
        position: usize,
        schema: &StepSchema,
        registry: &ExtraValidatorRegistry,
    ) -> Result<Self, ConfigurationError> {
        let id = schema.step.trim();
        if id.is_empty() {
            return Err(ConfigurationError::MissingStepKey(position));
        }
        if !is_path_segment(id) {
            return Err(ConfigurationError::InvalidStepIdentifier(id.to_string()));
        }

        let forms = schema
            .forms
            .iter()
            .map(|(handler, form)| Ok((handler.clone(), FormSpec::compile(form, registry)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;

        Ok(Self {
            position,
            id: id.to_string(),
            name: schema.display_name().to_string(),
            forms,
            validate_prev_steps: schema.validate_prev_steps,
            keep_session: schema.keep_session,
        })
    }

    pub fn form(&self, handler: &str) -> Option<&FormSpec> {
        self.forms.get(handler)
    }

    /// Every field any form of this step declares a rule for
    pub fn declared_fields(&self) -> impl Iterator<Item = &str> {
        self.forms
            .values()
            .flat_map(|form| form.ruleset.field_names())
    }

    /// Declared fields plus the companion fields their rules read
    pub fn stored_fields(&self) -> impl Iterator<Item = String> + '_ {
        self.forms.values().flat_map(|form| form.ruleset.stored_fields())
    }
}

/// Ordered steps of one wizard page
#[derive(Debug, Clone)]
pub struct StepGraph {
    page: String,
    title: Option<String>,
    route: RouteTemplate,
    steps: Vec<Step>,
}

impl StepGraph {
    /// Compile a definition, rejecting any configuration problem
    pub fn compile(
        definition: &WizardDefinition,
        registry: &ExtraValidatorRegistry,
    ) -> Result<Self, ConfigurationError> {
        if definition.page.trim().is_empty() {
            return Err(ConfigurationError::MissingPage);
        }
        let route = RouteTemplate::parse(&definition.route)?;

        if definition.steps.is_empty() {
            return Err(ConfigurationError::NoSteps(definition.page.clone()));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(definition.steps.len());
        for (position, schema) in definition.steps.iter().enumerate() {
            let step = Step::compile(position, schema, registry)?;
            if !seen.insert(step.id.clone()) {
                return Err(ConfigurationError::DuplicateStep(step.id));
            }
            steps.push(step);
        }

        Ok(Self {
            page: definition.page.trim().to_string(),
            title: definition.title.clone(),
            route,
            steps,
        })
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.page)
    }

    pub fn route(&self) -> &RouteTemplate {
        &self.route
    }

    /// Session key of this wizard's state
    pub fn session_key(&self) -> String {
        format!("wizard_steps-{}", self.page)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Step> {
        self.steps.get(position)
    }

    pub fn find_by_identifier(&self, id: &str) -> Option<(usize, &Step)> {
        self.steps
            .iter()
            .enumerate()
            .find(|(_, step)| step.id == id)
    }

    pub fn next(&self, position: usize) -> Option<&Step> {
        self.steps.get(position + 1)
    }

    pub fn prev(&self, position: usize) -> Option<&Step> {
        position.checked_sub(1).and_then(|p| self.steps.get(p))
    }

    pub fn url_for(&self, step: &Step) -> String {
        self.route.url_for(&step.id)
    }

    /// Furthest existing step not beyond `position`
    pub fn clamp(&self, position: usize) -> &Step {
        let last = self.steps.len() - 1;
        &self.steps[position.min(last)]
    }

    /// Fields stored by any step at or after `position`, except those an
    /// earlier step declares
    pub fn fields_from(&self, position: usize) -> BTreeSet<String> {
        let earlier: BTreeSet<&str> = self
            .steps
            .iter()
            .take(position)
            .flat_map(Step::declared_fields)
            .collect();
        self.steps
            .iter()
            .skip(position)
            .flat_map(Step::stored_fields)
            .filter(|field| !earlier.contains(field.as_str()))
            .collect()
    }

    /// Combined contract of every form of every step before `position`
    pub fn contract_before(&self, position: usize) -> FormSpec {
        let mut contract = FormSpec::default();
        for step in self.steps.iter().take(position) {
            for form in step.forms.values() {
                contract.merge(form);
            }
        }
        contract
    }
}
