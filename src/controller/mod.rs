//! Request-level wizard flow
//!
//! The controller resolves the requested step, checks it against the stored
//! watermark, validates and persists, then tells the boundary what to do
//! next. It only ever touches the [`Session`] it is handed; loading and saving
//! that session is the caller's job.

mod navigation;

pub use navigation::{Navigation, StepLink, StepView};

use serde_json::Value;
use tracing::debug;

use crate::error::WizardError;
use crate::session::Session;
use crate::state::WizardState;
use crate::steps::{FormSpec, Step, StepGraph};
use crate::validation::{self, FieldErrors, FieldMap, ValidationOutcome, Validated};

/// What the boundary should do with a request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send the user to another step
    Redirect(String),
    /// Submitted data was rejected; nothing was persisted
    ValidationFailed(FieldErrors),
    /// Step validated and recorded
    Submitted(Submission),
    /// Step may be shown
    Rendered(StepView),
}

/// Result of a successful step submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Accumulated fields after the extra validators ran
    pub fields: FieldMap,
    pub step_next: Option<String>,
    /// Output of the last extra validator
    pub returned: Option<FieldMap>,
}

impl Submission {
    /// Flat response body: fields, `stepNext` and `return`
    pub fn payload(&self) -> FieldMap {
        let mut payload = self.fields.clone();
        payload.insert(
            "stepNext".to_string(),
            self.step_next.clone().map_or(Value::Null, Value::String),
        );
        payload.insert(
            "return".to_string(),
            self.returned.clone().map_or(Value::Null, Value::Object),
        );
        payload
    }
}

/// Early exit from a flow
enum Interrupt {
    Exit(Outcome),
    Fail(WizardError),
}

impl From<WizardError> for Interrupt {
    fn from(err: WizardError) -> Self {
        Interrupt::Fail(err)
    }
}

impl From<Outcome> for Interrupt {
    fn from(outcome: Outcome) -> Self {
        Interrupt::Exit(outcome)
    }
}

type Flow<T> = Result<T, Interrupt>;

/// Form handler name from a header value such as `wizard::onSubmit`
pub fn handler_name(raw: &str) -> &str {
    raw.rsplit("::").next().unwrap_or(raw).trim()
}

/// Drives one wizard page
#[derive(Debug, Clone, Copy)]
pub struct WizardController<'a> {
    graph: &'a StepGraph,
}

impl<'a> WizardController<'a> {
    pub fn new(graph: &'a StepGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &StepGraph {
        self.graph
    }

    /// Handle a page visit for `step`
    pub fn render(&self, step: Option<&str>, session: &mut Session) -> Outcome {
        let key = self.graph.session_key();
        let original = WizardState::load(session, &key);
        let mut state = original.clone();

        match self.render_flow(step, &mut state) {
            Ok(view) => {
                persist(session, &key, &state, &original);
                Outcome::Rendered(view)
            }
            Err(outcome) => outcome,
        }
    }

    /// Handle a form submission for `step`
    pub fn submit(
        &self,
        step: Option<&str>,
        handler: Option<&str>,
        data: &FieldMap,
        session: &mut Session,
    ) -> Result<Outcome, WizardError> {
        let key = self.graph.session_key();
        let original = WizardState::load(session, &key);
        let mut state = original.clone();

        match self.submit_flow(step, handler, data, &mut state) {
            Ok(submission) => {
                persist(session, &key, &state, &original);
                Ok(Outcome::Submitted(submission))
            }
            Err(Interrupt::Exit(outcome)) => Ok(outcome),
            Err(Interrupt::Fail(err)) => Err(err),
        }
    }

    fn render_flow(&self, step: Option<&str>, state: &mut WizardState) -> Result<StepView, Outcome> {
        let (position, step) = self.resolve(step, state)?;

        if position == 0 {
            state.reset();
        }
        self.authorize(position, state)?;
        let prev_validations_data = self.replay_previous(step, state)?;

        let navigation = Navigation::resolve(self.graph, position);
        let view = StepView {
            step_current: step.id.clone(),
            steps: StepLink::all(self.graph),
            fields: state.validations.clone(),
            prev_validations_data,
            navigation,
        };

        if view.navigation.step_next.is_some() {
            state.prune_from(position, self.graph);
        } else if !step.keep_session {
            debug!(page = self.graph.page(), "final step reached, clearing wizard");
            state.reset();
        }

        Ok(view)
    }

    fn submit_flow(
        &self,
        step: Option<&str>,
        handler: Option<&str>,
        data: &FieldMap,
        state: &mut WizardState,
    ) -> Flow<Submission> {
        let (position, step) = self.resolve(step, state)?;
        self.authorize(position, state)?;
        let mut accumulator = self.replay_previous(step, state)?;

        let validated = match resolve_form(step, handler)? {
            Some(form) => {
                for field in form.ruleset.stored_fields() {
                    if let Some(value) = data.get(&field) {
                        accumulator.insert(field, value.clone());
                    }
                }
                match validate_form(form, data, &state.validations, accumulator) {
                    ValidationOutcome::Valid(validated) => validated,
                    ValidationOutcome::Invalid(errors) => {
                        debug!(step = %step.id, fields = errors.len(), "step validation failed");
                        return Err(Outcome::ValidationFailed(errors).into());
                    }
                }
            }
            None => Validated {
                fields: accumulator,
                returned: None,
            },
        };

        state.record_step_validated(position, &validated.fields);

        Ok(Submission {
            step_next: self.graph.next(position).map(|s| self.graph.url_for(s)),
            fields: validated.fields,
            returned: validated.returned,
        })
    }

    /// Map the step parameter to a position, redirecting when it cannot be used
    fn resolve(&self, step: Option<&str>, state: &WizardState) -> Result<(usize, &'a Step), Outcome> {
        let Some(id) = step.filter(|id| !id.is_empty()) else {
            return Err(self.redirect(self.first_url()));
        };
        match self.graph.find_by_identifier(id) {
            Some(found) => Ok(found),
            None => {
                debug!(page = self.graph.page(), step = id, "unknown step");
                Err(self.redirect(self.authorized_url(state)))
            }
        }
    }

    fn authorize(&self, position: usize, state: &WizardState) -> Result<(), Outcome> {
        if state.is_authorized(position) {
            return Ok(());
        }
        debug!(
            page = self.graph.page(),
            position,
            step_current = state.step_current,
            "step not yet reachable"
        );
        Err(self.redirect(self.authorized_url(state)))
    }

    /// Re-validate every earlier step when the step asks for it; otherwise
    /// hand back the stored values
    fn replay_previous(&self, step: &Step, state: &WizardState) -> Result<FieldMap, Outcome> {
        if !step.validate_prev_steps {
            return Ok(state.validations.clone());
        }

        let contract = self.graph.contract_before(step.position);
        let outcome = validation::validate_with(
            &state.validations,
            &contract.ruleset,
            &contract.messages,
            &contract.extras,
            state.validations.clone(),
        );
        match outcome {
            ValidationOutcome::Valid(validated) => Ok(validated.fields),
            ValidationOutcome::Invalid(errors) => {
                debug!(
                    page = self.graph.page(),
                    step = %step.id,
                    ?errors,
                    "earlier steps no longer validate, restarting"
                );
                Err(self.redirect(self.first_url()))
            }
        }
    }

    fn redirect(&self, url: String) -> Outcome {
        Outcome::Redirect(url)
    }

    fn first_url(&self) -> String {
        self.graph.url_for(self.graph.clamp(0))
    }

    fn authorized_url(&self, state: &WizardState) -> String {
        self.graph.url_for(self.graph.clamp(state.step_current))
    }
}

/// Pick the form a submission targets
fn resolve_form<'s>(step: &'s Step, handler: Option<&str>) -> Result<Option<&'s FormSpec>, WizardError> {
    if step.forms.is_empty() {
        return Ok(None);
    }

    let unknown = |handler: &str| WizardError::UnknownForm {
        step: step.id.clone(),
        handler: handler.to_string(),
    };

    match handler.map(handler_name).filter(|name| !name.is_empty()) {
        Some(name) => step.form(name).map(Some).ok_or_else(|| unknown(name)),
        None if step.forms.len() == 1 => Ok(step.forms.values().next()),
        None => Err(unknown("")),
    }
}

/// Base rules see only the submission; extra validators also see stored values
fn validate_form(
    form: &FormSpec,
    data: &FieldMap,
    stored: &FieldMap,
    accumulator: FieldMap,
) -> ValidationOutcome {
    let errors = validation::check_rules(data, &form.ruleset, &form.messages);
    if !errors.is_empty() {
        return ValidationOutcome::Invalid(errors);
    }

    let mut merged = stored.clone();
    for (key, value) in data {
        merged.insert(key.clone(), value.clone());
    }
    validation::apply_extras(&merged, &form.ruleset, &form.messages, &form.extras, accumulator)
}

/// Write the state back only if it changed; a cleared state drops the key
fn persist(session: &mut Session, key: &str, state: &WizardState, original: &WizardState) {
    if state == original {
        return;
    }
    if *state == WizardState::default() {
        session.forget(key);
    } else {
        state.store(session, key);
    }
}
