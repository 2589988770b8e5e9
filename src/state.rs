use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::session::Session;
use crate::steps::StepGraph;
use crate::validation::FieldMap;

/// Durable progress of one wizard instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    /// Furthest step the user may visit
    #[serde(rename = "stepCurrent", default)]
    pub step_current: usize,
    /// Accumulated validated field values
    #[serde(default)]
    pub validations: FieldMap,
}

impl WizardState {
    /// Read the state stored under `key`, falling back to empty
    pub fn load(session: &Session, key: &str) -> Self {
        match session.get(key, Value::Null) {
            Value::Null => Self::default(),
            value => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Resetting malformed wizard state '{}': {}", key, e);
                Self::default()
            }),
        }
    }

    pub fn store(&self, session: &mut Session, key: &str) {
        match serde_json::to_value(self) {
            Ok(value) => session.set(key, value),
            Err(e) => warn!("Failed to serialize wizard state '{}': {}", key, e),
        }
    }

    /// Merge `fields` and raise the watermark past `position`
    pub fn record_step_validated(&mut self, position: usize, fields: &FieldMap) {
        for (key, value) in fields {
            self.validations.insert(key.clone(), value.clone());
        }
        self.step_current = self.step_current.max(position + 1);
        debug!(position, step_current = self.step_current, "step validated");
    }

    /// Drop fields of every step at or after `position` and rewind to it
    pub fn prune_from(&mut self, position: usize, graph: &StepGraph) {
        for field in graph.fields_from(position) {
            self.validations.remove(&field);
        }
        self.step_current = position;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_authorized(&self, position: usize) -> bool {
        position <= self.step_current
    }
}
