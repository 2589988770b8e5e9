//! Per-user session storage
//!
//! A [`Session`] is a JSON map scoped to one browser session. Backends load it
//! at the start of a request and persist it at the end; last write wins.

mod file;
mod memory;

pub use file::FileSessionBackend;
pub use memory::MemorySessionBackend;

use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use crate::error::WizardError;
use crate::validation::FieldMap;

/// Session data of one user, tracked for changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    id: String,
    data: FieldMap,
    dirty: bool,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: FieldMap::new(),
            dirty: false,
        }
    }

    /// Fresh session with a random id
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_data(id: impl Into<String>, data: FieldMap) -> Self {
        Self {
            id: id.into(),
            data,
            dirty: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &FieldMap {
        &self.data
    }

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.data.get(key).cloned().unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.data.get(&key) != Some(&value) {
            self.data.insert(key, value);
            self.dirty = true;
        }
    }

    pub fn forget(&mut self, key: &str) {
        if self.data.remove(key).is_some() {
            self.dirty = true;
        }
    }

    /// Whether anything changed since load
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Persistence for sessions
pub trait SessionBackend: Send + Sync {
    /// Load a session; unknown ids yield an empty session with that id
    fn load(&self, id: &str) -> Result<Session, WizardError>;

    fn save(&self, session: &Session) -> Result<(), WizardError>;

    fn forget(&self, id: &str) -> Result<(), WizardError>;

    /// Drop sessions not saved within `max_idle`; returns how many went
    fn purge_idle(&self, max_idle: Duration) -> Result<usize, WizardError>;
}

/// Session ids end up in file names, so only a conservative alphabet is allowed
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_with_default() {
        let session = Session::new("abc");
        assert_eq!(session.get("missing", json!({})), json!({}));
    }

    #[test]
    fn test_set_marks_dirty_only_on_change() {
        let mut data = FieldMap::new();
        data.insert("k".to_string(), json!(1));
        let mut session = Session::with_data("abc", data);

        session.set("k", json!(1));
        assert!(!session.is_dirty());

        session.set("k", json!(2));
        assert!(session.is_dirty());
        assert_eq!(session.get("k", Value::Null), json!(2));
    }

    #[test]
    fn test_forget() {
        let mut session = Session::new("abc");
        session.forget("nothing");
        assert!(!session.is_dirty());

        session.set("k", json!("v"));
        session.mark_clean();
        session.forget("k");
        assert!(session.is_dirty());
        assert!(session.data().is_empty());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let session = Session::generate();
        assert!(is_valid_session_id(session.id()));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id(""));
    }
}
