use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Session, SessionBackend};
use crate::error::WizardError;
use crate::validation::FieldMap;

/// Process-local sessions, lost on restart
#[derive(Debug, Default)]
pub struct MemorySessionBackend {
    sessions: Mutex<HashMap<String, Stored>>,
}

#[derive(Debug)]
struct Stored {
    data: FieldMap,
    saved_at: Instant,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Stored>>, WizardError> {
        self.sessions
            .lock()
            .map_err(|_| WizardError::Session("session store lock poisoned".to_string()))
    }
}

impl SessionBackend for MemorySessionBackend {
    fn load(&self, id: &str) -> Result<Session, WizardError> {
        let sessions = self.lock()?;
        Ok(match sessions.get(id) {
            Some(stored) => Session::with_data(id, stored.data.clone()),
            None => Session::new(id),
        })
    }

    fn save(&self, session: &Session) -> Result<(), WizardError> {
        self.lock()?.insert(
            session.id().to_string(),
            Stored {
                data: session.data().clone(),
                saved_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn forget(&self, id: &str) -> Result<(), WizardError> {
        self.lock()?.remove(id);
        Ok(())
    }

    fn purge_idle(&self, max_idle: Duration) -> Result<usize, WizardError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.saved_at.elapsed() < max_idle);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_and_load() {
        let backend = MemorySessionBackend::new();
        let mut session = backend.load("s1").unwrap();
        assert!(session.data().is_empty());

        session.set("wizard_steps-signup", json!({"stepCurrent": 1}));
        backend.save(&session).unwrap();

        let loaded = backend.load("s1").unwrap();
        assert_eq!(
            loaded.get("wizard_steps-signup", json!(null)),
            json!({"stepCurrent": 1})
        );
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn test_forget() {
        let backend = MemorySessionBackend::new();
        let mut session = Session::new("s1");
        session.set("k", json!(1));
        backend.save(&session).unwrap();

        backend.forget("s1").unwrap();
        assert!(backend.load("s1").unwrap().data().is_empty());
    }

    #[test]
    fn test_purge_idle() {
        let backend = MemorySessionBackend::new();
        let mut session = Session::new("s1");
        session.set("k", json!(1));
        backend.save(&session).unwrap();

        assert_eq!(backend.purge_idle(Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(backend.purge_idle(Duration::ZERO).unwrap(), 1);
        assert!(backend.load("s1").unwrap().data().is_empty());
    }
}
