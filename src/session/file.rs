use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use super::{is_valid_session_id, Session, SessionBackend};
use crate::error::WizardError;
use crate::validation::FieldMap;

/// One JSON file per session under a directory
#[derive(Debug, Clone)]
pub struct FileSessionBackend {
    dir: PathBuf,
}

impl FileSessionBackend {
    /// Create the backend, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, WizardError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, WizardError> {
        if !is_valid_session_id(id) {
            return Err(WizardError::Session(format!("invalid session id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

impl SessionBackend for FileSessionBackend {
    fn load(&self, id: &str) -> Result<Session, WizardError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(Session::new(id));
        }

        let contents = fs::read_to_string(&path)?;
        match serde_json::from_str::<FieldMap>(&contents) {
            Ok(data) => Ok(Session::with_data(id, data)),
            Err(e) => {
                warn!("Discarding unreadable session file {}: {}", path.display(), e);
                Ok(Session::new(id))
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), WizardError> {
        let path = self.path_for(session.id())?;
        let contents = serde_json::to_string_pretty(session.data())?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn forget(&self, id: &str) -> Result<(), WizardError> {
        let path = self.path_for(id)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Idle time is measured from the file's modification time
    fn purge_idle(&self, max_idle: Duration) -> Result<usize, WizardError> {
        let now = SystemTime::now();
        let mut purged = 0;

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let idle = fs::metadata(&path)?
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if idle >= max_idle {
                debug!("Purging idle session file {}", path.display());
                fs::remove_file(&path)?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let backend = FileSessionBackend::new(dir.path().join("sessions")).unwrap();

        let mut session = Session::new("abc-123");
        session.set("wizard_steps-quote", json!({"stepCurrent": 2, "validations": {}}));
        backend.save(&session).unwrap();

        assert!(dir.path().join("sessions/abc-123.json").exists());
        let loaded = backend.load("abc-123").unwrap();
        assert_eq!(loaded.data(), session.data());
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let dir = TempDir::new().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        let session = backend.load("nobody").unwrap();
        assert_eq!(session.id(), "nobody");
        assert!(session.data().is_empty());
    }

    #[test]
    fn test_corrupt_file_yields_empty_session() {
        let dir = TempDir::new().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        assert!(backend.load("broken").unwrap().data().is_empty());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        assert!(matches!(
            backend.load("../escape"),
            Err(WizardError::Session(_))
        ));
    }

    #[test]
    fn test_forget_removes_file() {
        let dir = TempDir::new().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        let mut session = Session::new("gone");
        session.set("k", json!(true));
        backend.save(&session).unwrap();

        backend.forget("gone").unwrap();
        assert!(!dir.path().join("gone.json").exists());
        backend.forget("gone").unwrap();
    }

    #[test]
    fn test_purge_idle_removes_stale_files() {
        let dir = TempDir::new().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        let mut session = Session::new("idle");
        session.set("k", json!(1));
        backend.save(&session).unwrap();
        fs::write(dir.path().join("notes.txt"), "kept").unwrap();

        assert_eq!(backend.purge_idle(Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(backend.purge_idle(Duration::ZERO).unwrap(), 1);
        assert!(!dir.path().join("idle.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
