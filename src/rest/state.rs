//! API state management for the REST server.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, SessionBackendKind};
use crate::session::{FileSessionBackend, MemorySessionBackend, SessionBackend};
use crate::steps::WizardRegistry;

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    /// Compiled wizards, immutable once loaded
    pub registry: Arc<WizardRegistry>,
    /// Session persistence
    pub sessions: Arc<dyn SessionBackend>,
    pub config: Arc<Config>,
}

impl ApiState {
    /// Create state with the session backend named in the config
    pub fn new(config: Config, registry: WizardRegistry) -> Result<Self> {
        let sessions: Arc<dyn SessionBackend> = match config.session.backend {
            SessionBackendKind::Memory => Arc::new(MemorySessionBackend::new()),
            SessionBackendKind::File => Arc::new(
                FileSessionBackend::new(config.sessions_path())
                    .context("Failed to create session directory")?,
            ),
        };
        Ok(Self::with_sessions(config, registry, sessions))
    }

    pub fn with_sessions(
        config: Config,
        registry: WizardRegistry,
        sessions: Arc<dyn SessionBackend>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions,
            config: Arc::new(config),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.session.cookie_name
    }
}
