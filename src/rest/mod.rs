//! HTTP boundary for the wizard engine.
//!
//! Serves every loaded wizard at its own route plus a small JSON API for
//! inspecting the loaded definitions.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;

pub use openapi::ApiDoc;
pub use state::ApiState;

/// Build the router with the API and every wizard page
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Health endpoints
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/status", get(routes::health::status))
        // Wizard endpoints
        .route("/api/v1/wizards", get(routes::wizards::list))
        .route("/api/v1/wizards/:page", get(routes::wizards::get_one))
        .route(
            "/api/v1/wizards/:page/steps/:step",
            get(routes::wizards::get_step),
        )
        .route("/api/v1/openapi.json", get(openapi::spec))
        .with_state(state.clone());

    for graph in state.registry.iter() {
        tracing::debug!("Mounting wizard '{}' at {}", graph.page(), graph.route().as_str());
        router = router.merge(routes::pages::router(state.clone(), Arc::clone(graph)));
    }

    router.layer(TraceLayer::new_for_http()).layer(cors)
}

/// Upper bound between two idle-session sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Periodically purge idle sessions; `None` when the timeout is zero
pub fn spawn_session_sweeper(state: &ApiState) -> Option<tokio::task::JoinHandle<()>> {
    let max_idle = Duration::from_secs(state.config.session.idle_timeout_secs);
    if max_idle.is_zero() {
        return None;
    }
    let sessions = Arc::clone(&state.sessions);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(max_idle.min(SWEEP_INTERVAL));
        loop {
            ticker.tick().await;
            match sessions.purge_idle(max_idle) {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Purged {} idle sessions", purged),
                Err(e) => tracing::warn!("Session sweep failed: {}", e),
            }
        }
    }))
}

/// Serve until Ctrl-C
pub async fn serve(state: ApiState, addr: &str) -> Result<()> {
    let sweeper = spawn_session_sweeper(&state);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Wizard server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::steps::WizardRegistry;

    #[test]
    fn test_build_router() {
        let state = ApiState::new(Config::default(), WizardRegistry::new()).unwrap();
        let _router = build_router(state);
    }

    #[tokio::test]
    async fn test_session_sweeper_disabled_by_zero_timeout() {
        let mut config = Config::default();
        config.session.idle_timeout_secs = 0;
        let state = ApiState::new(config, WizardRegistry::new()).unwrap();
        assert!(spawn_session_sweeper(&state).is_none());

        let state = ApiState::new(Config::default(), WizardRegistry::new()).unwrap();
        let sweeper = spawn_session_sweeper(&state).expect("sweeper runs by default");
        sweeper.abort();
    }
}
