//! Session cookie handling for wizard pages.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::error::WizardError;
use crate::rest::state::ApiState;
use crate::session::{is_valid_session_id, Session};

/// Value of cookie `name` in the request headers
pub fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// `Set-Cookie` value issuing session `id`
pub fn set_cookie(name: &str, id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, id)).ok()
}

/// Session of the request, and whether a new one had to be issued
pub fn load(state: &ApiState, headers: &HeaderMap) -> Result<(Session, bool), WizardError> {
    match cookie_value(headers, state.cookie_name()).filter(|id| is_valid_session_id(id)) {
        Some(id) => Ok((state.sessions.load(id)?, false)),
        None => Ok((Session::generate(), true)),
    }
}

/// Persist the session if the request changed it; an emptied session is
/// removed from the store
pub fn save(state: &ApiState, session: &mut Session) -> Result<(), WizardError> {
    if !session.is_dirty() {
        return Ok(());
    }
    if session.data().is_empty() {
        state.sessions.forget(session.id())?;
    } else {
        state.sessions.save(session)?;
    }
    session.mark_clean();
    Ok(())
}
