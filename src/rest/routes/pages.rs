//! Wizard page endpoints, mounted at each wizard's own route.
//!
//! `GET` renders a step, `POST` submits its form. Requests carrying
//! `X-Requested-With: XMLHttpRequest` get JSON redirects; everything else gets
//! `303 See Other`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde_json::Value;
use tracing::debug;

use crate::controller::{Outcome, WizardController};
use crate::rest::dto::RedirectResponse;
use crate::rest::error::ApiError;
use crate::rest::session;
use crate::rest::state::ApiState;
use crate::steps::StepGraph;
use crate::validation::FieldMap;

/// Header naming the form handler, e.g. `wizard::onSubmit`
pub const HANDLER_HEADER: &str = "x-wizard-handler";

/// State of one mounted wizard
#[derive(Clone)]
pub struct PageState {
    pub api: ApiState,
    pub graph: Arc<StepGraph>,
}

/// Routes serving `graph` at its template, with and without the step segment
pub fn router(api: ApiState, graph: Arc<StepGraph>) -> Router {
    let (base, with_step) = graph.route().router_paths();
    Router::new()
        .route(&base, get(render).post(submit))
        .route(&with_step, get(render).post(submit))
        .with_state(PageState { api, graph })
}

pub async fn render(
    State(page): State<PageState>,
    step: Option<Path<String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (mut session, issued) = session::load(&page.api, &headers)?;

    let controller = WizardController::new(&page.graph);
    let outcome = controller.render(step.as_ref().map(|Path(s)| s.as_str()), &mut session);

    session::save(&page.api, &mut session)?;
    Ok(respond(&page, outcome, is_ajax(&headers), issued.then(|| session.id().to_string())))
}

pub async fn submit(
    State(page): State<PageState>,
    step: Option<Path<String>>,
    request: Request,
) -> Result<Response, ApiError> {
    let headers = request.headers().clone();
    let data = read_payload(request).await?;
    let (mut session, issued) = session::load(&page.api, &headers)?;

    let handler = headers
        .get(HANDLER_HEADER)
        .and_then(|value| value.to_str().ok());

    let controller = WizardController::new(&page.graph);
    let outcome = controller.submit(
        step.as_ref().map(|Path(s)| s.as_str()),
        handler,
        &data,
        &mut session,
    )?;

    session::save(&page.api, &mut session)?;
    Ok(respond(&page, outcome, is_ajax(&headers), issued.then(|| session.id().to_string())))
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Flat field map from a JSON or urlencoded body; an empty body is no fields
async fn read_payload(request: Request) -> Result<FieldMap, ApiError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok(pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect());
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FieldMap::new());
    }
    Ok(serde_json::from_slice(&body)?)
}

fn respond(page: &PageState, outcome: Outcome, ajax: bool, issued: Option<String>) -> Response {
    let mut response = match outcome {
        Outcome::Redirect(url) => {
            debug!(page = page.graph.page(), %url, ajax, "redirecting");
            redirect(url, ajax)
        }
        Outcome::ValidationFailed(errors) => ApiError::ValidationFailed(errors).into_response(),
        Outcome::Submitted(submission) => match submission.step_next.clone() {
            Some(next) if !ajax => Redirect::to(&next).into_response(),
            _ => Json(submission.payload()).into_response(),
        },
        Outcome::Rendered(view) => Json(view).into_response(),
    };

    if let Some(cookie) = issued
        .as_deref()
        .and_then(|id| session::set_cookie(page.api.cookie_name(), id))
    {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn redirect(url: String, ajax: bool) -> Response {
    if ajax {
        Json(RedirectResponse { redirect: url }).into_response()
    } else {
        Redirect::to(&url).into_response()
    }
}
