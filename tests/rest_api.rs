//! Integration tests for the HTTP boundary
//!
//! Requests are driven through the full router with `tower::ServiceExt::oneshot`;
//! the session cookie issued on the first response is replayed on later ones.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use wizard::config::{Config, SessionBackendKind};
use wizard::rest::{build_router, ApiState};
use wizard::steps::WizardRegistry;
use wizard::validation::ExtraValidatorRegistry;

// ─── Test Context ─────────────────────────────────────────────────────────────

const SIGNUP: &str = r#"
route: /signup/:step?
title: Sign up
steps:
  - step: a
    name: Name
    forms:
      onSubmit:
        validation: { name: required }
  - step: b
    name: Email
    forms:
      onSubmit:
        validation: { email: "required|email" }
"#;

struct TestContext {
    temp_dir: TempDir,
    router: Router,
}

impl TestContext {
    fn new(backend: SessionBackendKind) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let definitions = temp_dir.path().join("wizards");
        std::fs::create_dir_all(&definitions).unwrap();
        std::fs::write(definitions.join("signup.yaml"), SIGNUP).unwrap();

        let mut config = Config::default();
        config.paths.definitions = definitions.to_string_lossy().to_string();
        config.paths.state = temp_dir.path().join("state").to_string_lossy().to_string();
        config.session.backend = backend;

        let registry = WizardRegistry::load_dir(
            &config.definitions_path(),
            &ExtraValidatorRegistry::with_builtins(),
        )
        .unwrap();
        let state = ApiState::new(config, registry).unwrap();

        Self {
            temp_dir,
            router: build_router(state),
        }
    }

    fn stored_sessions(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path().join("state").join("sessions"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, cookie: Option<&str>, body: Value, ajax: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Wizard-Handler", "signupWizard::onSubmit");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if ajax {
        builder = builder.header("X-Requested-With", "XMLHttpRequest");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie issued")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_wizard_listing() {
    let ctx = TestContext::new(SessionBackendKind::Memory);

    let response = ctx.send(get("/api/v1/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let response = ctx.send(get("/api/v1/wizards", None)).await;
    let json = body_json(response).await;
    assert_eq!(json[0]["page"], "signup");
    assert_eq!(json[0]["step_count"], 2);

    let response = ctx.send(get("/api/v1/wizards/signup", None)).await;
    let json = body_json(response).await;
    assert_eq!(json["session_key"], "wizard_steps-signup");

    let response = ctx.send(get("/api/v1/wizards/nope", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let ctx = TestContext::new(SessionBackendKind::Memory);
    let response = ctx.send(get("/api/v1/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["info"]["title"], "Wizard API");
}

// ─── Wizard Pages ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_page_without_step_redirects_to_first() {
    let ctx = TestContext::new(SessionBackendKind::Memory);
    let response = ctx.send(get("/signup", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signup/a");
}

#[tokio::test]
async fn test_full_flow_over_http() {
    let ctx = TestContext::new(SessionBackendKind::Memory);

    let response = ctx.send(get("/signup/a", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("wizard_session="));
    let view = body_json(response).await;
    assert_eq!(view["stepCurrent"], "a");
    assert_eq!(view["stepNext"], "/signup/b");

    // Skip ahead is bounced back
    let response = ctx.send(get("/signup/b", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signup/a");

    // Invalid submission
    let response = ctx
        .send(post("/signup/a", Some(&cookie), json!({}), true))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_failed");
    assert!(json["errors"]["name"].is_array());

    // Valid ajax submission returns the payload
    let response = ctx
        .send(post("/signup/a", Some(&cookie), json!({"name": "Ann"}), true))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Ann");
    assert_eq!(json["stepNext"], "/signup/b");
    assert_eq!(json["return"], Value::Null);

    // Non-ajax final submission answers with JSON since there is no next step
    let response = ctx
        .send(post(
            "/signup/b",
            Some(&cookie),
            json!({"email": "ann@example.com"}),
            false,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stepNext"], Value::Null);

    // Viewing the final step shows everything, then clears the wizard
    let response = ctx.send(get("/signup/b", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["fields"]["name"], "Ann");
    assert_eq!(view["fields"]["email"], "ann@example.com");

    let response = ctx.send(get("/signup/b", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signup/a");
}

#[tokio::test]
async fn test_ajax_redirect_is_json() {
    let ctx = TestContext::new(SessionBackendKind::Memory);
    let response = ctx
        .send(post("/signup/b", None, json!({"email": "a@b.co"}), true))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"redirect": "/signup/a"}));
}

#[tokio::test]
async fn test_non_ajax_submission_redirects_to_next_step() {
    let ctx = TestContext::new(SessionBackendKind::Memory);
    let response = ctx.send(get("/signup/a", None)).await;
    let cookie = session_cookie(&response);

    let response = ctx
        .send(post("/signup/a", Some(&cookie), json!({"name": "Ann"}), false))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signup/b");
}

#[tokio::test]
async fn test_urlencoded_submission() {
    let ctx = TestContext::new(SessionBackendKind::Memory);
    let response = ctx.send(get("/signup/a", None)).await;
    let cookie = session_cookie(&response);

    let request = Request::builder()
        .method("POST")
        .uri("/signup/a")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, &cookie)
        .header("X-Requested-With", "XMLHttpRequest")
        .body(Body::from("name=Ann"))
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Ann");
}

#[tokio::test]
async fn test_unknown_handler_is_bad_request() {
    let ctx = TestContext::new(SessionBackendKind::Memory);
    let request = Request::builder()
        .method("POST")
        .uri("/signup/a")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Wizard-Handler", "onMissing")
        .body(Body::from(r#"{"name": "Ann"}"#))
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_file_sessions_persist_between_requests() {
    let ctx = TestContext::new(SessionBackendKind::File);
    let response = ctx.send(get("/signup/a", None)).await;
    let cookie = session_cookie(&response);

    ctx.send(post("/signup/a", Some(&cookie), json!({"name": "Ann"}), true))
        .await;

    let response = ctx.send(get("/signup/b", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_completed_wizard_leaves_no_stored_session() {
    let ctx = TestContext::new(SessionBackendKind::File);
    let response = ctx.send(get("/signup/a", None)).await;
    let cookie = session_cookie(&response);

    ctx.send(post("/signup/a", Some(&cookie), json!({"name": "Ann"}), true))
        .await;
    ctx.send(post("/signup/b", Some(&cookie), json!({"email": "a@b.co"}), true))
        .await;
    assert_eq!(ctx.stored_sessions(), 1);

    // Rendering the final step clears the wizard and with it the session
    let response = ctx.send(get("/signup/b", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.stored_sessions(), 0);
}
