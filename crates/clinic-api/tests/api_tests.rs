//! API Integration Tests
//!
//! The router runs against the in-memory store. Tests marked with #[ignore]
//! require PostgreSQL: set TEST_DATABASE_URL and run `cargo test -- --ignored`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use clinic_api::{auth::PasswordConfig, create_router, state::AppState};
use clinic_core::config::AppConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_state(AppState::in_memory(test_config()))
    }

    fn with_state(state: AppState) -> Self {
        let state = state.with_password_config(PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        });
        Self {
            router: create_router(Arc::new(state)),
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let request = match body {
            Some(json_body) => builder
                .body(Body::from(serde_json::to_string(&json_body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    async fn register(&self, username: &str, password: &str, role: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/register",
            None,
            Some(json!({ "username": username, "password": password, "role": role })),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register and log in, returning the `Authorization` header value
    async fn bearer_for(&self, username: &str, role: &str) -> String {
        let (status, _) = self.register(username, "secret1", role).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self.login(username, "secret1").await;
        assert_eq!(status, StatusCode::OK);
        format!("Bearer {}", body["data"]["token"].as_str().unwrap())
    }

    async fn create_patient(&self, bearer: &str, name: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/patients",
                Some(bearer),
                Some(json!({ "name": name, "age": 34, "gender": "female", "phone": "555-0100" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config
}

fn error_of(body: &Value) -> &str {
    assert_eq!(body["success"], false);
    body["error"].as_str().unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/patients/{id}/notes"].is_object());
}

// =============================================================================
// Account Tests
// =============================================================================

#[tokio::test]
async fn test_register_returns_public_identity() {
    let app = TestApp::new();

    let (status, body) = app.register("drjane", "secret1", "doctor").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "drjane");
    assert_eq!(body["data"]["role"], "doctor");
    assert!(body["data"]["id"].is_string());
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_unknown_role() {
    let app = TestApp::new();

    let (status, body) = app.register("mallory", "secret1", "admin").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    error_of(&body);
}

#[tokio::test]
async fn test_register_rejects_short_fields() {
    let app = TestApp::new();

    let (status, _) = app.register("jo", "secret1", "doctor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.register("drjane", "12345", "doctor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = TestApp::new();

    app.register("drjane", "secret1", "doctor").await;
    let (status, body) = app.register("drjane", "secret2", "receptionist").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_of(&body), "Username already exists");
}

#[tokio::test]
async fn test_login_does_not_reveal_which_part_was_wrong() {
    let app = TestApp::new();
    app.register("drjane", "secret1", "doctor").await;

    let (wrong_password_status, wrong_password) = app.login("drjane", "secret2").await;
    let (unknown_user_status, unknown_user) = app.login("nobody", "secret1").await;

    assert_eq!(wrong_password_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(error_of(&wrong_password), "Invalid credentials");
}

#[tokio::test]
async fn test_login_with_empty_fields_is_bad_request() {
    let app = TestApp::new();
    app.register("drjane", "secret1", "doctor").await;

    let (status, body) = app.login("drjane", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app.login("", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_returns_token_identity() {
    let app = TestApp::new();
    let bearer = app.bearer_for("front_desk", "receptionist").await;

    let (status, body) = app.send("GET", "/api/me", Some(&bearer), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "front_desk");
    assert_eq!(body["data"]["role"], "receptionist");
}

// =============================================================================
// Access Gate Tests
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_header() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api/patients", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(&body), "Authorization header is required");
}

#[tokio::test]
async fn test_basic_scheme_is_malformed() {
    let app = TestApp::new();

    let (status, body) = app
        .send("GET", "/api/patients", Some("Basic abc123"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(&body), "Invalid authorization format");
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let app = TestApp::new();
    let bearer = app.bearer_for("drjane", "doctor").await;

    // Flip the last signature character
    let mut tampered = bearer.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let (status, body) = app.send("GET", "/api/patients", Some(&tampered), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(&body), "Invalid or expired token");
}

#[tokio::test]
async fn test_token_from_another_deployment_is_rejected() {
    let app = TestApp::new();

    let mut other_config = test_config();
    other_config.auth.jwt_secret = "some-other-secret".to_string();
    let other = TestApp::with_state(AppState::in_memory(other_config));
    let foreign = other.bearer_for("drjane", "doctor").await;

    let (status, body) = app.send("GET", "/api/me", Some(&foreign), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(&body), "Invalid or expired token");
}

#[tokio::test]
async fn test_doctor_cannot_use_receptionist_routes() {
    let app = TestApp::new();
    let receptionist = app.bearer_for("front_desk", "receptionist").await;
    let doctor = app.bearer_for("drjane", "doctor").await;
    let id = app.create_patient(&receptionist, "Alice Smith").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/patients",
            Some(&doctor),
            Some(json!({ "name": "Bob Jones", "age": 50, "gender": "male" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_of(&body), "Forbidden: insufficient permissions");

    let (status, _) = app
        .send("DELETE", &format!("/api/patients/{id}"), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/patients/{id}"),
            Some(&doctor),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_receptionist_cannot_edit_notes() {
    let app = TestApp::new();
    let receptionist = app.bearer_for("front_desk", "receptionist").await;
    let id = app.create_patient(&receptionist, "Alice Smith").await;

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/api/patients/{id}/notes"),
            Some(&receptionist),
            Some(json!({ "medicalNotes": "self-diagnosed" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_of(&body), "Forbidden: insufficient permissions");
}

// =============================================================================
// Patient Tests
// =============================================================================

#[tokio::test]
async fn test_doctor_workflow_end_to_end() {
    let app = TestApp::new();
    let receptionist = app.bearer_for("front_desk", "receptionist").await;

    let (status, _) = app.register("drjane", "secret1", "doctor").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, login) = app.login("drjane", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    let doctor = format!("Bearer {}", login["data"]["token"].as_str().unwrap());

    let (_, me) = app.send("GET", "/api/me", Some(&doctor), None).await;
    assert_eq!(me["data"]["role"], "doctor");

    let id = app.create_patient(&receptionist, "Alice Smith").await;

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/api/patients/{id}/notes"),
            Some(&doctor),
            Some(json!({ "medicalNotes": "Allergic to penicillin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["updatedBy"], "drjane");

    let (status, body) = app
        .send("GET", &format!("/api/patients/{id}"), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let patient = &body["data"];
    assert_eq!(patient["medicalNotes"], "Allergic to penicillin");
    assert_eq!(patient["createdBy"]["username"], "front_desk");
    assert_eq!(patient["createdBy"]["role"], "receptionist");
    assert_eq!(patient["updatedBy"]["username"], "drjane");
    assert_eq!(patient["updatedBy"]["role"], "doctor");
}

#[tokio::test]
async fn test_receptionist_crud() {
    let app = TestApp::new();
    let receptionist = app.bearer_for("front_desk", "receptionist").await;

    let id = app.create_patient(&receptionist, "Alice Smith").await;
    app.create_patient(&receptionist, "Bob Jones").await;

    let (status, body) = app
        .send("GET", "/api/patients", Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/patients/{id}"),
            Some(&receptionist),
            Some(json!({ "age": 35, "address": "12 Elm Street" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["updatedBy"], "front_desk");

    let (_, body) = app
        .send("GET", &format!("/api/patients/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(body["data"]["age"], 35);
    assert_eq!(body["data"]["address"], "12 Elm Street");
    assert_eq!(body["data"]["phone"], "555-0100");
    assert_eq!(body["data"]["name"], "Alice Smith");

    let (status, body) = app
        .send("DELETE", &format!("/api/patients/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = app
        .send("GET", &format!("/api/patients/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Patient not found");
}

#[tokio::test]
async fn test_create_patient_validation() {
    let app = TestApp::new();
    let receptionist = app.bearer_for("front_desk", "receptionist").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/patients",
            Some(&receptionist),
            Some(json!({ "name": "Al", "age": 200, "gender": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    error_of(&body);
}

#[tokio::test]
async fn test_malformed_patient_id() {
    let app = TestApp::new();
    let doctor = app.bearer_for("drjane", "doctor").await;

    let (status, body) = app
        .send("GET", "/api/patients/not-a-uuid", Some(&doctor), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Invalid patient ID");
}

// =============================================================================
// PostgreSQL Tests
// =============================================================================

#[tokio::test]
#[ignore = "requires database"]
async fn test_postgres_register_login_and_notes() {
    let mut config = test_config();
    config.database.url = Some(
        std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set"),
    );

    let state = AppState::connect(config).await.unwrap();
    let app = TestApp::with_state(state);

    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    let receptionist = app
        .bearer_for(&format!("desk_{suffix}"), "receptionist")
        .await;
    let doctor = app.bearer_for(&format!("doc_{suffix}"), "doctor").await;

    let id = app.create_patient(&receptionist, "Dana Grey").await;

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/patients/{id}/notes"),
            Some(&doctor),
            Some(json!({ "medicalNotes": "Follow up in two weeks" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send("GET", &format!("/api/patients/{id}"), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updatedBy"]["username"], format!("doc_{suffix}"));

    let (status, _) = app
        .send("DELETE", &format!("/api/patients/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
