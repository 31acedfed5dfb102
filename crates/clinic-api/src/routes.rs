//! API route definitions
//!
//! Every route that reads `AuthenticatedUser` is composed under
//! `auth_middleware`; role-restricted groups add `require_roles` inside it.

use crate::auth::middleware::{auth_middleware, require_roles, DOCTOR_ONLY, RECEPTIONIST_ONLY};
use crate::handlers::{auth, health, patients};
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Routes mounted under `/api`
pub fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler));

    let receptionist_routes = Router::new()
        .route("/patients", post(patients::create_patient))
        .route(
            "/patients/:id",
            put(patients::update_patient).delete(patients::delete_patient),
        )
        .route_layer(middleware::from_fn(require_roles(RECEPTIONIST_ONLY)));

    let doctor_routes = Router::new()
        .route("/patients/:id/notes", patch(patients::update_patient_notes))
        .route_layer(middleware::from_fn(require_roles(DOCTOR_ONLY)));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route("/patients", get(patients::list_patients))
        .route("/patients/:id", get(patients::get_patient))
        .merge(receptionist_routes)
        .merge(doctor_routes)
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// CORS policy for the configured browser origins
///
/// With no origins configured any origin is allowed, without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(allowed).allow_credentials(true)
    }
}
