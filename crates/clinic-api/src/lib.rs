//! Clinic API - REST server for staff accounts and patient records
//!
//! Provides HTTP endpoints for registration, login and role-gated patient
//! CRUD. Receptionists manage patient details; doctors update medical notes.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod patients;
pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Build the application router over shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = routes::cors_layer(&state.config.server.cors_origins);

    Router::new()
        .nest("/api", routes::api_routes(&state))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
