//! OpenAPI document, served as JSON at `/api-docs/openapi.json`

use crate::auth::{LoginRequest, LoginResponse, RegisterRequest};
use crate::error::ApiError;
use crate::handlers::{auth, health, patients};
use crate::patients::{
    AddPatientRequest, AddPatientResponse, DeletePatientResponse, PatientDetail, PatientSummary,
    PatientUser, UpdateNotesRequest, UpdatePatientRequest, UpdatePatientResponse,
};
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic API",
        description = "Staff authentication and patient records for a small clinic"
    ),
    paths(
        health::health_check,
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        patients::list_patients,
        patients::get_patient,
        patients::create_patient,
        patients::update_patient,
        patients::update_patient_notes,
        patients::delete_patient,
    ),
    components(schemas(
        ApiError,
        health::HealthResponse,
        auth::UserResponse,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        AddPatientRequest,
        UpdatePatientRequest,
        UpdateNotesRequest,
        PatientSummary,
        PatientDetail,
        PatientUser,
        AddPatientResponse,
        UpdatePatientResponse,
        DeletePatientResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Registration and login"),
        (name = "patients", description = "Patient records"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
