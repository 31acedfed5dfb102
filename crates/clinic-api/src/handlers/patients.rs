//! Patient record handlers
//!
//! Reads are open to any authenticated user. Create, update and delete are
//! mounted behind the receptionist allow-list, the notes update behind the
//! doctor allow-list.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResponse, AppError};
use crate::patients::{
    AddPatientRequest, AddPatientResponse, DeletePatientResponse, PatientDetail, PatientSummary,
    UpdateNotesRequest, UpdatePatientRequest, UpdatePatientResponse,
};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

fn patient_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Invalid patient ID".to_string()))
}

/// List all patients
#[utoipa::path(
    get,
    path = "/api/patients",
    tag = "patients",
    responses(
        (status = 200, description = "All patients, oldest first", body = [PatientSummary]),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let patients = state.patients.list().await?;
    Ok(Json(ApiResponse::ok(patients)))
}

/// Get a patient with the users who created and last updated it
#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient record", body = PatientDetail),
        (status = 400, description = "Malformed patient ID", body = ApiError),
        (status = 404, description = "Patient not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = patient_id(path)?;
    let patient = state.patients.get(id).await?;
    Ok(Json(ApiResponse::ok(patient)))
}

/// Add a patient (receptionist only)
#[utoipa::path(
    post,
    path = "/api/patients",
    tag = "patients",
    request_body = AddPatientRequest,
    responses(
        (status = 201, description = "Patient created", body = AddPatientResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 403, description = "Caller is not a receptionist", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    payload: Result<Json<AddPatientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let created = state.patients.create(request, &user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// Update patient details (receptionist only)
#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = Uuid, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = UpdatePatientResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 403, description = "Caller is not a receptionist", body = ApiError),
        (status = 404, description = "Patient not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePatientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = patient_id(path)?;
    let Json(request) = payload?;
    let updated = state.patients.update(id, request, &user).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// Replace a patient's medical notes (doctor only)
#[utoipa::path(
    patch,
    path = "/api/patients/{id}/notes",
    tag = "patients",
    params(("id" = Uuid, Path, description = "Patient ID")),
    request_body = UpdateNotesRequest,
    responses(
        (status = 200, description = "Notes updated", body = UpdatePatientResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 403, description = "Caller is not a doctor", body = ApiError),
        (status = 404, description = "Patient not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_patient_notes(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateNotesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = patient_id(path)?;
    let Json(request) = payload?;
    let updated = state.patients.update_notes(id, request, &user).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// Delete a patient (receptionist only)
#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient deleted", body = DeletePatientResponse),
        (status = 403, description = "Caller is not a receptionist", body = ApiError),
        (status = 404, description = "Patient not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = patient_id(path)?;
    let deleted = state.patients.delete(id, &user).await?;
    Ok(Json(ApiResponse::ok(deleted)))
}
