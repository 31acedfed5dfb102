//! Patient records service
//!
//! Receptionists manage demographics; doctors only touch medical notes. The
//! role split is enforced by the router, this service stamps every write with
//! the acting user.

use crate::audit::{audit_log, AuditEvent};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use clinic_core::{
    NewPatient, Patient, PatientRepository, PatientUpdate, PatientWithUsers, Role, UserPublic,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

// ============================================================================
// Requests
// ============================================================================

/// New patient, as submitted by a receptionist
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddPatientRequest {
    #[validate(length(min = 3, max = 50, message = "name must be 3-50 characters"))]
    pub name: String,
    #[validate(range(min = 0, max = 120, message = "age must be between 0 and 120"))]
    pub age: i32,
    #[validate(length(min = 1, message = "gender is required"))]
    pub gender: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Partial update; omitted fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    #[validate(length(min = 3, max = 50, message = "name must be 3-50 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 120, message = "age must be between 0 and 120"))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub medical_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotesRequest {
    #[validate(length(min = 1, message = "medicalNotes is required"))]
    pub medical_notes: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Patient as listed by `GET /api/patients`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub medical_notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Patient> for PatientSummary {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            name: p.name,
            age: p.age,
            gender: p.gender,
            address: p.address,
            phone: p.phone,
            medical_notes: p.medical_notes,
            created_at: format_timestamp(p.created_at),
            updated_at: format_timestamp(p.updated_at),
        }
    }
}

/// Staff member referenced by a patient record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientUser {
    pub id: Uuid,
    pub username: String,
    #[schema(value_type = String)]
    pub role: Role,
}

impl From<UserPublic> for PatientUser {
    fn from(u: UserPublic) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role,
        }
    }
}

/// Full patient record with its creator and last editor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub medical_notes: String,
    /// `null` if the account no longer exists
    pub created_by: Option<PatientUser>,
    /// `null` if the account no longer exists
    pub updated_by: Option<PatientUser>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PatientWithUsers> for PatientDetail {
    fn from(record: PatientWithUsers) -> Self {
        let p = record.patient;
        Self {
            id: p.id,
            name: p.name,
            age: p.age,
            gender: p.gender,
            address: p.address,
            phone: p.phone,
            medical_notes: p.medical_notes,
            created_by: record.created_by.map(PatientUser::from),
            updated_by: record.updated_by.map(PatientUser::from),
            created_at: format_timestamp(p.created_at),
            updated_at: format_timestamp(p.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddPatientResponse {
    pub id: Uuid,
    /// Username of the creating receptionist
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientResponse {
    pub id: Uuid,
    /// Username of the editing user
    pub updated_by: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletePatientResponse {
    pub id: Uuid,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct PatientService {
    patients: Arc<dyn PatientRepository>,
}

impl PatientService {
    pub fn new(patients: Arc<dyn PatientRepository>) -> Self {
        Self { patients }
    }

    /// Create a patient; notes start empty
    pub async fn create(
        &self,
        request: AddPatientRequest,
        actor: &AuthenticatedUser,
    ) -> Result<AddPatientResponse, AppError> {
        request.validate()?;

        let patient = self
            .patients
            .create(NewPatient {
                name: request.name,
                age: request.age,
                gender: request.gender,
                address: request.address,
                phone: request.phone,
                created_by: actor.id,
            })
            .await?;

        record_change(patient.id, actor, "create");

        Ok(AddPatientResponse {
            id: patient.id,
            created_by: actor.username.clone(),
            created_at: format_timestamp(patient.created_at),
        })
    }

    pub async fn list(&self) -> Result<Vec<PatientSummary>, AppError> {
        let patients = self.patients.get_all().await?;
        Ok(patients.into_iter().map(PatientSummary::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<PatientDetail, AppError> {
        let record = self.patients.get_by_id_with_users(id).await?;
        Ok(PatientDetail::from(record))
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdatePatientRequest,
        actor: &AuthenticatedUser,
    ) -> Result<UpdatePatientResponse, AppError> {
        request.validate()?;

        let update = PatientUpdate {
            name: request.name,
            age: request.age,
            gender: request.gender,
            address: request.address,
            phone: request.phone,
            medical_notes: request.medical_notes,
            updated_by: actor.id,
        };

        let patient = self.patients.update(id, update).await?;
        record_change(patient.id, actor, "update");

        Ok(updated_response(&patient, actor))
    }

    /// Replace the medical notes; nothing else on the record changes
    pub async fn update_notes(
        &self,
        id: Uuid,
        request: UpdateNotesRequest,
        actor: &AuthenticatedUser,
    ) -> Result<UpdatePatientResponse, AppError> {
        request.validate()?;

        let patient = self
            .patients
            .update(id, PatientUpdate::notes(request.medical_notes, actor.id))
            .await?;
        record_change(patient.id, actor, "update_notes");

        Ok(updated_response(&patient, actor))
    }

    pub async fn delete(
        &self,
        id: Uuid,
        actor: &AuthenticatedUser,
    ) -> Result<DeletePatientResponse, AppError> {
        self.patients.delete(id).await?;
        record_change(id, actor, "delete");

        Ok(DeletePatientResponse { id })
    }
}

fn updated_response(patient: &Patient, actor: &AuthenticatedUser) -> UpdatePatientResponse {
    UpdatePatientResponse {
        id: patient.id,
        updated_by: actor.username.clone(),
        updated_at: format_timestamp(patient.updated_at),
    }
}

fn record_change(patient_id: Uuid, actor: &AuthenticatedUser, action: &str) {
    audit_log(&AuditEvent::PatientRecordChanged {
        patient_id,
        user_id: actor.id,
        action: action.to_string(),
    });
}
