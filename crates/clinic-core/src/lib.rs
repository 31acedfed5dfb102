//! Clinic Core - Domain models, storage traits, and shared types
//!
//! This crate defines the core abstractions used by the clinic API:
//! - Staff identities and the closed set of roles
//! - Patient records and partial updates
//! - Repository traits for users and patients
//! - PostgreSQL and in-memory repository implementations
//! - Configuration management

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::{PatientRepository, RepositoryError, UserRepository};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Roles
// ============================================================================

/// Staff role
///
/// The set is closed: anything other than these two values is rejected at
/// registration, when decoding token claims, and when reading stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Receptionist,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Receptionist => "receptionist",
            Role::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known roles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    /// Exact, case-sensitive match against the role names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receptionist" => Ok(Role::Receptionist),
            "doctor" => Ok(Role::Doctor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Stored staff account
///
/// `password_hash` holds a PHC string; the plaintext never reaches this type.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl User {
    /// Public representation without credential material
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Identity without credentials: what gets returned to clients and embedded in tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// Input for creating a user; the password is already hashed
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Patients
// ============================================================================

/// Patient record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub medical_notes: String,
    /// User who created the record
    pub created_by: Uuid,
    /// User who last modified the record
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a patient
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_by: Uuid,
}

/// Partial patient update
///
/// `None` fields keep their stored value. `updated_by` is always written.
#[derive(Debug, Clone)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub medical_notes: Option<String>,
    pub updated_by: Uuid,
}

impl PatientUpdate {
    /// An update that only touches the medical notes
    pub fn notes(medical_notes: impl Into<String>, updated_by: Uuid) -> Self {
        Self {
            name: None,
            age: None,
            gender: None,
            address: None,
            phone: None,
            medical_notes: Some(medical_notes.into()),
            updated_by,
        }
    }

    /// Apply the update to a record in place
    pub fn apply(self, patient: &mut Patient) {
        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(gender) = self.gender {
            patient.gender = gender;
        }
        if let Some(address) = self.address {
            patient.address = Some(address);
        }
        if let Some(phone) = self.phone {
            patient.phone = Some(phone);
        }
        if let Some(notes) = self.medical_notes {
            patient.medical_notes = notes;
        }
        patient.updated_by = self.updated_by;
        patient.updated_at = Utc::now();
    }
}

/// Patient together with the identities that created and last updated it
///
/// Either user may be missing if the account no longer exists.
#[derive(Debug, Clone)]
pub struct PatientWithUsers {
    pub patient: Patient,
    pub created_by: Option<UserPublic>,
    pub updated_by: Option<UserPublic>,
}
