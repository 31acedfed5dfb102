//! Repository traits for users and patients
//!
//! Both the PostgreSQL store and the in-memory store implement these traits;
//! services only ever hold `Arc<dyn ...>` handles.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{NewPatient, NewUser, Patient, PatientUpdate, PatientWithUsers, User};

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Staff account storage
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user, assigning its id and timestamps
    ///
    /// Fails with [`RepositoryError::UsernameTaken`] if the username exists.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Look up a user by exact username
    async fn find_by_username(&self, username: &str) -> Result<User>;
}

/// Patient record storage
#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn create(&self, patient: NewPatient) -> Result<Patient>;

    /// All patients, oldest first
    async fn get_all(&self) -> Result<Vec<Patient>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Patient>;

    /// Patient plus the users referenced by `created_by` / `updated_by`
    async fn get_by_id_with_users(&self, id: Uuid) -> Result<PatientWithUsers>;

    /// Apply a partial update and return the stored result
    async fn update(&self, id: Uuid, update: PatientUpdate) -> Result<Patient>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}
