//! PostgreSQL store
//!
//! Provides user and patient persistence using SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::repository::{PatientRepository, RepositoryError, Result, UserRepository};
use crate::{NewPatient, NewUser, Patient, PatientUpdate, PatientWithUsers, Role, User, UserPublic};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username VARCHAR(20) NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role VARCHAR(20) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER NOT NULL,
        gender TEXT NOT NULL,
        address TEXT,
        phone TEXT,
        medical_notes TEXT NOT NULL DEFAULT '',
        created_by UUID NOT NULL,
        updated_by UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_patients_created_by ON patients (created_by)",
    "CREATE INDEX IF NOT EXISTS idx_patients_updated_by ON patients (updated_by)",
];

const PATIENT_COLUMNS: &str = "id, name, age, gender, address, phone, medical_notes, \
     created_by, updated_by, created_at, updated_at";

/// PostgreSQL user and patient store
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::Database(format!("Failed to apply schema: {e}")))?;
        }
        tracing::debug!("Database schema is up to date");
        Ok(())
    }

    async fn find_public_user(&self, id: Uuid) -> Result<Option<UserPublic>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to fetch user: {e}")))?;

        row.map(|r| User::try_from(r).map(|u| u.to_public()))
            .transpose()
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| RepositoryError::Database(format!("Corrupt user row {}: {e}", row.id)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Patient row from database
#[derive(Debug, FromRow)]
struct PatientRow {
    id: Uuid,
    name: String,
    age: i32,
    gender: String,
    address: Option<String>,
    phone: Option<String>,
    medical_notes: String,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            name: row.name,
            age: row.age,
            gender: row.gender,
            address: row.address,
            phone: row.phone,
            medical_notes: row.medical_notes,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_insert_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::UsernameTaken,
        _ => RepositoryError::Database(format!("Failed to create user: {e}")),
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, username, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        User::try_from(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role, created_at, updated_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to fetch user: {e}")))?;

        row.ok_or(RepositoryError::NotFound("User"))
            .and_then(User::try_from)
    }
}

#[async_trait]
impl PatientRepository for PostgresStore {
    async fn create(&self, patient: NewPatient) -> Result<Patient> {
        let query = format!(
            r#"
            INSERT INTO patients (
                id, name, age, gender, address, phone,
                medical_notes, created_by, updated_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, '', $7, $7, NOW(), NOW())
            RETURNING {PATIENT_COLUMNS}
            "#
        );

        let row: PatientRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(&patient.name)
            .bind(patient.age)
            .bind(&patient.gender)
            .bind(&patient.address)
            .bind(&patient.phone)
            .bind(patient.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to create patient: {e}")))?;

        Ok(row.into())
    }

    async fn get_all(&self) -> Result<Vec<Patient>> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at");

        let rows: Vec<PatientRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to list patients: {e}")))?;

        Ok(rows.into_iter().map(Patient::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Patient> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");

        let row: Option<PatientRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to get patient: {e}")))?;

        row.map(Patient::from)
            .ok_or(RepositoryError::NotFound("Patient"))
    }

    async fn get_by_id_with_users(&self, id: Uuid) -> Result<PatientWithUsers> {
        let patient = self.get_by_id(id).await?;
        let created_by = self.find_public_user(patient.created_by).await?;
        let updated_by = if patient.updated_by == patient.created_by {
            created_by.clone()
        } else {
            self.find_public_user(patient.updated_by).await?
        };

        Ok(PatientWithUsers {
            patient,
            created_by,
            updated_by,
        })
    }

    async fn update(&self, id: Uuid, update: PatientUpdate) -> Result<Patient> {
        let query = format!(
            r#"
            UPDATE patients SET
                name = COALESCE($2, name),
                age = COALESCE($3, age),
                gender = COALESCE($4, gender),
                address = COALESCE($5, address),
                phone = COALESCE($6, phone),
                medical_notes = COALESCE($7, medical_notes),
                updated_by = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PATIENT_COLUMNS}
            "#
        );

        let row: Option<PatientRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(&update.name)
            .bind(update.age)
            .bind(&update.gender)
            .bind(&update.address)
            .bind(&update.phone)
            .bind(&update.medical_notes)
            .bind(update.updated_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to update patient: {e}")))?;

        row.map(Patient::from)
            .ok_or(RepositoryError::NotFound("Patient"))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to delete patient: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Patient"));
        }

        Ok(())
    }
}
