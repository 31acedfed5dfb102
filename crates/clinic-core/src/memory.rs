//! In-memory store
//!
//! Used by tests and by development runs without `DATABASE_URL`.
//! Writes are serialized through `tokio::sync::RwLock`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{PatientRepository, RepositoryError, Result, UserRepository};
use crate::{NewPatient, NewUser, Patient, PatientUpdate, PatientWithUsers, User};

/// In-memory users and patients
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::UsernameTaken);
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(RepositoryError::NotFound("User"))
    }
}

#[async_trait]
impl PatientRepository for MemoryStore {
    async fn create(&self, patient: NewPatient) -> Result<Patient> {
        let now = Utc::now();
        let created = Patient {
            id: Uuid::new_v4(),
            name: patient.name,
            age: patient.age,
            gender: patient.gender,
            address: patient.address,
            phone: patient.phone,
            medical_notes: String::new(),
            created_by: patient.created_by,
            updated_by: patient.created_by,
            created_at: now,
            updated_at: now,
        };

        self.patients
            .write()
            .await
            .insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_all(&self) -> Result<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.patients.read().await.values().cloned().collect();
        patients.sort_by_key(|p| p.created_at);
        Ok(patients)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Patient> {
        self.patients
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound("Patient"))
    }

    async fn get_by_id_with_users(&self, id: Uuid) -> Result<PatientWithUsers> {
        let patient = self.get_by_id(id).await?;

        let users = self.users.read().await;
        let created_by = users.get(&patient.created_by).map(User::to_public);
        let updated_by = users.get(&patient.updated_by).map(User::to_public);

        Ok(PatientWithUsers {
            patient,
            created_by,
            updated_by,
        })
    }

    async fn update(&self, id: Uuid, update: PatientUpdate) -> Result<Patient> {
        let mut patients = self.patients.write().await;
        let patient = patients
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("Patient"))?;

        update.apply(patient);
        Ok(patient.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.patients
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound("Patient"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role,
        }
    }

    fn new_patient(name: &str, created_by: Uuid) -> NewPatient {
        NewPatient {
            name: name.to_string(),
            age: 30,
            gender: "male".to_string(),
            address: None,
            phone: None,
            created_by,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = MemoryStore::new();
        let created = store
            .create_user(new_user("front_desk", Role::Receptionist))
            .await
            .unwrap();

        let by_name = store.find_by_username("front_desk").await.unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.role, Role::Receptionist);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = MemoryStore::new();
        store.create_user(new_user("drjane", Role::Doctor)).await.unwrap();

        let result = store.create_user(new_user("drjane", Role::Receptionist)).await;
        assert!(matches!(result, Err(RepositoryError::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = MemoryStore::new();
        let result = store.find_by_username("ghost").await;
        assert!(matches!(result, Err(RepositoryError::NotFound("User"))));
    }

    #[tokio::test]
    async fn test_patient_crud() {
        let store = MemoryStore::new();
        let receptionist = store
            .create_user(new_user("front_desk", Role::Receptionist))
            .await
            .unwrap();
        let doctor = store.create_user(new_user("drjane", Role::Doctor)).await.unwrap();

        let patient = store
            .create(new_patient("John Doe", receptionist.id))
            .await
            .unwrap();
        assert_eq!(patient.created_by, receptionist.id);
        assert_eq!(patient.updated_by, receptionist.id);
        assert!(patient.medical_notes.is_empty());

        let updated = store
            .update(patient.id, PatientUpdate::notes("Stable", doctor.id))
            .await
            .unwrap();
        assert_eq!(updated.medical_notes, "Stable");

        let detail = store.get_by_id_with_users(patient.id).await.unwrap();
        assert_eq!(detail.created_by.unwrap().username, "front_desk");
        assert_eq!(detail.updated_by.unwrap().username, "drjane");

        store.delete(patient.id).await.unwrap();
        assert!(matches!(
            store.get_by_id(patient.id).await,
            Err(RepositoryError::NotFound("Patient"))
        ));
        assert!(store.delete(patient.id).await.is_err());
    }

    #[tokio::test]
    async fn test_get_all_oldest_first() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let first = store.create(new_patient("First Patient", author)).await.unwrap();
        let second = store.create(new_patient("Second Patient", author)).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at <= all[1].created_at);
        assert!(all.iter().any(|p| p.id == first.id));
        assert!(all.iter().any(|p| p.id == second.id));
    }

    #[tokio::test]
    async fn test_missing_author_is_none() {
        let store = MemoryStore::new();
        let patient = store
            .create(new_patient("Orphan Record", Uuid::new_v4()))
            .await
            .unwrap();

        let detail = store.get_by_id_with_users(patient.id).await.unwrap();
        assert!(detail.created_by.is_none());
        assert!(detail.updated_by.is_none());
    }
}
