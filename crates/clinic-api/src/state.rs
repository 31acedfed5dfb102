//! Application state management

use crate::auth::jwt::JwtConfig;
use crate::auth::password::PasswordConfig;
use crate::auth::AuthService;
use crate::patients::PatientService;
use clinic_core::config::AppConfig;
use clinic_core::{MemoryStore, PatientRepository, PostgresStore, UserRepository};
use std::sync::Arc;
use std::time::Instant;

/// Backing store behind the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Postgres => "postgres",
            StorageKind::Memory => "memory",
        }
    }
}

/// Application state shared across handlers
///
/// Built once at startup; nothing in it changes while serving requests.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Token signing configuration, shared with the access gate
    pub jwt: Arc<JwtConfig>,
    /// Registration and login
    pub auth: AuthService,
    /// Patient records
    pub patients: PatientService,
    /// Which store the services run against
    pub storage: StorageKind,
}

impl AppState {
    /// Create application state over explicit repositories
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        patients: Arc<dyn PatientRepository>,
        storage: StorageKind,
    ) -> Self {
        let jwt = JwtConfig::from(&config.auth);

        Self {
            auth: AuthService::new(users, jwt.clone()),
            patients: PatientService::new(patients),
            jwt: Arc::new(jwt),
            config,
            start_time: Instant::now(),
            storage,
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store, StorageKind::Memory)
    }

    /// Connect to PostgreSQL when `database.url` is set, otherwise fall back
    /// to the in-memory store
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database.url.clone() else {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store, data will not persist");
            return Ok(Self::in_memory(config));
        };

        let store = PostgresStore::connect(&url, &config.database).await?;
        store.ensure_schema().await?;
        tracing::info!("Connected to PostgreSQL");

        let store = Arc::new(store);
        Ok(Self::new(config, store.clone(), store, StorageKind::Postgres))
    }

    /// Override the Argon2 cost parameters used at registration
    pub fn with_password_config(mut self, password_config: PasswordConfig) -> Self {
        self.auth = self.auth.with_password_config(password_config);
        self
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
