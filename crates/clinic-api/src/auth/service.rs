//! Account service
//!
//! Registration hashes the password and persists the user; login verifies the
//! password and issues a token. Login failures are indistinguishable to the
//! caller whether the username is unknown or the password is wrong.

use super::jwt::{issue_token, JwtConfig};
use super::middleware::AuthenticatedUser;
use super::password::{hash_password_with_config, verify_password, PasswordConfig, PasswordError};
use crate::audit::{audit_log, AuditEvent};
use crate::error::AppError;
use clinic_core::{NewUser, RepositoryError, Role, UserPublic, UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// User registration request
#[derive(Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 20, message = "username must be 3-20 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    /// `receptionist` or `doctor`
    #[schema(value_type = String, example = "doctor")]
    pub role: Role,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// User login request
#[derive(Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(users: Arc<dyn UserRepository>, jwt_config: JwtConfig) -> Self {
        Self {
            users,
            jwt_config,
            password_config: PasswordConfig::default(),
        }
    }

    /// Override the Argon2 cost parameters
    pub fn with_password_config(mut self, password_config: PasswordConfig) -> Self {
        self.password_config = password_config;
        self
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `Ok(UserPublic)` - Newly created user, without any credential material
    /// * `Err(AppError::Validation)` - Username or password out of bounds
    /// * `Err(AppError::Conflict)` - Username already taken
    pub async fn register(
        &self,
        request: RegisterRequest,
        ip_address: Option<String>,
    ) -> Result<UserPublic, AppError> {
        if let Err(e) = request.validate() {
            audit_log(&AuditEvent::RegistrationFailure {
                username: request.username.clone(),
                reason: "validation failed".to_string(),
                ip_address,
            });
            return Err(e.into());
        }

        let password_hash = hash_password_with_config(&request.password, &self.password_config)?;

        let created = self
            .users
            .create_user(NewUser {
                username: request.username.clone(),
                password_hash,
                role: request.role,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                audit_log(&AuditEvent::RegistrationFailure {
                    username: request.username,
                    reason: e.to_string(),
                    ip_address,
                });
                return Err(e.into());
            }
        };

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.to_string(),
            ip_address,
        });

        Ok(user.to_public())
    }

    /// Login with username and password
    ///
    /// # Returns
    ///
    /// * `Ok(LoginResponse)` - Signed token for the user
    /// * `Err(AppError::Validation)` - Empty username or password
    /// * `Err(AppError::InvalidCredentials)` - Unknown user, wrong password or
    ///   unreadable stored hash
    /// * `Err(AppError::Database)` - Repository failure other than not-found
    pub async fn login(
        &self,
        request: LoginRequest,
        ip_address: Option<String>,
    ) -> Result<LoginResponse, AppError> {
        let reject = |reason: &str, ip_address: Option<String>| {
            audit_log(&AuditEvent::LoginFailure {
                username: request.username.clone(),
                reason: reason.to_string(),
                ip_address,
            });
            AppError::InvalidCredentials
        };

        if let Err(e) = request.validate() {
            audit_log(&AuditEvent::LoginFailure {
                username: request.username.clone(),
                reason: "validation failed".to_string(),
                ip_address,
            });
            return Err(e.into());
        }

        let user = match self.users.find_by_username(&request.username).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound(_)) => return Err(reject("unknown username", ip_address)),
            Err(e) => return Err(e.into()),
        };

        match verify_password(&request.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(reject("wrong password", ip_address)),
            Err(PasswordError::InvalidHashFormat) => {
                tracing::warn!(user_id = %user.id, "Stored password hash is unreadable");
                return Err(reject("unreadable password hash", ip_address));
            }
            Err(e) => return Err(e.into()),
        }

        let token = issue_token(&self.jwt_config, user.id, &user.username, user.role)?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.to_string(),
            ip_address,
        });

        Ok(LoginResponse { token })
    }

    /// The caller's identity, straight from the verified token
    pub fn me(&self, user: &AuthenticatedUser) -> UserPublic {
        user.to_public()
    }
}
