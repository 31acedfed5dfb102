//! JWT token generation and validation
//!
//! Tokens are HS256-signed JWTs carrying the user id (`sub`), username and
//! role. Validation pins the algorithm to HS256: a token whose header names
//! `none` or an asymmetric scheme is rejected before any claim is read.

use clinic_core::{AuthConfig, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT Claims structure containing user information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,
    /// Username at the time of issuance
    pub username: String,
    /// Role at the time of issuance
    pub role: Role,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

/// Identity claims checked individually during verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimField {
    UserId,
    Username,
    Role,
}

impl ClaimField {
    fn key(self) -> &'static str {
        match self {
            ClaimField::UserId => "sub",
            ClaimField::Username => "username",
            ClaimField::Role => "role",
        }
    }
}

impl std::fmt::Display for ClaimField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            ClaimField::UserId => "Invalid user ID in token",
            ClaimField::Username => "Invalid username in token",
            ClaimField::Role => "Invalid role in token",
        };
        f.write_str(message)
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token signing secret is not configured")]
    MissingSecret,

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Unexpected token algorithm")]
    InvalidAlgorithm,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("{0}")]
    InvalidClaim(ClaimField),

    #[error("Token lifetime of {0} seconds overflows the expiry timestamp")]
    ExpirationOverflow(u64),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime in seconds
    pub expiration_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiration_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration_secs,
        }
    }

    /// A blank or whitespace-only secret counts as unset
    fn has_secret(&self) -> bool {
        !self.secret.trim().is_empty()
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.jwt_expiration_secs)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

/// Issue a signed token for an authenticated user
///
/// ```no_run
/// use clinic_api::auth::jwt::{issue_token, JwtConfig};
/// use clinic_core::Role;
/// use uuid::Uuid;
///
/// let config = JwtConfig::new("change-me", 3600);
/// let token = issue_token(&config, Uuid::new_v4(), "drjane", Role::Doctor)
///     .expect("Failed to generate token");
/// ```
pub fn issue_token(
    config: &JwtConfig,
    user_id: Uuid,
    username: &str,
    role: Role,
) -> Result<String, JwtError> {
    if !config.has_secret() {
        return Err(JwtError::MissingSecret);
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let exp = now
        .checked_add(config.expiration_secs)
        .ok_or(JwtError::ExpirationOverflow(config.expiration_secs))?;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        iat: now,
        exp,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a token and extract its claims
///
/// Rejects malformed tokens, bad signatures, expired tokens and any
/// algorithm other than HS256. The identity claims are then checked one by
/// one so callers can report which claim was missing or mistyped.
pub fn verify_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    if !config.has_secret() {
        return Err(JwtError::MissingSecret);
    }

    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Map<String, Value>>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::InvalidAlgorithm,
        _ => JwtError::InvalidToken,
    })?;

    Claims::from_map(&token_data.claims)
}

impl Claims {
    fn from_map(map: &Map<String, Value>) -> Result<Self, JwtError> {
        let string_claim = |field: ClaimField| {
            map.get(field.key())
                .and_then(Value::as_str)
                .ok_or(JwtError::InvalidClaim(field))
        };

        let sub = string_claim(ClaimField::UserId)?
            .parse::<Uuid>()
            .map_err(|_| JwtError::InvalidClaim(ClaimField::UserId))?;
        let username = string_claim(ClaimField::Username)?.to_string();
        let role = string_claim(ClaimField::Role)?
            .parse::<Role>()
            .map_err(|_| JwtError::InvalidClaim(ClaimField::Role))?;

        let timestamp = |key: &str| {
            map.get(key)
                .and_then(Value::as_u64)
                .ok_or(JwtError::InvalidToken)
        };

        Ok(Claims {
            sub,
            username,
            role,
            iat: timestamp("iat")?,
            exp: timestamp("exp")?,
        })
    }
}
