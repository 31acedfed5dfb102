//! Authentication middleware for protecting routes
//!
//! Extracts and validates the bearer token from the Authorization header.
//! On success, adds the authenticated user to the request extensions, where
//! handlers pick it up through the [`AuthenticatedUser`] extractor.

use super::jwt::{verify_token, ClaimField, Claims, JwtConfig, JwtError};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use clinic_core::{Role, UserPublic};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Route groups open to receptionists only
pub const RECEPTIONIST_ONLY: &[Role] = &[Role::Receptionist];

/// Route groups open to doctors only
pub const DOCTOR_ONLY: &[Role] = &[Role::Doctor];

/// Authenticated user information extracted from a verified token
///
/// Inserted into the request extensions by [`auth_middleware`] and scoped to
/// that request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Access the identity attached by [`auth_middleware`]
///
/// Precondition: the route is mounted under `auth_middleware`. The router
/// guarantees this for every handler that takes this extractor; a route
/// wired without the gate fails with [`AuthError::GateNotApplied`].
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    "AuthenticatedUser requested on a route without auth_middleware"
                );
                AuthError::GateNotApplied
            })
    }
}

/// Access gate errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization format")]
    InvalidAuthHeader,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] JwtError),

    #[error("{0}")]
    InvalidClaim(ClaimField),

    #[error("Forbidden: insufficient permissions")]
    InsufficientPermissions,

    #[error("Authenticated identity requested outside the access gate")]
    GateNotApplied,
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidClaim(field) => AuthError::InvalidClaim(field),
            other => AuthError::InvalidToken(other),
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken(_)
            | AuthError::InvalidClaim(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::GateNotApplied => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AuthError::GateNotApplied => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Split an Authorization header into its bearer token
///
/// The value must be exactly `Bearer <token>`: two parts separated by a
/// single space, with a case-sensitive scheme.
pub fn parse_bearer(value: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Err(AuthError::MissingAuthHeader),
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Authentication middleware that requires a valid bearer token
///
/// This middleware:
/// 1. Extracts the Authorization header
/// 2. Validates the `Bearer <token>` format
/// 3. Verifies the token signature, algorithm and expiry
/// 4. Checks the identity claims
/// 5. Adds [`AuthenticatedUser`] to request extensions
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use clinic_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/api/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(jwt_config, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(config): State<Arc<JwtConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = match parse_bearer(request.headers().get(header::AUTHORIZATION)) {
        Ok(token) => token,
        Err(e) => {
            reject(&request, &e);
            return Err(e);
        }
    };

    let claims = match verify_token(&config, token) {
        Ok(claims) => claims,
        Err(e) => {
            let e = AuthError::from(e);
            reject(&request, &e);
            return Err(e);
        }
    };

    let user = AuthenticatedUser::from(claims);
    tracing::debug!(user_id = %user.id, role = %user.role, "Request authenticated");

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

fn reject(request: &Request<Body>, err: &AuthError) {
    let reason = match err {
        AuthError::InvalidToken(source) => source.to_string(),
        other => other.to_string(),
    };

    audit_log(&AuditEvent::InvalidToken {
        ip_address: extract_ip_address(request.headers()),
        user_agent: extract_user_agent(request.headers()),
        reason,
    });
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory for role-based access control
///
/// Returns a middleware that admits the request only if the authenticated
/// user's role is in `allowed`. Must be layered inside `auth_middleware`.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, routing::post, Router};
/// use clinic_api::auth::middleware::{auth_middleware, require_roles, RECEPTIONIST_ONLY};
///
/// let app = Router::new()
///     .route("/api/patients", post(create_patient))
///     .route_layer(middleware::from_fn(require_roles(RECEPTIONIST_ONLY)))
///     .route_layer(middleware::from_fn_with_state(jwt_config, auth_middleware));
/// ```
pub fn require_roles(
    allowed: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = match request.extensions().get::<AuthenticatedUser>() {
                Some(user) => user.clone(),
                None => {
                    tracing::error!(
                        path = %request.uri().path(),
                        "Role check mounted without auth_middleware"
                    );
                    return Err(AuthError::GateNotApplied);
                }
            };

            if !user.has_any_role(allowed) {
                audit_log(&AuditEvent::AccessDenied {
                    user_id: user.id,
                    username: user.username.clone(),
                    role: user.role.to_string(),
                    allowed_roles: allowed.iter().map(|r| r.to_string()).collect(),
                    resource: format!("{} {}", request.method(), request.uri().path()),
                    ip_address: extract_ip_address(request.headers()),
                    user_agent: extract_user_agent(request.headers()),
                });

                return Err(AuthError::InsufficientPermissions);
            }

            Ok(next.run(request).await)
        })
    }
}
