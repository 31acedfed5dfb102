//! Authentication API handlers
//!
//! Registration and login are public; `/api/me` sits behind the access gate.

use crate::audit::extract_ip_address;
use crate::auth::{AuthenticatedUser, LoginRequest, LoginResponse, RegisterRequest};
use crate::error::{ApiError, ApiResponse, AppError};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use clinic_core::{Role, UserPublic};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Public view of a staff account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    #[schema(value_type = String, example = "doctor")]
    pub role: Role,
}

impl From<UserPublic> for UserResponse {
    fn from(user: UserPublic) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Register a new staff account
///
/// # Request Body
///
/// * `username` - 3 to 20 characters, unique
/// * `password` - At least 6 characters
/// * `role` - `receptionist` or `doctor`
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = UserResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 409, description = "Username already exists", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let user = state
        .auth
        .register(request, extract_ip_address(&headers))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(user))),
    ))
}

/// Login with username and password
///
/// Returns a bearer token. An unknown username and a wrong password produce
/// the same 401 response.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let response = state
        .auth
        .login(request, extract_ip_address(&headers))
        .await?;

    Ok(Json(ApiResponse::ok(response)))
}

/// Current user, from the verified token
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated identity", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(UserResponse::from(state.auth.me(&user))))
}
