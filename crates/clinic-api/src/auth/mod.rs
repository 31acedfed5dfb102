//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Password hashing with Argon2id
//! - Token issuance and verification
//! - The access gate middleware and role allow-lists
//! - The account service for registration and login

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{issue_token, verify_token, ClaimField, Claims, JwtConfig, JwtError};
pub use middleware::{
    auth_middleware, require_roles, AuthError, AuthenticatedUser, DOCTOR_ONLY, RECEPTIONIST_ONLY,
};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthService, LoginRequest, LoginResponse, RegisterRequest};
