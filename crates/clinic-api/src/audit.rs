//! Security audit logging for authentication events
//!
//! Provides structured audit logging for logins, registrations, rejected
//! tokens, role check failures and changes to patient records.
//!
//! All audit events are logged at INFO level with the "audit" target,
//! making them easy to filter and route to security monitoring systems.
//! Passwords and password hashes never appear in an event.
//!
//! # Example
//!
//! ```ignore
//! use clinic_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     username: user.username.clone(),
//!     role: user.role.to_string(),
//!     ip_address: Some("192.168.1.1".to_string()),
//! });
//! ```

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful login; a token was issued
    LoginSuccess {
        user_id: Uuid,
        username: String,
        role: String,
        ip_address: Option<String>,
    },

    /// Failed login attempt
    ///
    /// `reason` is internal only; clients always see the same message.
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// Successful registration
    RegistrationSuccess {
        user_id: Uuid,
        username: String,
        role: String,
        ip_address: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// Request rejected by the access gate before a role check
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Authenticated user lacks a role required by the route
    AccessDenied {
        user_id: Uuid,
        username: String,
        role: String,
        allowed_roles: Vec<String>,
        resource: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Patient record created, updated or deleted
    PatientRecordChanged {
        patient_id: Uuid,
        user_id: Uuid,
        action: String,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::PatientRecordChanged { .. } => "Patient record changed",
        }
    }
}

/// Log a security audit event with structured fields
///
/// The event is serialized to JSON so log aggregators can index it:
///
/// ```json
/// {
///   "event_type": "access_denied",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "username": "drjane",
///   "role": "doctor",
///   "allowed_roles": ["receptionist"],
///   "resource": "DELETE /api/patients/…"
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess { username, ip_address, .. }
        | AuditEvent::RegistrationSuccess { username, ip_address, .. } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::LoginFailure {
            username,
            reason,
            ip_address,
        }
        | AuditEvent::RegistrationFailure {
            username,
            reason,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "{}",
                event.summary()
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            role,
            resource,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                role = %role,
                resource = %resource,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::PatientRecordChanged {
            patient_id,
            user_id,
            action,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                patient_id = %patient_id,
                user_id = %user_id,
                action = %action,
                "{}",
                event.summary()
            );
        }
    }
}

/// Extract the client IP address from proxy headers
///
/// Checks X-Forwarded-For (first hop), then X-Real-IP.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
