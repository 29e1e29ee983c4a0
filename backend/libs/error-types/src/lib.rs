//! Shared response envelope and error taxonomy for reel services.
//!
//! Every HTTP response body is an [`ApiResponse`]: either a success carrying
//! the endpoint payload or an error carrying an [`ErrorBody`]. Clients branch
//! on the `status` discriminant instead of probing ad hoc fields.
use serde::{Deserialize, Serialize};

/// Error classes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// Unknown identity or resource
    NotFound,
    /// Missing, invalid or expired bearer token, or bad credentials
    Auth,
    /// Self-follow, duplicate registration and similar state conflicts
    Conflict,
    /// One-time code past its expiry window
    Expired,
    /// Store connectivity or other server-side failure
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Auth => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Expired => 410,
            ErrorKind::Internal => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ErrorKind::Internal)
    }
}

/// Machine-readable error codes, stable across releases.
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const SELF_FOLLOW: &str = "SELF_FOLLOW";
    pub const EMAIL_TAKEN: &str = "EMAIL_TAKEN";
    pub const CONFLICT: &str = "CONFLICT";
    pub const CODE_EXPIRED: &str = "CODE_EXPIRED";
    pub const CODE_MISMATCH: &str = "CODE_MISMATCH";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// Error payload carried by a failed [`ApiResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, code: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Tagged result envelope returned by every endpoint.
///
/// Serializes as `{"status":"success","data":...}` or
/// `{"status":"error","error":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiResponse<T> {
    Success { data: T },
    Error { error: ErrorBody },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success { data }
    }

    pub fn failure(error: ErrorBody) -> Self {
        ApiResponse::Error { error }
    }
}
