use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error;
use std::fmt;

use crate::browser::sandbox::SandboxError;

/// The primary error type for the application.
///
/// Every handler returns [`AppResult`]; the variant decides the HTTP status.
/// Variants that map to 5xx never echo their payload to the client.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// A client error that carries structured context (e.g. the file metadata).
    BadRequestWithDetails {
        message: String,
        details: serde_json::Value,
    },
    /// For when a requested resource is not found.
    NotFound(String),
    /// The requested path lies outside the sandbox. The attempted path is only logged.
    Forbidden,
    /// The entry exists but the server process may not read it.
    PermissionDenied(String),
    /// Content exceeds a configured size cap.
    PayloadTooLarge {
        message: String,
        details: Option<serde_json::Value>,
    },
    /// For when a specific field in a request fails validation.
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
    /// For errors related to I/O operations.
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::BadRequestWithDetails { message, .. } => write!(f, "Bad request: {}", message),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Forbidden => write!(f, "Access denied"),
            AppError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            AppError::PayloadTooLarge { message, .. } => write!(f, "Payload too large: {}", message),
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
            AppError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_)
            | AppError::BadRequestWithDetails { .. }
            | AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden | AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!("Internal error {}: {:?}", error_id, e);
                (
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg, None),
            AppError::BadRequestWithDetails { message, details } => ("BAD_REQUEST", message, Some(details)),
            AppError::NotFound(msg) => ("NOT_FOUND", msg, None),
            AppError::Forbidden => ("ACCESS_DENIED", "Access denied".to_string(), None),
            AppError::PermissionDenied(msg) => ("PERMISSION_DENIED", msg, None),
            AppError::PayloadTooLarge { message, details } => ("PAYLOAD_TOO_LARGE", message, details),
            AppError::ValidationError { field, message } => (
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
            AppError::IoError(msg) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!("I/O error {}: {}", error_id, msg);
                (
                    "IO_ERROR",
                    "Internal server error".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound("Path does not exist".to_string()),
            std::io::ErrorKind::PermissionDenied => AppError::PermissionDenied("Permission denied".to_string()),
            _ => AppError::IoError(format!("{}: {}", err.kind(), err)),
        }
    }
}

impl From<SandboxError> for AppError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::OutsideRoot(_) => AppError::Forbidden,
            SandboxError::InvalidPath(message) => AppError::ValidationError { field: "path".to_string(), message },
            SandboxError::Root { .. } => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::anyhow!("blocking task join error: {}", err))
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// Request parameter helpers.
pub mod validation {
    use super::*;

    /// Returns a required query parameter unchanged. Blank values count as missing.
    pub fn require_param<'a>(value: Option<&'a str>, field: &str) -> AppResult<&'a str> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(AppError::BadRequest(format!("{} parameter required", capitalize(field)))),
        }
    }

    fn capitalize(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
