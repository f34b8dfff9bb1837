//! Error types and the HTTP error envelope

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::category::ErrorCategory;
use super::codes::ErrorCode;

/// Application error with a structured error code
///
/// The primary error type for the backend:
/// - Standardized codes via [`ErrorCode`]
/// - Human-readable message (becomes the `detail` field on the wire)
/// - Optional field-level tags for validation failures
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Field-level validation tags (`field -> tag`)
    pub fields: Option<HashMap<String, String>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            fields: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
        }
    }

    /// Attach a field-level validation tag
    pub fn with_field(mut self, field: impl Into<String>, tag: impl Into<String>) -> Self {
        self.fields
            .get_or_insert_with(HashMap::new)
            .insert(field.into(), tag.into());
        self
    }

    /// HTTP status code for this error
    pub fn http_status(&self) -> http::StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Field validation error (422)
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Not-found error carrying the resource name (404)
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{r} not found"))
    }

    /// Request-shape error (400)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Missing/failed authentication (401)
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    /// Role gate failure (403)
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    /// Internal error - message is logged, client sees the generic detail
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Database error - message is logged, client sees the generic detail
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Broker error
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::BrokerError, msg)
    }
}

/// Stable wire envelope: `{"detail": "...", "fields": {"precio": "min"}}`
///
/// `fields` is only present for field-level validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, String>>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        // System errors never leak internals to the client
        let detail = match err.code.category() {
            ErrorCategory::System => err.code.message().to_string(),
            _ => err.message.clone(),
        };
        Self {
            detail,
            fields: err.fields.clone(),
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ErrorBody::from(&self);

        if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "system error");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_message() {
        let err = AppError::new(ErrorCode::ClosedSession);
        assert_eq!(err.code, ErrorCode::ClosedSession);
        assert_eq!(err.message, "No open cash session");
        assert!(err.fields.is_none());
    }

    #[test]
    fn test_with_field() {
        let err = AppError::validation("invalid payload")
            .with_field("cantidad", "min")
            .with_field("metodo", "required");
        let fields = err.fields.unwrap();
        assert_eq!(fields.get("cantidad").unwrap(), "min");
        assert_eq!(fields.get("metodo").unwrap(), "required");
    }

    #[test]
    fn test_envelope_hides_system_detail() {
        let err = AppError::database("connection refused on 10.0.0.3:5432");
        let body = ErrorBody::from(&err);
        assert_eq!(body.detail, "Database error");
    }

    #[test]
    fn test_envelope_keeps_domain_detail() {
        let err = AppError::with_message(ErrorCode::InactiveProduct, "Yerba 1kg is inactive");
        let body = ErrorBody::from(&err);
        assert_eq!(body.detail, "Yerba 1kg is inactive");
    }

    #[test]
    fn test_envelope_serialization() {
        let err = AppError::validation("bad").with_field("monto", "min");
        let json = serde_json::to_string(&ErrorBody::from(&err)).unwrap();
        assert!(json.contains("\"detail\":\"bad\""));
        assert!(json.contains("\"monto\":\"min\""));

        let plain = AppError::new(ErrorCode::NotFound);
        let json = serde_json::to_string(&ErrorBody::from(&plain)).unwrap();
        assert!(!json.contains("fields"));
    }
}
