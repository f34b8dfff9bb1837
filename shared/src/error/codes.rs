//! Unified error codes for the Tango POS backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Cash-session errors
//! - 4xxx: Sale errors
//! - 5xxx: Inventory errors
//! - 6xxx: Rate-limit errors
//! - 9xxx: System / external-dependency errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::ErrorCategory;

/// Unified error code enum
///
/// Codes are represented as u16 values for efficient serialization and
/// stable cross-client contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Unknown error
    Unknown = 1,
    /// Field-level validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Request shape is invalid (bad JSON, bad id format)
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// No credentials presented
    NotAuthenticated = 1001,
    /// Wrong username/password
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is malformed or has a bad signature
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1005,

    // ==================== 2xxx: Permission ====================
    /// Authenticated but role is not allowed on this endpoint
    PermissionDenied = 2001,

    // ==================== 3xxx: Cash session ====================
    /// Operation requires an open session
    ClosedSession = 3001,
    /// An open session already exists for this register
    DuplicateOpen = 3002,
    /// Critical deviation requires supervisor observations
    ObservationsRequired = 3003,

    // ==================== 4xxx: Sale ====================
    /// Sum of payments does not cover the sale total
    InsufficientPayment = 4001,
    /// Sale is already cancelled
    AlreadyCancelled = 4002,
    /// Product is inactive and cannot be sold
    InactiveProduct = 4003,

    // ==================== 5xxx: Inventory ====================
    /// Parent stock cannot cover the requested disassembly
    InsufficientParentStock = 5001,
    /// Link would close a directed cycle in the product graph
    CyclicLink = 5002,

    // ==================== 6xxx: Rate limit ====================
    /// Per-IP request budget exhausted
    TooManyRequests = 6001,

    // ==================== 9xxx: System ====================
    /// Unexpected internal error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Broker (queue) unreachable
    BrokerError = 9003,
    /// Circuit breaker is open - fast-failed without calling out
    CircuitOpen = 9004,
    /// A hard dependency is unreachable
    DependencyUnavailable = 9005,
}

impl ErrorCode {
    /// Numeric code carried in the wire envelope
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message for the code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::InvalidCredentials => "Invalid credentials",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::ClosedSession => "No open cash session",
            ErrorCode::DuplicateOpen => "An open cash session already exists for this register",
            ErrorCode::ObservationsRequired => {
                "Critical deviation: supervisor observations are required"
            }
            ErrorCode::InsufficientPayment => "Total payments do not cover the sale total",
            ErrorCode::AlreadyCancelled => "Sale is already cancelled",
            ErrorCode::InactiveProduct => "Product is inactive and cannot be sold",
            ErrorCode::InsufficientParentStock => "Insufficient parent stock for disassembly",
            ErrorCode::CyclicLink => "Link would create a cycle in the product hierarchy",
            ErrorCode::TooManyRequests => "Too many requests",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::BrokerError => "Queue broker error",
            ErrorCode::CircuitOpen => "Circuit breaker is open",
            ErrorCode::DependencyUnavailable => "A required dependency is unavailable",
        }
    }

    /// HTTP status this code maps to
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotAuthenticated
            | ErrorCode::InvalidCredentials
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::AccountDisabled => StatusCode::UNAUTHORIZED,
            ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::DuplicateOpen => StatusCode::CONFLICT,
            ErrorCode::ClosedSession
            | ErrorCode::ObservationsRequired
            | ErrorCode::InsufficientPayment
            | ErrorCode::AlreadyCancelled
            | ErrorCode::InactiveProduct
            | ErrorCode::InsufficientParentStock
            | ErrorCode::CyclicLink => StatusCode::BAD_REQUEST,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError | ErrorCode::DatabaseError | ErrorCode::BrokerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::CircuitOpen | ErrorCode::DependencyUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Category of the code (drives logging policy)
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            1000..=2999 => ErrorCategory::Auth,
            9000..=9999 => ErrorCategory::System,
            _ => ErrorCategory::Domain,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            1001 => ErrorCode::NotAuthenticated,
            1002 => ErrorCode::InvalidCredentials,
            1003 => ErrorCode::TokenExpired,
            1004 => ErrorCode::TokenInvalid,
            1005 => ErrorCode::AccountDisabled,
            2001 => ErrorCode::PermissionDenied,
            3001 => ErrorCode::ClosedSession,
            3002 => ErrorCode::DuplicateOpen,
            3003 => ErrorCode::ObservationsRequired,
            4001 => ErrorCode::InsufficientPayment,
            4002 => ErrorCode::AlreadyCancelled,
            4003 => ErrorCode::InactiveProduct,
            5001 => ErrorCode::InsufficientParentStock,
            5002 => ErrorCode::CyclicLink,
            6001 => ErrorCode::TooManyRequests,
            9001 => ErrorCode::InternalError,
            9002 => ErrorCode::DatabaseError,
            9003 => ErrorCode::BrokerError,
            9004 => ErrorCode::CircuitOpen,
            9005 => ErrorCode::DependencyUnavailable,
            other => return Err(format!("unknown error code: {other}")),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            ErrorCode::ClosedSession,
            ErrorCode::DuplicateOpen,
            ErrorCode::InsufficientPayment,
            ErrorCode::CircuitOpen,
            ErrorCode::TooManyRequests,
        ] {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw), Ok(code));
        }
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            ErrorCode::DuplicateOpen.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::ObservationsRequired.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::CircuitOpen.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::TooManyRequests.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_category() {
        assert_eq!(ErrorCode::TokenExpired.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
        assert_eq!(ErrorCode::ClosedSession.category(), ErrorCategory::Domain);
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(ErrorCode::try_from(7777).is_err());
    }
}
