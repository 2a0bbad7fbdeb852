//! # API Error Type
//!
//! Unified error type for the scan station.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                  │
//! │                                                                         │
//! │  scanned line                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  ScanController::scan → Result<ScanReport, ApiError>             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rejected scan?  ── ScanError ──► ScanReport.status (not an Err) │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──► ApiError ──►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Text output:  Error: Database operation failed                        │
//! │  JSON output:  {"code":"DATABASE_ERROR","message":"..."}               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An `ApiError` aborts the current line only. The loop keeps reading.

use serde::Serialize;
use tally_core::{ScanError, ValidationError};
use tally_db::{CommitError, DbError};

use crate::config::ConfigError;

/// Error returned from controller operations, also used for the status of
/// a rejected scan.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: P9"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// Scan refused by the session
    ScanRejected,

    /// Insufficient stock
    InsufficientStock,

    /// Ledger rows were written but stock quantities were not updated
    CommitIncomplete,

    /// Configuration could not be loaded
    ConfigError,

    /// Internal error
    Internal,
}

/// Result type for controller operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::InvalidData { field, reason } => {
                tracing::error!(%field, "Stored data is invalid: {}", reason);
                ApiError::new(
                    ErrorCode::DatabaseError,
                    format!("Stored {} is invalid", field),
                )
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        let code = match err {
            ScanError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            ScanError::NoActiveUser
            | ScanError::UnknownProduct { .. }
            | ScanError::QuantityOutOfRange { .. } => ErrorCode::ScanRejected,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// A commit that wrote ledger rows keeps them; only the stock update is lost.
impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        if !err.is_flushed() {
            return err.source.into();
        }

        let codes: Vec<&str> = err
            .written
            .iter()
            .map(|entry| entry.product_code.as_str())
            .collect();
        ApiError::new(
            ErrorCode::CommitIncomplete,
            format!(
                "batch recorded in the ledger but stock was not updated for: {}",
                codes.join(", ")
            ),
        )
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_keeps_entity_and_id() {
        let err = ApiError::from(DbError::not_found("Product", "P9"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Product not found: P9");
    }

    #[test]
    fn test_query_failure_hides_details() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_scan_errors_keep_status_text() {
        let err = ApiError::from(ScanError::InsufficientStock {
            code: "P1".into(),
            available: 0,
            requested: 1,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "insufficient quantity of product \"P1\"");

        let err = ApiError::from(ScanError::NoActiveUser);
        assert_eq!(err.code, ErrorCode::ScanRejected);
    }

    #[test]
    fn test_serializes_screaming_code() {
        let err = ApiError::validation("empty scan");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":"VALIDATION_ERROR","message":"empty scan"}"#);
    }

    #[test]
    fn test_unflushed_commit_error_is_a_database_error() {
        let err = ApiError::from(CommitError {
            written: Vec::new(),
            source: DbError::TransactionFailed("disk I/O error".into()),
        });
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database transaction failed");
    }

    #[test]
    fn test_config_and_validation_errors() {
        let err = ApiError::from(ConfigError::NoDataDir);
        assert_eq!(err.code, ErrorCode::ConfigError);

        let err = ApiError::from(ValidationError::Required {
            field: "code".into(),
        });
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "code is required");
    }
}
