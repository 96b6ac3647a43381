//! # Application Error Type
//!
//! Unified error type for every operation the view layer can call.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Vitrina                                │
//! │                                                                         │
//! │  Sale form                     Rust Backend                             │
//! │  ─────────                     ────────────                             │
//! │                                                                         │
//! │  sales.create(draft)                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Operation                                                       │  │
//! │  │  AppResult<T>                                                    │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Stock Error? ─── CoreError::InsufficientStock ─── AppError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄────────────────────────────────────────────────────────────────────  │
//! │                                                                         │
//! │  dismissible alert:                                                     │
//! │    e.code    = "INSUFFICIENT_STOCK"                                     │
//! │    e.message = "Insufficient stock for Shirt (M/Blue): available 7,     │
//! │                 requested 11"                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database failures are logged in full and reach the user as a generic
//! message; validation and stock failures reach the user verbatim.

use serde::Serialize;
use vitrina_core::{CoreError, ValidationError};
use vitrina_db::DbError;

use crate::config::ConfigError;

/// Result alias used throughout the application layer.
pub type AppResult<T> = Result<T, AppError>;

/// Error returned from application operations.
///
/// ## Serialization
/// This is what the view layer receives when an operation fails:
/// ```json
/// {
///   "code": "DUPLICATE",
///   "message": "Duplicate product: Shirt (Acme) already exists"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for application responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, sale or variant not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Product or account already exists
    Duplicate,

    /// Sale asks for more units than are in stock
    InsufficientStock,

    /// Database operation failed
    DatabaseError,

    /// No user is signed in
    Unauthenticated,

    /// Email or password did not match
    InvalidCredentials,

    /// Configuration could not be loaded or saved
    ConfigError,

    /// Internal error
    Internal,
}

impl AppError {
    /// Creates a new application error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    pub fn unauthenticated() -> Self {
        AppError::new(ErrorCode::Unauthenticated, "Sign in to continue")
    }

    /// The same message whether the email or the password was wrong.
    pub fn invalid_credentials() -> Self {
        AppError::new(ErrorCode::InvalidCredentials, "Invalid email or password")
    }
}

/// Converts database errors to application errors.
impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => AppError::new(
                ErrorCode::Duplicate,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                AppError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Serialization(e) => {
                tracing::error!("Malformed stored document: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to application errors.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => AppError::not_found("Product", &id),
            CoreError::SaleNotFound(id) => AppError::not_found("Sale", &id),
            e @ CoreError::VariantNotFound { .. } => AppError::new(ErrorCode::NotFound, e.to_string()),
            e @ CoreError::InsufficientStock { .. } => {
                AppError::new(ErrorCode::InsufficientStock, e.to_string())
            }
            e @ CoreError::DuplicateProduct { .. } => AppError::new(ErrorCode::Duplicate, e.to_string()),
            e @ CoreError::StockOverflow { .. } => AppError::validation(e.to_string()),
            CoreError::Validation(e) => AppError::from(e),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            e @ ValidationError::Duplicate { .. } => AppError::new(ErrorCode::Duplicate, e.to_string()),
            e => AppError::validation(e.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
