//! # Error Types
//!
//! Domain-specific error types for vitrina-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vitrina-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  vitrina-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  vitrina-app errors                                                    │
//! │  └── AppError         - What the alert dialog shows                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AppError → Front end              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the caller's inventory.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found in the caller's sales.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A variant the user explicitly targeted does not exist.
    #[error("Variant {size}/{color} not found on {product}")]
    VariantNotFound {
        product: String,
        size: String,
        color: String,
    },

    /// Insufficient stock to complete a sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale form: Shirt M/Red, qty 11
    ///      │
    ///      ▼
    /// Check stock: available=10
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Shirt (M/Red)", available: 10, requested: 11 }
    ///      │
    ///      ▼
    /// Alert: "Stock insuficiente..."
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// A stock counter would leave the `i64` range.
    #[error("Stock of {product} is out of range")]
    StockOverflow { product: String },

    /// The product being created duplicates an existing one.
    #[error("Duplicate product: {name} ({brand}) already exists")]
    DuplicateProduct { name: String, brand: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write, so an operation failing with one of these has
/// no side effects.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// A numeric form field did not parse.
    #[error("{field} must be a number, got '{value}'")]
    InvalidNumber { field: String, value: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// An amount computed from valid fields does not fit.
    #[error("{field} is too large")]
    Overflow { field: String },

    /// Duplicate value (e.g., a variant already on the product).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for a `Required` error on `field`.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
