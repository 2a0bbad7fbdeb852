//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── ScanError        - Rejected scans, shown to the operator           │
//! │  └── ValidationError  - Malformed codes and configuration               │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  terminal errors (in app)                                              │
//! │  └── ApiError         - What the operator console sees                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the scanned code in messages
//! 3. Scan errors are never fatal: they leave the session unchanged

use thiserror::Error;

// =============================================================================
// Scan Error
// =============================================================================

/// A scan the session refused to apply.
///
/// The `Display` text is exactly what the status line shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A product was scanned before any user.
    #[error("scan a user code before a product code")]
    NoActiveUser,

    /// The code is neither a marker, a user, nor a product.
    #[error("product with code \"{code}\" does not exist")]
    UnknownProduct { code: String },

    /// Applying the scan would drive the product's stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Stored quantity: 2
    /// Pending in batch: -2
    ///      │
    ///      ▼
    /// Take scan (-1) → 2 + (-2) + (-1) = -1
    ///      │
    ///      ▼
    /// InsufficientStock { code: "P1", available: 0, requested: 1 }
    /// ```
    #[error("insufficient quantity of product \"{code}\"")]
    InsufficientStock {
        code: String,
        /// Stored quantity plus what is already pending.
        available: i64,
        requested: i64,
    },

    /// The stored quantity plus the pending delta does not fit in an `i64`.
    #[error("quantity of product \"{code}\" is out of range")]
    QuantityOutOfRange { code: String },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., unparseable timestamp or activity label).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two settings that must differ share a value.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Unit Tests
// =============================================================================
