//! # Validation Module
//!
//! Input validation utilities for Tally.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal                                                      │
//! │  ├── Trims the scanned line, ignores empty lines                       │
//! │  └── Config load: marker codes must be distinct                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Code length and emptiness                                          │
//! │  └── Names for seeded users and products                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── PRIMARY KEY on codes                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_code, validate_markers};
//! use tally_core::ScanMarkers;
//!
//! assert!(validate_code("5901234123457").is_ok());
//! assert!(validate_markers(&ScanMarkers::default()).is_ok());
//! ```

use crate::error::ValidationError;
use crate::scan::ScanMarkers;
use crate::MAX_CODE_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a user or product code.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most `MAX_CODE_LENGTH` characters
///
/// Codes are otherwise opaque; no character set is enforced because badge
/// and product labels come from different printers.
pub fn validate_code(code: &str) -> ValidationResult<()> {
    check_code("code", code)
}

/// Validates a display name for a user or product.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates the reserved marker codes.
///
/// ## Rules
/// - Each marker is a valid code
/// - The three markers are pairwise distinct
pub fn validate_markers(markers: &ScanMarkers) -> ValidationResult<()> {
    let named = [
        ("take marker", markers.take.as_str()),
        ("return marker", markers.return_.as_str()),
        ("cancel marker", markers.cancel.as_str()),
    ];

    for (field, code) in named {
        check_code(field, code)?;
    }

    for (i, (_, a)) in named.iter().enumerate() {
        if named[i + 1..].iter().any(|(_, b)| a == b) {
            return Err(ValidationError::Duplicate {
                field: "marker".to_string(),
                value: a.to_string(),
            });
        }
    }

    Ok(())
}

fn check_code(field: &str, code: &str) -> ValidationResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
