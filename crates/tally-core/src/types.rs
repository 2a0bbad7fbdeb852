//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │    Product      │   │    Activity     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (scanned) │   │  code (scanned) │   │  Take    (-1)   │       │
//! │  │  name           │   │  name           │   │  Return  (+1)   │       │
//! │  └─────────────────┘   │  quantity       │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────────────┐        ┌─────────────────────────┐        │
//! │  │     PendingEntry        │ commit │      LedgerEntry        │        │
//! │  │  ─────────────────────  │ ─────► │  ─────────────────────  │        │
//! │  │  row_id (session seq)   │        │  id (UUID v4)           │        │
//! │  │  user/product code      │        │  user/product code      │        │
//! │  │  quantity (net delta)   │        │  quantity (net delta)   │        │
//! │  │  activity, updated_at   │        │  activity, recorded_at  │        │
//! │  └─────────────────────────┘        └─────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Codes are whatever the barcode scanner emits and are compared as exact
//! strings.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::TIMESTAMP_FORMAT;

// =============================================================================
// User
// =============================================================================

/// A person allowed to take and return products.
///
/// Reference data: the session looks users up but never creates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    /// Scanned identifier (badge barcode).
    pub code: String,

    /// Display name shown on the current-user line.
    pub name: String,
}

impl User {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        User {
            code: code.into(),
            name: name.into(),
        }
    }

    /// Label for the current-user line: `Anna (U1)`.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Scanned identifier (product barcode).
    pub code: String,

    /// Display name.
    pub name: String,

    /// Current stored quantity. Only committed batches change it.
    pub quantity: i64,
}

impl Product {
    pub fn new(code: impl Into<String>, name: impl Into<String>, quantity: i64) -> Self {
        Product {
            code: code.into(),
            name: name.into(),
            quantity,
        }
    }
}

// =============================================================================
// Activity
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Activity {
    /// Product leaves the stock room.
    #[default]
    #[serde(rename = "Take Product")]
    Take,

    /// Product comes back.
    #[serde(rename = "Return Product")]
    Return,
}

impl Activity {
    /// Signed quantity contributed by one scan in this mode.
    #[inline]
    pub const fn unit_delta(self) -> i64 {
        match self {
            Activity::Take => -1,
            Activity::Return => 1,
        }
    }

    /// Label for a net delta: negative is a take, anything else a return.
    #[inline]
    pub const fn from_delta(delta: i64) -> Self {
        if delta < 0 {
            Activity::Take
        } else {
            Activity::Return
        }
    }

    /// Label stored in the ledger and shown in the batch table.
    pub const fn label(self) -> &'static str {
        match self {
            Activity::Take => "Take Product",
            Activity::Return => "Return Product",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Activity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Take Product" => Ok(Activity::Take),
            "Return Product" => Ok(Activity::Return),
            other => Err(ValidationError::InvalidFormat {
                field: "activity".to_string(),
                reason: format!("unknown activity label '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Pending Entry
// =============================================================================

/// One row of the open batch.
///
/// ## Invariants
/// - At most one entry per `product_code` in a batch
/// - `quantity` is never zero (a net no-op row is removed)
/// - `activity == Activity::from_delta(quantity)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Sequential id, unique for the lifetime of the process.
    pub row_id: u64,
    pub user_code: String,
    pub product_code: String,
    /// Net signed delta (negative = taken, positive = returned).
    pub quantity: i64,
    pub activity: Activity,
    /// Time of the last scan that touched this row.
    pub updated_at: NaiveDateTime,
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// Immutable historical record written on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub user_code: String,
    pub product_code: String,
    pub quantity: i64,
    pub activity: Activity,
    pub recorded_at: NaiveDateTime,
}

// =============================================================================
// Timestamps
// =============================================================================

/// Drops sub-second precision; stored timestamps have whole seconds.
pub fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|e| {
        ValidationError::InvalidFormat {
            field: "timestamp".to_string(),
            reason: e.to_string(),
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_activity_unit_delta() {
        assert_eq!(Activity::Take.unit_delta(), -1);
        assert_eq!(Activity::Return.unit_delta(), 1);
    }

    #[test]
    fn test_activity_from_delta() {
        assert_eq!(Activity::from_delta(-3), Activity::Take);
        assert_eq!(Activity::from_delta(2), Activity::Return);
        assert_eq!(Activity::from_delta(0), Activity::Return);
    }

    #[test]
    fn test_activity_labels_parse_back() {
        assert_eq!("Take Product".parse::<Activity>().unwrap(), Activity::Take);
        assert_eq!("Return Product".parse::<Activity>().unwrap(), Activity::Return);
        assert!("take".parse::<Activity>().is_err());
    }

    #[test]
    fn test_activity_default_is_take() {
        assert_eq!(Activity::default(), Activity::Take);
    }

    #[test]
    fn test_user_display_label() {
        let user = User::new("U1", "Anna");
        assert_eq!(user.display_label(), "Anna (U1)");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(8, 5, 9, 750)
            .unwrap();

        let truncated = truncate_to_seconds(ts);
        assert_eq!(format_timestamp(&truncated), "2024-03-01 08:05:09");
        assert_eq!(parse_timestamp("2024-03-01 08:05:09").unwrap(), truncated);
        assert!(parse_timestamp("01/03/2024").is_err());
    }
}
