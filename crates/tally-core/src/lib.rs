//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally. It contains the scan session state
//! machine and the pending-batch arithmetic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Terminal (barcode scanner on stdin)             │   │
//! │  │      scan user ──► scan products ──► scan user (commit)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ScanController (app)                         │   │
//! │  │    classify marker → resolve user/product → apply → effects     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   scan    │  │   batch   │  │  session  │  │   │
//! │  │   │  User     │  │  Markers  │  │  Pending  │  │  apply()  │  │   │
//! │  │   │  Product  │  │  Events   │  │  Batch    │  │  Effects  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │             users, products, ledger, commit_batch               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Product, PendingEntry, LedgerEntry)
//! - [`scan`] - Reserved marker codes and resolved scan events
//! - [`batch`] - The pending batch with per-product coalescing
//! - [`session`] - The session state machine (`Session::apply`)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tally_core::{Activity, Product, ScanEvent, Session, User};
//!
//! let now = NaiveDate::from_ymd_opt(2024, 3, 1)
//!     .unwrap()
//!     .and_hms_opt(8, 30, 0)
//!     .unwrap();
//! let user = User::new("U1", "Anna");
//! let drill = Product::new("P1", "Drill", 5);
//!
//! let session = Session::new()
//!     .apply(ScanEvent::User(user), now)
//!     .session
//!     .apply(ScanEvent::product("P1", Some(drill.clone())), now)
//!     .session
//!     .apply(ScanEvent::product("P1", Some(drill)), now)
//!     .session;
//!
//! let entry = session.batch().entry_for("P1").unwrap();
//! assert_eq!(entry.quantity, -2);
//! assert_eq!(entry.activity, Activity::Take);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod error;
pub mod scan;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use batch::{PendingBatch, RowIdSequence, StageOutcome};
pub use error::{ScanError, ValidationError};
pub use scan::{Marker, ScanEvent, ScanMarkers};
pub use session::{CommitRequest, Effect, Session, Transition};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Timestamp layout used for pending rows and ledger entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Maximum length of a user or product code.
///
/// Scanners emit EAN-13/Code-128 payloads; anything longer is almost
/// certainly two scans run together without a line break.
pub const MAX_CODE_LENGTH: usize = 64;

/// Default reserved code that selects the Take mode.
pub const DEFAULT_TAKE_CODE: &str = "1";

/// Default reserved code that selects the Return mode.
pub const DEFAULT_RETURN_CODE: &str = "2";

/// Default reserved code that discards the pending batch.
pub const DEFAULT_CANCEL_CODE: &str = "3";
