//! # Scan Codes
//!
//! Classification of raw scanned strings.
//!
//! ## Resolution Order
//! ```text
//! raw code
//!    │
//!    ├── == take marker?    → ScanEvent::SelectMode(Take)
//!    ├── == return marker?  → ScanEvent::SelectMode(Return)
//!    ├── == cancel marker?  → ScanEvent::Cancel
//!    ├── known user?        → ScanEvent::User(user)          (store lookup)
//!    └── otherwise          → ScanEvent::Product { .. }      (store lookup)
//! ```
//!
//! Only the marker step is pure; the controller performs the lookups and
//! hands the session a fully resolved [`ScanEvent`].

use serde::{Deserialize, Serialize};

use crate::types::{Activity, Product, User};
use crate::{DEFAULT_CANCEL_CODE, DEFAULT_RETURN_CODE, DEFAULT_TAKE_CODE};

/// A reserved scan code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Take,
    Return,
    Cancel,
}

/// The reserved codes printed on the operator's marker card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMarkers {
    #[serde(default = "default_take")]
    pub take: String,

    #[serde(rename = "return", default = "default_return")]
    pub return_: String,

    #[serde(default = "default_cancel")]
    pub cancel: String,
}

fn default_take() -> String {
    DEFAULT_TAKE_CODE.to_string()
}

fn default_return() -> String {
    DEFAULT_RETURN_CODE.to_string()
}

fn default_cancel() -> String {
    DEFAULT_CANCEL_CODE.to_string()
}

impl Default for ScanMarkers {
    fn default() -> Self {
        ScanMarkers {
            take: default_take(),
            return_: default_return(),
            cancel: default_cancel(),
        }
    }
}

impl ScanMarkers {
    /// Matches `code` exactly against the reserved codes.
    pub fn classify(&self, code: &str) -> Option<Marker> {
        if code == self.take {
            Some(Marker::Take)
        } else if code == self.return_ {
            Some(Marker::Return)
        } else if code == self.cancel {
            Some(Marker::Cancel)
        } else {
            None
        }
    }
}

/// A scan after store resolution, ready for [`crate::Session::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Take or Return marker.
    SelectMode(Activity),

    /// Cancel marker: discard the batch.
    Cancel,

    /// Explicit commit without changing user (the Save action).
    Save,

    /// Code resolved to a known user.
    User(User),

    /// Anything else. `product` is `None` when the store has no such code.
    Product {
        code: String,
        product: Option<Product>,
    },
}

impl ScanEvent {
    pub fn product(code: impl Into<String>, product: Option<Product>) -> Self {
        ScanEvent::Product {
            code: code.into(),
            product,
        }
    }
}

impl From<Marker> for ScanEvent {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::Take => ScanEvent::SelectMode(Activity::Take),
            Marker::Return => ScanEvent::SelectMode(Activity::Return),
            Marker::Cancel => ScanEvent::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers_classify() {
        let markers = ScanMarkers::default();

        assert_eq!(markers.classify("1"), Some(Marker::Take));
        assert_eq!(markers.classify("2"), Some(Marker::Return));
        assert_eq!(markers.classify("3"), Some(Marker::Cancel));
        assert_eq!(markers.classify("4"), None);
        // Exact match only
        assert_eq!(markers.classify(" 1"), None);
        assert_eq!(markers.classify("11"), None);
    }

    #[test]
    fn test_marker_into_event() {
        assert_eq!(
            ScanEvent::from(Marker::Take),
            ScanEvent::SelectMode(Activity::Take)
        );
        assert_eq!(
            ScanEvent::from(Marker::Return),
            ScanEvent::SelectMode(Activity::Return)
        );
        assert_eq!(ScanEvent::from(Marker::Cancel), ScanEvent::Cancel);
    }
}
