//! # Pending Batch
//!
//! The rows accumulated for the active user before they are committed.
//!
//! ## Coalescing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Scan sequence (Take mode)        Batch after each scan                 │
//! │  ─────────────────────────        ─────────────────────────────────     │
//! │  P1                               #1 P1  -1  Take Product               │
//! │  P1                               #1 P1  -2  Take Product               │
//! │  P2                               #1 P1  -2  |  #2 P2  -1               │
//! │  (Return mode) P2                 #1 P1  -2          (#2 removed: 0)    │
//! │  P2                               #1 P1  -2  |  #3 P2  +1 Return        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row ids come from a [`RowIdSequence`] owned by the batch. Clearing the
//! batch keeps the sequence, so ids only restart with a new process.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::types::{truncate_to_seconds, Activity, PendingEntry, Product};

// =============================================================================
// Row Id Sequence
// =============================================================================

/// Monotonic row id generator, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIdSequence {
    next: u64,
}

impl RowIdSequence {
    pub const fn new() -> Self {
        RowIdSequence { next: 1 }
    }

    /// Returns the next id and advances.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for RowIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Stage Outcome
// =============================================================================

/// What a successful [`PendingBatch::stage`] did to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// A new row was appended.
    Inserted(u64),
    /// An existing row's delta changed.
    Updated(u64),
    /// An existing row netted out to zero and was dropped.
    Removed(u64),
}

impl StageOutcome {
    pub fn row_id(&self) -> u64 {
        match *self {
            StageOutcome::Inserted(id) | StageOutcome::Updated(id) | StageOutcome::Removed(id) => {
                id
            }
        }
    }
}

// =============================================================================
// Pending Batch
// =============================================================================

/// The open batch of pending rows, in insertion order.
///
/// ## Invariants
/// - Items are unique by `product_code` (scanning again changes the delta)
/// - No row has a zero delta
/// - Stored quantity + pending delta never goes below zero for a staged scan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingBatch {
    entries: Vec<PendingEntry>,
    sequence: RowIdSequence,
}

impl PendingBatch {
    /// Creates a new empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one scan of `product` in `activity` mode.
    ///
    /// ## Behavior
    /// - Checks `stored + pending + delta >= 0`, rejecting the scan otherwise
    /// - Rejects the scan when that sum does not fit in an `i64`
    /// - If the product already has a row: adds the delta, refreshes the
    ///   timestamp and label, and drops the row when it nets to zero
    /// - Otherwise appends a new row with the next row id
    ///
    /// The batch is untouched when an error is returned.
    pub fn stage(
        &mut self,
        user_code: &str,
        product: &Product,
        activity: Activity,
        now: NaiveDateTime,
    ) -> Result<StageOutcome, ScanError> {
        let delta = activity.unit_delta();
        let position = self
            .entries
            .iter()
            .position(|e| e.product_code == product.code);
        let pending = position.map_or(0, |i| self.entries[i].quantity);

        let out_of_range = || ScanError::QuantityOutOfRange {
            code: product.code.clone(),
        };
        let available = product
            .quantity
            .checked_add(pending)
            .ok_or_else(out_of_range)?;
        let prospective = available.checked_add(delta).ok_or_else(out_of_range)?;
        let new_pending = pending.checked_add(delta).ok_or_else(out_of_range)?;

        if prospective < 0 {
            return Err(ScanError::InsufficientStock {
                code: product.code.clone(),
                available,
                requested: -delta,
            });
        }

        let now = truncate_to_seconds(now);

        match position {
            Some(i) => {
                let entry = &mut self.entries[i];
                entry.quantity = new_pending;
                entry.activity = Activity::from_delta(entry.quantity);
                entry.updated_at = now;
                entry.user_code = user_code.to_string();

                let row_id = entry.row_id;
                if entry.quantity == 0 {
                    self.entries.remove(i);
                    Ok(StageOutcome::Removed(row_id))
                } else {
                    Ok(StageOutcome::Updated(row_id))
                }
            }
            None => {
                let row_id = self.sequence.next_id();
                self.entries.push(PendingEntry {
                    row_id,
                    user_code: user_code.to_string(),
                    product_code: product.code.clone(),
                    quantity: delta,
                    activity: Activity::from_delta(delta),
                    updated_at: now,
                });
                Ok(StageOutcome::Inserted(row_id))
            }
        }
    }

    /// Returns the row for `product_code`, if any.
    pub fn entry_for(&self, product_code: &str) -> Option<&PendingEntry> {
        self.entries.iter().find(|e| e.product_code == product_code)
    }

    /// Rows in insertion order.
    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    /// Drains the rows for commit. The row id sequence is kept.
    pub fn take_entries(&mut self) -> Vec<PendingEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Discards all rows. The row id sequence is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of rows (distinct products).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let mut seq = RowIdSequence::new();
        assert_eq!(seq.next_id(), 1);
        assert_eq!(seq.next_id(), 2);
        assert_eq!(seq.next_id(), 3);
    }

    #[test]
    fn test_stage_inserts_new_row() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", 5);

        let outcome = batch.stage("U1", &product, Activity::Take, at(0)).unwrap();

        assert_eq!(outcome, StageOutcome::Inserted(1));
        let entry = batch.entry_for("P1").unwrap();
        assert_eq!(entry.quantity, -1);
        assert_eq!(entry.activity, Activity::Take);
        assert_eq!(entry.user_code, "U1");
    }

    #[test]
    fn test_stage_same_product_coalesces() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", 5);

        batch.stage("U1", &product, Activity::Take, at(0)).unwrap();
        let outcome = batch.stage("U1", &product, Activity::Take, at(1)).unwrap();

        assert_eq!(outcome, StageOutcome::Updated(1));
        assert_eq!(batch.len(), 1);
        let entry = batch.entry_for("P1").unwrap();
        assert_eq!(entry.quantity, -2);
        assert_eq!(entry.updated_at, at(1));
    }

    #[test]
    fn test_stage_net_zero_removes_row() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", 5);

        batch.stage("U1", &product, Activity::Take, at(0)).unwrap();
        let outcome = batch.stage("U1", &product, Activity::Return, at(1)).unwrap();

        assert_eq!(outcome, StageOutcome::Removed(1));
        assert!(batch.is_empty());

        // A later scan gets a fresh row id
        let outcome = batch.stage("U1", &product, Activity::Take, at(2)).unwrap();
        assert_eq!(outcome, StageOutcome::Inserted(2));
    }

    #[test]
    fn test_stage_label_follows_net_sign() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", 5);

        batch.stage("U1", &product, Activity::Return, at(0)).unwrap();
        batch.stage("U1", &product, Activity::Return, at(0)).unwrap();
        assert_eq!(batch.entry_for("P1").unwrap().activity, Activity::Return);

        batch.stage("U1", &product, Activity::Take, at(1)).unwrap();
        batch.stage("U1", &product, Activity::Take, at(1)).unwrap();
        batch.stage("U1", &product, Activity::Take, at(1)).unwrap();
        let entry = batch.entry_for("P1").unwrap();
        assert_eq!(entry.quantity, -1);
        assert_eq!(entry.activity, Activity::Take);
    }

    #[test]
    fn test_stage_rejects_negative_stock() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", 2);

        batch.stage("U1", &product, Activity::Take, at(0)).unwrap();
        batch.stage("U1", &product, Activity::Take, at(1)).unwrap();
        let before = batch.clone();

        let result = batch.stage("U1", &product, Activity::Take, at(2));

        assert_matches!(
            result,
            Err(ScanError::InsufficientStock { ref code, available: 0, requested: 1 }) if code == "P1"
        );
        assert_eq!(batch, before);
    }

    #[test]
    fn test_stage_rejects_take_of_empty_product() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", 0);

        assert!(batch.stage("U1", &product, Activity::Take, at(0)).is_err());
        assert!(batch.is_empty());

        // Returning is always possible from zero
        assert!(batch.stage("U1", &product, Activity::Return, at(0)).is_ok());
    }

    #[test]
    fn test_clear_keeps_sequence() {
        let mut batch = PendingBatch::new();
        batch
            .stage("U1", &Product::new("P1", "Drill", 5), Activity::Take, at(0))
            .unwrap();
        batch
            .stage("U1", &Product::new("P2", "Saw", 5), Activity::Take, at(0))
            .unwrap();

        batch.clear();
        assert!(batch.is_empty());

        let outcome = batch
            .stage("U1", &Product::new("P3", "Tape", 5), Activity::Take, at(1))
            .unwrap();
        assert_eq!(outcome.row_id(), 3);
    }

    #[test]
    fn test_take_entries_preserves_insertion_order() {
        let mut batch = PendingBatch::new();
        for code in ["P3", "P1", "P2"] {
            batch
                .stage("U1", &Product::new(code, code, 5), Activity::Take, at(0))
                .unwrap();
        }

        let drained = batch.take_entries();
        let codes: Vec<_> = drained.iter().map(|e| e.product_code.as_str()).collect();
        assert_eq!(codes, ["P3", "P1", "P2"]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_stage_rejects_quantity_overflow() {
        let mut batch = PendingBatch::new();
        let product = Product::new("P1", "Drill", i64::MAX);

        let result = batch.stage("U1", &product, Activity::Return, at(0));

        assert_matches!(result, Err(ScanError::QuantityOutOfRange { ref code }) if code == "P1");
        assert!(batch.is_empty());

        // Taking from a full shelf still works
        assert!(batch.stage("U1", &product, Activity::Take, at(1)).is_ok());
    }
}
