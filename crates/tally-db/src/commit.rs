//! # Batch Commit
//!
//! Persists a drained pending batch.
//!
//! ## Two Passes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entries (insertion order)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pass 1: ledger                     one INSERT per entry, each one      │
//! │  ──────────────                     committed on its own (autocommit)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pass 2: quantities                 BEGIN                               │
//! │  ──────────────────                   for each entry:                   │
//! │                                         read stored, write stored+delta │
//! │                                         (missing product: warn, skip)   │
//! │                                     COMMIT                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure in pass 2 rolls back every quantity change. Ledger rows written
//! in pass 1 stay: the ledger is the audit record. [`CommitError::written`]
//! lists them, and a batch with written rows must not be committed again.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use tally_core::{LedgerEntry, PendingEntry};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::product::{quantity_on, update_quantity_on};

/// Outcome of [`Database::commit_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Ledger rows written, in batch order.
    pub ledger_entries: Vec<LedgerEntry>,

    /// Number of products whose quantity changed.
    pub products_updated: usize,

    /// Product codes that no longer exist in the store.
    pub skipped_products: Vec<String>,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.ledger_entries.is_empty()
    }
}

/// A commit that stopped partway.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct CommitError {
    /// Ledger rows that were durably written before the failure.
    pub written: Vec<LedgerEntry>,

    pub source: DbError,
}

impl CommitError {
    /// True when part of the batch reached the ledger. Retrying such a batch
    /// would append those rows twice.
    pub fn is_flushed(&self) -> bool {
        !self.written.is_empty()
    }
}

impl Database {
    /// Writes one ledger row per entry, then applies every delta to the
    /// stored quantities in a single transaction.
    ///
    /// An empty slice does not touch the store.
    pub async fn commit_batch(&self, entries: &[PendingEntry]) -> Result<CommitSummary, CommitError> {
        if entries.is_empty() {
            return Ok(CommitSummary::default());
        }

        let mut summary = CommitSummary::default();

        for entry in entries {
            let appended = self
                .append_ledger_entry(
                    &entry.user_code,
                    &entry.product_code,
                    entry.quantity,
                    entry.activity,
                    entry.updated_at,
                )
                .await;

            match appended {
                Ok(written) => summary.ledger_entries.push(written),
                Err(source) => return Err(partial(summary, source)),
            }
        }

        if let Err(source) = self.apply_quantities(entries, &mut summary).await {
            return Err(partial(summary, source));
        }

        info!(
            ledger_entries = summary.ledger_entries.len(),
            products_updated = summary.products_updated,
            "Batch committed"
        );

        Ok(summary)
    }

    /// Pass 2: one transaction over every entry.
    async fn apply_quantities(
        &self,
        entries: &[PendingEntry],
        summary: &mut CommitSummary,
    ) -> DbResult<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for entry in entries {
            let Some(stored) = quantity_on(&mut tx, &entry.product_code).await? else {
                warn!(
                    code = %entry.product_code,
                    delta = entry.quantity,
                    "Product vanished before commit, quantity not updated"
                );
                summary.skipped_products.push(entry.product_code.clone());
                continue;
            };

            let quantity = stored.checked_add(entry.quantity).ok_or_else(|| {
                DbError::invalid_data(
                    "products.quantity",
                    format!("{} + {} overflows", stored, entry.quantity),
                )
            })?;

            update_quantity_on(&mut tx, &entry.product_code, quantity).await?;
            summary.products_updated += 1;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

fn partial(summary: CommitSummary, source: DbError) -> CommitError {
    if !summary.ledger_entries.is_empty() {
        error!(
            %source,
            ledger_entries = summary.ledger_entries.len(),
            "Commit failed after ledger rows were written, quantities not updated"
        );
    }
    CommitError {
        written: summary.ledger_entries,
        source,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
