//! # Scan Controller
//!
//! Connects the pure [`Session`] to the store.
//!
//! ## One Scan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "P1"                                                                   │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  resolve   marker? ─► user lookup ─► product lookup (only with a user)  │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  session.clone().apply(event, now)  ─►  Transition { session, effects } │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  run effects in order      Commit ─► Database::commit_batch            │
//! │    │                                                                    │
//! │    ├── all ok   ─► self.session = transition.session                   │
//! │    ├── store err, nothing written ─► keep the old session, return Err  │
//! │    └── store err after ledger rows ─► adopt the new session, return Err│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use tally_core::validation::validate_code;
use tally_core::{
    truncate_to_seconds, Activity, Effect, LedgerEntry, PendingEntry, Product, ScanEvent,
    ScanMarkers, Session, User,
};
use tally_db::{CommitSummary, Database};

use crate::error::{ApiError, ApiResult};

/// What the display needs after each operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Why the scan was refused, for the status line.
    pub status: Option<ApiError>,

    pub active_user: Option<User>,

    pub mode: Activity,

    /// Pending rows in insertion order.
    pub rows: Vec<PendingEntry>,

    /// Present when this operation committed a batch.
    pub commit: Option<CommitSummary>,
}

impl ScanReport {
    pub fn is_rejected(&self) -> bool {
        self.status.is_some()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.message.as_str())
    }
}

/// Owns the session and resolves scans against the store.
#[derive(Debug)]
pub struct ScanController {
    db: Database,
    markers: ScanMarkers,
    session: Session,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ScanController {
    pub fn new(db: Database, markers: ScanMarkers) -> Self {
        ScanController {
            db,
            markers,
            session: Session::new(),
            clock: local_now,
        }
    }

    /// Replaces the wall clock (tests).
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handles one scanned code.
    ///
    /// Rejected scans come back as `Ok` with [`ScanReport::status`] set.
    /// `Err` means the store failed. The session is left unchanged unless
    /// the failed commit already reached the ledger.
    pub async fn scan(&mut self, code: &str) -> ApiResult<ScanReport> {
        let code = code.trim();
        validate_code(code)?;

        let event = self.resolve(code).await?;
        self.dispatch(event).await
    }

    /// Commits the batch and keeps the user active.
    pub async fn save(&mut self) -> ApiResult<ScanReport> {
        self.dispatch(ScanEvent::Save).await
    }

    /// Discards the batch.
    pub async fn cancel(&mut self) -> ApiResult<ScanReport> {
        self.dispatch(ScanEvent::Cancel).await
    }

    /// Most recent ledger rows first.
    pub async fn history(&self, limit: u32) -> ApiResult<Vec<LedgerEntry>> {
        Ok(self.db.ledger().list_recent(limit).await?)
    }

    /// Stored products ordered by code.
    pub async fn stock(&self, limit: u32) -> ApiResult<Vec<Product>> {
        Ok(self.db.products().list(limit).await?)
    }

    /// One product with its ledger rows, oldest first.
    pub async fn product_history(&self, code: &str) -> ApiResult<(Product, Vec<LedgerEntry>)> {
        let product = self
            .db
            .find_product(code)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", code))?;
        let entries = self.db.ledger().list_for_product(code).await?;
        Ok((product, entries))
    }

    /// Current state without a status or commit.
    pub fn report(&self) -> ScanReport {
        self.build_report(None, None)
    }

    async fn resolve(&self, code: &str) -> ApiResult<ScanEvent> {
        if let Some(marker) = self.markers.classify(code) {
            debug!(code = %code, ?marker, "Marker scanned");
            return Ok(marker.into());
        }

        if let Some(user) = self.db.find_user(code).await? {
            return Ok(ScanEvent::User(user));
        }

        // Without a user the session rejects any product, so skip the lookup
        if self.session.active_user().is_none() {
            return Ok(ScanEvent::product(code, None));
        }

        let product = self.db.find_product(code).await?;
        Ok(ScanEvent::product(code, product))
    }

    async fn dispatch(&mut self, event: ScanEvent) -> ApiResult<ScanReport> {
        let now = truncate_to_seconds((self.clock)());
        let transition = self.session.clone().apply(event, now);

        let mut status = None;
        let mut commit = None;

        for effect in &transition.effects {
            match effect {
                Effect::Commit(request) => {
                    info!(
                        user = %request.user_code,
                        rows = request.entries.len(),
                        "Committing batch"
                    );
                    match self.db.commit_batch(&request.entries).await {
                        Ok(summary) => commit = Some(summary),
                        Err(err) if err.is_flushed() => {
                            // The batch is in the ledger, committing it again would duplicate it
                            self.session = transition.session;
                            return Err(err.into());
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Effect::Status(err) => {
                    debug!(%err, "Scan rejected");
                    status = Some(ApiError::from(err.clone()));
                }
                Effect::ModeChanged(mode) => debug!(%mode, "Mode changed"),
                Effect::ActiveUserChanged(Some(user)) => info!(user = %user.code, "User active"),
                Effect::ActiveUserChanged(None) => info!("User logged out"),
                Effect::BatchChanged => {}
            }
        }

        self.session = transition.session;
        Ok(self.build_report(status, commit))
    }

    fn build_report(&self, status: Option<ApiError>, commit: Option<CommitSummary>) -> ScanReport {
        ScanReport {
            status,
            active_user: self.session.active_user().cloned(),
            mode: self.session.mode(),
            rows: self.session.batch().entries().to_vec(),
            commit,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
