//! # Scan Session
//!
//! The state machine that interprets one resolved scan at a time.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Transitions                              │
//! │                                                                         │
//! │          User(u)                                                        │
//! │   ┌────────┐ ───────────────────────────► ┌─────────────────────────┐   │
//! │   │ NoUser │                              │ UserActive(u, mode)     │   │
//! │   └────────┘ ◄─────────────────────────── │  batch: PendingBatch    │   │
//! │       ▲        User(u) again: commit      └─────────────────────────┘   │
//! │       │                                     │      ▲                    │
//! │       │                                     │      │ User(v), v != u:   │
//! │   Product → NoActiveUser                    └──────┘ commit, switch     │
//! │                                                                         │
//! │  In any state:  SelectMode(m) → mode = m                                │
//! │                 Cancel        → batch discarded (no commit)             │
//! │  UserActive:    Product       → stage into batch (or reject)            │
//! │                 Save          → commit, stay active                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects as Data
//! [`Session::apply`] consumes the session and returns the next one together
//! with the [`Effect`]s the caller must carry out. Persisting a commit is an
//! effect, so the caller can keep the previous session if the store fails.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::batch::PendingBatch;
use crate::error::ScanError;
use crate::scan::ScanEvent;
use crate::types::{Activity, PendingEntry, Product, User};

// =============================================================================
// Effects
// =============================================================================

/// A batch handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub user_code: String,
    /// Rows in insertion order.
    pub entries: Vec<PendingEntry>,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist these rows (ledger first, then quantities).
    Commit(CommitRequest),
    /// Show a rejected scan on the status line.
    Status(ScanError),
    ModeChanged(Activity),
    ActiveUserChanged(Option<User>),
    /// Re-render the batch table.
    BatchChanged,
}

/// Result of [`Session::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(session: Session, effects: Vec<Effect>) -> Self {
        Transition { session, effects }
    }

    fn rejected(session: Session, error: ScanError) -> Self {
        Transition::new(session, vec![Effect::Status(error)])
    }

    /// The rejection reported by this transition, if any.
    pub fn status(&self) -> Option<&ScanError> {
        self.effects.iter().find_map(|e| match e {
            Effect::Status(err) => Some(err),
            _ => None,
        })
    }

    /// The commit requested by this transition, if any.
    pub fn commit(&self) -> Option<&CommitRequest> {
        self.effects.iter().find_map(|e| match e {
            Effect::Commit(req) => Some(req),
            _ => None,
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// Active user, activity mode and open batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    active_user: Option<User>,
    mode: Activity,
    batch: PendingBatch,
}

impl Session {
    /// No active user, Take mode, empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_user(&self) -> Option<&User> {
        self.active_user.as_ref()
    }

    pub fn mode(&self) -> Activity {
        self.mode
    }

    pub fn batch(&self) -> &PendingBatch {
        &self.batch
    }

    /// Applies one resolved scan.
    pub fn apply(self, event: ScanEvent, now: NaiveDateTime) -> Transition {
        match event {
            ScanEvent::SelectMode(mode) => self.select_mode(mode),
            ScanEvent::Cancel => self.cancel(),
            ScanEvent::Save => self.save(),
            ScanEvent::User(user) => self.scan_user(user),
            ScanEvent::Product { code, product } => self.scan_product(code, product, now),
        }
    }

    fn select_mode(mut self, mode: Activity) -> Transition {
        self.mode = mode;
        Transition::new(self, vec![Effect::ModeChanged(mode)])
    }

    fn cancel(mut self) -> Transition {
        self.batch.clear();
        Transition::new(self, vec![Effect::BatchChanged])
    }

    fn save(mut self) -> Transition {
        let mut effects = Vec::new();
        if let Some(commit) = self.drain_batch() {
            effects.push(Effect::Commit(commit));
            effects.push(Effect::BatchChanged);
        }
        Transition::new(self, effects)
    }

    fn scan_user(mut self, user: User) -> Transition {
        let mut effects = Vec::new();

        if let Some(commit) = self.drain_batch() {
            effects.push(Effect::Commit(commit));
        }

        let same_user = self
            .active_user
            .as_ref()
            .is_some_and(|active| active.code == user.code);

        self.active_user = if same_user { None } else { Some(user) };
        effects.push(Effect::ActiveUserChanged(self.active_user.clone()));
        effects.push(Effect::BatchChanged);

        Transition::new(self, effects)
    }

    fn scan_product(
        mut self,
        code: String,
        product: Option<Product>,
        now: NaiveDateTime,
    ) -> Transition {
        let Some(user_code) = self.active_user.as_ref().map(|u| u.code.clone()) else {
            return Transition::rejected(self, ScanError::NoActiveUser);
        };

        let Some(product) = product else {
            return Transition::rejected(self, ScanError::UnknownProduct { code });
        };

        match self.batch.stage(&user_code, &product, self.mode, now) {
            Ok(_) => Transition::new(self, vec![Effect::BatchChanged]),
            Err(err) => Transition::rejected(self, err),
        }
    }

    /// Takes the batch as a commit request when there is anything to commit.
    fn drain_batch(&mut self) -> Option<CommitRequest> {
        let user = self.active_user.as_ref()?;
        if self.batch.is_empty() {
            return None;
        }
        Some(CommitRequest {
            user_code: user.code.clone(),
            entries: self.batch.take_entries(),
        })
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

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn anna() -> User {
        User::new("U1", "Anna")
    }

    fn piotr() -> User {
        User::new("U2", "Piotr")
    }

    fn drill(quantity: i64) -> Product {
        Product::new("P1", "Drill", quantity)
    }

    fn scan_product(session: Session, product: Product) -> Transition {
        let code = product.code.clone();
        session.apply(ScanEvent::product(code, Some(product)), now())
    }

    fn active(user: User) -> Session {
        Session::new().apply(ScanEvent::User(user), now()).session
    }

    #[test]
    fn test_new_session_has_no_user_and_take_mode() {
        let session = Session::new();
        assert!(session.active_user().is_none());
        assert_eq!(session.mode(), Activity::Take);
        assert!(session.batch().is_empty());
    }

    #[test]
    fn test_select_mode_keeps_state() {
        let session = active(anna());
        let t = session.apply(ScanEvent::SelectMode(Activity::Return), now());

        assert_eq!(t.session.mode(), Activity::Return);
        assert_eq!(t.session.active_user(), Some(&anna()));
        assert_eq!(t.effects, vec![Effect::ModeChanged(Activity::Return)]);
    }

    #[test]
    fn test_product_without_user_is_rejected() {
        let t = scan_product(Session::new(), drill(5));

        assert_eq!(t.status(), Some(&ScanError::NoActiveUser));
        assert_eq!(t.session, Session::new());
    }

    #[test]
    fn test_unknown_product_is_rejected() {
        let session = active(anna());
        let before = session.clone();

        let t = session.apply(ScanEvent::product("NOPE", None), now());

        assert_matches!(t.status(), Some(ScanError::UnknownProduct { code }) if code == "NOPE");
        assert_eq!(t.session, before);
    }

    #[test]
    fn test_first_user_scan_needs_no_commit() {
        let t = Session::new().apply(ScanEvent::User(anna()), now());

        assert!(t.commit().is_none());
        assert_eq!(t.session.active_user(), Some(&anna()));
        assert!(t
            .effects
            .contains(&Effect::ActiveUserChanged(Some(anna()))));
    }

    #[test]
    fn test_repeated_takes_coalesce() {
        let mut session = active(anna());
        for _ in 0..2 {
            session = scan_product(session, drill(5)).session;
        }

        assert_eq!(session.batch().len(), 1);
        let entry = session.batch().entry_for("P1").unwrap();
        assert_eq!(entry.quantity, -2);
        assert_eq!(entry.activity, Activity::Take);
    }

    #[test]
    fn test_take_then_return_cancels_out() {
        let session = scan_product(active(anna()), drill(5)).session;
        let session = session
            .apply(ScanEvent::SelectMode(Activity::Return), now())
            .session;
        let session = scan_product(session, drill(5)).session;

        assert!(session.batch().is_empty());
    }

    #[test]
    fn test_insufficient_stock_leaves_batch_unchanged() {
        let mut session = active(anna());
        session = scan_product(session, drill(2)).session;
        session = scan_product(session, drill(2)).session;
        let before = session.clone();

        let t = scan_product(session, drill(2));

        assert_matches!(t.status(), Some(ScanError::InsufficientStock { .. }));
        assert_eq!(t.session, before);
    }

    #[test]
    fn test_same_user_commits_and_logs_out() {
        let session = scan_product(active(anna()), drill(5)).session;

        let t = session.apply(ScanEvent::User(anna()), now());

        let commit = t.commit().expect("batch should be committed");
        assert_eq!(commit.user_code, "U1");
        assert_eq!(commit.entries.len(), 1);
        assert_eq!(commit.entries[0].quantity, -1);
        assert!(t.session.active_user().is_none());
        assert!(t.session.batch().is_empty());
    }

    #[test]
    fn test_switching_user_commits_old_batch_and_keeps_mode() {
        let session = active(anna())
            .apply(ScanEvent::SelectMode(Activity::Return), now())
            .session;
        let session = scan_product(session, drill(5)).session;

        let t = session.apply(ScanEvent::User(piotr()), now());

        let commit = t.commit().expect("old batch should be committed");
        assert_eq!(commit.user_code, "U1");
        assert_eq!(commit.entries[0].quantity, 1);
        assert_eq!(t.session.active_user(), Some(&piotr()));
        assert_eq!(t.session.mode(), Activity::Return);
        assert!(t.session.batch().is_empty());

        // Commit comes before the user change
        assert_matches!(t.effects[0], Effect::Commit(_));
    }

    #[test]
    fn test_user_scan_with_empty_batch_skips_commit() {
        let t = active(anna()).apply(ScanEvent::User(anna()), now());

        assert!(t.commit().is_none());
        assert!(t.session.active_user().is_none());
    }

    #[test]
    fn test_cancel_discards_without_commit() {
        let session = scan_product(active(anna()), drill(5)).session;

        let t = session.apply(ScanEvent::Cancel, now());

        assert!(t.commit().is_none());
        assert!(t.session.batch().is_empty());
        assert_eq!(t.session.active_user(), Some(&anna()));
    }

    #[test]
    fn test_save_commits_and_stays_active() {
        let session = scan_product(active(anna()), drill(5)).session;

        let t = session.apply(ScanEvent::Save, now());

        assert!(t.commit().is_some());
        assert!(t.session.batch().is_empty());
        assert_eq!(t.session.active_user(), Some(&anna()));
    }

    #[test]
    fn test_save_with_nothing_pending_is_noop() {
        let session = active(anna());
        let t = session.clone().apply(ScanEvent::Save, now());

        assert!(t.effects.is_empty());
        assert_eq!(t.session, session);
    }

    #[test]
    fn test_row_ids_continue_after_commit() {
        let session = scan_product(active(anna()), drill(5)).session;
        let session = session.apply(ScanEvent::Save, now()).session;
        let session = scan_product(session, drill(5)).session;

        assert_eq!(session.batch().entry_for("P1").unwrap().row_id, 2);
    }
}
