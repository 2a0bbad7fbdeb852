//! # Ledger Repository
//!
//! Append-only history of committed takes and returns.
//!
//! Rows are never updated or deleted. `activity` and `recorded_at` are stored
//! as TEXT and decoded through [`LedgerRow`].

use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{format_timestamp, parse_timestamp, truncate_to_seconds, Activity, LedgerEntry};

/// Raw ledger row as stored.
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: String,
    user_code: String,
    product_code: String,
    quantity: i64,
    activity: String,
    recorded_at: String,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = DbError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let activity = row
            .activity
            .parse::<Activity>()
            .map_err(|e| DbError::invalid_data("ledger.activity", e.to_string()))?;
        let recorded_at = parse_timestamp(&row.recorded_at)
            .map_err(|e| DbError::invalid_data("ledger.recorded_at", e.to_string()))?;

        Ok(LedgerEntry {
            id: row.id,
            user_code: row.user_code,
            product_code: row.product_code,
            quantity: row.quantity,
            activity,
            recorded_at,
        })
    }
}

/// Repository for ledger database operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends one row in its own implicit transaction.
    ///
    /// ## Returns
    /// The stored entry, with a fresh UUID and the timestamp truncated to
    /// whole seconds.
    pub async fn append(
        &self,
        user_code: &str,
        product_code: &str,
        quantity: i64,
        activity: Activity,
        recorded_at: NaiveDateTime,
    ) -> DbResult<LedgerEntry> {
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            user_code: user_code.to_string(),
            product_code: product_code.to_string(),
            quantity,
            activity,
            recorded_at: truncate_to_seconds(recorded_at),
        };

        let mut conn = self.pool.acquire().await?;
        insert_on(&mut conn, &entry).await?;

        Ok(entry)
    }

    /// Most recent entries first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, user_code, product_code, quantity, activity, recorded_at
            FROM ledger
            ORDER BY rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// All entries for one product, oldest first.
    pub async fn list_for_product(&self, product_code: &str) -> DbResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, user_code, product_code, quantity, activity, recorded_at
            FROM ledger
            WHERE product_code = ?1
            ORDER BY rowid
            "#,
        )
        .bind(product_code)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// Counts ledger rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn insert_on(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
    debug!(
        user = %entry.user_code,
        product = %entry.product_code,
        quantity = entry.quantity,
        "Appending ledger entry"
    );

    sqlx::query(
        r#"
        INSERT INTO ledger (id, user_code, product_code, quantity, activity, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.user_code)
    .bind(&entry.product_code)
    .bind(entry.quantity)
    .bind(entry.activity.label())
    .bind(format_timestamp(&entry.recorded_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
