//! # User Repository
//!
//! Users are reference data: the scan loop only reads them.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::User;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by exact code. The first inserted row wins.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<User>> {
        debug!(code = %code, "Looking up user");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT code, name
            FROM users
            WHERE code = ?1
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Inserts a new user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, user: &User) -> DbResult<User> {
        debug!(code = %user.code, "Inserting user");

        sqlx::query("INSERT INTO users (code, name) VALUES (?1, ?2)")
            .bind(&user.code)
            .bind(&user.name)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &user.code),
                other => other,
            })?;

        Ok(user.clone())
    }

    /// Counts stored users (for diagnostics and the seeder).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use assert_matches::assert_matches;
    use tally_core::User;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_find_by_code_exact_match() {
        let db = db().await;
        db.users().insert(&User::new("U1", "Anna")).await.unwrap();

        let found = db.users().find_by_code("U1").await.unwrap();
        assert_eq!(found, Some(User::new("U1", "Anna")));

        assert!(db.users().find_by_code("u1").await.unwrap().is_none());
        assert!(db.users().find_by_code("U").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_code_is_rejected() {
        let db = db().await;
        db.users().insert(&User::new("U1", "Anna")).await.unwrap();

        let result = db.users().insert(&User::new("U1", "Other")).await;

        assert_matches!(result, Err(DbError::UniqueViolation { value, .. }) if value == "U1");
        assert_eq!(db.users().count().await.unwrap(), 1);
    }
}
