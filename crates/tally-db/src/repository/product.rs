//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Exact-code lookup for scans
//! - Quantity overwrite on commit
//! - Insert and list for seeding
//!
//! ## Quantity Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Commit pass for one pending row (P1, -2)                           │
//! │                                                                     │
//! │  read:   SELECT quantity FROM products WHERE code = 'P1'  → 5      │
//! │  write:  UPDATE products SET quantity = 3 WHERE code = 'P1'        │
//! │                                                                     │
//! │  The stored value is re-read at commit time, so the new quantity   │
//! │  is always "current + net delta", never the value seen when the    │
//! │  product was scanned.                                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::Product;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// if let Some(product) = repo.find_by_code("P1").await? {
///     repo.update_quantity("P1", product.quantity - 1).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by exact code. The first inserted row wins.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found, with its stored quantity
    /// * `Ok(None)` - No product has this code
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        debug!(code = %code, "Looking up product");

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT code, name, quantity
            FROM products
            WHERE code = ?1
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products ordered by code.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT code, name, quantity
            FROM products
            ORDER BY code
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.code, quantity = product.quantity, "Inserting product");

        sqlx::query("INSERT INTO products (code, name, quantity) VALUES (?1, ?2, ?3)")
            .bind(&product.code)
            .bind(&product.name)
            .bind(product.quantity)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => {
                    DbError::duplicate(field, &product.code)
                }
                other => other,
            })?;

        Ok(product.clone())
    }

    /// Overwrites the stored quantity.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update_quantity(&self, code: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_quantity_on(&mut conn, code, quantity).await
    }

    /// Counts stored products (for diagnostics and the seeder).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Reads the stored quantity on an open connection or transaction.
pub(crate) async fn quantity_on(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<i64>> {
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM products WHERE code = ?1 ORDER BY rowid LIMIT 1",
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Writes the stored quantity on an open connection or transaction.
pub(crate) async fn update_quantity_on(
    conn: &mut SqliteConnection,
    code: &str,
    quantity: i64,
) -> DbResult<()> {
    debug!(code = %code, quantity, "Updating product quantity");

    let result = sqlx::query("UPDATE products SET quantity = ?2 WHERE code = ?1")
        .bind(code)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", code));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use assert_matches::assert_matches;
    use tally_core::Product;

    async fn db_with(products: &[Product]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for product in products {
            db.products().insert(product).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_find_by_code_returns_quantity() {
        let db = db_with(&[Product::new("P1", "Drill", 5)]).await;

        let product = db.products().find_by_code("P1").await.unwrap().unwrap();
        assert_eq!(product.name, "Drill");
        assert_eq!(product.quantity, 5);

        assert!(db.products().find_by_code("P2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_quantity_overwrites() {
        let db = db_with(&[Product::new("P1", "Drill", 5)]).await;

        db.products().update_quantity("P1", 0).await.unwrap();

        let product = db.products().find_by_code("P1").await.unwrap().unwrap();
        assert_eq!(product.quantity, 0);
    }

    #[tokio::test]
    async fn test_update_quantity_missing_product() {
        let db = db_with(&[]).await;

        let result = db.products().update_quantity("P404", 1).await;

        assert_matches!(result, Err(DbError::NotFound { entity, id }) if entity == "Product" && id == "P404");
    }

    #[tokio::test]
    async fn test_list_orders_by_code() {
        let db = db_with(&[
            Product::new("P2", "Saw", 1),
            Product::new("P1", "Drill", 5),
        ])
        .await;

        let codes: Vec<_> = db
            .products()
            .list(10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, ["P1", "P2"]);
        assert_eq!(db.products().count().await.unwrap(), 2);
    }
}
