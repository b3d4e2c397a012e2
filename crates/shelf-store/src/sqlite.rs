//! SQLite product store.
//!
//! Products live in a single table:
//!
//! ```sql
//! CREATE TABLE product (
//!     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//!     name        TEXT    NOT NULL,
//!     description TEXT,
//!     price       INTEGER NOT NULL,
//!     rating      REAL,
//!     category    TEXT    NOT NULL
//! )
//! ```
//!
//! `AUTOINCREMENT` keeps ids monotonic: a deleted id is never handed out again.

use std::str::FromStr;

use async_trait::async_trait;
use shelf_core::{Error, NewProduct, Product, ProductId, ProductStore, Result};
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const CREATE_PRODUCT_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS product (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    description TEXT,
    price       INTEGER NOT NULL,
    rating      REAL,
    category    TEXT    NOT NULL
)";

const INSERT_PRODUCT: &str = "\
INSERT INTO product (name, description, price, rating, category) VALUES (?, ?, ?, ?, ?)";

const DELETE_PRODUCT: &str = "DELETE FROM product WHERE id = ?";

const SELECT_PAGE: &str = "\
SELECT id, name, description, price, rating, category
FROM product
ORDER BY id ASC
LIMIT ? OFFSET ?";

/// Default pool size for file-backed databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: i64,
    rating: Option<f64>,
    category: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            rating: row.rating,
            category: row.category,
        }
    }
}

fn store_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::persistence_with_source(format!("{context}: {e}"), e)
}

fn to_sql_int(value: usize, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::validation_field(what, "value out of range"))
}

/// Product store backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteProductStore {
    pool: SqlitePool,
}

impl SqliteProductStore {
    /// Connect to `url` (e.g. `sqlite://shelf.db`), creating the database
    /// file and the product table if needed.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::config(format!("Invalid database URL '{url}': {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(store_error("Failed to connect to database"))?;

        log::info!("Connected to product database at {url}");
        Self::from_pool(pool).await
    }

    /// A private in-memory database.
    ///
    /// Uses a single long-lived connection, since every SQLite in-memory
    /// connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::config(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(store_error("Failed to open in-memory database"))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.ensure_table().await?;
        Ok(store)
    }

    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(CREATE_PRODUCT_TABLE)
            .execute(&self.pool)
            .await
            .map_err(store_error("Failed to create product table"))?;
        Ok(())
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn insert(&self, product: &NewProduct) -> Result<ProductId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;

        let result = sqlx::query(INSERT_PRODUCT)
            .bind(product.name.as_str())
            .bind(product.description.as_deref())
            .bind(product.price)
            .bind(product.rating)
            .bind(product.category.as_str())
            .execute(&mut *tx)
            .await
            .map_err(store_error("Failed to insert product"))?;

        tx.commit()
            .await
            .map_err(store_error("Failed to commit product insert"))?;

        let id = result.last_insert_rowid();
        log::debug!("Inserted product {id}");
        Ok(id)
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query(DELETE_PRODUCT)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Failed to delete product"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_page(&self, offset: usize, limit: usize) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(SELECT_PAGE)
            .bind(to_sql_int(limit, "size")?)
            .bind(to_sql_int(offset, "page")?)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("Failed to list products"))?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

impl std::fmt::Debug for SqliteProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProductStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
