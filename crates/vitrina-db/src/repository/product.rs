//! # Product Repository
//!
//! The `inventory` collection: one row per product, variants stored as a
//! JSON document in the `variants` column.
//!
//! ## Row Layout
//! ```text
//! ┌──────────┬──────────┬───────┬───────┬────────────┬──────────────────────────────────┬───────┐
//! │ id       │ owner_id │ name  │ brand │ cost/sale  │ variants (JSON)                  │ stock │
//! ├──────────┼──────────┼───────┼───────┼────────────┼──────────────────────────────────┼───────┤
//! │ 7f3c…    │ u-ana    │ Shirt │ Acme  │ 500 / 1290 │ [{"size":"M","color":"Red",      │ 10    │
//! │          │          │       │       │            │   "stock":10}]                   │       │
//! └──────────┴──────────┴───────┴───────┴────────────┴──────────────────────────────────┴───────┘
//! ```
//!
//! Every query is scoped by `owner_id`: one user can never read or write
//! another user's products, even with a valid id.
//!
//! Methods on [`ProductRepository`] run on the pool and announce their
//! change right away. The `*_in` functions run inside a [`UnitOfWork`] and
//! announce on commit.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::changes::{ChangeEvent, ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;
use vitrina_core::{Money, Product, Variant};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    owner_id: String,
    name: String,
    brand: String,
    category: String,
    cost_cents: i64,
    sale_cents: i64,
    variants: String,
    stock: i64,
    date_incorporation: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let variants: Vec<Variant> = serde_json::from_str(&row.variants)?;
        Ok(Product {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            brand: row.brand,
            category: row.category,
            cost_price: Money::from_cents(row.cost_cents),
            sale_price: Money::from_cents(row.sale_cents),
            variants,
            stock: row.stock,
            date_incorporation: row.date_incorporation,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `inventory` collection.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let all = repo.list(&user.id).await?;
/// let shirt = repo.get(&user.id, "uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ProductRepository { pool, feed }
    }

    /// All products of `owner_id`, by name.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Product>> {
        select_all(&self.pool, owner_id).await
    }

    /// Gets a product by id.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - No such product in this user's inventory
    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
        select_one(&self.pool, owner_id, id).await
    }

    /// Inserts a new product.
    ///
    /// The store assigns the id and both timestamps; whatever the caller put
    /// there is replaced.
    pub async fn create(&self, product: Product) -> DbResult<Product> {
        let product = prepare_new(product);
        insert_row(&self.pool, &product).await?;
        self.feed.publish(ChangeEvent::new(Collection::Inventory, &product.owner_id));
        Ok(product)
    }

    /// Replaces every mutable field of an existing product.
    ///
    /// `date_incorporation` is never rewritten.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product with its new `updated_at`
    /// * `Err(DbError::NotFound)` - No such product in this user's inventory
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        let product = touched(product);
        update_row(&self.pool, &product).await?;
        self.feed.publish(ChangeEvent::new(Collection::Inventory, &product.owner_id));
        Ok(product)
    }

    /// Deletes a product. Sales that reference it are left untouched.
    pub async fn delete(&self, owner_id: &str, id: &str) -> DbResult<()> {
        delete_row(&self.pool, owner_id, id).await?;
        self.feed.publish(ChangeEvent::new(Collection::Inventory, owner_id));
        Ok(())
    }

    /// Counts the products of `owner_id`.
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Unit-of-work variants
    // =========================================================================

    pub async fn list_in(uow: &mut UnitOfWork, owner_id: &str) -> DbResult<Vec<Product>> {
        select_all(uow.conn(), owner_id).await
    }

    pub async fn get_in(uow: &mut UnitOfWork, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
        select_one(uow.conn(), owner_id, id).await
    }

    pub async fn create_in(uow: &mut UnitOfWork, product: Product) -> DbResult<Product> {
        let product = prepare_new(product);
        insert_row(uow.conn(), &product).await?;
        uow.touch(Collection::Inventory, &product.owner_id);
        Ok(product)
    }

    pub async fn update_in(uow: &mut UnitOfWork, product: &Product) -> DbResult<Product> {
        let product = touched(product);
        update_row(uow.conn(), &product).await?;
        uow.touch(Collection::Inventory, &product.owner_id);
        Ok(product)
    }

    pub async fn delete_in(uow: &mut UnitOfWork, owner_id: &str, id: &str) -> DbResult<()> {
        delete_row(uow.conn(), owner_id, id).await?;
        uow.touch(Collection::Inventory, owner_id);
        Ok(())
    }
}

/// Generates a new product id.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

fn prepare_new(mut product: Product) -> Product {
    let now = Utc::now();
    product.id = generate_product_id();
    product.date_incorporation = now;
    product.updated_at = now;
    product
}

fn touched(product: &Product) -> Product {
    let mut product = product.clone();
    product.updated_at = Utc::now();
    product
}

// =============================================================================
// Queries
// =============================================================================

async fn select_all<'e>(executor: impl SqliteExecutor<'e>, owner_id: &str) -> DbResult<Vec<Product>> {
    let rows: Vec<ProductRow> = sqlx::query_as(
        r#"
        SELECT
            id, owner_id, name, brand, category,
            cost_cents, sale_cents, variants, stock,
            date_incorporation, updated_at
        FROM products
        WHERE owner_id = ?1
        ORDER BY name COLLATE NOCASE, date_incorporation
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await?;

    debug!(owner_id = %owner_id, count = rows.len(), "Listed products");
    rows.into_iter().map(Product::try_from).collect()
}

async fn select_one<'e>(executor: impl SqliteExecutor<'e>, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(
        r#"
        SELECT
            id, owner_id, name, brand, category,
            cost_cents, sale_cents, variants, stock,
            date_incorporation, updated_at
        FROM products
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await?;

    row.map(Product::try_from).transpose()
}

async fn insert_row<'e>(executor: impl SqliteExecutor<'e>, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, name = %product.name, "Inserting product");

    let variants = serde_json::to_string(&product.variants)?;

    sqlx::query(
        r#"
        INSERT INTO products (
            id, owner_id, name, brand, category,
            cost_cents, sale_cents, variants, stock,
            date_incorporation, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&product.id)
    .bind(&product.owner_id)
    .bind(&product.name)
    .bind(&product.brand)
    .bind(&product.category)
    .bind(product.cost_price.cents())
    .bind(product.sale_price.cents())
    .bind(variants)
    .bind(product.stock)
    .bind(product.date_incorporation)
    .bind(product.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

async fn update_row<'e>(executor: impl SqliteExecutor<'e>, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, stock = product.stock, "Updating product");

    let variants = serde_json::to_string(&product.variants)?;

    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = ?3,
            brand = ?4,
            category = ?5,
            cost_cents = ?6,
            sale_cents = ?7,
            variants = ?8,
            stock = ?9,
            updated_at = ?10
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(&product.id)
    .bind(&product.owner_id)
    .bind(&product.name)
    .bind(&product.brand)
    .bind(&product.category)
    .bind(product.cost_price.cents())
    .bind(product.sale_price.cents())
    .bind(variants)
    .bind(product.stock)
    .bind(product.updated_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &product.id));
    }

    Ok(())
}

async fn delete_row<'e>(executor: impl SqliteExecutor<'e>, owner_id: &str, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting product");

    let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
