//! # Sale Repository
//!
//! The `sales` collection: one row per sale, line items stored as a JSON
//! document in the `products` column.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE   insert_in()   id and date assigned by the store           │
//! │  2. EDIT     replace_in()  lines, defaults, total replaced; date        │
//! │                            refreshed                                   │
//! │  3. DELETE   delete_in()   row removed                                 │
//! │                                                                         │
//! │  Each step runs inside the same unit of work as the stock writes it    │
//! │  causes, so the sale record and the inventory never disagree.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::changes::{ChangeEvent, ChangeFeed, Collection};
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;
use vitrina_core::{Money, PaymentMethod, Sale, SaleLineItem, SalesChannel};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    owner_id: String,
    products: String,
    payment_method: String,
    channel: String,
    total_cents: i64,
    date: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        let products: Vec<SaleLineItem> = serde_json::from_str(&row.products)?;
        Ok(Sale {
            id: row.id,
            owner_id: row.owner_id,
            products,
            payment_method: PaymentMethod::from_label(&row.payment_method),
            channel: SalesChannel::from_label(&row.channel),
            total: Money::from_cents(row.total_cents),
            date: row.date,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `sales` collection.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        SaleRepository { pool, feed }
    }

    /// All sales of `owner_id`, newest first.
    pub async fn list(&self, owner_id: &str) -> DbResult<Vec<Sale>> {
        select_all(&self.pool, owner_id).await
    }

    /// Gets a sale by id.
    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Sale>> {
        select_one(&self.pool, owner_id, id).await
    }

    /// Inserts a sale outside any unit of work (imports, seeding).
    ///
    /// Stock is not touched; recording a sale that moves stock goes through
    /// the sale service.
    pub async fn insert(&self, sale: Sale) -> DbResult<Sale> {
        let sale = prepare_new(sale);
        insert_row(&self.pool, &sale).await?;
        self.feed.publish(ChangeEvent::new(Collection::Sales, &sale.owner_id));
        Ok(sale)
    }

    /// Counts the sales of `owner_id`.
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Unit-of-work variants
    // =========================================================================

    pub async fn get_in(uow: &mut UnitOfWork, owner_id: &str, id: &str) -> DbResult<Option<Sale>> {
        select_one(uow.conn(), owner_id, id).await
    }

    /// Inserts a new sale; the store assigns its id and date.
    pub async fn insert_in(uow: &mut UnitOfWork, sale: Sale) -> DbResult<Sale> {
        let sale = prepare_new(sale);
        insert_row(uow.conn(), &sale).await?;
        uow.touch(Collection::Sales, &sale.owner_id);
        Ok(sale)
    }

    /// Replaces the lines, defaults and total of an existing sale and
    /// refreshes its date.
    pub async fn replace_in(uow: &mut UnitOfWork, sale: Sale) -> DbResult<Sale> {
        let mut sale = sale;
        sale.date = Utc::now();

        debug!(id = %sale.id, lines = sale.products.len(), "Replacing sale");

        let products = serde_json::to_string(&sale.products)?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                products = ?3,
                payment_method = ?4,
                channel = ?5,
                total_cents = ?6,
                date = ?7
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.owner_id)
        .bind(products)
        .bind(sale.payment_method.label())
        .bind(sale.channel.label())
        .bind(sale.total.cents())
        .bind(sale.date)
        .execute(uow.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        uow.touch(Collection::Sales, &sale.owner_id);
        Ok(sale)
    }

    pub async fn delete_in(uow: &mut UnitOfWork, owner_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(uow.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        uow.touch(Collection::Sales, owner_id);
        Ok(())
    }
}

/// Generates a new sale id.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

fn prepare_new(mut sale: Sale) -> Sale {
    sale.id = generate_sale_id();
    sale.date = Utc::now();
    sale
}

// =============================================================================
// Queries
// =============================================================================

async fn select_all<'e>(executor: impl SqliteExecutor<'e>, owner_id: &str) -> DbResult<Vec<Sale>> {
    let rows: Vec<SaleRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, products, payment_method, channel, total_cents, date
        FROM sales
        WHERE owner_id = ?1
        ORDER BY date DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await?;

    debug!(owner_id = %owner_id, count = rows.len(), "Listed sales");
    rows.into_iter().map(Sale::try_from).collect()
}

async fn select_one<'e>(executor: impl SqliteExecutor<'e>, owner_id: &str, id: &str) -> DbResult<Option<Sale>> {
    let row: Option<SaleRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, products, payment_method, channel, total_cents, date
        FROM sales
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await?;

    row.map(Sale::try_from).transpose()
}

async fn insert_row<'e>(executor: impl SqliteExecutor<'e>, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total = %sale.total, "Inserting sale");

    let products = serde_json::to_string(&sale.products)?;

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, owner_id, products, payment_method, channel, total_cents, date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.owner_id)
    .bind(products)
    .bind(sale.payment_method.label())
    .bind(sale.channel.label())
    .bind(sale.total.cents())
    .bind(sale.date)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::user::tests::create_user;
    use vitrina_core::VariantRef;

    fn sale(owner: &str, qty: i64) -> Sale {
        let line = SaleLineItem {
            product_id: "p1".to_string(),
            product_name: "Shirt".to_string(),
            variant: Some(VariantRef::new("M", "Red")),
            quantity: qty,
            price: Money::from_cents(1290),
            payment_method: PaymentMethod::Deuna,
            channel: SalesChannel::Online,
            override_defaults: true,
        };
        Sale {
            id: String::new(),
            owner_id: owner.to_string(),
            total: line.line_total(),
            products: vec![line],
            payment_method: PaymentMethod::Efectivo,
            channel: SalesChannel::Local,
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = create_user(&db, "ana@tienda.ec").await;

        let mut uow = db.begin().await.unwrap();
        let created = SaleRepository::insert_in(&mut uow, sale(&owner, 2)).await.unwrap();
        uow.commit().await.unwrap();

        let loaded = db.sales().get(&owner, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded.products, created.products);
        assert_eq!(loaded.payment_method, PaymentMethod::Efectivo);
        assert_eq!(loaded.products[0].payment_method, PaymentMethod::Deuna);
        assert_eq!(loaded.total.cents(), 2580);
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = create_user(&db, "ana@tienda.ec").await;
        let created = db.sales().insert(sale(&owner, 2)).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let mut edited = sale(&owner, 5);
        edited.id = created.id.clone();
        let replaced = SaleRepository::replace_in(&mut uow, edited).await.unwrap();
        uow.commit().await.unwrap();
        assert!(replaced.date >= created.date);

        let loaded = db.sales().get(&owner, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded.products[0].quantity, 5);

        let mut uow = db.begin().await.unwrap();
        SaleRepository::delete_in(&mut uow, &owner, &created.id).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(db.sales().count(&owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = create_user(&db, "ana@tienda.ec").await;

        let first = db.sales().insert(sale(&owner, 1)).await.unwrap();
        let second = db.sales().insert(sale(&owner, 2)).await.unwrap();

        let all = db.sales().list(&owner).await.unwrap();
        assert_eq!(all.len(), 2);
        if second.date > first.date {
            assert_eq!(all[0].id, second.id);
        }
    }

    #[tokio::test]
    async fn test_missing_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = create_user(&db, "ana@tienda.ec").await;

        let mut uow = db.begin().await.unwrap();
        assert!(SaleRepository::get_in(&mut uow, &owner, "nope").await.unwrap().is_none());
        assert!(matches!(
            SaleRepository::delete_in(&mut uow, &owner, "nope").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
