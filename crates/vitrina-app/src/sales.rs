//! # Sale Transaction Orchestrator
//!
//! Records, edits and deletes sales while keeping variant stock in step.
//!
//! ## One Operation, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(draft)                                                          │
//! │                                                                         │
//! │  validate_draft ──► BEGIN ──► load referenced products                 │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                          check_stock ──✗──► InsufficientStock           │
//! │                                 │            (nothing written)          │
//! │                                 ▼                                       │
//! │                    reconciliation_plan(reverse, apply)                  │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │              apply deltas, one product write per product               │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                    write the sale record ──► COMMIT                     │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                   live queries see one change           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `edit` reverses the original lines and applies the new ones in the same
//! plan; `delete` only reverses. Any error before COMMIT drops the unit of
//! work, which rolls every write of the operation back.
//!
//! Adjustments that cannot land (the product was deleted, or the variant
//! was removed after the sale) are not errors. They are logged and listed
//! in the returned [`SaleReceipt`].

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use ts_rs::TS;

use vitrina_core::sale::{check_stock, compute_total, reconciliation_plan, validate_draft, ProductAdjustment, SaleDraft};
use vitrina_core::stock::{apply_stock_delta, StockOutcome, StockTarget};
use vitrina_core::{CoreError, Product, Sale, SaleLineItem, VariantRef};
use vitrina_db::{Database, DbResult, ProductRepository, SaleRepository, UnitOfWork};

use crate::auth::Session;
use crate::error::AppResult;

// =============================================================================
// Receipt
// =============================================================================

/// Why an adjustment was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// The product is no longer in the inventory.
    ProductMissing,
    /// The product has no variant with that size and color.
    VariantNotFound,
    /// The product tracks stock per variant but the line named none.
    VariantRequired,
}

/// A stock change that was planned but not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SkippedAdjustment {
    pub product_id: String,
    pub variant: Option<VariantRef>,
    pub delta: i64,
    pub reason: SkipReason,
}

/// Result of a sale operation.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    /// The sale as written (for `delete`, as it was before removal).
    pub sale: Sale,
    pub skipped: Vec<SkippedAdjustment>,
}

// =============================================================================
// Service
// =============================================================================

/// Sale operations on the signed-in user's collections.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    session: Session,
}

impl SaleService {
    pub fn new(db: Database, session: Session) -> Self {
        SaleService { db, session }
    }

    /// Records a new sale and deducts its units from stock.
    ///
    /// ## Errors
    /// - `ValidationError` for an empty draft, a non-positive quantity, a
    ///   negative price, or a missing variant on a product that uses them
    /// - `NotFound` for an unknown product or variant
    /// - `InsufficientStock` when the draft asks for more than is on hand
    pub async fn create(&self, draft: SaleDraft) -> AppResult<SaleReceipt> {
        let user = self.session.require_user()?;
        validate_draft(&draft)?;

        let mut uow = self.db.begin().await?;
        let mut products = load_products(&mut uow, &user.id, &draft.products).await?;

        check_stock(&snapshot(&products), &draft.products, &[])?;

        let lines = snapshot_names(draft.effective_lines(), &products);
        let plan = reconciliation_plan(&[], &lines);
        let skipped = apply_plan(&mut uow, &mut products, &plan).await?;

        let sale = SaleRepository::insert_in(
            &mut uow,
            Sale {
                id: String::new(),
                owner_id: user.id.clone(),
                total: compute_total(&lines)?,
                products: lines,
                payment_method: draft.payment_method,
                channel: draft.channel,
                date: Utc::now(),
            },
        )
        .await?;

        uow.commit().await?;

        info!(
            sale_id = %sale.id,
            total = %sale.total,
            lines = sale.products.len(),
            skipped = skipped.len(),
            "Sale created"
        );

        Ok(SaleReceipt { sale, skipped })
    }

    /// Replaces the lines of an existing sale.
    ///
    /// The original lines are put back into stock and the new ones are
    /// taken out, netted per variant, so an edit that changes nothing
    /// writes no stock. Units held by the original sale count as available
    /// when the new lines are checked.
    pub async fn edit(&self, sale_id: &str, draft: SaleDraft) -> AppResult<SaleReceipt> {
        let user = self.session.require_user()?;
        validate_draft(&draft)?;

        let mut uow = self.db.begin().await?;
        let original = SaleRepository::get_in(&mut uow, &user.id, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let referenced: Vec<SaleLineItem> = original
            .products
            .iter()
            .chain(draft.products.iter())
            .cloned()
            .collect();
        let mut products = load_products(&mut uow, &user.id, &referenced).await?;

        check_stock(&snapshot(&products), &draft.products, &original.products)?;

        let lines = snapshot_names(draft.effective_lines(), &products);
        let plan = reconciliation_plan(&original.products, &lines);
        let skipped = apply_plan(&mut uow, &mut products, &plan).await?;

        let sale = SaleRepository::replace_in(
            &mut uow,
            Sale {
                id: original.id.clone(),
                owner_id: user.id.clone(),
                total: compute_total(&lines)?,
                products: lines,
                payment_method: draft.payment_method,
                channel: draft.channel,
                date: original.date,
            },
        )
        .await?;

        uow.commit().await?;

        info!(
            sale_id = %sale.id,
            total = %sale.total,
            adjusted = plan.len(),
            skipped = skipped.len(),
            "Sale edited"
        );

        Ok(SaleReceipt { sale, skipped })
    }

    /// Deletes a sale and returns its units to stock.
    pub async fn delete(&self, sale_id: &str) -> AppResult<SaleReceipt> {
        let user = self.session.require_user()?;

        let mut uow = self.db.begin().await?;
        let sale = SaleRepository::get_in(&mut uow, &user.id, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let mut products = load_products(&mut uow, &user.id, &sale.products).await?;
        let plan = reconciliation_plan(&sale.products, &[]);
        let skipped = apply_plan(&mut uow, &mut products, &plan).await?;

        SaleRepository::delete_in(&mut uow, &user.id, &sale.id).await?;
        uow.commit().await?;

        info!(sale_id = %sale.id, skipped = skipped.len(), "Sale deleted");

        Ok(SaleReceipt { sale, skipped })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Loads every product the lines reference, keyed by id. Products that no
/// longer exist are simply absent.
async fn load_products(
    uow: &mut UnitOfWork,
    owner_id: &str,
    lines: &[SaleLineItem],
) -> DbResult<HashMap<String, Product>> {
    let mut products = HashMap::new();

    for line in lines {
        if products.contains_key(&line.product_id) {
            continue;
        }
        if let Some(product) = ProductRepository::get_in(uow, owner_id, &line.product_id).await? {
            products.insert(line.product_id.clone(), product);
        }
    }

    Ok(products)
}

fn snapshot(products: &HashMap<String, Product>) -> Vec<Product> {
    products.values().cloned().collect()
}

/// Stamps each line with the current product name.
fn snapshot_names(mut lines: Vec<SaleLineItem>, products: &HashMap<String, Product>) -> Vec<SaleLineItem> {
    for line in &mut lines {
        if let Some(product) = products.get(&line.product_id) {
            line.product_name = product.name.clone();
        }
    }
    lines
}

/// Applies a plan to the loaded products and writes each changed product
/// once. Returns what could not be applied.
///
/// A counter overflow fails the whole operation; the caller's unit of work
/// is dropped and nothing it wrote survives.
async fn apply_plan(
    uow: &mut UnitOfWork,
    products: &mut HashMap<String, Product>,
    plan: &[ProductAdjustment],
) -> AppResult<Vec<SkippedAdjustment>> {
    let mut skipped = Vec::new();

    for adjustment in plan {
        let Some(product) = products.get_mut(&adjustment.product_id) else {
            for delta in &adjustment.deltas {
                warn!(
                    product_id = %adjustment.product_id,
                    delta = delta.delta,
                    "Skipping stock adjustment: product no longer exists"
                );
                skipped.push(skip(&adjustment.product_id, &delta.target, delta.delta, SkipReason::ProductMissing));
            }
            continue;
        };

        let mut changed = false;
        for delta in &adjustment.deltas {
            match apply_stock_delta(product, delta) {
                StockOutcome::Applied { previous, current } => {
                    debug!(product_id = %product.id, previous, current, "Stock adjusted");
                    changed = true;
                }
                StockOutcome::VariantNotFound => {
                    warn!(
                        product_id = %product.id,
                        delta = delta.delta,
                        "Skipping stock adjustment: variant not found"
                    );
                    skipped.push(skip(&product.id, &delta.target, delta.delta, SkipReason::VariantNotFound));
                }
                StockOutcome::VariantRequired => {
                    warn!(
                        product_id = %product.id,
                        delta = delta.delta,
                        "Skipping stock adjustment: product tracks stock per variant"
                    );
                    skipped.push(skip(&product.id, &delta.target, delta.delta, SkipReason::VariantRequired));
                }
                StockOutcome::Overflow => {
                    return Err(CoreError::StockOverflow {
                        product: product.name.clone(),
                    }
                    .into());
                }
            }
        }

        if changed {
            *product = ProductRepository::update_in(uow, product).await?;
        }
    }

    Ok(skipped)
}

fn skip(product_id: &str, target: &StockTarget, delta: i64, reason: SkipReason) -> SkippedAdjustment {
    SkippedAdjustment {
        product_id: product_id.to_string(),
        variant: match target {
            StockTarget::Variant(v) => Some(v.clone()),
            StockTarget::Product => None,
        },
        delta,
        reason,
    }
}
