//! # Sale Math
//!
//! Everything the sale orchestrator decides before touching the database:
//! draft validation, effective payment method and channel, totals, stock
//! sufficiency, and the per-product adjustment plan.
//!
//! ## Reconciliation Plan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create:  reverse = []            apply = draft lines                  │
//! │  edit:    reverse = original      apply = draft lines                  │
//! │  delete:  reverse = original      apply = []                           │
//! │                                                                         │
//! │  reverse lines ──► +quantity ─┐                                        │
//! │                               ├──► net per (product, variant) ──► plan │
//! │  apply lines   ──► −quantity ─┘        (zero deltas dropped)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Editing a sale without changing its lines yields an empty plan, so stock
//! is left exactly as it was.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::grouping::group_by_product;
use crate::money::Money;
use crate::stock::{available, StockDelta, StockTarget};
use crate::types::{PaymentMethod, Product, SaleLineItem, SalesChannel, VariantKey};
use crate::validation::{validate_price, validate_quantity, validate_sale_size, ValidationResult};

// =============================================================================
// Sale Draft
// =============================================================================

/// A sale as submitted by the sale form, before it is recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    /// Sale-level default payment method.
    pub payment_method: PaymentMethod,

    /// Sale-level default channel.
    pub channel: SalesChannel,

    pub products: Vec<SaleLineItem>,
}

impl SaleDraft {
    pub fn new(payment_method: PaymentMethod, channel: SalesChannel) -> Self {
        SaleDraft {
            payment_method,
            channel,
            products: Vec::new(),
        }
    }

    /// Lines with their effective payment method and channel.
    ///
    /// A line that does not override the sale defaults takes both values
    /// from the sale; an overriding line keeps its own.
    pub fn effective_lines(&self) -> Vec<SaleLineItem> {
        self.products
            .iter()
            .map(|line| {
                let mut line = line.clone();
                if !line.override_defaults {
                    line.payment_method = self.payment_method;
                    line.channel = self.channel;
                }
                line
            })
            .collect()
    }

    pub fn total(&self) -> ValidationResult<Money> {
        compute_total(&self.products)
    }
}

/// Σ quantity × price over `lines`.
///
/// ## Errors
/// [`ValidationError::Overflow`] when the total does not fit in `i64` cents.
pub fn compute_total(lines: &[SaleLineItem]) -> ValidationResult<Money> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        line.price
            .checked_multiply_quantity(line.quantity)
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| ValidationError::Overflow {
                field: "total".to_string(),
            })
    })
}

// =============================================================================
// Validation
// =============================================================================

/// Checks the shape of a draft: at least one line, a product on every line,
/// positive quantities, prices within range and a total that fits.
///
/// Catalog references and stock are checked by [`check_stock`].
pub fn validate_draft(draft: &SaleDraft) -> CoreResult<()> {
    validate_sale_size(draft.products.len())?;

    for line in &draft.products {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required("product").into());
        }
        if let Some(v) = &line.variant {
            if v.size.trim().is_empty() || v.color.trim().is_empty() {
                return Err(ValidationError::required("variant").into());
            }
        }
        validate_quantity(line.quantity)?;
        validate_price("price", line.price)?;
    }

    compute_total(&draft.products)?;
    Ok(())
}

/// Validates that `demand` can be served from `products`.
///
/// Demand is aggregated per (product, variant) before comparing, so two
/// lines of 6 against a variant holding 10 fail. Units in `released` (the
/// original lines of a sale being edited) count as available again.
///
/// ## Errors
/// - [`CoreError::ProductNotFound`] when a line references an unknown product
/// - [`ValidationError::Required`] when a line omits the variant of a product
///   that tracks stock per variant
/// - [`CoreError::VariantNotFound`] when the variant does not exist
/// - [`CoreError::InsufficientStock`] when demand exceeds availability
pub fn check_stock(products: &[Product], demand: &[SaleLineItem], released: &[SaleLineItem]) -> CoreResult<()> {
    let credit = released_units(released);

    for group in group_by_product(demand) {
        let product = products
            .iter()
            .find(|p| p.id == group.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(group.product_id.to_string()))?;

        for wanted in group.net_deltas(1) {
            let stock = match (&wanted.target, available(product, &wanted.target)) {
                (_, Some(stock)) => stock,
                (StockTarget::Product, None) => return Err(ValidationError::required("variant").into()),
                (StockTarget::Variant(v), None) => {
                    return Err(CoreError::VariantNotFound {
                        product: product.display_name(),
                        size: v.size.clone(),
                        color: v.color.clone(),
                    })
                }
            };

            let key = (group.product_id.to_string(), target_key(&wanted.target));
            let limit = stock + credit.get(&key).copied().unwrap_or(0);

            if wanted.delta > limit {
                return Err(CoreError::InsufficientStock {
                    item: item_label(product, &wanted.target),
                    available: limit,
                    requested: wanted.delta,
                });
            }
        }
    }

    Ok(())
}

fn released_units(lines: &[SaleLineItem]) -> HashMap<(String, Option<VariantKey>), i64> {
    let mut units = HashMap::new();
    for line in lines {
        let key = (line.product_id.clone(), line.variant.as_ref().map(|v| v.key()));
        *units.entry(key).or_insert(0) += line.quantity;
    }
    units
}

fn item_label(product: &Product, target: &StockTarget) -> String {
    match target {
        StockTarget::Variant(v) => format!("{} ({})", product.name, v),
        StockTarget::Product => product.name.clone(),
    }
}

fn target_key(target: &StockTarget) -> Option<VariantKey> {
    match target {
        StockTarget::Variant(v) => Some(v.key()),
        StockTarget::Product => None,
    }
}

// =============================================================================
// Reconciliation Plan
// =============================================================================

/// Net stock changes for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAdjustment {
    pub product_id: String,
    pub deltas: Vec<StockDelta>,
}

/// Builds the per-product plan for reversing `reverse` and applying `apply`.
///
/// Reversed lines add their quantity back, applied lines take it away.
/// Deltas for the same (product, variant) are netted and zero results are
/// dropped, as are products left with nothing to change. Products appear in
/// first-reference order, reversed lines first.
///
/// ## Example
/// ```rust
/// use vitrina_core::money::Money;
/// use vitrina_core::sale::reconciliation_plan;
/// use vitrina_core::stock::StockDelta;
/// use vitrina_core::types::{PaymentMethod, SaleLineItem, SalesChannel, VariantRef};
///
/// let line = |qty| SaleLineItem {
///     product_id: "shirt".into(),
///     product_name: "Shirt".into(),
///     variant: Some(VariantRef::new("M", "Red")),
///     quantity: qty,
///     price: Money::from_cents(1000),
///     payment_method: PaymentMethod::Efectivo,
///     channel: SalesChannel::Local,
///     override_defaults: false,
/// };
///
/// // Edit 3 → 5: reinstate 3, deduct 5.
/// let plan = reconciliation_plan(&[line(3)], &[line(5)]);
/// assert_eq!(plan[0].deltas, vec![StockDelta::variant(VariantRef::new("M", "Red"), -2)]);
///
/// // Unchanged edit: nothing to write.
/// assert!(reconciliation_plan(&[line(3)], &[line(3)]).is_empty());
/// ```
pub fn reconciliation_plan(reverse: &[SaleLineItem], apply: &[SaleLineItem]) -> Vec<ProductAdjustment> {
    let mut plan: Vec<ProductAdjustment> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let phases = group_by_product(reverse)
        .into_iter()
        .map(|g| (g.product_id.to_string(), g.net_deltas(1)))
        .chain(
            group_by_product(apply)
                .into_iter()
                .map(|g| (g.product_id.to_string(), g.net_deltas(-1))),
        );

    for (product_id, deltas) in phases {
        let slot = match index.get(&product_id) {
            Some(&i) => i,
            None => {
                index.insert(product_id.clone(), plan.len());
                plan.push(ProductAdjustment {
                    product_id,
                    deltas: Vec::new(),
                });
                plan.len() - 1
            }
        };

        let adjustment = &mut plan[slot];
        for delta in deltas {
            let key = target_key(&delta.target);
            match adjustment.deltas.iter_mut().find(|d| target_key(&d.target) == key) {
                Some(existing) => existing.delta += delta.delta,
                None => adjustment.deltas.push(delta),
            }
        }
    }

    for adjustment in &mut plan {
        adjustment.deltas.retain(|d| d.delta != 0);
    }
    plan.retain(|a| !a.deltas.is_empty());
    plan
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::recompute_stock;
    use crate::types::{Variant, VariantRef};

    fn line(product: &str, variant: Option<(&str, &str)>, qty: i64) -> SaleLineItem {
        SaleLineItem {
            product_id: product.to_string(),
            product_name: String::new(),
            variant: variant.map(|(s, c)| VariantRef::new(s, c)),
            quantity: qty,
            price: Money::from_cents(1000),
            payment_method: PaymentMethod::Otro,
            channel: SalesChannel::Otro,
            override_defaults: false,
        }
    }

    fn shirt(stock: i64) -> Product {
        let mut p = Product::new("Shirt", "Acme");
        p.id = "shirt".to_string();
        p.variants = vec![Variant::new("M", "Red", stock)];
        recompute_stock(&mut p).unwrap();
        p
    }

    fn cap(stock: i64) -> Product {
        let mut p = Product::new("Cap", "Acme");
        p.id = "cap".to_string();
        p.stock = stock;
        p
    }

    #[test]
    fn test_effective_lines_respect_override() {
        let mut draft = SaleDraft::new(PaymentMethod::Deuna, SalesChannel::Online);
        draft.products.push(line("shirt", Some(("M", "Red")), 1));

        let mut own = line("cap", None, 1);
        own.override_defaults = true;
        own.payment_method = PaymentMethod::Efectivo;
        own.channel = SalesChannel::Local;
        draft.products.push(own);

        let lines = draft.effective_lines();
        assert_eq!(lines[0].payment_method, PaymentMethod::Deuna);
        assert_eq!(lines[0].channel, SalesChannel::Online);
        assert_eq!(lines[1].payment_method, PaymentMethod::Efectivo);
        assert_eq!(lines[1].channel, SalesChannel::Local);
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let mut a = line("shirt", Some(("M", "Red")), 3);
        a.price = Money::from_cents(1290);
        let mut b = line("cap", None, 2);
        b.price = Money::from_cents(500);

        assert_eq!(compute_total(&[a, b]).unwrap().cents(), 3 * 1290 + 2 * 500);
        assert_eq!(compute_total(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let mut a = line("shirt", Some(("M", "Red")), 2);
        a.price = Money::from_cents(i64::MAX / 2 + 1);

        assert!(matches!(
            compute_total(&[a.clone()]),
            Err(ValidationError::Overflow { .. })
        ));

        let mut b = line("cap", None, 1);
        b.price = Money::from_cents(i64::MAX);
        assert!(compute_total(&[b.clone(), b]).is_err());
    }

    #[test]
    fn test_validate_draft() {
        let mut draft = SaleDraft::default();
        assert!(validate_draft(&draft).is_err());

        draft.products.push(line("shirt", Some(("M", "Red")), 1));
        assert!(validate_draft(&draft).is_ok());

        draft.products[0].quantity = 0;
        assert!(validate_draft(&draft).is_err());

        draft.products[0].quantity = 1;
        draft.products[0].price = Money::from_cents(-1);
        assert!(validate_draft(&draft).is_err());

        draft.products[0].price = Money::from_cents(crate::MAX_PRICE_CENTS + 1);
        assert!(validate_draft(&draft).is_err());

        draft.products[0].price = Money::zero();
        draft.products[0].product_id.clear();
        assert!(validate_draft(&draft).is_err());
    }

    #[test]
    fn test_check_stock_rejects_over_quantity() {
        let products = vec![shirt(10)];

        assert!(check_stock(&products, &[line("shirt", Some(("M", "Red")), 10)], &[]).is_ok());

        let err = check_stock(&products, &[line("shirt", Some(("m", "red")), 11)], &[]).unwrap_err();
        match err {
            CoreError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_check_stock_aggregates_demand() {
        let products = vec![shirt(10)];
        let demand = vec![line("shirt", Some(("M", "Red")), 6), line("shirt", Some(("M", "RED")), 6)];

        assert!(matches!(
            check_stock(&products, &demand, &[]),
            Err(CoreError::InsufficientStock { requested: 12, .. })
        ));
    }

    #[test]
    fn test_check_stock_counts_released_units() {
        // After a sale of 3, stock is 7; editing it to 10 is allowed, 11 is not.
        let products = vec![shirt(7)];
        let original = vec![line("shirt", Some(("M", "Red")), 3)];

        assert!(check_stock(&products, &[line("shirt", Some(("M", "Red")), 10)], &original).is_ok());
        assert!(check_stock(&products, &[line("shirt", Some(("M", "Red")), 11)], &original).is_err());
    }

    #[test]
    fn test_check_stock_references() {
        let products = vec![shirt(10), cap(4)];

        assert!(matches!(
            check_stock(&products, &[line("ghost", None, 1)], &[]),
            Err(CoreError::ProductNotFound(_))
        ));
        assert!(matches!(
            check_stock(&products, &[line("shirt", Some(("XL", "Red")), 1)], &[]),
            Err(CoreError::VariantNotFound { .. })
        ));
        assert!(matches!(
            check_stock(&products, &[line("shirt", None, 1)], &[]),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
        assert!(check_stock(&products, &[line("cap", None, 4)], &[]).is_ok());
        assert!(check_stock(&products, &[line("cap", None, 5)], &[]).is_err());
    }

    #[test]
    fn test_plan_for_create_and_delete() {
        let lines = vec![
            line("shirt", Some(("M", "Red")), 2),
            line("cap", None, 1),
            line("shirt", Some(("m", "red")), 1),
        ];

        let create = reconciliation_plan(&[], &lines);
        assert_eq!(create.len(), 2);
        assert_eq!(create[0].product_id, "shirt");
        assert_eq!(create[0].deltas, vec![StockDelta::variant(VariantRef::new("M", "Red"), -3)]);
        assert_eq!(create[1].deltas, vec![StockDelta::product(-1)]);

        let delete = reconciliation_plan(&lines, &[]);
        assert_eq!(delete[0].deltas, vec![StockDelta::variant(VariantRef::new("M", "Red"), 3)]);
        assert_eq!(delete[1].deltas, vec![StockDelta::product(1)]);
    }

    #[test]
    fn test_plan_for_edit_nets_and_drops_zeroes() {
        let original = vec![line("shirt", Some(("M", "Red")), 3), line("cap", None, 1)];
        let updated = vec![line("cap", None, 1), line("shirt", Some(("L", "Red")), 2)];

        let plan = reconciliation_plan(&original, &updated);
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].deltas,
            vec![
                StockDelta::variant(VariantRef::new("M", "Red"), 3),
                StockDelta::variant(VariantRef::new("L", "Red"), -2),
            ]
        );
    }

    #[test]
    fn test_identical_edit_is_a_no_op() {
        let lines = vec![line("shirt", Some(("M", "Red")), 3), line("cap", None, 2)];
        assert!(reconciliation_plan(&lines, &lines).is_empty());
    }
}
