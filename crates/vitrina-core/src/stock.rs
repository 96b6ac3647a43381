//! # Stock Adjuster
//!
//! Applies signed quantity deltas to a product held in memory and keeps the
//! aggregate stock invariant.
//!
//! ## Invariant
//! ```text
//! product.stock == Σ variants[i].stock     (whenever variants are used)
//! ```
//!
//! ## Delta Signs
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────────────┐
//! │ Sale create  │ −quantity per variant                                 │
//! │ Sale delete  │ +quantity per variant (reversal)                      │
//! │ Sale edit    │ +original quantity, then −updated quantity            │
//! └──────────────┴───────────────────────────────────────────────────────┘
//! ```
//!
//! A missing variant is never an error here and never a silent no-op
//! either: the caller receives [`StockOutcome::VariantNotFound`] and
//! decides how to report it. Counters never wrap: a delta that would leave
//! the `i64` range yields [`StockOutcome::Overflow`] and changes nothing.

use crate::error::{CoreError, CoreResult};
use crate::types::{Product, VariantRef};
use crate::variant::find_variant_mut;

// =============================================================================
// Stock Target & Delta
// =============================================================================

/// What a delta applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockTarget {
    /// One (size, color) variant of the product.
    Variant(VariantRef),
    /// Product-level stock, for products sold without variants.
    Product,
}

/// A signed change to one stock counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub target: StockTarget,
    pub delta: i64,
}

impl StockDelta {
    pub fn variant(variant: VariantRef, delta: i64) -> Self {
        StockDelta {
            target: StockTarget::Variant(variant),
            delta,
        }
    }

    pub fn product(delta: i64) -> Self {
        StockDelta {
            target: StockTarget::Product,
            delta,
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of one adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    /// The counter moved from `previous` to `current`.
    Applied { previous: i64, current: i64 },
    /// No variant matched; the product is unchanged.
    VariantNotFound,
    /// A product-level delta hit a product that tracks stock per variant;
    /// the product is unchanged.
    VariantRequired,
    /// The counter or the aggregate would overflow; the product is
    /// unchanged.
    Overflow,
}

impl StockOutcome {
    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self, StockOutcome::Applied { .. })
    }
}

// =============================================================================
// Adjustments
// =============================================================================

/// Adds `delta` to the (size, color) variant and recomputes product stock.
///
/// ## Example
/// ```rust
/// use vitrina_core::stock::{apply_delta, StockOutcome};
/// use vitrina_core::types::{Product, Variant};
///
/// let mut p = Product::new("Shirt", "Acme");
/// p.variants.push(Variant::new("M", "Red", 10));
///
/// assert_eq!(apply_delta(&mut p, "M", "Red", -3), StockOutcome::Applied { previous: 10, current: 7 });
/// assert_eq!(apply_delta(&mut p, "XL", "Red", -1), StockOutcome::VariantNotFound);
/// assert_eq!(p.stock, 7);
/// ```
pub fn apply_delta(product: &mut Product, size: &str, color: &str, delta: i64) -> StockOutcome {
    let Some(variant) = find_variant_mut(product, size, color) else {
        return StockOutcome::VariantNotFound;
    };

    let previous = variant.stock;
    let Some(current) = previous.checked_add(delta) else {
        return StockOutcome::Overflow;
    };
    variant.stock = current;

    if recompute_stock(product).is_err() {
        if let Some(variant) = find_variant_mut(product, size, color) {
            variant.stock = previous;
        }
        return StockOutcome::Overflow;
    }

    StockOutcome::Applied { previous, current }
}

/// Adds `delta` to the product-level stock of a product without variants.
pub fn apply_product_delta(product: &mut Product, delta: i64) -> StockOutcome {
    if product.uses_variants() {
        return StockOutcome::VariantRequired;
    }

    let previous = product.stock;
    match previous.checked_add(delta) {
        Some(current) => {
            product.stock = current;
            StockOutcome::Applied { previous, current }
        }
        None => StockOutcome::Overflow,
    }
}

/// Dispatches a [`StockDelta`] to the right counter.
pub fn apply_stock_delta(product: &mut Product, delta: &StockDelta) -> StockOutcome {
    match &delta.target {
        StockTarget::Variant(v) => apply_delta(product, &v.size, &v.color, delta.delta),
        StockTarget::Product => apply_product_delta(product, delta.delta),
    }
}

/// Re-establishes `stock == Σ variant stock`.
///
/// Products without variants keep their product-level stock.
///
/// ## Errors
/// [`CoreError::StockOverflow`] when the sum leaves the `i64` range; the
/// product is left untouched.
pub fn recompute_stock(product: &mut Product) -> CoreResult<()> {
    if product.uses_variants() {
        product.stock = product
            .variants
            .iter()
            .try_fold(0i64, |sum, v| sum.checked_add(v.stock))
            .ok_or_else(|| CoreError::StockOverflow {
                product: product.name.clone(),
            })?;
    }
    Ok(())
}

/// Current stock of a target, or `None` when the target does not exist.
pub fn available(product: &Product, target: &StockTarget) -> Option<i64> {
    match target {
        StockTarget::Variant(v) => crate::variant::find_variant(product, &v.size, &v.color).map(|v| v.stock),
        StockTarget::Product if product.uses_variants() => None,
        StockTarget::Product => Some(product.stock),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variant;

    fn shirt() -> Product {
        let mut p = Product::new("Shirt", "Acme");
        p.variants = vec![Variant::new("M", "Red", 10), Variant::new("L", "Red", 5)];
        recompute_stock(&mut p).unwrap();
        p
    }

    fn assert_invariant(p: &Product) {
        assert_eq!(p.stock, p.variants.iter().map(|v| v.stock).sum::<i64>());
    }

    #[test]
    fn test_apply_delta_keeps_invariant() {
        let mut p = shirt();
        assert_eq!(p.stock, 15);

        for (size, delta) in [("M", -3), ("L", 2), ("m", 4), ("l", -7)] {
            assert!(apply_delta(&mut p, size, "red", delta).is_applied());
            assert_invariant(&p);
        }
        assert_eq!(p.variants[0].stock, 11);
        assert_eq!(p.variants[1].stock, 0);
    }

    #[test]
    fn test_missing_variant_leaves_product_unchanged() {
        let mut p = shirt();
        let before = p.clone();

        assert_eq!(apply_delta(&mut p, "S", "Red", -1), StockOutcome::VariantNotFound);
        assert_eq!(p.variants, before.variants);
        assert_eq!(p.stock, before.stock);
    }

    #[test]
    fn test_product_level_stock() {
        let mut cap = Product::new("Cap", "Acme");
        cap.stock = 8;

        assert_eq!(
            apply_product_delta(&mut cap, -2),
            StockOutcome::Applied { previous: 8, current: 6 }
        );
        assert_eq!(available(&cap, &StockTarget::Product), Some(6));

        let mut p = shirt();
        assert_eq!(apply_product_delta(&mut p, -1), StockOutcome::VariantRequired);
        assert_eq!(available(&p, &StockTarget::Product), None);
    }

    #[test]
    fn test_overflow_leaves_product_unchanged() {
        let mut p = Product::new("Shirt", "Acme");
        p.variants = vec![Variant::new("M", "Red", i64::MAX), Variant::new("L", "Red", 1)];
        assert!(matches!(recompute_stock(&mut p), Err(CoreError::StockOverflow { .. })));

        let mut p = shirt();
        p.variants[0].stock = i64::MAX - 5;
        p.variants[1].stock = 0;
        recompute_stock(&mut p).unwrap();

        // The variant itself fits, the aggregate does not.
        assert_eq!(apply_delta(&mut p, "L", "Red", 6), StockOutcome::Overflow);
        assert_eq!(p.variants[1].stock, 0);
        assert_eq!(p.stock, i64::MAX - 5);

        assert_eq!(apply_delta(&mut p, "M", "Red", 6), StockOutcome::Overflow);
        assert_eq!(p.variants[0].stock, i64::MAX - 5);

        let mut cap = Product::new("Cap", "Acme");
        cap.stock = i64::MAX;
        assert_eq!(apply_product_delta(&mut cap, 1), StockOutcome::Overflow);
        assert_eq!(cap.stock, i64::MAX);
    }

    #[test]
    fn test_apply_stock_delta_dispatch() {
        let mut p = shirt();
        let d = StockDelta::variant(VariantRef::new("l", "RED"), -5);
        assert_eq!(
            apply_stock_delta(&mut p, &d),
            StockOutcome::Applied { previous: 5, current: 0 }
        );
        assert_eq!(p.stock, 10);
    }
}
