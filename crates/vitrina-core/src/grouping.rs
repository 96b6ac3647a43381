//! # Sale Line Grouper
//!
//! Groups sale lines by product so that one product is read and written
//! once per operation, however many of its variants a sale touches.
//!
//! ```text
//! lines:  [Shirt M/Red ×2, Cap ×1, Shirt L/Red ×1, Shirt m/red ×1]
//!            │
//!            ▼  group_by_product
//! groups: Shirt → [M/Red ×2, L/Red ×1, m/red ×1]
//!         Cap   → [×1]
//!            │
//!            ▼  net_deltas(−1)
//! Shirt:  M/Red −3, L/Red −1        (same variant referenced twice → one delta)
//! Cap:    product −1
//! ```

use std::collections::HashMap;

use crate::stock::{StockDelta, StockTarget};
use crate::types::{SaleLineItem, VariantKey};

/// Lines of one sale that reference the same product.
#[derive(Debug, Clone)]
pub struct ProductGroup<'a> {
    pub product_id: &'a str,
    /// In their original relative order.
    pub lines: Vec<&'a SaleLineItem>,
}

impl ProductGroup<'_> {
    /// Units requested across the group.
    pub fn quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Collapses the group into one delta per distinct stock target.
    ///
    /// Each line contributes `sign × quantity`. Targets keep the order in
    /// which they first appear, and the first spelling of a variant is the
    /// one reported.
    pub fn net_deltas(&self, sign: i64) -> Vec<StockDelta> {
        let mut deltas: Vec<StockDelta> = Vec::new();
        let mut index: HashMap<Option<VariantKey>, usize> = HashMap::new();

        for line in &self.lines {
            let key = line.variant.as_ref().map(|v| v.key());
            let amount = sign * line.quantity;

            match index.get(&key) {
                Some(&i) => deltas[i].delta += amount,
                None => {
                    index.insert(key, deltas.len());
                    let target = match &line.variant {
                        Some(v) => StockTarget::Variant(v.clone()),
                        None => StockTarget::Product,
                    };
                    deltas.push(StockDelta { target, delta: amount });
                }
            }
        }

        deltas
    }
}

/// Groups `lines` by product id.
///
/// Groups appear in the order their product is first referenced; lines keep
/// their relative order within a group.
pub fn group_by_product(lines: &[SaleLineItem]) -> Vec<ProductGroup<'_>> {
    let mut groups: Vec<ProductGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for line in lines {
        match index.get(line.product_id.as_str()) {
            Some(&i) => groups[i].lines.push(line),
            None => {
                index.insert(line.product_id.as_str(), groups.len());
                groups.push(ProductGroup {
                    product_id: line.product_id.as_str(),
                    lines: vec![line],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{PaymentMethod, SalesChannel, VariantRef};

    fn line(product: &str, variant: Option<(&str, &str)>, qty: i64) -> SaleLineItem {
        SaleLineItem {
            product_id: product.to_string(),
            product_name: String::new(),
            variant: variant.map(|(s, c)| VariantRef::new(s, c)),
            quantity: qty,
            price: Money::from_cents(100),
            payment_method: PaymentMethod::Efectivo,
            channel: SalesChannel::Local,
            override_defaults: false,
        }
    }

    #[test]
    fn test_group_preserves_order() {
        let lines = vec![
            line("shirt", Some(("M", "Red")), 2),
            line("cap", None, 1),
            line("shirt", Some(("L", "Red")), 1),
            line("shirt", Some(("m", "red")), 1),
        ];

        let groups = group_by_product(&lines);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].product_id, "shirt");
        assert_eq!(groups[1].product_id, "cap");

        let quantities: Vec<i64> = groups[0].lines.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![2, 1, 1]);
        assert_eq!(groups[0].quantity(), 4);
    }

    #[test]
    fn test_net_deltas_merge_same_variant() {
        let lines = vec![
            line("shirt", Some(("M", "Red")), 2),
            line("shirt", Some(("L", "Red")), 1),
            line("shirt", Some(("m", "RED")), 1),
        ];

        let groups = group_by_product(&lines);
        let deltas = groups[0].net_deltas(-1);

        assert_eq!(
            deltas,
            vec![
                StockDelta::variant(VariantRef::new("M", "Red"), -3),
                StockDelta::variant(VariantRef::new("L", "Red"), -1),
            ]
        );
    }

    #[test]
    fn test_net_deltas_product_level() {
        let lines = vec![line("cap", None, 2), line("cap", None, 3)];
        let groups = group_by_product(&lines);
        assert_eq!(groups[0].net_deltas(1), vec![StockDelta::product(5)]);
    }

    #[test]
    fn test_empty_lines() {
        assert!(group_by_product(&[]).is_empty());
    }
}
