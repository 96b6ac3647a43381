//! # Reports
//!
//! Aggregates over recorded sales and the current inventory, as shown on
//! the dashboard screen.
//!
//! ```text
//! sales ──► summarize_sales(range)   count, units, revenue, per method/channel
//!       └─► sales_by_period(period)  one bucket per day / week / month
//!
//! inventory ──► inventory_summary    units, value at cost and at sale price,
//!                                    variants out of stock
//! ```
//!
//! All breakdowns use each line's effective payment method and channel, so
//! a sale paid half in cash and half by transfer lands in both buckets.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, Product, Sale, SaleLineItem, SalesChannel, VariantRef};

// =============================================================================
// Date Range
// =============================================================================

/// Half-open time interval `[start, end)`. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Every point in time.
    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }
}

// =============================================================================
// Sales Summary
// =============================================================================

/// Totals over a set of sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub sale_count: usize,
    pub units: i64,
    pub revenue: Money,
    pub by_payment_method: BTreeMap<PaymentMethod, Money>,
    pub by_channel: BTreeMap<SalesChannel, Money>,
}

/// Payment method a line was actually paid with.
pub fn effective_payment_method(sale: &Sale, line: &SaleLineItem) -> PaymentMethod {
    if line.override_defaults {
        line.payment_method
    } else {
        sale.payment_method
    }
}

/// Channel a line was actually sold through.
pub fn effective_channel(sale: &Sale, line: &SaleLineItem) -> SalesChannel {
    if line.override_defaults {
        line.channel
    } else {
        sale.channel
    }
}

/// Summarises the sales dated inside `range`.
///
/// Revenue is recomputed from the lines rather than read from
/// `Sale::total`, so it stays right for documents written before totals
/// were stored.
pub fn summarize_sales(sales: &[Sale], range: DateRange) -> SalesSummary {
    let mut summary = SalesSummary::default();

    for sale in sales.iter().filter(|s| range.contains(s.date)) {
        summary.sale_count += 1;

        for line in &sale.products {
            let amount = line.line_total();
            summary.units += line.quantity;
            summary.revenue += amount;
            *summary
                .by_payment_method
                .entry(effective_payment_method(sale, line))
                .or_default() += amount;
            *summary.by_channel.entry(effective_channel(sale, line)).or_default() += amount;
        }
    }

    summary
}

// =============================================================================
// Period Buckets
// =============================================================================

/// Bucket width for [`sales_by_period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Period {
    Day,
    /// ISO weeks, starting on Monday.
    Week,
    Month,
}

impl Period {
    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Period::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

/// Sales falling in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotal {
    #[ts(as = "String")]
    pub start: NaiveDate,
    pub sale_count: usize,
    pub units: i64,
    pub revenue: Money,
}

/// Groups sales into buckets of `period`, oldest first.
///
/// Only periods with at least one sale are returned. Bucketing uses the
/// UTC date of each sale.
pub fn sales_by_period(sales: &[Sale], period: Period) -> Vec<PeriodTotal> {
    let mut buckets: BTreeMap<NaiveDate, PeriodTotal> = BTreeMap::new();

    for sale in sales {
        let start = period.bucket_start(sale.date.date_naive());
        let bucket = buckets.entry(start).or_insert_with(|| PeriodTotal {
            start,
            sale_count: 0,
            units: 0,
            revenue: Money::zero(),
        });

        bucket.sale_count += 1;
        bucket.units += sale.units();
        bucket.revenue += sale.products.iter().map(SaleLineItem::line_total).sum::<Money>();
    }

    buckets.into_values().collect()
}

// =============================================================================
// Inventory Summary
// =============================================================================

/// A stock counter at or below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OutOfStock {
    pub product_id: String,
    pub product_name: String,
    /// `None` for products without variants.
    pub variant: Option<VariantRef>,
}

/// Snapshot of the inventory's size and value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub product_count: usize,
    pub total_units: i64,
    /// Σ stock × cost price.
    pub cost_value: Money,
    /// Σ stock × sale price.
    pub sale_value: Money,
    pub out_of_stock: Vec<OutOfStock>,
}

impl InventorySummary {
    /// Expected gross margin if everything in stock sold at list price.
    pub fn potential_margin(&self) -> Money {
        self.sale_value - self.cost_value
    }
}

pub fn inventory_summary(products: &[Product]) -> InventorySummary {
    let mut summary = InventorySummary {
        product_count: products.len(),
        ..InventorySummary::default()
    };

    for product in products {
        // Negative counters come from legacy edits; they hold no value.
        let units = product.stock.max(0);
        summary.total_units += units;
        summary.cost_value += product.cost_price.multiply_quantity(units);
        summary.sale_value += product.sale_price.multiply_quantity(units);

        if product.uses_variants() {
            summary.out_of_stock.extend(product.variants.iter().filter(|v| v.stock <= 0).map(|v| OutOfStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                variant: Some(VariantRef::new(v.size.clone(), v.color.clone())),
            }));
        } else if product.stock <= 0 {
            summary.out_of_stock.push(OutOfStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                variant: None,
            });
        }
    }

    summary
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::compute_total;
    use crate::stock::recompute_stock;
    use chrono::TimeZone;
    use crate::types::Variant;

    fn line(qty: i64, cents: i64, method: PaymentMethod, overriding: bool) -> SaleLineItem {
        SaleLineItem {
            product_id: "p".to_string(),
            product_name: "Shirt".to_string(),
            variant: None,
            quantity: qty,
            price: Money::from_cents(cents),
            payment_method: method,
            channel: SalesChannel::Online,
            override_defaults: overriding,
        }
    }

    fn sale(day: u32, lines: Vec<SaleLineItem>) -> Sale {
        let total = compute_total(&lines).unwrap();
        Sale {
            id: format!("s{day}"),
            owner_id: "u".to_string(),
            products: lines,
            payment_method: PaymentMethod::Efectivo,
            channel: SalesChannel::Local,
            total,
            date: Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_summarize_uses_effective_method() {
        let sales = vec![sale(
            4,
            vec![
                line(2, 1000, PaymentMethod::Deuna, false),
                line(1, 500, PaymentMethod::Deuna, true),
            ],
        )];

        let summary = summarize_sales(&sales, DateRange::all());
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.units, 3);
        assert_eq!(summary.revenue.cents(), 2500);
        assert_eq!(summary.by_payment_method[&PaymentMethod::Efectivo].cents(), 2000);
        assert_eq!(summary.by_payment_method[&PaymentMethod::Deuna].cents(), 500);
        assert_eq!(summary.by_channel[&SalesChannel::Local].cents(), 2000);
        assert_eq!(summary.by_channel[&SalesChannel::Online].cents(), 500);
    }

    #[test]
    fn test_summarize_respects_range() {
        let sales = vec![
            sale(4, vec![line(1, 100, PaymentMethod::Efectivo, false)]),
            sale(5, vec![line(1, 200, PaymentMethod::Efectivo, false)]),
        ];

        let day = DateRange::between(
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap(),
        );
        let summary = summarize_sales(&sales, day);
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.revenue.cents(), 200);
    }

    #[test]
    fn test_sales_by_period() {
        // 2024-03-04 is a Monday.
        let sales = vec![
            sale(4, vec![line(1, 100, PaymentMethod::Efectivo, false)]),
            sale(6, vec![line(2, 100, PaymentMethod::Efectivo, false)]),
            sale(11, vec![line(1, 300, PaymentMethod::Efectivo, false)]),
        ];

        let daily = sales_by_period(&sales, Period::Day);
        assert_eq!(daily.len(), 3);

        let weekly = sales_by_period(&sales, Period::Week);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(weekly[0].sale_count, 2);
        assert_eq!(weekly[0].units, 3);
        assert_eq!(weekly[0].revenue.cents(), 300);

        let monthly = sales_by_period(&sales, Period::Month);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(monthly[0].revenue.cents(), 600);
    }

    #[test]
    fn test_inventory_summary() {
        let mut shirt = Product::new("Shirt", "Acme");
        shirt.id = "shirt".to_string();
        shirt.cost_price = Money::from_cents(500);
        shirt.sale_price = Money::from_cents(1200);
        shirt.variants = vec![Variant::new("M", "Red", 3), Variant::new("L", "Red", 0)];
        recompute_stock(&mut shirt).unwrap();

        let mut cap = Product::new("Cap", "Acme");
        cap.id = "cap".to_string();
        cap.sale_price = Money::from_cents(800);

        let summary = inventory_summary(&[shirt, cap]);
        assert_eq!(summary.product_count, 2);
        assert_eq!(summary.total_units, 3);
        assert_eq!(summary.cost_value.cents(), 1500);
        assert_eq!(summary.sale_value.cents(), 3600);
        assert_eq!(summary.potential_margin().cents(), 2100);

        assert_eq!(summary.out_of_stock.len(), 2);
        assert_eq!(summary.out_of_stock[0].variant, Some(VariantRef::new("L", "Red")));
        assert_eq!(summary.out_of_stock[1].product_id, "cap");
        assert_eq!(summary.out_of_stock[1].variant, None);
    }
}
