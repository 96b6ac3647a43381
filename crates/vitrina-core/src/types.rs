//! # Domain Types
//!
//! Core domain types used throughout Vitrina.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────┐                        │
//! │  │    Product      │ 1    * │    Variant      │                        │
//! │  │  ─────────────  │───────►│  ─────────────  │                        │
//! │  │  id, owner_id   │        │  size, color    │                        │
//! │  │  name, brand    │        │  stock          │                        │
//! │  │  stock = Σ var  │        └────────▲────────┘                        │
//! │  └────────▲────────┘                 │ (size, color) lookup            │
//! │           │ product_id (weak)        │                                 │
//! │  ┌────────┴────────┐        ┌────────┴────────┐                        │
//! │  │  SaleLineItem   │        │   VariantRef    │                        │
//! │  │  quantity,price │───────►│  size, color    │                        │
//! │  │  method,channel │        └─────────────────┘                        │
//! │  └────────▲────────┘                                                   │
//! │           │ *                                                          │
//! │  ┌────────┴────────┐                                                   │
//! │  │      Sale       │  total = Σ quantity × price                       │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line items reference products by id only. A product may be edited or
//! deleted after a sale without touching the sale record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::DEFAULT_CATEGORY;

// =============================================================================
// Variant
// =============================================================================

/// A (size, color) combination of a product; the unit stock is tracked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Variant {
    pub size: String,
    pub color: String,
    pub stock: i64,
}

impl Variant {
    pub fn new(size: impl Into<String>, color: impl Into<String>, stock: i64) -> Self {
        Variant {
            size: size.into(),
            color: color.into(),
            stock,
        }
    }

    /// Case-insensitive identity of this variant.
    pub fn key(&self) -> VariantKey {
        VariantKey::new(&self.size, &self.color)
    }

    /// Checks whether this variant is the (size, color) pair, ignoring case.
    pub fn matches(&self, size: &str, color: &str) -> bool {
        eq_ignore_case(&self.size, size) && eq_ignore_case(&self.color, color)
    }
}

/// Normalised (size, color) pair used as a map key.
///
/// Two variants with the same key are the same variant for stock purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    size: String,
    color: String,
}

impl VariantKey {
    pub fn new(size: &str, color: &str) -> Self {
        VariantKey {
            size: size.trim().to_lowercase(),
            color: color.trim().to_lowercase(),
        }
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

/// Reference from a sale line to a variant of its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantRef {
    pub size: String,
    pub color: String,
}

impl VariantRef {
    pub fn new(size: impl Into<String>, color: impl Into<String>) -> Self {
        VariantRef {
            size: size.into(),
            color: color.into(),
        }
    }

    pub fn key(&self) -> VariantKey {
        VariantKey::new(&self.size, &self.color)
    }
}

impl fmt::Display for VariantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.size, self.color)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry in a user's `inventory` collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4), assigned by the store.
    pub id: String,

    /// User whose inventory holds this product.
    pub owner_id: String,

    pub name: String,
    pub brand: String,
    pub category: String,

    /// Unit cost paid to the supplier.
    pub cost_price: Money,

    /// Unit price charged to the customer.
    pub sale_price: Money,

    pub variants: Vec<Variant>,

    /// Sum of variant stock when variants are used; product-level stock
    /// otherwise.
    pub stock: i64,

    /// Set once on creation.
    #[ts(as = "String")]
    pub date_incorporation: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an unsaved product with the default category and no variants.
    pub fn new(name: impl Into<String>, brand: impl Into<String>) -> Self {
        let now = Utc::now();
        Product {
            id: String::new(),
            owner_id: String::new(),
            name: name.into(),
            brand: brand.into(),
            category: DEFAULT_CATEGORY.to_string(),
            cost_price: Money::zero(),
            sale_price: Money::zero(),
            variants: Vec::new(),
            stock: 0,
            date_incorporation: now,
            updated_at: now,
        }
    }

    /// Whether stock is tracked per variant.
    #[inline]
    pub fn uses_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Label used in error messages and reports.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.brand)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a line item was paid.
///
/// `Otro` is the overflow bucket for anything the shop does not name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Efectivo,
    Transferencia,
    #[serde(rename = "DEUNA")]
    Deuna,
    Otro,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Efectivo,
        PaymentMethod::Transferencia,
        PaymentMethod::Deuna,
        PaymentMethod::Otro,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Efectivo => "Efectivo",
            PaymentMethod::Transferencia => "Transferencia",
            PaymentMethod::Deuna => "DEUNA",
            PaymentMethod::Otro => "Otro",
        }
    }

    /// Maps free-form input to a method; anything unknown lands in `Otro`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "efectivo" | "cash" => PaymentMethod::Efectivo,
            "transferencia" | "transfer" => PaymentMethod::Transferencia,
            "deuna" => PaymentMethod::Deuna,
            _ => PaymentMethod::Otro,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PaymentMethod::from_label(s))
    }
}

// =============================================================================
// Sales Channel
// =============================================================================

/// Where a line item was sold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SalesChannel {
    #[default]
    Local,
    Online,
    Otro,
}

impl SalesChannel {
    pub const ALL: [SalesChannel; 3] = [SalesChannel::Local, SalesChannel::Online, SalesChannel::Otro];

    pub fn label(&self) -> &'static str {
        match self {
            SalesChannel::Local => "Local",
            SalesChannel::Online => "Online",
            SalesChannel::Otro => "Otro",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "local" | "tienda" => SalesChannel::Local,
            "online" | "en linea" | "en línea" => SalesChannel::Online,
            _ => SalesChannel::Otro,
        }
    }
}

impl fmt::Display for SalesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SalesChannel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SalesChannel::from_label(s))
    }
}

// =============================================================================
// Sale Line Item
// =============================================================================

/// One entry of a sale.
///
/// The unit price is captured when the line is written and never
/// re-derived from the product's current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub product_id: String,

    /// Product name when the line was written (display only).
    #[serde(default)]
    pub product_name: String,

    pub variant: Option<VariantRef>,
    pub quantity: i64,
    pub price: Money,
    pub payment_method: PaymentMethod,
    pub channel: SalesChannel,

    /// When false, payment method and channel come from the sale defaults.
    #[serde(rename = "override")]
    pub override_defaults: bool,
}

impl SaleLineItem {
    /// quantity × price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale in a user's `sales` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub owner_id: String,
    pub products: Vec<SaleLineItem>,

    /// Sale-level default payment method.
    pub payment_method: PaymentMethod,

    /// Sale-level default channel.
    pub channel: SalesChannel,

    pub total: Money,

    /// Creation time, refreshed on every edit.
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl Sale {
    /// Total number of units across all lines.
    pub fn units(&self) -> i64 {
        self.products.iter().map(|line| line.quantity).sum()
    }
}

// =============================================================================
// User
// =============================================================================

/// An authenticated user. Every collection is scoped to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Case-insensitive, whitespace-tolerant string equality.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_matches_ignoring_case() {
        let v = Variant::new("M", "Red", 3);
        assert!(v.matches("m", "RED"));
        assert!(v.matches(" M ", "red"));
        assert!(!v.matches("L", "Red"));
        assert_eq!(v.key(), VariantRef::new("m", "rEd").key());
    }

    #[test]
    fn test_payment_method_labels() {
        assert_eq!(PaymentMethod::from_label("DEUNA"), PaymentMethod::Deuna);
        assert_eq!(PaymentMethod::from_label("efectivo"), PaymentMethod::Efectivo);
        assert_eq!(PaymentMethod::from_label("tarjeta"), PaymentMethod::Otro);
        assert_eq!(PaymentMethod::Deuna.to_string(), "DEUNA");
        assert_eq!(PaymentMethod::default(), PaymentMethod::Efectivo);
    }

    #[test]
    fn test_channel_labels() {
        assert_eq!(SalesChannel::from_label("Online"), SalesChannel::Online);
        assert_eq!(SalesChannel::from_label("feria"), SalesChannel::Otro);
        assert_eq!(SalesChannel::default(), SalesChannel::Local);
    }

    #[test]
    fn test_line_item_document_shape() {
        let line = SaleLineItem {
            product_id: "p1".to_string(),
            product_name: "Shirt".to_string(),
            variant: Some(VariantRef::new("M", "Red")),
            quantity: 2,
            price: Money::from_cents(1290),
            payment_method: PaymentMethod::Deuna,
            channel: SalesChannel::Online,
            override_defaults: true,
        };

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["paymentMethod"], "DEUNA");
        assert_eq!(json["override"], true);
        assert_eq!(line.line_total().cents(), 2580);
    }

    #[test]
    fn test_new_product_defaults() {
        let p = Product::new("Shirt", "Acme");
        assert_eq!(p.category, DEFAULT_CATEGORY);
        assert!(!p.uses_variants());
        assert_eq!(p.stock, 0);
        assert_eq!(p.display_name(), "Shirt (Acme)");
    }
}
