//! # vitrina-core: Pure Business Logic for Vitrina
//!
//! This crate holds the stock-reconciliation rules of the inventory and
//! sales tracker as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vitrina Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile front end                             │   │
//! │  │    Products ──► Sales ──► Reports                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vitrina-app                                  │   │
//! │  │    AppState, SaleService, CatalogService, Session               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vitrina-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐         │   │
//! │  │   │ variant  │ │  stock   │ │ grouping │ │ duplicate │         │   │
//! │  │   │ matcher  │ │ adjuster │ │  lines   │ │ detector  │         │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └───────────┘         │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐         │   │
//! │  │   │  types   │ │  money   │ │   sale   │ │  report   │         │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └───────────┘         │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vitrina-db (Database Layer)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Variant, Sale, SaleLineItem)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Form input validation
//! - [`variant`] - Case-insensitive variant lookup
//! - [`stock`] - Stock deltas and the aggregate stock invariant
//! - [`grouping`] - Grouping sale lines by product
//! - [`duplicate`] - Duplicate product detection
//! - [`sale`] - Sale drafts, totals and stock-sufficiency checks
//! - [`report`] - Sales and inventory summaries
//!
//! ## Example Usage
//!
//! ```rust
//! use vitrina_core::stock::{apply_delta, StockOutcome};
//! use vitrina_core::types::{Product, Variant};
//!
//! let mut shirt = Product::new("Shirt", "Acme");
//! shirt.variants.push(Variant::new("M", "Red", 10));
//! vitrina_core::stock::recompute_stock(&mut shirt).unwrap();
//!
//! let outcome = apply_delta(&mut shirt, "m", "RED", -3);
//! assert!(matches!(outcome, StockOutcome::Applied { current: 7, .. }));
//! assert_eq!(shirt.stock, 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod duplicate;
pub mod error;
pub mod grouping;
pub mod money;
pub mod report;
pub mod sale;
pub mod stock;
pub mod types;
pub mod validation;
pub mod variant;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category assigned to products created without one.
///
/// The shop sells clothing, so the catalog form starts on this label.
pub const DEFAULT_CATEGORY: &str = "Ropa";

/// Maximum quantity of a single line item.
///
/// Guards against typing 1000 instead of 10 on the sale form.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum number of line items in one sale.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum stock count a form may set on one variant or product.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Maximum unit price in cents ($10,000,000.00).
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_SALE_LINES`] this keeps every sale
/// total far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
