//! # Catalog Service
//!
//! Product and variant maintenance for the signed-in user's inventory.
//!
//! Form input arrives as text (prices typed with `.` or `,`), is validated
//! and parsed here, and every write keeps `stock` equal to the sum of the
//! variant counts. Reads and writes of one operation share a unit of work,
//! so the duplicate check and the insert cannot interleave with another
//! writer.

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use vitrina_core::duplicate::find_duplicate;
use vitrina_core::stock::recompute_stock;
use vitrina_core::validation::{
    normalize_category, parse_integer, parse_price, validate_brand, validate_product_name, validate_stock,
    validate_variant_label,
};
use vitrina_core::variant::{ensure_unique, find_variant, variant_index};
use vitrina_core::{CoreError, Money, Product, ValidationError, Variant};
use vitrina_db::{Database, ProductRepository, UnitOfWork};

use crate::auth::Session;
use crate::error::AppResult;

// =============================================================================
// Form Types
// =============================================================================

/// The product form as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub brand: String,

    /// Blank or missing means the configured default category.
    #[serde(default)]
    pub category: Option<String>,

    pub cost_price: String,
    pub sale_price: String,

    #[serde(default)]
    pub variants: Vec<VariantDraft>,

    /// Product-level stock, used only when there are no variants. Blank
    /// means zero.
    #[serde(default)]
    pub stock: String,
}

/// One row of the variant grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VariantDraft {
    pub size: String,
    pub color: String,
    pub stock: i64,
}

impl VariantDraft {
    pub fn new(size: impl Into<String>, color: impl Into<String>, stock: i64) -> Self {
        VariantDraft {
            size: size.into(),
            color: color.into(),
            stock,
        }
    }

    fn validate(&self) -> AppResult<Variant> {
        let size = validate_variant_label("size", &self.size)?;
        let color = validate_variant_label("color", &self.color)?;
        validate_stock(self.stock)?;
        Ok(Variant::new(size, color, self.stock))
    }
}

/// Validated product fields shared by add and update.
struct ProductFields {
    name: String,
    brand: String,
    category: String,
    cost_price: Money,
    sale_price: Money,
    stock: Option<i64>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    session: Session,
    default_category: String,
}

impl CatalogService {
    pub fn new(db: Database, session: Session, default_category: impl Into<String>) -> Self {
        CatalogService {
            db,
            session,
            default_category: default_category.into(),
        }
    }

    /// Adds a product to the inventory.
    ///
    /// ## Errors
    /// - `ValidationError` for a blank name or brand, an unparseable or
    ///   negative price, a bad variant row, or two rows with the same
    ///   (size, color)
    /// - `Duplicate` when the inventory already holds the same product
    pub async fn add_product(&self, draft: ProductDraft) -> AppResult<Product> {
        let user = self.session.require_user()?;
        let fields = self.validate(&draft)?;

        let variants = draft
            .variants
            .iter()
            .map(VariantDraft::validate)
            .collect::<AppResult<Vec<_>>>()?;
        ensure_unique(&variants)?;

        let mut product = Product::new(fields.name, fields.brand);
        product.owner_id = user.id.clone();
        product.category = fields.category;
        product.cost_price = fields.cost_price;
        product.sale_price = fields.sale_price;
        product.variants = variants;
        product.stock = fields.stock.unwrap_or(0);
        recompute_stock(&mut product)?;

        let mut uow = self.db.begin().await?;
        let existing = ProductRepository::list_in(&mut uow, &user.id).await?;
        if let Some(duplicate) = find_duplicate(&existing, &product) {
            return Err(CoreError::DuplicateProduct {
                name: duplicate.name.clone(),
                brand: duplicate.brand.clone(),
            }
            .into());
        }

        let product = ProductRepository::create_in(&mut uow, product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, variants = product.variants.len(), stock = product.stock, "Product added");
        Ok(product)
    }

    /// Replaces name, brand, category and prices.
    ///
    /// Variants and the incorporation date are kept. For a product without
    /// variants a non-blank `stock` field also replaces the stock count.
    pub async fn update_product(&self, id: &str, draft: ProductDraft) -> AppResult<Product> {
        let user = self.session.require_user()?;
        let fields = self.validate(&draft)?;

        let mut uow = self.db.begin().await?;
        let mut product = self.load(&mut uow, &user.id, id).await?;

        product.name = fields.name;
        product.brand = fields.brand;
        product.category = fields.category;
        product.cost_price = fields.cost_price;
        product.sale_price = fields.sale_price;
        if let (false, Some(stock)) = (product.uses_variants(), fields.stock) {
            product.stock = stock;
        }

        let product = ProductRepository::update_in(&mut uow, &product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Removes a product. Past sales keep their line snapshots.
    pub async fn delete_product(&self, id: &str) -> AppResult<()> {
        let user = self.session.require_user()?;
        self.db.products().delete(&user.id, id).await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Adds a (size, color) variant.
    pub async fn add_variant(&self, id: &str, variant: VariantDraft) -> AppResult<Product> {
        let user = self.session.require_user()?;
        let variant = variant.validate()?;

        let mut uow = self.db.begin().await?;
        let mut product = self.load(&mut uow, &user.id, id).await?;

        if find_variant(&product, &variant.size, &variant.color).is_some() {
            return Err(ValidationError::Duplicate {
                field: "variant".to_string(),
                value: format!("{}/{}", variant.size, variant.color),
            }
            .into());
        }

        // The first variant takes over from product-level stock.
        if !product.uses_variants() {
            product.stock = 0;
        }
        product.variants.push(variant);
        recompute_stock(&mut product)?;

        let product = ProductRepository::update_in(&mut uow, &product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, variants = product.variants.len(), "Variant added");
        Ok(product)
    }

    /// Sets the stock count of one variant (restock or count correction).
    pub async fn set_variant_stock(&self, id: &str, size: &str, color: &str, stock: i64) -> AppResult<Product> {
        let user = self.session.require_user()?;
        validate_stock(stock)?;

        let mut uow = self.db.begin().await?;
        let mut product = self.load(&mut uow, &user.id, id).await?;

        let index = variant_index(&product, size, color).ok_or_else(|| variant_not_found(&product, size, color))?;
        product.variants[index].stock = stock;
        recompute_stock(&mut product)?;

        let product = ProductRepository::update_in(&mut uow, &product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, size, color, stock, "Variant restocked");
        Ok(product)
    }

    /// Removes one variant; its units leave the product total.
    pub async fn remove_variant(&self, id: &str, size: &str, color: &str) -> AppResult<Product> {
        let user = self.session.require_user()?;

        let mut uow = self.db.begin().await?;
        let mut product = self.load(&mut uow, &user.id, id).await?;

        let index = variant_index(&product, size, color).ok_or_else(|| variant_not_found(&product, size, color))?;
        let removed = product.variants.remove(index);
        product.stock = product
            .stock
            .checked_sub(removed.stock)
            .ok_or_else(|| CoreError::StockOverflow {
                product: product.display_name(),
            })?;
        recompute_stock(&mut product)?;

        let product = ProductRepository::update_in(&mut uow, &product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, size, color, "Variant removed");
        Ok(product)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn validate(&self, draft: &ProductDraft) -> AppResult<ProductFields> {
        let name = validate_product_name(&draft.name)?;
        let brand = validate_brand(&draft.brand)?;
        let cost_price = parse_price("cost price", &draft.cost_price)?;
        let sale_price = parse_price("sale price", &draft.sale_price)?;

        let stock = if draft.stock.trim().is_empty() {
            None
        } else {
            let stock = parse_integer("stock", &draft.stock)?;
            validate_stock(stock)?;
            Some(stock)
        };

        Ok(ProductFields {
            name,
            brand,
            category: normalize_category(draft.category.as_deref(), &self.default_category),
            cost_price,
            sale_price,
            stock,
        })
    }

    async fn load(&self, uow: &mut UnitOfWork, owner_id: &str, id: &str) -> AppResult<Product> {
        ProductRepository::get_in(uow, owner_id, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }
}

fn variant_not_found(product: &Product, size: &str, color: &str) -> CoreError {
    CoreError::VariantNotFound {
        product: product.display_name(),
        size: size.to_string(),
        color: color.to_string(),
    }
}
