//! # Validation Module
//!
//! Input validation for the product, variant, sale and account forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                    │
//! │  └── Empty-field checks, numeric keyboards                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: vitrina-app services                                         │
//! │  └── THIS MODULE: parse and check every field before any write         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / UNIQUE / CHECK constraints                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here runs before the first write of an operation, so a
//! failure leaves no side effects.

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_SALE_LINES, MAX_STOCK};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Checks that `value` is not blank and returns it trimmed.
pub fn require(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(value.to_string())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use vitrina_core::validation::validate_product_name;
///
/// assert_eq!(validate_product_name("  Camisa  ").unwrap(), "Camisa");
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = require("name", name)?;
    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }
    Ok(name)
}

/// Validates a brand. Same rules as the name, shorter limit.
pub fn validate_brand(brand: &str) -> ValidationResult<String> {
    let brand = require("brand", brand)?;
    if brand.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "brand".to_string(),
            max: 100,
        });
    }
    Ok(brand)
}

/// Returns the trimmed category, or `default` when blank.
pub fn normalize_category(category: Option<&str>, default: &str) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => default.trim().to_string(),
    }
}

/// Validates a variant size or color label.
pub fn validate_variant_label(field: &str, value: &str) -> ValidationResult<String> {
    let value = require(field, value)?;
    if value.chars().count() > 40 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 40,
        });
    }
    Ok(value)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a price typed into a form.
///
/// ## Rules
/// - Required
/// - Must be a decimal number (see [`Money::parse`])
/// - Must be non-negative and at most [`MAX_PRICE_CENTS`]
///
/// ## Example
/// ```rust
/// use vitrina_core::validation::parse_price;
///
/// assert_eq!(parse_price("cost price", "7,10").unwrap().cents(), 710);
/// assert!(parse_price("cost price", "siete").is_err());
/// assert!(parse_price("cost price", "-1").is_err());
/// assert!(parse_price("sale price", "90000000000000000").is_err());
/// ```
pub fn parse_price(field: &str, input: &str) -> ValidationResult<Money> {
    let raw = require(field, input)?;
    let money = Money::parse(&raw).ok_or_else(|| ValidationError::InvalidNumber {
        field: field.to_string(),
        value: raw.clone(),
    })?;
    validate_price(field, money)?;
    Ok(money)
}

/// Validates a price that is already a number.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Parses a whole-number field (quantity, stock).
pub fn parse_integer(field: &str, input: &str) -> ValidationResult<i64> {
    let raw = require(field, input)?;
    raw.parse::<i64>().map_err(|_| ValidationError::InvalidNumber {
        field: field.to_string(),
        value: raw,
    })
}

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock count entered by hand: `0..=MAX_STOCK`.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a sale.
pub fn validate_sale_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::required("products"));
    }
    if lines > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "products".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates and normalises an email address (trimmed, lowercased).
///
/// Only the shape is checked: one `@`, a non-empty local part and a dotted
/// domain.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = require("email", email)?.to_lowercase();

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.com".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(email)
}

/// Validates a password for registration.
///
/// ## Rules
/// - At least 6 characters (the identity provider's historical minimum)
/// - At most 128 characters
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if len < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }
    if len > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_CATEGORY;

    #[test]
    fn test_validate_product_name() {
        assert_eq!(validate_product_name(" Camisa ").unwrap(), "Camisa");
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(None, DEFAULT_CATEGORY), "Ropa");
        assert_eq!(normalize_category(Some("  "), DEFAULT_CATEGORY), "Ropa");
        assert_eq!(normalize_category(Some(" Calzado "), DEFAULT_CATEGORY), "Calzado");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("sale price", "12.90").unwrap().cents(), 1290);
        assert_eq!(parse_price("sale price", "0").unwrap().cents(), 0);

        assert!(matches!(
            parse_price("sale price", "").unwrap_err(),
            ValidationError::Required { .. }
        ));
        assert!(matches!(
            parse_price("sale price", "doce").unwrap_err(),
            ValidationError::InvalidNumber { .. }
        ));
        assert!(matches!(
            parse_price("sale price", "-4").unwrap_err(),
            ValidationError::OutOfRange { .. }
        ));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("stock", " 12 ").unwrap(), 12);
        assert!(parse_integer("stock", "1.5").is_err());
        assert!(parse_integer("stock", "x").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_stock() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(MAX_STOCK).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_stock(MAX_STOCK + 1).is_err());
        assert!(validate_stock(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_sale_size() {
        assert!(validate_sale_size(0).is_err());
        assert!(validate_sale_size(1).is_ok());
        assert!(validate_sale_size(MAX_SALE_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Ana@Tienda.EC ").unwrap(), "ana@tienda.ec");
        assert!(validate_email("").is_err());
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@tienda.ec").is_err());
        assert!(validate_email("ana@tienda").is_err());
        assert!(validate_email("ana@@tienda.ec").is_err());
        assert!(validate_email("a na@tienda.ec").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secreto").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_price_bounds() {
        assert!(validate_price("price", Money::from_cents(MAX_PRICE_CENTS)).is_ok());
        assert!(validate_price("price", Money::from_cents(MAX_PRICE_CENTS + 1)).is_err());
        assert!(parse_price("sale price", "10000000.00").is_ok());
        assert!(parse_price("sale price", "10000000.01").is_err());
    }
}
