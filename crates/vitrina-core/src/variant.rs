//! # Variant Matcher
//!
//! Finds the variant of a product for a (size, color) pair.
//!
//! Matching ignores case and surrounding whitespace on both fields. The
//! first match wins; products should never hold two variants with the same
//! key, but the matcher does not enforce it (see [`ensure_unique`]).

use crate::error::ValidationError;
use crate::types::{Product, Variant};

/// Returns the first variant of `product` matching (size, color).
pub fn find_variant<'a>(product: &'a Product, size: &str, color: &str) -> Option<&'a Variant> {
    product.variants.iter().find(|v| v.matches(size, color))
}

/// Mutable twin of [`find_variant`].
pub fn find_variant_mut<'a>(
    product: &'a mut Product,
    size: &str,
    color: &str,
) -> Option<&'a mut Variant> {
    product.variants.iter_mut().find(|v| v.matches(size, color))
}

/// Position of the first matching variant.
pub fn variant_index(product: &Product, size: &str, color: &str) -> Option<usize> {
    product.variants.iter().position(|v| v.matches(size, color))
}

/// Checks that no two variants share a (size, color) key.
///
/// Used by catalog operations before a write; the matcher itself stays
/// lenient so that legacy documents with duplicates can still be read.
pub fn ensure_unique(variants: &[Variant]) -> Result<(), ValidationError> {
    for (i, v) in variants.iter().enumerate() {
        if variants[..i].iter().any(|earlier| earlier.key() == v.key()) {
            return Err(ValidationError::Duplicate {
                field: "variant".to_string(),
                value: format!("{}/{}", v.size, v.color),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> Product {
        let mut p = Product::new("Shirt", "Acme");
        p.variants = vec![
            Variant::new("S", "Blue", 4),
            Variant::new("M", "Red", 10),
        ];
        p
    }

    #[test]
    fn test_find_variant_case_insensitive() {
        let p = shirt();
        let v = find_variant(&p, "m", "RED").unwrap();
        assert_eq!(v.stock, 10);
        assert!(find_variant(&p, "L", "Red").is_none());
        assert_eq!(variant_index(&p, "s", "blue"), Some(0));
    }

    #[test]
    fn test_first_match_wins() {
        let mut p = shirt();
        p.variants.push(Variant::new("m", "red", 99));
        assert_eq!(find_variant(&p, "M", "Red").unwrap().stock, 10);

        find_variant_mut(&mut p, "M", "Red").unwrap().stock = 1;
        assert_eq!(p.variants[1].stock, 1);
        assert_eq!(p.variants[2].stock, 99);
    }

    #[test]
    fn test_ensure_unique() {
        let mut p = shirt();
        assert!(ensure_unique(&p.variants).is_ok());

        p.variants.push(Variant::new("s", "BLUE", 0));
        let err = ensure_unique(&p.variants).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));
    }
}
