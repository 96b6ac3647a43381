//! # Duplicate Detector
//!
//! Decides whether a product about to be created already exists.
//!
//! ## Rule
//! ```text
//! same name AND same brand (case-insensitive)
//!   AND ( both have no variants
//!       OR both have variants AND one (size, color) pair overlaps )
//! ```
//!
//! A product with variants is never a duplicate of one without variants,
//! and vice versa. That asymmetry looks accidental but is kept as-is until
//! the shop owner says otherwise.

use crate::types::{eq_ignore_case, Product};

/// Whether `candidate` duplicates any product in `existing`.
pub fn is_duplicate(existing: &[Product], candidate: &Product) -> bool {
    find_duplicate(existing, candidate).is_some()
}

/// The first existing product that `candidate` duplicates.
pub fn find_duplicate<'a>(existing: &'a [Product], candidate: &Product) -> Option<&'a Product> {
    existing
        .iter()
        .filter(|p| p.id != candidate.id || candidate.id.is_empty())
        .find(|p| duplicates(p, candidate))
}

fn duplicates(existing: &Product, candidate: &Product) -> bool {
    if !eq_ignore_case(&existing.name, &candidate.name) || !eq_ignore_case(&existing.brand, &candidate.brand) {
        return false;
    }

    match (existing.uses_variants(), candidate.uses_variants()) {
        (false, false) => true,
        (true, true) => candidate
            .variants
            .iter()
            .any(|c| existing.variants.iter().any(|e| e.key() == c.key())),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variant;

    fn product(name: &str, brand: &str, variants: &[(&str, &str)]) -> Product {
        let mut p = Product::new(name, brand);
        p.id = format!("{}-{}", name, variants.len());
        p.variants = variants.iter().map(|(s, c)| Variant::new(*s, *c, 1)).collect();
        p
    }

    #[test]
    fn test_no_variants_on_either_side() {
        let existing = vec![product("Shirt", "Acme", &[])];
        let mut candidate = product("shirt", " ACME ", &[]);
        candidate.id.clear();
        assert!(is_duplicate(&existing, &candidate));
    }

    #[test]
    fn test_variant_overlap() {
        let existing = vec![product("Shirt", "Acme", &[("M", "Red"), ("L", "Blue")])];

        let mut overlapping = product("Shirt", "Acme", &[("S", "Green"), ("l", "BLUE")]);
        overlapping.id.clear();
        assert!(is_duplicate(&existing, &overlapping));

        let mut disjoint = product("Shirt", "Acme", &[("S", "Green")]);
        disjoint.id.clear();
        assert!(!is_duplicate(&existing, &disjoint));
    }

    #[test]
    fn test_different_name_or_brand() {
        let existing = vec![product("Shirt", "Acme", &[])];
        let mut other_brand = product("Shirt", "Zeta", &[]);
        other_brand.id.clear();
        assert!(!is_duplicate(&existing, &other_brand));

        let mut other_name = product("Pants", "Acme", &[]);
        other_name.id.clear();
        assert!(!is_duplicate(&existing, &other_name));
    }

    // Mixed empty / non-empty variant lists never collide.
    #[test]
    fn test_mixed_variant_lists_are_not_duplicates() {
        let existing = vec![product("Shirt", "Acme", &[("M", "Red")])];
        let mut bare = product("Shirt", "Acme", &[]);
        bare.id.clear();
        assert!(!is_duplicate(&existing, &bare));

        let existing = vec![product("Shirt", "Acme", &[])];
        let mut with_variant = product("Shirt", "Acme", &[("M", "Red")]);
        with_variant.id.clear();
        assert!(!is_duplicate(&existing, &with_variant));
    }

    #[test]
    fn test_product_is_not_its_own_duplicate() {
        let existing = vec![product("Shirt", "Acme", &[])];
        let same = existing[0].clone();
        assert!(!is_duplicate(&existing, &same));
    }
}
