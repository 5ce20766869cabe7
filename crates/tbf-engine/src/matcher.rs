//! Per-product match decision.
//!
//! A product passes when all three hold:
//!
//! 1. its product metafields satisfy every expected product key;
//! 2. its variants pass the variant-level check (below);
//! 3. its trimmed vendor equals the vendor filter, when one is set.
//!
//! Variant-level check: when availability is constrained to *unavailable*
//! every variant must be unavailable and nothing else is checked.
//! Otherwise some single variant must satisfy the variant metafields, the
//! availability requirement and the price bounds together, so a product
//! without variants never passes.

use std::str::FromStr;

use rust_decimal::Decimal;
use tbf_core::MetafieldKey;

use crate::classify::ClassifiedFilters;
use crate::types::{ProductNode, VariantNode};
use crate::value::is_variant_available;

/// One constraint to hold out while matching. Used by the self-exclusion
/// calculator; ordinary filtering uses [`Relaxation::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relaxation<'a> {
    None,
    ProductKey(&'a MetafieldKey),
    VariantKey(&'a MetafieldKey),
    Vendor,
    Availability,
}

impl<'a> Relaxation<'a> {
    fn product_key(self) -> Option<&'a MetafieldKey> {
        match self {
            Relaxation::ProductKey(k) => Some(k),
            _ => None,
        }
    }

    fn variant_key(self) -> Option<&'a MetafieldKey> {
        match self {
            Relaxation::VariantKey(k) => Some(k),
            _ => None,
        }
    }
}

/// Evaluates products against one request's filters.
#[derive(Debug, Clone, Copy)]
pub struct ProductMatcher<'a> {
    filters: &'a ClassifiedFilters,
}

impl<'a> ProductMatcher<'a> {
    #[must_use]
    pub fn new(filters: &'a ClassifiedFilters) -> Self {
        Self { filters }
    }

    #[must_use]
    pub fn filters(&self) -> &'a ClassifiedFilters {
        self.filters
    }

    /// Full decision with every constraint applied.
    #[must_use]
    pub fn matches(&self, product: &ProductNode) -> bool {
        self.matches_relaxed(product, Relaxation::None)
    }

    /// Decision with one constraint held out.
    #[must_use]
    pub fn matches_relaxed(&self, product: &ProductNode, relax: Relaxation<'_>) -> bool {
        self.product_level(product, relax)
            && self.variant_level(product, relax)
            && self.vendor_level(product, relax)
    }

    fn product_level(&self, product: &ProductNode, relax: Relaxation<'_>) -> bool {
        self.filters
            .expected_product
            .matches(&product.metafields, relax.product_key())
    }

    fn vendor_level(&self, product: &ProductNode, relax: Relaxation<'_>) -> bool {
        if relax == Relaxation::Vendor {
            return true;
        }
        match &self.filters.native.vendor {
            Some(vendor) => product.vendor.as_deref().map(str::trim) == Some(vendor.trim()),
            None => true,
        }
    }

    fn availability(&self, relax: Relaxation<'_>) -> Option<bool> {
        if relax == Relaxation::Availability {
            None
        } else {
            self.filters.native.availability
        }
    }

    fn variant_level(&self, product: &ProductNode, relax: Relaxation<'_>) -> bool {
        match self.availability(relax) {
            Some(false) => product.variants.iter().all(|v| !is_variant_available(v)),
            Some(true) => product.variants.iter().any(|v| {
                is_variant_available(v) && self.variant_attributes(product, v, relax)
            }),
            None => product
                .variants
                .iter()
                .any(|v| self.variant_attributes(product, v, relax)),
        }
    }

    /// Returns `true` if `variant` satisfies every variant-level constraint
    /// still in force under `relax`. Availability counts unless it is the
    /// relaxed constraint.
    #[must_use]
    pub fn variant_passes(
        &self,
        product: &ProductNode,
        variant: &VariantNode,
        relax: Relaxation<'_>,
    ) -> bool {
        let availability_ok = match self.availability(relax) {
            Some(want) => is_variant_available(variant) == want,
            None => true,
        };
        availability_ok && self.variant_attributes(product, variant, relax)
    }

    /// Variant metafields and price, without availability.
    fn variant_attributes(
        &self,
        product: &ProductNode,
        variant: &VariantNode,
        relax: Relaxation<'_>,
    ) -> bool {
        self.filters
            .expected_variant
            .matches(&variant.metafields, relax.variant_key())
            && self.price_ok(product, variant)
    }

    fn price_ok(&self, product: &ProductNode, variant: &VariantNode) -> bool {
        let price = &self.filters.native.price;
        if !price.is_active() {
            return true;
        }
        variant_price(product, variant).is_some_and(|p| price.contains(p))
    }
}

fn parse_amount(raw: Option<&String>) -> Option<Decimal> {
    raw.and_then(|s| Decimal::from_str(s.trim()).ok())
}

/// The variant's own price, else the product's minimum price, else its
/// maximum price.
#[must_use]
pub fn variant_price(product: &ProductNode, variant: &VariantNode) -> Option<Decimal> {
    parse_amount(variant.price.as_ref())
        .or_else(|| parse_amount(product.price_range.min.as_ref()))
        .or_else(|| parse_amount(product.price_range.max.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_filters;
    use crate::types::{BackorderFlag, MetafieldRecord, PriceRange};

    fn variant(qty: i64, metafields: &[(&str, &str)]) -> VariantNode {
        VariantNode {
            id: format!("v-{qty}"),
            price: None,
            quantity: Some(qty),
            allow_backorder: None,
            metafields: metafields
                .iter()
                .map(|(k, v)| MetafieldRecord::new("upng", k, v))
                .collect(),
        }
    }

    fn product(vendor: &str, variants: Vec<VariantNode>) -> ProductNode {
        ProductNode {
            id: "p1".into(),
            title: "Shirt".into(),
            handle: "shirt".into(),
            vendor: Some(vendor.into()),
            price_range: PriceRange::default(),
            metafields: vec![],
            variants,
        }
    }

    #[test]
    fn and_across_keys_within_one_variant() {
        let filters =
            classify_filters([("filter.v.upng.color", "red"), ("filter.v.upng.size", "M")]);
        let matcher = ProductMatcher::new(&filters);

        let red_l = product("Acme", vec![variant(1, &[("color", "red"), ("size", "L")])]);
        let red_m = product("Acme", vec![variant(1, &[("color", "red"), ("size", "M")])]);
        assert!(!matcher.matches(&red_l));
        assert!(matcher.matches(&red_m));
    }

    #[test]
    fn keys_must_match_on_the_same_variant() {
        let filters =
            classify_filters([("filter.v.upng.color", "red"), ("filter.v.upng.size", "M")]);
        let matcher = ProductMatcher::new(&filters);
        let split = product(
            "Acme",
            vec![
                variant(1, &[("color", "red"), ("size", "L")]),
                variant(1, &[("color", "blue"), ("size", "M")]),
            ],
        );
        assert!(!matcher.matches(&split));
    }

    #[test]
    fn or_within_key() {
        let filters = classify_filters([
            ("filter.v.upng.color", "red"),
            ("filter.v.upng.color", "blue"),
        ]);
        let matcher = ProductMatcher::new(&filters);
        assert!(matcher.matches(&product("Acme", vec![variant(1, &[("color", "blue")])])));
        assert!(!matcher.matches(&product("Acme", vec![variant(1, &[("color", "green")])])));
    }

    #[test]
    fn unavailable_requires_every_variant_unavailable() {
        let filters = classify_filters([("filter.v.availability", "false")]);
        let matcher = ProductMatcher::new(&filters);
        let mixed = product("Acme", vec![variant(2, &[]), variant(0, &[])]);
        let sold_out = product("Acme", vec![variant(0, &[]), variant(0, &[])]);
        assert!(!matcher.matches(&mixed));
        assert!(matcher.matches(&sold_out));
    }

    #[test]
    fn unavailable_ignores_variant_attributes_and_price() {
        let filters = classify_filters([
            ("filter.v.availability", "unavailable"),
            ("filter.v.upng.color", "red"),
            ("filter.v.price_gte", "100"),
        ]);
        let matcher = ProductMatcher::new(&filters);
        let blue = product("Acme", vec![variant(0, &[("color", "blue")])]);
        let red = product("Acme", vec![variant(0, &[("color", "red")])]);
        let red_in_stock = product("Acme", vec![variant(3, &[("color", "red")])]);
        assert!(matcher.matches(&blue));
        assert!(matcher.matches(&red));
        assert!(!matcher.matches(&red_in_stock));
    }

    #[test]
    fn available_requires_one_available_variant() {
        let filters = classify_filters([("filter.v.availability", "available")]);
        let matcher = ProductMatcher::new(&filters);
        let mut backorder = variant(0, &[]);
        backorder.allow_backorder = Some(BackorderFlag::Text("1".into()));

        assert!(!matcher.matches(&product("Acme", vec![variant(0, &[])])));
        assert!(matcher.matches(&product("Acme", vec![variant(0, &[]), backorder])));
    }

    #[test]
    fn price_uses_variant_then_product_fallback() {
        let filters = classify_filters([
            ("filter.v.price_gte", "10"),
            ("filter.v.price_lte", "20"),
        ]);
        let matcher = ProductMatcher::new(&filters);

        let mut priced = variant(1, &[]);
        priced.price = Some("20.00".into());
        assert!(matcher.matches(&product("Acme", vec![priced])));

        let mut fallback = product("Acme", vec![variant(1, &[])]);
        fallback.price_range = PriceRange {
            min: Some("25.00".into()),
            max: Some("30.00".into()),
        };
        assert!(!matcher.matches(&fallback));
        fallback.price_range.min = Some("not-a-price".into());
        fallback.price_range.max = Some("15".into());
        assert!(matcher.matches(&fallback));

        let unpriced = product("Acme", vec![variant(1, &[])]);
        assert!(!matcher.matches(&unpriced));
    }

    #[test]
    fn vendor_is_exact_match() {
        let filters = classify_filters([("filter.p.vendor", "Acme")]);
        let matcher = ProductMatcher::new(&filters);
        assert!(matcher.matches(&product("Acme", vec![variant(1, &[])])));
        assert!(!matcher.matches(&product("acme", vec![variant(1, &[])])));
    }

    #[test]
    fn vendor_comparison_ignores_surrounding_whitespace() {
        let filters = classify_filters([("filter.p.vendor", "Acme")]);
        let matcher = ProductMatcher::new(&filters);
        assert!(matcher.matches(&product("  Acme ", vec![variant(1, &[])])));
        assert!(!matcher.matches(&product(" Acme Co ", vec![variant(1, &[])])));
    }

    #[test]
    fn product_metafield_required_when_constrained() {
        let filters = classify_filters([("filter.p.upng.material", "cotton")]);
        let matcher = ProductMatcher::new(&filters);
        let mut with = product("Acme", vec![variant(1, &[])]);
        with.metafields = vec![MetafieldRecord::new("upng", "material", "cotton|linen")];
        let without = product("Acme", vec![variant(1, &[])]);
        assert!(matcher.matches(&with));
        assert!(!matcher.matches(&without));
    }

    #[test]
    fn relaxation_drops_only_the_held_out_constraint() {
        let filters = classify_filters([
            ("filter.p.vendor", "Acme"),
            ("filter.v.upng.color", "red"),
        ]);
        let matcher = ProductMatcher::new(&filters);
        let other_vendor_red = product("Other", vec![variant(1, &[("color", "red")])]);
        let acme_blue = product("Acme", vec![variant(1, &[("color", "blue")])]);
        let color = MetafieldKey::new("upng", "color");

        assert!(matcher.matches_relaxed(&other_vendor_red, Relaxation::Vendor));
        assert!(!matcher.matches_relaxed(&other_vendor_red, Relaxation::VariantKey(&color)));
        assert!(matcher.matches_relaxed(&acme_blue, Relaxation::VariantKey(&color)));
        assert!(!matcher.matches_relaxed(&acme_blue, Relaxation::Vendor));
    }

    #[test]
    fn variantless_product_fails_unless_unavailable_is_requested() {
        let vendor_only = classify_filters([("filter.p.vendor", "Acme")]);
        assert!(!ProductMatcher::new(&vendor_only).matches(&product("Acme", vec![])));

        let available = classify_filters([("filter.v.availability", "true")]);
        assert!(!ProductMatcher::new(&available).matches(&product("Acme", vec![])));

        // Every variant of an empty list is unavailable.
        let unavailable = classify_filters([("filter.v.availability", "false")]);
        assert!(ProductMatcher::new(&unavailable).matches(&product("Acme", vec![])));
    }
}
