//! Self-exclusion facet values.
//!
//! For each stored facet, collect the values still reachable when every
//! active filter applies except that facet's own. The storefront uses the
//! result to disable checkboxes that would lead to an empty page while
//! keeping the shopper's current selections clickable.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tbf_core::facets::{AVAILABILITY_PARAM, AVAILABLE, UNAVAILABLE, VENDOR_PARAM};
use tbf_core::{Facet, MetafieldKey, MetafieldOwner};

use crate::matcher::{ProductMatcher, Relaxation};
use crate::types::ProductNode;
use crate::value::{explode_value, is_variant_available};

/// A facet whose available values can be recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetTarget {
    Metafield(MetafieldOwner, MetafieldKey),
    Vendor,
    Availability,
}

impl FacetTarget {
    /// Parses a facet `param_name`. Price and unknown shapes yield `None`.
    #[must_use]
    pub fn from_param_name(param_name: &str) -> Option<Self> {
        match param_name {
            VENDOR_PARAM => return Some(FacetTarget::Vendor),
            AVAILABILITY_PARAM => return Some(FacetTarget::Availability),
            _ => {}
        }
        let rest = param_name.strip_prefix("filter.")?;
        let mut parts = rest.split('.');
        let (Some(scope), Some(namespace), Some(key), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        let owner = match scope {
            "p" => MetafieldOwner::Product,
            "v" if namespace != "price" && namespace != "availability" => MetafieldOwner::Variant,
            _ => return None,
        };
        Some(FacetTarget::Metafield(owner, MetafieldKey::new(namespace, key)))
    }

    /// Key into [`AvailableValues`]: the `param_name` without `filter.`.
    #[must_use]
    pub fn available_key(&self) -> String {
        match self {
            FacetTarget::Vendor => "p.vendor".to_string(),
            FacetTarget::Availability => "v.availability".to_string(),
            FacetTarget::Metafield(owner, key) => {
                format!("{}.{}.{}", owner.scope(), key.namespace, key.key)
            }
        }
    }

    /// The constraint to hold out while collecting this facet's values.
    #[must_use]
    pub fn relaxation(&self) -> Relaxation<'_> {
        match self {
            FacetTarget::Vendor => Relaxation::Vendor,
            FacetTarget::Availability => Relaxation::Availability,
            FacetTarget::Metafield(MetafieldOwner::Product, key) => Relaxation::ProductKey(key),
            FacetTarget::Metafield(MetafieldOwner::Variant, key) => Relaxation::VariantKey(key),
        }
    }
}

/// Distinct targets of a stored facet index, in index order.
#[must_use]
pub fn facet_targets(facets: &[Facet]) -> Vec<FacetTarget> {
    let mut targets: Vec<FacetTarget> = Vec::new();
    for target in facets
        .iter()
        .filter_map(|f| FacetTarget::from_param_name(&f.param_name))
    {
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}

/// Metafield keys the facet scan has to fetch, split by owner.
#[must_use]
pub fn target_metafields(targets: &[FacetTarget]) -> (Vec<MetafieldKey>, Vec<MetafieldKey>) {
    let mut product = Vec::new();
    let mut variant = Vec::new();
    for target in targets {
        if let FacetTarget::Metafield(owner, key) = target {
            let keys = match owner {
                MetafieldOwner::Product => &mut product,
                MetafieldOwner::Variant => &mut variant,
            };
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    (product, variant)
}

/// Available values per facet, keyed like `p.upng.color` or `p.vendor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailableValues(BTreeMap<String, BTreeSet<String>>);

impl AvailableValues {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.0.get(key).is_some_and(|set| set.contains(value))
    }

    pub fn insert(&mut self, key: &str, value: String) {
        self.0.entry(key.to_string()).or_default().insert(value);
    }

    /// Makes sure `key` is present even when nothing was collected for it.
    pub fn touch(&mut self, key: &str) {
        self.0.entry(key.to_string()).or_default();
    }

    /// Folds another partial result in (set union per key).
    pub fn merge(&mut self, other: AvailableValues) {
        for (key, values) in other.0 {
            self.0.entry(key).or_default().extend(values);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }
}

/// Values of `target` contributed by `product` under `relax`.
///
/// Nothing is contributed unless the product passes the relaxed match.
/// Variant-scoped values come only from variants that pass the remaining
/// variant-level constraints.
pub fn collect_target_values(
    matcher: &ProductMatcher<'_>,
    product: &ProductNode,
    target: &FacetTarget,
    relax: Relaxation<'_>,
    out: &mut BTreeSet<String>,
) {
    if !matcher.matches_relaxed(product, relax) {
        return;
    }
    match target {
        FacetTarget::Vendor => {
            if let Some(vendor) = product.vendor.as_deref().map(str::trim) {
                if !vendor.is_empty() {
                    out.insert(vendor.to_string());
                }
            }
        }
        FacetTarget::Availability => {
            for variant in &product.variants {
                if matcher.variant_passes(product, variant, Relaxation::Availability) {
                    let status = if is_variant_available(variant) {
                        AVAILABLE
                    } else {
                        UNAVAILABLE
                    };
                    out.insert(status.to_string());
                }
            }
        }
        FacetTarget::Metafield(MetafieldOwner::Product, key) => {
            for record in product.metafields_for(key) {
                out.extend(explode_value(Some(record)));
            }
        }
        FacetTarget::Metafield(MetafieldOwner::Variant, key) => {
            for variant in &product.variants {
                if !matcher.variant_passes(product, variant, relax) {
                    continue;
                }
                for record in variant.metafields.iter().filter(|mf| mf.is(key)) {
                    out.extend(explode_value(Some(record)));
                }
            }
        }
    }
}

/// Per-request fold of self-exclusion values over scanned pages.
#[derive(Debug)]
pub struct SelfExclusionAccumulator<'a> {
    matcher: ProductMatcher<'a>,
    targets: &'a [FacetTarget],
    values: AvailableValues,
}

impl<'a> SelfExclusionAccumulator<'a> {
    #[must_use]
    pub fn new(matcher: ProductMatcher<'a>, targets: &'a [FacetTarget]) -> Self {
        let mut values = AvailableValues::default();
        for target in targets {
            values.touch(&target.available_key());
        }
        Self {
            matcher,
            targets,
            values,
        }
    }

    /// Computes one batch's partial result and merges it in.
    pub fn add_batch(&mut self, products: &[ProductNode]) {
        let partial = available_values(&self.matcher, self.targets, products);
        self.values.merge(partial);
    }

    #[must_use]
    pub fn finish(self) -> AvailableValues {
        self.values
    }
}

/// Self-exclusion values of `targets` over `products`.
#[must_use]
pub fn available_values(
    matcher: &ProductMatcher<'_>,
    targets: &[FacetTarget],
    products: &[ProductNode],
) -> AvailableValues {
    let mut values = AvailableValues::default();
    for target in targets {
        let mut set = BTreeSet::new();
        let relax = target.relaxation();
        for product in products {
            collect_target_values(matcher, product, target, relax, &mut set);
        }
        let key = target.available_key();
        values.touch(&key);
        for value in set {
            values.insert(&key, value);
        }
    }
    values
}
