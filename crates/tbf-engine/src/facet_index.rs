//! Offline facet index construction.
//!
//! A [`FacetAccumulator`] is folded over every product of a collection and
//! then finished into the ordered facet array persisted on the collection.
//! Counts only grow during the fold; value metadata is fixed on first sight.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tbf_core::facets::{
    facet_value_id, AVAILABILITY_FACET_ID, AVAILABILITY_PARAM, AVAILABLE, PRICE_FACET_ID,
    PRICE_PARAM, UNAVAILABLE, VENDOR_FACET_ID, VENDOR_PARAM,
};
use tbf_core::{Facet, FacetValue, MetafieldKey, MetafieldOwner};

use crate::collate::{dedup_key, locale_cmp};
use crate::matcher::variant_price;
use crate::types::{MetafieldRecord, ProductNode, ProductQuery};
use crate::value::{explode_value, is_variant_available};

/// A resolved metafield definition selected by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafieldDefinition {
    /// Opaque definition id; the facet id of the resulting facet.
    pub id: String,
    pub name: Option<String>,
    pub key: MetafieldKey,
    pub owner: MetafieldOwner,
    /// Definition type name, e.g. `list.single_line_text_field`.
    pub type_name: Option<String>,
}

/// What one collection's facet index should contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexConfig {
    pub definitions: Vec<MetafieldDefinition>,
    pub include_vendor: bool,
    pub include_availability: bool,
    pub include_price: bool,
    /// Explicit facet order, by facet id.
    pub order: Vec<String>,
    /// Facet id -> display label.
    pub labels: BTreeMap<String, String>,
}

impl IndexConfig {
    /// Returns `true` if the config selects no facet at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
            && !self.include_vendor
            && !self.include_availability
            && !self.include_price
    }

    fn keys_for(&self, owner: MetafieldOwner) -> Vec<MetafieldKey> {
        let mut keys: Vec<MetafieldKey> = Vec::new();
        for def in self.definitions.iter().filter(|d| d.owner == owner) {
            if !keys.contains(&def.key) {
                keys.push(def.key.clone());
            }
        }
        keys
    }

    /// Product query fetching exactly the selected metafields.
    #[must_use]
    pub fn query(&self, collection_id: &str, page_size: u32) -> ProductQuery {
        ProductQuery::new(collection_id, page_size).with_metafields(
            self.keys_for(MetafieldOwner::Product),
            self.keys_for(MetafieldOwner::Variant),
        )
    }
}

#[derive(Debug, Clone)]
enum SlotKind {
    Metafield(MetafieldOwner, MetafieldKey),
    Vendor,
    Availability,
    Price,
}

#[derive(Debug, Clone)]
struct FacetSlot {
    id: String,
    default_label: String,
    namespace: Option<String>,
    key: String,
    facet_type: String,
    kind: SlotKind,
    tally: ValueTally,
}

impl FacetSlot {
    fn native(id: &str, label: &str, facet_type: &str, param_name: &str, kind: SlotKind) -> Self {
        Self {
            id: id.to_string(),
            default_label: label.to_string(),
            namespace: None,
            key: id.to_string(),
            facet_type: facet_type.to_string(),
            kind,
            tally: ValueTally::new(param_name.to_string()),
        }
    }

    fn metafield(def: &MetafieldDefinition) -> Self {
        Self {
            id: def.id.clone(),
            default_label: def
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| def.key.to_string()),
            namespace: Some(def.key.namespace.clone()),
            key: def.key.key.clone(),
            facet_type: def.type_name.clone().unwrap_or_default(),
            kind: SlotKind::Metafield(def.owner, def.key.clone()),
            tally: ValueTally::new(def.owner.param_name(&def.key)),
        }
    }
}

/// Values of one facet keyed by their exact string, in first-seen order.
#[derive(Debug, Clone)]
struct ValueTally {
    param_name: String,
    values: Vec<FacetValue>,
    positions: HashMap<String, usize>,
}

impl ValueTally {
    fn new(param_name: String) -> Self {
        Self {
            param_name,
            values: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Counts one occurrence of `value`.
    fn bump(&mut self, value: &str) {
        if let Some(&i) = self.positions.get(value) {
            self.values[i].count += 1;
            return;
        }
        self.positions.insert(value.to_string(), self.values.len());
        self.values.push(FacetValue {
            id: facet_value_id(&self.param_name, value),
            value: value.to_string(),
            label: value.to_string(),
            count: 1,
            active: false,
            param_name: self.param_name.clone(),
        });
    }

    /// Merges case-insensitive duplicates into their first spelling, then
    /// sorts.
    fn finish(self) -> Vec<FacetValue> {
        let mut merged: Vec<FacetValue> = Vec::with_capacity(self.values.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        for value in self.values {
            let k = dedup_key(&value.value);
            if let Some(&i) = seen.get(&k) {
                merged[i].count += value.count;
            } else {
                seen.insert(k, merged.len());
                merged.push(value);
            }
        }
        merged.sort_by(|a, b| locale_cmp(&a.value, &b.value));
        merged
    }
}

/// Fold state of one facet index build.
#[derive(Debug, Clone)]
pub struct FacetAccumulator {
    slots: Vec<FacetSlot>,
    tracks_price: bool,
    max_floor_price: Option<Decimal>,
    priced_products: u64,
}

impl FacetAccumulator {
    /// Sets up one slot per selected facet: product definitions, variant
    /// definitions, then vendor, availability and price.
    #[must_use]
    pub fn new(config: &IndexConfig) -> Self {
        let mut slots: Vec<FacetSlot> = Vec::new();
        for owner in [MetafieldOwner::Product, MetafieldOwner::Variant] {
            for def in config.definitions.iter().filter(|d| d.owner == owner) {
                let slot = FacetSlot::metafield(def);
                if !slots.iter().any(|s| s.tally.param_name == slot.tally.param_name) {
                    slots.push(slot);
                }
            }
        }
        if config.include_vendor {
            slots.push(FacetSlot::native(
                VENDOR_FACET_ID,
                "Vendor",
                "single_line_text_field",
                VENDOR_PARAM,
                SlotKind::Vendor,
            ));
        }
        if config.include_availability {
            slots.push(FacetSlot::native(
                AVAILABILITY_FACET_ID,
                "Availability",
                "boolean",
                AVAILABILITY_PARAM,
                SlotKind::Availability,
            ));
        }
        if config.include_price {
            slots.push(FacetSlot::native(
                PRICE_FACET_ID,
                "Price",
                "money",
                PRICE_PARAM,
                SlotKind::Price,
            ));
        }
        Self {
            slots,
            tracks_price: config.include_price,
            max_floor_price: None,
            priced_products: 0,
        }
    }

    /// Folds one product in.
    ///
    /// Product metafields, vendor and availability count once per product;
    /// variant metafields count once per variant.
    pub fn add_product(&mut self, product: &ProductNode) {
        for slot in &mut self.slots {
            let tally = &mut slot.tally;
            match &slot.kind {
                SlotKind::Metafield(MetafieldOwner::Product, key) => {
                    for value in distinct_values(product.metafields_for(key)) {
                        tally.bump(&value);
                    }
                }
                SlotKind::Metafield(MetafieldOwner::Variant, key) => {
                    for variant in &product.variants {
                        let records = variant.metafields.iter().filter(|mf| mf.is(key));
                        for value in distinct_values(records) {
                            tally.bump(&value);
                        }
                    }
                }
                SlotKind::Vendor => {
                    let vendor = product.vendor.as_deref().map_or("", str::trim);
                    if !vendor.is_empty() {
                        tally.bump(vendor);
                    }
                }
                SlotKind::Availability => {
                    let available = product.variants.iter().any(is_variant_available);
                    tally.bump(if available { AVAILABLE } else { UNAVAILABLE });
                }
                SlotKind::Price => {}
            }
        }

        if self.tracks_price {
            if let Some(floor) = floor_price(product) {
                self.priced_products += 1;
                self.max_floor_price =
                    Some(self.max_floor_price.map_or(floor, |m| m.max(floor)));
            }
        }
    }

    /// Finishes the fold into the persisted facet array.
    ///
    /// Facets listed in `config.order` come first in that order (unknown ids
    /// are skipped), then the rest in slot order. Facets without values are
    /// dropped. Labels come from `config.labels`, then the definition name,
    /// then `namespace.key`.
    #[must_use]
    pub fn finish(self, config: &IndexConfig) -> Vec<Facet> {
        let price_value = self.max_floor_price.map(|max| {
            let amount = max.normalize().to_string();
            FacetValue {
                id: facet_value_id(PRICE_PARAM, "max"),
                value: amount.clone(),
                label: amount,
                count: self.priced_products,
                active: false,
                param_name: PRICE_PARAM.to_string(),
            }
        });

        let mut facets: Vec<Facet> = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            let label = config
                .labels
                .get(&slot.id)
                .filter(|l| !l.trim().is_empty())
                .cloned()
                .unwrap_or(slot.default_label);
            let param_name = slot.tally.param_name.clone();
            let (presentation, values) = match slot.kind {
                SlotKind::Price => ("price_range", price_value.iter().cloned().collect()),
                _ => ("text", slot.tally.finish()),
            };
            if values.is_empty() {
                continue;
            }
            facets.push(Facet {
                id: slot.id,
                label,
                namespace: slot.namespace,
                key: slot.key,
                facet_type: slot.facet_type,
                param_name,
                presentation: presentation.to_string(),
                values,
            });
        }

        order_facets(facets, &config.order)
    }
}

/// Distinct, trimmed, non-empty values of the given records, in first-seen
/// order.
fn distinct_values<'a>(records: impl Iterator<Item = &'a MetafieldRecord>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for record in records {
        for value in explode_value(Some(record)) {
            let value = value.trim();
            if !value.is_empty() && seen.insert(value.to_string()) {
                out.push(value.to_string());
            }
        }
    }
    out
}

/// Lowest price of a product: the minimum over its variants (each falling
/// back to the product price range), or the range minimum when it has no
/// priced variant.
fn floor_price(product: &ProductNode) -> Option<Decimal> {
    product
        .variants
        .iter()
        .filter_map(|v| variant_price(product, v))
        .min()
        .or_else(|| {
            product
                .price_range
                .min
                .as_deref()
                .and_then(|s| Decimal::from_str(s.trim()).ok())
        })
}

/// Applies the explicit order, then appends the remaining facets in their
/// current order.
fn order_facets(facets: Vec<Facet>, order: &[String]) -> Vec<Facet> {
    let mut remaining: Vec<Option<Facet>> = facets.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    for id in order {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|f| f.as_ref().is_some_and(|f| &f.id == id))
        {
            if let Some(facet) = slot.take() {
                ordered.push(facet);
            }
        }
    }
    ordered.extend(remaining.into_iter().flatten());
    ordered
}

/// Builds the index for one collection's products in one pass.
#[must_use]
pub fn build_index<'a>(
    config: &IndexConfig,
    products: impl IntoIterator<Item = &'a ProductNode>,
) -> Vec<Facet> {
    let mut acc = FacetAccumulator::new(config);
    for product in products {
        acc.add_product(product);
    }
    acc.finish(config)
}

#[cfg(test)]
#[path = "facet_index_test.rs"]
mod tests;
