//! Query-string filter classification.
//!
//! Storefront filter parameters follow Shopify's `filter.*` naming. Each
//! `(key, value)` pair is parsed once into a [`FilterParam`] and folded into
//! [`ClassifiedFilters`]; nothing downstream looks at the dotted strings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use tbf_core::facets::{AVAILABILITY_PARAM, AVAILABLE, UNAVAILABLE, VENDOR_PARAM};
use tbf_core::{MetafieldKey, MetafieldOwner};

use crate::types::MetafieldRecord;
use crate::value::explode_value;

/// Upper or lower edge of the price filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBound {
    Gte,
    Lte,
}

/// One recognized filter parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterParam {
    Vendor(String),
    /// `None` for a literal that is neither available nor unavailable.
    Availability(Option<bool>),
    /// `None` for a non-numeric bound.
    Price(PriceBound, Option<Decimal>),
    Metafield {
        owner: MetafieldOwner,
        key: MetafieldKey,
        value: String,
    },
}

impl FilterParam {
    /// Parses one query pair. Unrecognized keys and empty values yield `None`.
    #[must_use]
    pub fn parse(key: &str, value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        match key {
            VENDOR_PARAM => return Some(FilterParam::Vendor(value.to_string())),
            AVAILABILITY_PARAM => {
                return Some(FilterParam::Availability(parse_availability(value)));
            }
            "filter.v.price_gte" | "filter.v.price.gte" => {
                return Some(FilterParam::Price(PriceBound::Gte, parse_price(value)));
            }
            "filter.v.price_lte" | "filter.v.price.lte" => {
                return Some(FilterParam::Price(PriceBound::Lte, parse_price(value)));
            }
            _ => {}
        }

        let mut parts = key.split('.');
        let (Some("filter"), Some(scope), Some(namespace), Some(mf_key), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return None;
        };
        if namespace.is_empty() || mf_key.is_empty() {
            return None;
        }

        let owner = match scope {
            "p" => MetafieldOwner::Product,
            "v" if namespace != "price" && namespace != "availability" => MetafieldOwner::Variant,
            _ => return None,
        };
        Some(FilterParam::Metafield {
            owner,
            key: MetafieldKey::new(namespace, mf_key),
            value: value.to_string(),
        })
    }
}

/// `available`/`true`/`1` mean in stock; `unavailable`/`false`/`0` mean out
/// of stock. Matching is case-insensitive.
fn parse_availability(value: &str) -> Option<bool> {
    let v = value.to_ascii_lowercase();
    match v.as_str() {
        AVAILABLE | "true" | "1" => Some(true),
        UNAVAILABLE | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value).ok()
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceFilter {
    pub gte: Option<Decimal>,
    pub lte: Option<Decimal>,
}

impl PriceFilter {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.gte.is_some() || self.lte.is_some()
    }

    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        self.gte.is_none_or(|gte| price >= gte) && self.lte.is_none_or(|lte| price <= lte)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NativeFilters {
    pub vendor: Option<String>,
    pub availability: Option<bool>,
    pub price: PriceFilter,
}

/// Acceptable values for one metafield key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedKey {
    pub namespace: String,
    pub key: String,
    pub values: Vec<String>,
}

impl ExpectedKey {
    fn is(&self, key: &MetafieldKey) -> bool {
        key.is(&self.namespace, &self.key)
    }
}

/// Expected values grouped by key, in first-seen key order.
///
/// A record set matches when, for every key, some exploded value of a record
/// with that key is one of the expected values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpectedValues(Vec<ExpectedKey>);

impl ExpectedValues {
    /// Adds `value` under `key`. Repeats widen the set, never narrow it.
    pub fn insert(&mut self, key: &MetafieldKey, value: &str) {
        match self.0.iter_mut().find(|e| e.is(key)) {
            Some(entry) => {
                if !entry.values.iter().any(|v| v == value) {
                    entry.values.push(value.to_string());
                }
            }
            None => self.0.push(ExpectedKey {
                namespace: key.namespace.clone(),
                key: key.key.clone(),
                values: vec![value.to_string()],
            }),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpectedKey> {
        self.0.iter()
    }

    #[must_use]
    pub fn contains_key(&self, key: &MetafieldKey) -> bool {
        self.0.iter().any(|e| e.is(key))
    }

    /// Keys in first-seen order.
    #[must_use]
    pub fn keys(&self) -> Vec<MetafieldKey> {
        self.0
            .iter()
            .map(|e| MetafieldKey::new(e.namespace.clone(), e.key.clone()))
            .collect()
    }

    /// Returns `true` if `records` satisfy every expected key, optionally
    /// ignoring one held-out key.
    #[must_use]
    pub fn matches(&self, records: &[MetafieldRecord], except: Option<&MetafieldKey>) -> bool {
        self.0
            .iter()
            .filter(|e| except.is_none_or(|k| !e.is(k)))
            .all(|expected| {
                records
                    .iter()
                    .filter(|r| r.namespace == expected.namespace && r.key == expected.key)
                    .any(|r| {
                        explode_value(Some(r))
                            .iter()
                            .any(|v| expected.values.contains(v))
                    })
            })
    }

    /// Number of keys still constraining once `except` is held out.
    #[must_use]
    pub fn len_except(&self, except: Option<&MetafieldKey>) -> usize {
        self.0
            .iter()
            .filter(|e| except.is_none_or(|k| !e.is(k)))
            .count()
    }
}

/// Active filters of one request. Built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedFilters {
    pub product_metafields: Vec<MetafieldKey>,
    pub variant_metafields: Vec<MetafieldKey>,
    pub native: NativeFilters,
    pub expected_product: ExpectedValues,
    pub expected_variant: ExpectedValues,
}

impl ClassifiedFilters {
    /// Folds one parsed parameter in. Vendor, availability and price bounds
    /// are last-write-wins; metafield values accumulate.
    pub fn apply(&mut self, param: FilterParam) {
        match param {
            FilterParam::Vendor(vendor) => self.native.vendor = Some(vendor),
            FilterParam::Availability(Some(available)) => {
                self.native.availability = Some(available);
            }
            FilterParam::Availability(None) => {}
            FilterParam::Price(PriceBound::Gte, bound) => self.native.price.gte = bound,
            FilterParam::Price(PriceBound::Lte, bound) => self.native.price.lte = bound,
            FilterParam::Metafield { owner, key, value } => {
                let (keys, expected) = match owner {
                    MetafieldOwner::Product => {
                        (&mut self.product_metafields, &mut self.expected_product)
                    }
                    MetafieldOwner::Variant => {
                        (&mut self.variant_metafields, &mut self.expected_variant)
                    }
                };
                if !keys.contains(&key) {
                    keys.push(key.clone());
                }
                expected.insert(&key, &value);
            }
        }
    }

    /// Returns `true` if any constraint is in force.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.expected_product.is_empty()
            || !self.expected_variant.is_empty()
            || self.native.vendor.is_some()
            || self.native.availability.is_some()
            || self.native.price.is_active()
    }
}

/// Classifies a flat, possibly repeated, list of query pairs.
pub fn classify_filters<'a, I>(params: I) -> ClassifiedFilters
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut filters = ClassifiedFilters::default();
    for (key, value) in params {
        if let Some(param) = FilterParam::parse(key, value) {
            filters.apply(param);
        }
    }
    filters
}
