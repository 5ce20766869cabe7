//! The persisted facet index and the `filter.*` parameter vocabulary.
//!
//! A facet index is the JSON array written onto a collection metafield
//! (`tb-filters.config`) whenever a filter template is saved. The storefront
//! reads it back to render checkboxes and to know which facets exist when
//! computing self-exclusion values.
//!
//! `param_name` is the join key between a facet and the storefront query
//! string. Its shape is an external contract:
//!
//! | facet               | `param_name`              |
//! |---------------------|---------------------------|
//! | product metafield   | `filter.p.<ns>.<key>`     |
//! | variant metafield   | `filter.v.<ns>.<key>`     |
//! | vendor              | `filter.p.vendor`         |
//! | availability        | `filter.v.availability`   |
//! | price               | `filter.v.price`          |

use serde::{Deserialize, Serialize};

/// Collection metafield namespace holding the facet index.
pub const FACET_INDEX_NAMESPACE: &str = "tb-filters";
/// Collection metafield key holding the facet index.
pub const FACET_INDEX_KEY: &str = "config";

pub const VENDOR_PARAM: &str = "filter.p.vendor";
pub const AVAILABILITY_PARAM: &str = "filter.v.availability";
pub const PRICE_PARAM: &str = "filter.v.price";

/// Facet identifiers of the native facets. Metafield facets use the
/// metafield definition GID instead.
pub const VENDOR_FACET_ID: &str = "vendor";
pub const AVAILABILITY_FACET_ID: &str = "availability";
pub const PRICE_FACET_ID: &str = "price";

pub const AVAILABLE: &str = "available";
pub const UNAVAILABLE: &str = "unavailable";

/// A metafield address: `namespace` + `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetafieldKey {
    pub namespace: String,
    pub key: String,
}

impl MetafieldKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Returns `true` if `namespace`/`key` address this metafield.
    #[must_use]
    pub fn is(&self, namespace: &str, key: &str) -> bool {
        self.namespace == namespace && self.key == key
    }
}

impl std::fmt::Display for MetafieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// Which resource a metafield definition hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetafieldOwner {
    #[serde(rename = "PRODUCT")]
    Product,
    #[serde(rename = "PRODUCTVARIANT")]
    Variant,
}

impl MetafieldOwner {
    /// The scope letter used in `param_name` (`p` or `v`).
    #[must_use]
    pub fn scope(self) -> &'static str {
        match self {
            MetafieldOwner::Product => "p",
            MetafieldOwner::Variant => "v",
        }
    }

    /// Builds `filter.<scope>.<ns>.<key>`.
    #[must_use]
    pub fn param_name(self, key: &MetafieldKey) -> String {
        format!("filter.{}.{}.{}", self.scope(), key.namespace, key.key)
    }
}

/// One selectable option within a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    #[serde(default)]
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub active: bool,
    pub param_name: String,
}

/// A filterable dimension with its discovered values.
///
/// `namespace` is `None` for native facets (vendor, availability, price).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    #[serde(default)]
    pub id: String,
    pub label: String,
    pub namespace: Option<String>,
    pub key: String,
    #[serde(rename = "type", default)]
    pub facet_type: String,
    pub param_name: String,
    #[serde(default)]
    pub presentation: String,
    #[serde(default)]
    pub values: Vec<FacetValue>,
}

/// Builds the stable identifier of a facet value: `<param_name>.<handle>`,
/// where the handle is the lowercased value with non-alphanumeric runs
/// collapsed to `-`.
#[must_use]
pub fn facet_value_id(param_name: &str, value: &str) -> String {
    format!("{param_name}.{}", crate::templates::slugify(value))
}

/// Parses a persisted facet index. Blank input is an empty index.
///
/// # Errors
///
/// Returns the decode error for malformed JSON or JSON that is not an array
/// of facets. Read paths log it and fall back to an empty index.
pub fn parse_facet_index(raw: &str) -> Result<Vec<Facet>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<Facet>>(raw)
}
