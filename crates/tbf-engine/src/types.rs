use serde::{Deserialize, Serialize};
use tbf_core::MetafieldKey;

/// A raw metafield as returned on a product or variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafieldRecord {
    pub namespace: String,
    pub key: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl MetafieldRecord {
    #[must_use]
    pub fn new(namespace: &str, key: &str, value: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field_type: String::new(),
            value: Some(value.to_string()),
        }
    }

    #[must_use]
    pub fn is(&self, key: &MetafieldKey) -> bool {
        key.is(&self.namespace, &self.key)
    }
}

/// Allow-backorder flag as it arrives from upstream: either a JSON boolean
/// or a metafield string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackorderFlag {
    Bool(bool),
    Text(String),
}

impl BackorderFlag {
    /// `true`, `"true"` (any case) and `"1"` are truthy.
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            BackorderFlag::Bool(b) => *b,
            BackorderFlag::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantNode {
    pub id: String,
    /// Decimal amount as a string; absent or non-numeric falls back to the
    /// product price range when matching.
    #[serde(default)]
    pub price: Option<String>,
    /// `quantityAvailable` (Storefront) or `inventoryQuantity` (Admin).
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub allow_backorder: Option<BackorderFlag>,
    #[serde(default)]
    pub metafields: Vec<MetafieldRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductNode {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub price_range: PriceRange,
    #[serde(default)]
    pub metafields: Vec<MetafieldRecord>,
    #[serde(default)]
    pub variants: Vec<VariantNode>,
}

impl ProductNode {
    pub fn metafields_for<'a>(
        &'a self,
        key: &'a MetafieldKey,
    ) -> impl Iterator<Item = &'a MetafieldRecord> + 'a {
        self.metafields.iter().filter(move |mf| mf.is(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One page of collection products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub nodes: Vec<ProductNode>,
    pub page_info: PageInfo,
}

/// Upstream sort order for collection products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortKey {
    CollectionDefault,
    BestSelling,
    Title,
    Price,
    Created,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CollectionDefault => "COLLECTION_DEFAULT",
            SortKey::BestSelling => "BEST_SELLING",
            SortKey::Title => "TITLE",
            SortKey::Price => "PRICE",
            SortKey::Created => "CREATED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub sort_key: SortKey,
    pub reverse: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            sort_key: SortKey::CollectionDefault,
            reverse: false,
        }
    }
}

/// Buyer context for Storefront `@inContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleContext {
    pub country: String,
    pub language: String,
}

impl LocaleContext {
    /// Upper-cases both codes; blanks fall back to `US` / `EN`.
    #[must_use]
    pub fn new(country: Option<&str>, language: Option<&str>) -> Self {
        let pick = |raw: Option<&str>, default: &str| {
            raw.map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or_else(|| default.to_string(), str::to_ascii_uppercase)
        };
        Self {
            country: pick(country, "US"),
            language: pick(language, "EN"),
        }
    }
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Everything a product fetch needs except the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub collection_id: String,
    pub product_metafields: Vec<MetafieldKey>,
    pub variant_metafields: Vec<MetafieldKey>,
    pub page_size: u32,
    pub sort: SortOrder,
    pub locale: LocaleContext,
}

impl ProductQuery {
    #[must_use]
    pub fn new(collection_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            collection_id: collection_id.into(),
            product_metafields: Vec::new(),
            variant_metafields: Vec::new(),
            page_size,
            sort: SortOrder::default(),
            locale: LocaleContext::default(),
        }
    }

    #[must_use]
    pub fn with_metafields(
        mut self,
        product_metafields: Vec<MetafieldKey>,
        variant_metafields: Vec<MetafieldKey>,
    ) -> Self {
        self.product_metafields = product_metafields;
        self.variant_metafields = variant_metafields;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: LocaleContext) -> Self {
        self.locale = locale;
        self
    }
}
