//! Filter templates: which facets appear for which collections.
//!
//! Templates are stored upstream as metaobjects whose fields are plain
//! strings. The helpers here convert between those string fields and the
//! typed model; anything malformed recovers to an empty value instead of
//! failing the read.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Metaobject type holding templates.
pub const TEMPLATE_TYPE: &str = "$app:tb-filters-template";

/// `id` value that asks for a brand-new template.
pub const NEW_TEMPLATE_SENTINEL: &str = "0";

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// A collection referenced by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
}

/// A stored template, as read back from upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterTemplate {
    pub id: String,
    pub handle: String,
    pub title: Option<String>,
    pub active: bool,
    pub collections: Vec<CollectionRef>,
    /// Selected metafield definition GIDs.
    pub filter_ids: Vec<String>,
    pub include_vendor: bool,
    pub include_availability: bool,
    pub include_price: bool,
    /// Explicit facet order, by facet id.
    pub filters_order: Vec<String>,
    /// Facet id -> display label.
    pub filters_labels: BTreeMap<String, String>,
}

impl FilterTemplate {
    /// Builds a template from its raw metaobject fields (key -> value).
    #[must_use]
    pub fn from_fields(
        id: String,
        handle: String,
        fields: &BTreeMap<String, String>,
        collections: Vec<CollectionRef>,
    ) -> Self {
        let get = |key: &str| fields.get(key).map(String::as_str);
        Self {
            id,
            handle,
            title: get("title").map(str::to_string),
            active: parse_bool_field(get("active")),
            collections,
            filter_ids: parse_json_list(get("filters")),
            include_vendor: parse_bool_field(get("include_vendor")),
            include_availability: parse_bool_field(get("include_availability")),
            include_price: parse_bool_field(get("include_price")),
            filters_order: parse_json_list(get("filters_order")),
            filters_labels: parse_json_labels(get("filters_labels")),
        }
    }

    /// Collection ids the template applies to.
    #[must_use]
    pub fn collection_ids(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.id.clone()).collect()
    }

    /// The save payload that would reproduce this template.
    #[must_use]
    pub fn to_input(&self) -> TemplateInput {
        TemplateInput {
            title: self.title.clone().unwrap_or_default(),
            collection_ids: self.collection_ids(),
            filter_ids: self.filter_ids.clone(),
            active: self.active,
            include_vendor: self.include_vendor,
            include_availability: self.include_availability,
            include_price: self.include_price,
            filters_order: self.filters_order.clone(),
            filters_labels: self.filters_labels.clone(),
        }
    }
}

/// Payload of a template save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    #[serde(default, alias = "filtersIds")]
    pub filter_ids: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub include_vendor: bool,
    #[serde(default)]
    pub include_availability: bool,
    #[serde(default)]
    pub include_price: bool,
    #[serde(default)]
    pub filters_order: Vec<String>,
    #[serde(default)]
    pub filters_labels: BTreeMap<String, String>,
}

fn default_active() -> bool {
    true
}

/// One `{key, value}` metaobject field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateField {
    pub key: &'static str,
    pub value: String,
}

impl TemplateInput {
    /// Renders the input as metaobject fields. List and map fields are
    /// stored as JSON strings.
    #[must_use]
    pub fn to_fields(&self) -> Vec<TemplateField> {
        let json_list =
            |v: &[String]| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string());
        let field = |key: &'static str, value: String| TemplateField { key, value };
        vec![
            field("title", self.title.clone()),
            field("collections", json_list(&self.collection_ids)),
            field("filters", json_list(&self.filter_ids)),
            field("active", self.active.to_string()),
            field("include_vendor", self.include_vendor.to_string()),
            field("include_availability", self.include_availability.to_string()),
            field("include_price", self.include_price.to_string()),
            field("filters_order", json_list(&self.filters_order)),
            field(
                "filters_labels",
                serde_json::to_string(&self.filters_labels).unwrap_or_else(|_| "{}".to_string()),
            ),
        ]
    }
}

/// A field-level validation error, either produced locally or relayed
/// verbatim from upstream `userErrors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field: Vec<String>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Bulk template actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateAction {
    Remove,
    Activate,
    Deactivate,
}

/// Lowercases `s` and collapses every run of non `[a-z0-9]` characters into
/// a single `-`, trimming leading and trailing dashes.
#[must_use]
pub fn slugify(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    NON_ALNUM
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Handle for an upserted template.
///
/// The creation sentinel gets a timestamped handle so repeated creations
/// with the same title never collide.
#[must_use]
pub fn template_handle(id: &str, title: &str, now_millis: i64) -> String {
    if id == NEW_TEMPLATE_SENTINEL {
        let slug = slugify(title);
        let slug = if slug.is_empty() { "untitled".to_string() } else { slug };
        format!("tpl-{now_millis}-{slug}")
    } else {
        format!("tpl-{}", slugify(id))
    }
}

/// `"true"` (any case) is true; anything else, including absence, is false.
#[must_use]
pub fn parse_bool_field(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Parses a JSON list of strings; non-string elements are dropped.
#[must_use]
pub fn parse_json_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses a JSON object of string labels; non-string labels are dropped.
#[must_use]
pub fn parse_json_labels(raw: Option<&str>) -> BTreeMap<String, String> {
    let Some(raw) = raw else {
        return BTreeMap::new();
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}
