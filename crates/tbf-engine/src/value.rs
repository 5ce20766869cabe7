//! Metafield value extraction.
//!
//! Metafields reach us in several encodings depending on their type:
//! `list.*` types hold a JSON array, `json` may hold an object, and plain
//! text types sometimes carry several values joined with `|`, `,` or `;`.
//! [`parse_value`] sniffs the shape once and [`explode_value`] flattens it
//! into the set of matchable strings.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::{MetafieldRecord, VariantNode};

static DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|,;]+").expect("valid delimiter regex"));

/// Shape of a raw metafield value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetafieldValue {
    /// Not JSON, or a JSON scalar: the raw text, still to be split on
    /// delimiters.
    Scalar(String),
    /// A JSON array, or the values of a JSON object, in source order.
    List(Vec<String>),
}

impl MetafieldValue {
    /// Flattens into non-empty strings.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        match self {
            MetafieldValue::List(items) => items,
            MetafieldValue::Scalar(raw) => DELIMITERS
                .split(&raw)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Classifies a raw metafield value.
#[must_use]
pub fn parse_value(raw: &str) -> MetafieldValue {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => MetafieldValue::List(stringify_all(items)),
        Ok(Value::Object(map)) => {
            MetafieldValue::List(stringify_all(map.into_iter().map(|(_, v)| v)))
        }
        _ => MetafieldValue::Scalar(raw.to_string()),
    }
}

fn stringify_all(items: impl IntoIterator<Item = Value>) -> Vec<String> {
    items
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalized values of a metafield. A missing record or a null value
/// yields nothing.
#[must_use]
pub fn explode_value(record: Option<&MetafieldRecord>) -> Vec<String> {
    match record.and_then(|r| r.value.as_deref()) {
        Some(raw) => parse_value(raw).into_values(),
        None => Vec::new(),
    }
}

/// A variant is available when it has stock on hand or when backorders are
/// allowed for it.
#[must_use]
pub fn is_variant_available(variant: &VariantNode) -> bool {
    variant.quantity.is_some_and(|q| q > 0)
        || variant
            .allow_backorder
            .as_ref()
            .is_some_and(crate::types::BackorderFlag::is_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackorderFlag;

    fn record(value: Option<&str>) -> MetafieldRecord {
        MetafieldRecord {
            namespace: "upng".into(),
            key: "color".into(),
            field_type: String::new(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn explode_missing_record_or_null_value_is_empty() {
        assert!(explode_value(None).is_empty());
        assert!(explode_value(Some(&record(None))).is_empty());
    }

    #[test]
    fn explode_json_array_preserves_order() {
        let xs = vec!["red", "blue", "green"];
        let raw = serde_json::to_string(&xs).unwrap();
        assert_eq!(explode_value(Some(&record(Some(&raw)))), xs);
    }

    #[test]
    fn explode_json_array_stringifies_and_drops_empty() {
        let got = explode_value(Some(&record(Some(r#"["a", "", 3, true]"#))));
        assert_eq!(got, vec!["a", "3", "true"]);
    }

    #[test]
    fn explode_delimited_string() {
        let got = explode_value(Some(&record(Some("a|b,c; d"))));
        assert_eq!(got, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn explode_json_object_uses_values() {
        let got = explode_value(Some(&record(Some(r#"{"x": "red", "y": "blue"}"#))));
        assert_eq!(got, vec!["red", "blue"]);
    }

    #[test]
    fn explode_json_scalar_falls_back_to_raw_text() {
        assert_eq!(explode_value(Some(&record(Some("42")))), vec!["42"]);
        assert_eq!(
            parse_value("Rojo"),
            MetafieldValue::Scalar("Rojo".to_string())
        );
    }

    #[test]
    fn explode_blank_string_is_empty() {
        assert!(explode_value(Some(&record(Some(" ,; | ")))).is_empty());
    }

    #[test]
    fn variant_with_stock_is_available() {
        let v = VariantNode {
            quantity: Some(3),
            ..VariantNode::default()
        };
        assert!(is_variant_available(&v));
    }

    #[test]
    fn zero_stock_with_backorder_is_available() {
        let v = VariantNode {
            quantity: Some(0),
            allow_backorder: Some(BackorderFlag::Text("true".into())),
            ..VariantNode::default()
        };
        assert!(is_variant_available(&v));
    }

    #[test]
    fn zero_stock_without_backorder_is_unavailable() {
        let absent = VariantNode {
            quantity: Some(0),
            ..VariantNode::default()
        };
        let off = VariantNode {
            quantity: Some(0),
            allow_backorder: Some(BackorderFlag::Bool(false)),
            ..VariantNode::default()
        };
        assert!(!is_variant_available(&absent));
        assert!(!is_variant_available(&off));
    }

    #[test]
    fn negative_or_unknown_stock_is_unavailable() {
        let v = VariantNode {
            quantity: Some(-2),
            ..VariantNode::default()
        };
        assert!(!is_variant_available(&v));
        assert!(!is_variant_available(&VariantNode::default()));
    }
}
