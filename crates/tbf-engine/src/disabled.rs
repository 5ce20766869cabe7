use serde::Serialize;
use tbf_core::facets::PRICE_PARAM;
use tbf_core::Facet;

use crate::self_exclusion::AvailableValues;

/// A stored facet value that would lead to no results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisabledFilter {
    pub param_name: String,
    pub value: String,
}

/// Lists every stored facet value missing from `available`.
///
/// Values are looked up under their `param_name` minus the `filter.`
/// prefix; a facet with no entry at all has every value disabled. Price
/// facets are never disabled.
#[must_use]
pub fn disabled_filters(stored: &[Facet], available: &AvailableValues) -> Vec<DisabledFilter> {
    let mut disabled = Vec::new();
    for facet in stored.iter().filter(|f| f.param_name != PRICE_PARAM) {
        for value in &facet.values {
            let param_name = if value.param_name.is_empty() {
                &facet.param_name
            } else {
                &value.param_name
            };
            let key = param_name.strip_prefix("filter.").unwrap_or(param_name);
            if !available.contains(key, &value.value) {
                disabled.push(DisabledFilter {
                    param_name: param_name.clone(),
                    value: value.value.clone(),
                });
            }
        }
    }
    disabled
}
