use serde::Deserialize;
use serde_json::json;
use tbf_core::gid::{retain_gids, METAFIELD_DEFINITION};
use tbf_core::{MetafieldKey, MetafieldOwner, TemplateInput};
use tbf_engine::{IndexConfig, MetafieldDefinition};

use crate::client::{Api, ShopifyClient};
use crate::error::ShopifyError;
use crate::query;

#[derive(Debug, Deserialize)]
struct WireTypeName {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDefinition {
    id: String,
    #[serde(default)]
    name: Option<String>,
    namespace: String,
    key: String,
    owner_type: MetafieldOwner,
    #[serde(rename = "type", default)]
    type_name: Option<WireTypeName>,
}

impl From<WireDefinition> for MetafieldDefinition {
    fn from(d: WireDefinition) -> Self {
        MetafieldDefinition {
            id: d.id,
            name: d.name,
            key: MetafieldKey::new(d.namespace, d.key),
            owner: d.owner_type,
            type_name: d.type_name.map(|t| t.name),
        }
    }
}

/// Keeps nodes that decode as product or variant definitions.
fn decode_definitions(nodes: Vec<Option<serde_json::Value>>) -> Vec<MetafieldDefinition> {
    nodes
        .into_iter()
        .flatten()
        .filter_map(|node| serde_json::from_value::<WireDefinition>(node).ok())
        .map(MetafieldDefinition::from)
        .collect()
}

impl ShopifyClient {
    /// Resolves metafield definition GIDs. Non-GID entries are dropped
    /// before the request; ids that resolve to nothing, or to a definition
    /// owned by anything but products and variants, are skipped.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn definitions_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<MetafieldDefinition>, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(default)]
            nodes: Vec<Option<serde_json::Value>>,
        }

        let ids = retain_gids(ids, METAFIELD_DEFINITION);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let data: Data = self
            .graphql(
                Api::Admin,
                "MetafieldDefinitions",
                query::DEFINITIONS_BY_IDS,
                json!({ "ids": ids }),
            )
            .await?;
        Ok(decode_definitions(data.nodes))
    }

    /// What the facet index of a template's collections should contain.
    ///
    /// # Errors
    ///
    /// Returns transport errors from definition resolution.
    pub async fn index_config(&self, input: &TemplateInput) -> Result<IndexConfig, ShopifyError> {
        Ok(IndexConfig {
            definitions: self.definitions_by_ids(&input.filter_ids).await?,
            include_vendor: input.include_vendor,
            include_availability: input.include_availability,
            include_price: input.include_price,
            order: input.filters_order.clone(),
            labels: input.filters_labels.clone(),
        })
    }
}
