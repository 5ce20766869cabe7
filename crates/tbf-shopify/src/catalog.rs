//! Collection product pages and the stored facet index.
//!
//! [`StorefrontCatalog`] serves buyer-facing requests in the buyer's
//! country and language. [`AdminCatalog`] reads the full catalog for index
//! rebuilds and persists the facet index on the collection.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use tbf_core::facets::{FACET_INDEX_KEY, FACET_INDEX_NAMESPACE};
use tbf_core::gid::collection_gid;
use tbf_core::{parse_facet_index, Facet, UserError};
use tbf_engine::{
    BackorderFlag, FacetIndexSink, MetafieldRecord, PageInfo, PriceRange, ProductNode,
    ProductPage, ProductQuery, ProductSource, VariantNode,
};

use crate::client::{Api, ShopifyClient};
use crate::error::ShopifyError;
use crate::query;

#[derive(Debug, Deserialize)]
struct CollectionProductsData {
    collection: Option<WireCollection>,
}

#[derive(Debug, Deserialize)]
struct WireCollection {
    products: WireConnection<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct WireConnection<T> {
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct WireNodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct WireMoney {
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePrice {
    Money(WireMoney),
    Plain(String),
}

impl WirePrice {
    fn into_amount(self) -> String {
        match self {
            WirePrice::Money(m) => m.amount,
            WirePrice::Plain(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePriceRange {
    min_variant_price: Option<WireMoney>,
    max_variant_price: Option<WireMoney>,
}

#[derive(Debug, Deserialize)]
struct WireValue {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    id: String,
    #[serde(default)]
    title: String,
    handle: String,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    price_range: Option<WirePriceRange>,
    #[serde(default)]
    variants: Option<WireNodes<WireVariant>>,
    /// `mf_<i>` aliases.
    #[serde(flatten)]
    aliases: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireVariant {
    id: String,
    #[serde(default)]
    price: Option<WirePrice>,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    backorder: Option<WireValue>,
    #[serde(flatten)]
    aliases: BTreeMap<String, serde_json::Value>,
}

/// Non-null `mf_<i>` aliases, in alias order.
fn aliased_metafields(aliases: BTreeMap<String, serde_json::Value>) -> Vec<MetafieldRecord> {
    let mut indexed: Vec<(usize, MetafieldRecord)> = aliases
        .into_iter()
        .filter_map(|(alias, value)| {
            let index = alias.strip_prefix("mf_")?.parse::<usize>().ok()?;
            let record = serde_json::from_value::<Option<MetafieldRecord>>(value).ok()??;
            Some((index, record))
        })
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, record)| record).collect()
}

impl From<WireVariant> for VariantNode {
    fn from(v: WireVariant) -> Self {
        VariantNode {
            id: v.id,
            price: v.price.map(WirePrice::into_amount),
            quantity: v.quantity,
            allow_backorder: v
                .backorder
                .and_then(|b| b.value)
                .map(BackorderFlag::Text),
            metafields: aliased_metafields(v.aliases),
        }
    }
}

impl From<WireProduct> for ProductNode {
    fn from(p: WireProduct) -> Self {
        let price_range = p
            .price_range
            .map(|r| PriceRange {
                min: r.min_variant_price.map(|m| m.amount),
                max: r.max_variant_price.map(|m| m.amount),
            })
            .unwrap_or_default();
        ProductNode {
            id: p.id,
            title: p.title,
            handle: p.handle,
            vendor: p.vendor,
            price_range,
            metafields: aliased_metafields(p.aliases),
            variants: p
                .variants
                .map(|v| v.nodes.into_iter().map(VariantNode::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// A missing collection reads as an empty last page.
fn into_page(data: CollectionProductsData) -> ProductPage {
    match data.collection {
        Some(collection) => ProductPage {
            nodes: collection
                .products
                .nodes
                .into_iter()
                .map(ProductNode::from)
                .collect(),
            page_info: collection.products.page_info,
        },
        None => ProductPage::default(),
    }
}

impl ShopifyClient {
    async fn products_page(
        &self,
        api: Api,
        query: &ProductQuery,
        after: Option<&str>,
    ) -> Result<ProductPage, ShopifyError> {
        let document = query::collection_products(
            api,
            &query.product_metafields,
            &query.variant_metafields,
            self.backorder_metafield(),
        );
        let mut variables = json!({
            "id": collection_gid(&query.collection_id),
            "first": query.page_size,
            "after": after,
            "sortKey": query.sort.sort_key.as_str(),
            "reverse": query.sort.reverse,
        });
        if api == Api::Storefront {
            variables["country"] = json!(query.locale.country);
            variables["language"] = json!(query.locale.language);
        }
        let data: CollectionProductsData = self
            .graphql(api, "CollectionProducts", &document, variables)
            .await?;
        Ok(into_page(data))
    }

    /// Reads the facet index stored on a collection.
    ///
    /// A missing metafield is an empty index. So is a malformed one, which
    /// is logged at `warn`.
    ///
    /// # Errors
    ///
    /// Returns transport errors; stored data never fails the read.
    pub async fn read_facet_index(&self, collection_id: &str) -> Result<Vec<Facet>, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            collection: Option<Owner>,
        }
        #[derive(Deserialize)]
        struct Owner {
            metafield: Option<WireValue>,
        }

        let collection_id = collection_gid(collection_id);
        let data: Data = self
            .graphql(
                Api::Admin,
                "FacetIndex",
                &query::facet_index(),
                json!({ "id": collection_id }),
            )
            .await?;

        let Some(raw) = data
            .collection
            .and_then(|c| c.metafield)
            .and_then(|m| m.value)
        else {
            return Ok(Vec::new());
        };

        Ok(parse_facet_index(&raw).unwrap_or_else(|e| {
            tracing::warn!(%collection_id, error = %e, "stored facet index is malformed, ignoring");
            Vec::new()
        }))
    }

    /// Overwrites the facet index stored on a collection.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::UserErrors`] when the write is rejected,
    /// otherwise transport errors.
    pub async fn write_facet_index(
        &self,
        collection_id: &str,
        facets: &[Facet],
    ) -> Result<(), ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metafields_set: Option<Payload>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            user_errors: Vec<UserError>,
        }

        let value = serde_json::to_string(facets).map_err(|e| ShopifyError::Deserialize {
            context: format!("facet index of {collection_id}"),
            source: e,
        })?;
        let variables = json!({
            "metafields": [{
                "ownerId": collection_gid(collection_id),
                "namespace": FACET_INDEX_NAMESPACE,
                "key": FACET_INDEX_KEY,
                "type": "json",
                "value": value,
            }]
        });
        let data: Data = self
            .graphql(Api::Admin, "FacetIndexSet", query::METAFIELDS_SET, variables)
            .await?;
        let errors = data.metafields_set.map(|p| p.user_errors).unwrap_or_default();
        if !errors.is_empty() {
            return Err(ShopifyError::UserErrors {
                operation: "metafieldsSet".to_owned(),
                errors,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn storefront(&self) -> StorefrontCatalog<'_> {
        StorefrontCatalog { client: self }
    }

    #[must_use]
    pub fn admin(&self) -> AdminCatalog<'_> {
        AdminCatalog { client: self }
    }
}

/// Buyer-facing product pages, priced and stocked in the buyer's context.
#[derive(Clone, Copy)]
pub struct StorefrontCatalog<'a> {
    client: &'a ShopifyClient,
}

impl ProductSource for StorefrontCatalog<'_> {
    type Error = ShopifyError;

    async fn fetch_page(
        &self,
        query: &ProductQuery,
        after: Option<&str>,
    ) -> Result<ProductPage, ShopifyError> {
        self.client
            .products_page(Api::Storefront, query, after)
            .await
    }
}

/// Full-catalog access for index rebuilds, plus facet index storage.
#[derive(Clone, Copy)]
pub struct AdminCatalog<'a> {
    client: &'a ShopifyClient,
}

impl ProductSource for AdminCatalog<'_> {
    type Error = ShopifyError;

    async fn fetch_page(
        &self,
        query: &ProductQuery,
        after: Option<&str>,
    ) -> Result<ProductPage, ShopifyError> {
        self.client.products_page(Api::Admin, query, after).await
    }
}

impl FacetIndexSink for AdminCatalog<'_> {
    type Error = ShopifyError;

    async fn write_facet_index(
        &self,
        collection_id: &str,
        facets: &[Facet],
    ) -> Result<(), ShopifyError> {
        self.client.write_facet_index(collection_id, facets).await
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
