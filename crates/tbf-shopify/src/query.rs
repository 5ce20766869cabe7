//! GraphQL documents. Product queries are built per request so that only
//! the metafields a scan needs are fetched, each under a stable `mf_<i>`
//! alias.

use tbf_core::facets::{FACET_INDEX_KEY, FACET_INDEX_NAMESPACE};
use tbf_core::templates::TEMPLATE_TYPE;
use tbf_core::MetafieldKey;

use crate::client::Api;

/// Variants fetched per product.
pub(crate) const VARIANTS_PER_PRODUCT: u32 = 100;

/// Quotes `s` as a GraphQL string literal.
fn string_literal(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn metafield_selections(keys: &[MetafieldKey]) -> String {
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            format!(
                "mf_{i}: metafield(namespace: {}, key: {}) {{ namespace key type value }}",
                string_literal(&key.namespace),
                string_literal(&key.key)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collection products page with the requested metafields plus the
/// backorder flag on every variant.
pub(crate) fn collection_products(
    api: Api,
    product_metafields: &[MetafieldKey],
    variant_metafields: &[MetafieldKey],
    backorder: &MetafieldKey,
) -> String {
    let product_mf = metafield_selections(product_metafields);
    let variant_mf = metafield_selections(variant_metafields);
    let backorder = format!(
        "backorder: metafield(namespace: {}, key: {}) {{ value }}",
        string_literal(&backorder.namespace),
        string_literal(&backorder.key)
    );

    let (header, price_range, variant_stock) = match api {
        Api::Storefront => (
            "query CollectionProducts($id: ID!, $first: Int!, $after: String, \
             $sortKey: ProductCollectionSortKeys!, $reverse: Boolean!, \
             $country: CountryCode!, $language: LanguageCode!) \
             @inContext(country: $country, language: $language)",
            "priceRange",
            "price { amount }\nquantity: quantityAvailable",
        ),
        Api::Admin => (
            "query CollectionProducts($id: ID!, $first: Int!, $after: String, \
             $sortKey: ProductCollectionSortKeys!, $reverse: Boolean!)",
            "priceRange: priceRangeV2",
            "price\nquantity: inventoryQuantity",
        ),
    };

    format!(
        "{header} {{
  collection(id: $id) {{
    products(first: $first, after: $after, sortKey: $sortKey, reverse: $reverse) {{
      pageInfo {{ hasNextPage endCursor }}
      nodes {{
        id
        title
        handle
        vendor
        {price_range} {{ minVariantPrice {{ amount }} maxVariantPrice {{ amount }} }}
        {product_mf}
        variants(first: {VARIANTS_PER_PRODUCT}) {{
          nodes {{
            id
            {variant_stock}
            {backorder}
            {variant_mf}
          }}
        }}
      }}
    }}
  }}
}}"
    )
}

pub(crate) fn facet_index() -> String {
    format!(
        "query FacetIndex($id: ID!) {{
  collection(id: $id) {{
    metafield(namespace: {}, key: {}) {{ value }}
  }}
}}",
        string_literal(FACET_INDEX_NAMESPACE),
        string_literal(FACET_INDEX_KEY)
    )
}

pub(crate) const METAFIELDS_SET: &str = "mutation FacetIndexSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { id }
    userErrors { field message code }
  }
}";

pub(crate) const DEFINITIONS_BY_IDS: &str = "query MetafieldDefinitions($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on MetafieldDefinition {
      id
      name
      namespace
      key
      ownerType
      type { name }
    }
  }
}";

pub(crate) const CREATE_TEMPLATE_DEFINITION: &str = "mutation CreateTemplateDefinition($definition: MetaobjectDefinitionCreateInput!) {
  metaobjectDefinitionCreate(definition: $definition) {
    metaobjectDefinition { id type }
    userErrors { field message code }
  }
}";

const TEMPLATE_FIELDS: &str = "id
      handle
      fields { key value }
      collections: field(key: \"collections\") {
        references(first: 250) {
          nodes { ... on Collection { id title handle } }
        }
      }";

pub(crate) fn list_templates() -> String {
    format!(
        "query ListTemplates($first: Int!, $after: String) {{
  metaobjects(type: {}, first: $first, after: $after, reverse: true) {{
    nodes {{
      {TEMPLATE_FIELDS}
    }}
    pageInfo {{ hasNextPage endCursor }}
  }}
}}",
        string_literal(TEMPLATE_TYPE)
    )
}

pub(crate) fn get_template() -> String {
    format!(
        "query GetTemplate($id: ID!) {{
  metaobject(id: $id) {{
      {TEMPLATE_FIELDS}
  }}
}}"
    )
}

pub(crate) const UPSERT_TEMPLATE: &str = "mutation UpsertTemplate($handle: MetaobjectHandleInput!, $metaobject: MetaobjectUpsertInput!) {
  metaobjectUpsert(handle: $handle, metaobject: $metaobject) {
    metaobject { id handle }
    userErrors { field message code }
  }
}";

pub(crate) const UPDATE_TEMPLATE: &str = "mutation UpdateTemplate($id: ID!, $metaobject: MetaobjectUpdateInput!) {
  metaobjectUpdate(id: $id, metaobject: $metaobject) {
    metaobject { id handle }
    userErrors { field message code }
  }
}";

pub(crate) const DELETE_TEMPLATE: &str = "mutation DeleteTemplate($id: ID!) {
  metaobjectDelete(id: $id) {
    deletedId
    userErrors { field message code }
  }
}";
