use std::future::Future;

use tbf_core::Facet;

use crate::types::{ProductPage, ProductQuery};

/// Paginated access to a collection's products.
///
/// Implementations fetch exactly the metafields named in the query, keyed
/// by namespace and key, and fill each variant's stock and allow-backorder
/// flag. Failures are returned as-is; the engine never retries.
pub trait ProductSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_page(
        &self,
        query: &ProductQuery,
        after: Option<&str>,
    ) -> impl Future<Output = Result<ProductPage, Self::Error>> + Send;
}

/// Persistence of a collection's facet index. Each write replaces the
/// previous index wholesale.
pub trait FacetIndexSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_facet_index(
        &self,
        collection_id: &str,
        facets: &[Facet],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
