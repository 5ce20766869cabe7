#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tbf_core::Facet;
use tbf_engine::{
    FacetIndexSink, MetafieldRecord, PageInfo, ProductNode, ProductPage, ProductQuery,
    ProductSource, VariantNode,
};

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
pub struct Unavailable;

/// Serves a fixed product list in `query.page_size` chunks. Cursors are the
/// offset of the next product.
#[derive(Debug, Default)]
pub struct MemorySource {
    products: Vec<ProductNode>,
    fetches: AtomicUsize,
    fail_on_fetch: Option<usize>,
    queries: Mutex<Vec<ProductQuery>>,
}

impl MemorySource {
    pub fn new(products: Vec<ProductNode>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Fails the `n`-th fetch (1-based).
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<ProductQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn serve(&self, query: &ProductQuery, after: Option<&str>) -> Result<ProductPage, Unavailable> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_on_fetch == Some(n) {
            return Err(Unavailable);
        }
        let start: usize = after.map_or(0, |c| c.parse().unwrap());
        let end = (start + query.page_size as usize).min(self.products.len());
        let has_next_page = end < self.products.len();
        Ok(ProductPage {
            nodes: self.products[start..end].to_vec(),
            page_info: PageInfo {
                has_next_page,
                end_cursor: Some(end.to_string()),
            },
        })
    }
}

impl ProductSource for MemorySource {
    type Error = Unavailable;

    fn fetch_page(
        &self,
        query: &ProductQuery,
        after: Option<&str>,
    ) -> impl Future<Output = Result<ProductPage, Self::Error>> + Send {
        std::future::ready(self.serve(query, after))
    }
}

/// Records every write; optionally rejects them all.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub writes: Mutex<Vec<(String, Vec<Facet>)>>,
    pub reject: bool,
}

impl MemorySink {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(String, Vec<Facet>)> {
        self.writes.lock().unwrap().clone()
    }
}

impl FacetIndexSink for MemorySink {
    type Error = Unavailable;

    fn write_facet_index(
        &self,
        collection_id: &str,
        facets: &[Facet],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let result = if self.reject {
            Err(Unavailable)
        } else {
            self.writes
                .lock()
                .unwrap()
                .push((collection_id.to_string(), facets.to_vec()));
            Ok(())
        };
        std::future::ready(result)
    }
}

pub fn product(handle: &str, vendor: &str, color: &str, in_stock: bool) -> ProductNode {
    ProductNode {
        id: format!("gid://shopify/Product/{handle}"),
        title: handle.to_string(),
        handle: handle.to_string(),
        vendor: Some(vendor.to_string()),
        metafields: vec![MetafieldRecord::new("upng", "color", color)],
        variants: vec![VariantNode {
            id: format!("gid://shopify/ProductVariant/{handle}"),
            price: Some("10.00".to_string()),
            quantity: Some(i64::from(in_stock)),
            ..VariantNode::default()
        }],
        ..ProductNode::default()
    }
}

/// Eight products, five of them red: p0, p2, p3, p5, p7.
pub fn catalog() -> Vec<ProductNode> {
    vec![
        product("p0", "Acme", "red", true),
        product("p1", "Zeta", "green", true),
        product("p2", "Acme", "red", false),
        product("p3", "Zeta", "red", true),
        product("p4", "Zeta", "green", true),
        product("p5", "Acme", "red", true),
        product("p6", "Acme", "blue", true),
        product("p7", "Zeta", "red", true),
    ]
}

pub fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
