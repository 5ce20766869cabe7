//! The collection filter operation and the facet index rebuild.

use serde::Serialize;
use tbf_core::{AppConfig, Facet};

use crate::classify::classify_filters;
use crate::disabled::{disabled_filters, DisabledFilter};
use crate::error::RebuildError;
use crate::facet_index::{FacetAccumulator, IndexConfig};
use crate::matcher::ProductMatcher;
use crate::paging::{parse_paging, parse_sort};
use crate::scan::{scan_until, BatchControl};
use crate::self_exclusion::{
    facet_targets, target_metafields, AvailableValues, SelfExclusionAccumulator,
};
use crate::source::{FacetIndexSink, ProductSource};
use crate::types::{LocaleContext, PageInfo, ProductQuery};
use crate::window::filtered_window;

/// Page sizes and ceilings of the engine's scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub default_per_page: u32,
    pub scan_page_size: u32,
    pub scan_max_pages: usize,
    pub facets_max_pages: usize,
    pub index_page_size: u32,
    pub index_max_pages: usize,
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_per_page: config.default_per_page,
            scan_page_size: config.scan_page_size,
            scan_max_pages: config.scan_max_pages,
            facets_max_pages: config.facets_max_pages,
            index_page_size: config.index_page_size,
            index_max_pages: config.index_max_pages,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_per_page: 16,
            scan_page_size: 250,
            scan_max_pages: 50,
            facets_max_pages: 40,
            index_page_size: 50,
            index_max_pages: 1000,
        }
    }
}

/// One storefront request for a collection page.
#[derive(Debug, Clone)]
pub struct FilterRequest<'a> {
    pub collection_id: &'a str,
    pub locale: LocaleContext,
    /// Raw query pairs, repeated keys allowed.
    pub params: &'a [(String, String)],
}

impl FilterRequest<'_> {
    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `include_facets=true` (or `1`) asks for self-exclusion values.
    #[must_use]
    pub fn wants_facets(&self) -> bool {
        self.pairs()
            .filter(|(k, _)| *k == "include_facets")
            .last()
            .is_some_and(|(_, v)| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Native,
    Filtered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterResponse {
    pub mode: FilterMode,
    pub handles: Vec<String>,
    #[serde(rename = "pageInfo", skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
    #[serde(rename = "hasNextPageFiltered", skip_serializing_if = "Option::is_none")]
    pub has_next_page_filtered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_values: Option<AvailableValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<Vec<DisabledFilter>>,
}

/// Computes one page of a collection.
///
/// Without active filters the upstream order and cursor are used as-is
/// (native mode). Otherwise products are scanned and matched until the
/// requested window plus one lookahead item is filled (filtered mode).
/// `stored_facets` is consulted only when the request asks for facets.
///
/// # Errors
///
/// Returns the source's error when any page fetch fails.
pub async fn filter_collection<S: ProductSource>(
    source: &S,
    settings: &EngineSettings,
    request: &FilterRequest<'_>,
    stored_facets: Option<&[Facet]>,
) -> Result<FilterResponse, S::Error> {
    let filters = classify_filters(request.pairs());
    let paging = parse_paging(request.pairs(), settings.default_per_page);
    let sort = parse_sort(request.pairs());
    let matcher = ProductMatcher::new(&filters);

    let mut response = if filters.is_active() {
        let query = ProductQuery::new(request.collection_id, settings.scan_page_size)
            .with_metafields(
                filters.product_metafields.clone(),
                filters.variant_metafields.clone(),
            )
            .with_sort(sort)
            .with_locale(request.locale.clone());
        let window = filtered_window(
            source,
            &query,
            &matcher,
            paging.page,
            paging.per_page,
            settings.scan_max_pages,
        )
        .await?;
        tracing::debug!(
            collection_id = %request.collection_id,
            page = paging.page,
            handles = window.handles.len(),
            "filtered window computed"
        );
        FilterResponse {
            mode: FilterMode::Filtered,
            handles: window.handles,
            page_info: None,
            has_next_page_filtered: Some(window.has_next_page_filtered),
            page: Some(paging.page),
            per_page: paging.per_page,
            available_values: None,
            disabled: None,
        }
    } else {
        let query = ProductQuery::new(request.collection_id, paging.per_page)
            .with_sort(sort)
            .with_locale(request.locale.clone());
        let page = source.fetch_page(&query, paging.after.as_deref()).await?;
        FilterResponse {
            mode: FilterMode::Native,
            handles: page.nodes.into_iter().map(|p| p.handle).collect(),
            page_info: Some(page.page_info),
            has_next_page_filtered: None,
            page: None,
            per_page: paging.per_page,
            available_values: None,
            disabled: None,
        }
    };

    if request.wants_facets() {
        let stored = stored_facets.unwrap_or_default();
        let targets = facet_targets(stored);
        let (mut product_keys, mut variant_keys) = target_metafields(&targets);
        for key in &filters.product_metafields {
            if !product_keys.contains(key) {
                product_keys.push(key.clone());
            }
        }
        for key in &filters.variant_metafields {
            if !variant_keys.contains(key) {
                variant_keys.push(key.clone());
            }
        }
        let query = ProductQuery::new(request.collection_id, settings.scan_page_size)
            .with_metafields(product_keys, variant_keys)
            .with_locale(request.locale.clone());

        let mut acc = SelfExclusionAccumulator::new(matcher, &targets);
        scan_until::<_, (), _>(source, &query, None, settings.facets_max_pages, |nodes, _| {
            acc.add_batch(&nodes);
            BatchControl::Continue
        })
        .await?;
        let available = acc.finish();
        response.disabled = Some(disabled_filters(stored, &available));
        response.available_values = Some(available);
    }

    Ok(response)
}

/// Computes the facet index of one collection from a full product scan.
///
/// An empty config yields an empty index without touching the source.
///
/// # Errors
///
/// Returns the source's error when any page fetch fails.
pub async fn build_collection_index<S: ProductSource>(
    source: &S,
    collection_id: &str,
    config: &IndexConfig,
    settings: &EngineSettings,
) -> Result<Vec<Facet>, S::Error> {
    if config.is_empty() {
        return Ok(Vec::new());
    }
    let query = config.query(collection_id, settings.index_page_size);
    let mut acc = FacetAccumulator::new(config);
    let outcome = scan_until::<_, (), _>(
        source,
        &query,
        None,
        settings.index_max_pages,
        |nodes, _| {
            for product in &nodes {
                acc.add_product(product);
            }
            BatchControl::Continue
        },
    )
    .await?;
    tracing::debug!(
        collection_id,
        pages_scanned = outcome.pages_fetched,
        truncated = outcome.truncated,
        "facet index scan finished"
    );
    Ok(acc.finish(config))
}

/// Rebuilds one collection's facet index and overwrites the stored copy.
///
/// # Errors
///
/// Returns [`RebuildError::Fetch`] when scanning fails and
/// [`RebuildError::Write`] when the write is rejected.
pub async fn rebuild_collection_index<S, W>(
    source: &S,
    sink: &W,
    collection_id: &str,
    config: &IndexConfig,
    settings: &EngineSettings,
) -> Result<Vec<Facet>, RebuildError>
where
    S: ProductSource,
    W: FacetIndexSink,
{
    let facets = build_collection_index(source, collection_id, config, settings)
        .await
        .map_err(|e| RebuildError::Fetch {
            collection_id: collection_id.to_string(),
            source: Box::new(e),
        })?;
    sink.write_facet_index(collection_id, &facets)
        .await
        .map_err(|e| RebuildError::Write {
            collection_id: collection_id.to_string(),
            source: Box::new(e),
        })?;
    tracing::info!(collection_id, facets = facets.len(), "facet index rebuilt");
    Ok(facets)
}

/// Rebuilds every collection in turn, stopping at the first failure.
///
/// # Errors
///
/// Returns the first collection's [`RebuildError`].
pub async fn rebuild_collections<S, W>(
    source: &S,
    sink: &W,
    collection_ids: &[String],
    config: &IndexConfig,
    settings: &EngineSettings,
) -> Result<usize, RebuildError>
where
    S: ProductSource,
    W: FacetIndexSink,
{
    for collection_id in collection_ids {
        rebuild_collection_index(source, sink, collection_id, config, settings).await?;
    }
    tracing::info!(collections = collection_ids.len(), "facet indexes rebuilt");
    Ok(collection_ids.len())
}
