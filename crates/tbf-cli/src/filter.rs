//! `filter`: one storefront page of a collection, printed as JSON.

use reqwest::Url;
use tbf_engine::{filter_collection, EngineSettings, FilterRequest, LocaleContext};
use tbf_shopify::ShopifyClient;

/// Splits a raw query string into decoded pairs, keeping repeats and order.
pub(crate) fn parse_query_string(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    let mut url = Url::parse("tbf://query/")?;
    url.set_query(Some(raw.trim_start_matches('?')));
    Ok(url.query_pairs().into_owned().collect())
}

/// # Errors
///
/// Returns an error for an unparseable query or any upstream failure.
pub(crate) async fn run_filter(
    client: &ShopifyClient,
    settings: &EngineSettings,
    collection: &str,
    query: &str,
    country: Option<&str>,
    language: Option<&str>,
) -> anyhow::Result<()> {
    let params = parse_query_string(query)?;
    let request = FilterRequest {
        collection_id: collection,
        locale: LocaleContext::new(country, language),
        params: &params,
    };

    let stored = if request.wants_facets() {
        Some(client.read_facet_index(collection).await?)
    } else {
        None
    };
    let response =
        filter_collection(&client.storefront(), settings, &request, stored.as_deref()).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
