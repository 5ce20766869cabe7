mod common;

use common::{catalog, params, MemorySource};
use tbf_core::{Facet, FacetValue};
use tbf_engine::{
    filter_collection, EngineSettings, FilterMode, FilterRequest, LocaleContext, SortKey,
};

fn settings() -> EngineSettings {
    EngineSettings {
        scan_page_size: 2,
        ..EngineSettings::default()
    }
}

fn request<'a>(params: &'a [(String, String)]) -> FilterRequest<'a> {
    FilterRequest {
        collection_id: "gid://shopify/Collection/1",
        locale: LocaleContext::default(),
        params,
    }
}

fn color_facet(values: &[&str]) -> Facet {
    Facet {
        id: "gid://shopify/MetafieldDefinition/1".to_string(),
        label: "Color".to_string(),
        namespace: Some("upng".to_string()),
        key: "color".to_string(),
        facet_type: "single_line_text_field".to_string(),
        param_name: "filter.p.upng.color".to_string(),
        presentation: "text".to_string(),
        values: values
            .iter()
            .map(|v| FacetValue {
                id: format!("filter.p.upng.color.{v}"),
                value: (*v).to_string(),
                label: (*v).to_string(),
                count: 1,
                active: false,
                param_name: "filter.p.upng.color".to_string(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn filtered_first_page_stops_after_lookahead() {
    let source = MemorySource::new(catalog());
    let params = params(&[("filter.p.upng.color", "red"), ("per_page", "2")]);

    let response = filter_collection(&source, &settings(), &request(&params), None)
        .await
        .unwrap();

    assert_eq!(response.mode, FilterMode::Filtered);
    assert_eq!(response.handles, vec!["p0", "p2"]);
    assert_eq!(response.has_next_page_filtered, Some(true));
    assert_eq!(response.page, Some(1));
    // p0, p2 and the lookahead p3 all arrive within the first two pages.
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn filtered_last_page_is_partial() {
    let source = MemorySource::new(catalog());
    let params = params(&[
        ("filter.p.upng.color", "red"),
        ("per_page", "2"),
        ("page", "3"),
    ]);

    let response = filter_collection(&source, &settings(), &request(&params), None)
        .await
        .unwrap();

    assert_eq!(response.handles, vec!["p7"]);
    assert_eq!(response.has_next_page_filtered, Some(false));
    assert_eq!(source.fetches(), 4);
}

#[tokio::test]
async fn filtered_query_requests_only_active_metafields() {
    let source = MemorySource::new(catalog());
    let params = params(&[("filter.p.upng.color", "red"), ("sort_by", "title-descending")]);

    filter_collection(&source, &settings(), &request(&params), None)
        .await
        .unwrap();

    let query = &source.queries()[0];
    assert_eq!(query.product_metafields.len(), 1);
    assert_eq!(query.product_metafields[0].to_string(), "upng.color");
    assert!(query.variant_metafields.is_empty());
    assert_eq!(query.sort.sort_key, SortKey::Title);
    assert!(query.sort.reverse);
}

#[tokio::test]
async fn page_ceiling_truncates_without_error() {
    let source = MemorySource::new(catalog());
    let params = params(&[
        ("filter.p.upng.color", "red"),
        ("per_page", "2"),
        ("page", "3"),
    ]);
    let settings = EngineSettings {
        scan_max_pages: 1,
        ..settings()
    };

    let response = filter_collection(&source, &settings, &request(&params), None)
        .await
        .unwrap();

    assert!(response.handles.is_empty());
    assert_eq!(response.has_next_page_filtered, Some(false));
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn fetch_failure_aborts_the_scan() {
    let source = MemorySource::new(catalog()).failing_on(2);
    let params = params(&[("filter.p.upng.color", "red"), ("per_page", "2")]);

    let result = filter_collection(&source, &settings(), &request(&params), None).await;

    assert!(result.is_err());
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn native_mode_passes_cursor_and_sort_through() {
    let source = MemorySource::new(catalog());
    let params = params(&[
        ("per_page", "3"),
        ("after", "3"),
        ("sort_by", "price-descending"),
        ("filter.p.upng.color", ""),
    ]);

    let response = filter_collection(&source, &settings(), &request(&params), None)
        .await
        .unwrap();

    assert_eq!(response.mode, FilterMode::Native);
    assert_eq!(response.handles, vec!["p3", "p4", "p5"]);
    let page_info = response.page_info.unwrap();
    assert!(page_info.has_next_page);
    assert_eq!(page_info.end_cursor.as_deref(), Some("6"));
    assert_eq!(response.per_page, 3);

    let queries = source.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].product_metafields.is_empty());
    assert_eq!(queries[0].page_size, 3);
    assert_eq!(queries[0].sort.sort_key, SortKey::Price);
    assert!(queries[0].sort.reverse);
}

#[tokio::test]
async fn response_json_shape_per_mode() {
    let source = MemorySource::new(catalog());

    let native = params(&[("per_page", "2")]);
    let json = serde_json::to_value(
        filter_collection(&source, &settings(), &request(&native), None)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(json["mode"], "native");
    assert_eq!(json["pageInfo"]["hasNextPage"], true);
    assert!(json.get("hasNextPageFiltered").is_none());

    let filtered = params(&[("filter.p.vendor", "Acme"), ("per_page", "2")]);
    let json = serde_json::to_value(
        filter_collection(&source, &settings(), &request(&filtered), None)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(json["mode"], "filtered");
    assert_eq!(json["handles"], serde_json::json!(["p0", "p2"]));
    assert_eq!(json["hasNextPageFiltered"], true);
    assert_eq!(json["page"], 1);
    assert!(json.get("pageInfo").is_none());
    assert!(json.get("available_values").is_none());
}

#[tokio::test]
async fn facets_hold_out_their_own_constraint() {
    let source = MemorySource::new(catalog());
    let stored = vec![color_facet(&["blue", "green", "red"])];
    let params = params(&[
        ("filter.p.vendor", "Acme"),
        ("filter.p.upng.color", "red"),
        ("include_facets", "true"),
    ]);

    let response = filter_collection(&source, &settings(), &request(&params), Some(&stored))
        .await
        .unwrap();

    assert_eq!(response.handles, vec!["p0", "p2", "p5"]);
    let available = response.available_values.unwrap();
    let colors: Vec<&str> = available
        .get("p.upng.color")
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect();
    // Acme carries red and blue; the color selection itself is held out.
    assert_eq!(colors, vec!["blue", "red"]);

    let disabled = response.disabled.unwrap();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0].value, "green");
    assert_eq!(disabled[0].param_name, "filter.p.upng.color");
}

#[tokio::test]
async fn facets_without_stored_index_are_empty() {
    let source = MemorySource::new(catalog());
    let params = params(&[("include_facets", "1")]);

    let response = filter_collection(&source, &settings(), &request(&params), None)
        .await
        .unwrap();

    assert_eq!(response.mode, FilterMode::Native);
    assert_eq!(response.available_values.unwrap().iter().count(), 0);
    assert!(response.disabled.unwrap().is_empty());
}
