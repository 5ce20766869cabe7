mod common;

use std::collections::BTreeMap;

use common::{catalog, MemorySink, MemorySource};
use tbf_core::{MetafieldKey, MetafieldOwner};
use tbf_engine::{
    rebuild_collection_index, rebuild_collections, EngineSettings, IndexConfig,
    MetafieldDefinition, RebuildError,
};

fn settings() -> EngineSettings {
    EngineSettings {
        index_page_size: 3,
        ..EngineSettings::default()
    }
}

fn config() -> IndexConfig {
    IndexConfig {
        definitions: vec![MetafieldDefinition {
            id: "gid://shopify/MetafieldDefinition/7".to_string(),
            name: Some("Color".to_string()),
            key: MetafieldKey::new("upng", "color"),
            owner: MetafieldOwner::Product,
            type_name: Some("single_line_text_field".to_string()),
        }],
        include_vendor: true,
        include_availability: true,
        include_price: false,
        order: vec!["vendor".to_string()],
        labels: BTreeMap::new(),
    }
}

#[tokio::test]
async fn rebuild_scans_everything_and_overwrites() {
    let source = MemorySource::new(catalog());
    let sink = MemorySink::default();

    let facets = rebuild_collection_index(
        &source,
        &sink,
        "gid://shopify/Collection/9",
        &config(),
        &settings(),
    )
    .await
    .unwrap();

    // 8 products in pages of 3.
    assert_eq!(source.fetches(), 3);
    let ids: Vec<&str> = facets.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["vendor", "gid://shopify/MetafieldDefinition/7", "availability"]
    );
    let vendor: Vec<(&str, u64)> = facets[0]
        .values
        .iter()
        .map(|v| (v.value.as_str(), v.count))
        .collect();
    assert_eq!(vendor, vec![("Acme", 4), ("Zeta", 4)]);

    let writes = sink.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "gid://shopify/Collection/9");
    assert_eq!(writes[0].1, facets);
}

#[tokio::test]
async fn empty_config_writes_empty_index_without_fetching() {
    let source = MemorySource::new(catalog());
    let sink = MemorySink::default();

    let empty = IndexConfig::default();
    let facets = rebuild_collection_index(&source, &sink, "c1", &empty, &settings())
        .await
        .unwrap();

    assert!(facets.is_empty());
    assert_eq!(source.fetches(), 0);
    assert_eq!(sink.writes(), vec![("c1".to_string(), vec![])]);
}

#[tokio::test]
async fn rebuilding_twice_is_idempotent() {
    let source = MemorySource::new(catalog());
    let sink = MemorySink::default();

    for _ in 0..2 {
        rebuild_collection_index(&source, &sink, "c1", &config(), &settings())
            .await
            .unwrap();
    }

    let writes = sink.writes();
    assert_eq!(writes[0], writes[1]);
}

#[tokio::test]
async fn fetch_failure_skips_the_write() {
    let source = MemorySource::new(catalog()).failing_on(2);
    let sink = MemorySink::default();

    let err = rebuild_collection_index(&source, &sink, "c1", &config(), &settings())
        .await
        .unwrap_err();

    assert!(matches!(err, RebuildError::Fetch { .. }));
    assert_eq!(err.collection_id(), "c1");
    assert!(sink.writes().is_empty());
}

#[tokio::test]
async fn write_failure_is_reported() {
    let source = MemorySource::new(catalog());
    let sink = MemorySink::rejecting();

    let err = rebuild_collection_index(&source, &sink, "c1", &config(), &settings())
        .await
        .unwrap_err();

    assert!(matches!(err, RebuildError::Write { .. }));
}

#[tokio::test]
async fn rebuild_collections_covers_every_collection() {
    let source = MemorySource::new(catalog());
    let sink = MemorySink::default();
    let ids = vec!["c1".to_string(), "c2".to_string()];

    let count = rebuild_collections(&source, &sink, &ids, &config(), &settings())
        .await
        .unwrap();

    assert_eq!(count, 2);
    let written: Vec<String> = sink.writes().into_iter().map(|(id, _)| id).collect();
    assert_eq!(written, ids);
}
