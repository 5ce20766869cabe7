use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("SHOPIFY_SHOP", "acme.myshopify.com");
    m.insert("SHOPIFY_ADMIN_TOKEN", "shpat_test");
    m.insert("SHOPIFY_STOREFRONT_TOKEN", "storefront_test");
    m
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("unknown").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "TBF_ENV"));
}

#[test]
fn build_app_config_fails_without_shop() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHOPIFY_SHOP"),
        "expected MissingEnvVar(SHOPIFY_SHOP), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_token_as_missing() {
    let mut map = full_env();
    map.insert("SHOPIFY_ADMIN_TOKEN", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHOPIFY_ADMIN_TOKEN"),
        "expected MissingEnvVar(SHOPIFY_ADMIN_TOKEN), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_without_storefront_token() {
    let mut map = full_env();
    map.remove("SHOPIFY_STOREFRONT_TOKEN");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHOPIFY_STOREFRONT_TOKEN"),
        "expected MissingEnvVar(SHOPIFY_STOREFRONT_TOKEN), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = full_env();
    map.insert("TBF_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TBF_BIND_ADDR"),
        "expected InvalidEnvVar(TBF_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_all_required_vars() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.shop, "acme.myshopify.com");
    assert_eq!(cfg.api_version, "2024-04");
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "tb-filters/0.1");
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.retry_backoff_base_secs, 1);
    assert_eq!(cfg.default_per_page, 16);
    assert_eq!(cfg.scan_page_size, 250);
    assert_eq!(cfg.scan_max_pages, 50);
    assert_eq!(cfg.facets_max_pages, 40);
    assert_eq!(cfg.index_page_size, 50);
    assert_eq!(cfg.index_max_pages, 1000);
    assert_eq!(
        cfg.backorder_metafield,
        MetafieldKey::new("upng", "permite_pedidos")
    );
}

#[test]
fn debug_output_redacts_tokens() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("shpat_test"));
    assert!(!rendered.contains("storefront_test"));
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn scan_max_pages_override() {
    let mut map = full_env();
    map.insert("TBF_SCAN_MAX_PAGES", "5");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.scan_max_pages, 5);
}

#[test]
fn scan_max_pages_invalid() {
    let mut map = full_env();
    map.insert("TBF_SCAN_MAX_PAGES", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TBF_SCAN_MAX_PAGES"),
        "expected InvalidEnvVar(TBF_SCAN_MAX_PAGES), got: {result:?}"
    );
}

#[test]
fn scan_page_size_above_shopify_cap_is_rejected() {
    let mut map = full_env();
    map.insert("TBF_SCAN_PAGE_SIZE", "500");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TBF_SCAN_PAGE_SIZE"),
        "expected InvalidEnvVar(TBF_SCAN_PAGE_SIZE), got: {result:?}"
    );
}

#[test]
fn index_page_size_zero_is_rejected() {
    let mut map = full_env();
    map.insert("TBF_INDEX_PAGE_SIZE", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TBF_INDEX_PAGE_SIZE"),
        "expected InvalidEnvVar(TBF_INDEX_PAGE_SIZE), got: {result:?}"
    );
}

#[test]
fn backorder_metafield_override() {
    let mut map = full_env();
    map.insert("TBF_BACKORDER_METAFIELD", "custom.allow_backorder");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.backorder_metafield,
        MetafieldKey::new("custom", "allow_backorder")
    );
}

#[test]
fn backorder_metafield_without_dot_is_rejected() {
    let mut map = full_env();
    map.insert("TBF_BACKORDER_METAFIELD", "permite_pedidos");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TBF_BACKORDER_METAFIELD"),
        "expected InvalidEnvVar(TBF_BACKORDER_METAFIELD), got: {result:?}"
    );
}

#[test]
fn unknown_env_is_rejected() {
    let mut map = full_env();
    map.insert("TBF_ENV", "staging");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TBF_ENV"),
        "expected InvalidEnvVar(TBF_ENV), got: {result:?}"
    );
}
