use std::net::SocketAddr;

use crate::facets::MetafieldKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Shop domain, e.g. `acme.myshopify.com`.
    pub shop: String,
    pub admin_token: String,
    pub storefront_token: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub default_per_page: u32,
    /// Upstream page size while scanning for a filtered window.
    pub scan_page_size: u32,
    /// Page ceiling for the filtered window scan.
    pub scan_max_pages: usize,
    /// Page ceiling for the self-exclusion facet scan.
    pub facets_max_pages: usize,
    pub index_page_size: u32,
    /// Page ceiling for a full facet index rebuild.
    pub index_max_pages: usize,
    /// Variant metafield holding the allow-backorder flag.
    pub backorder_metafield: MetafieldKey,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("shop", &self.shop)
            .field("admin_token", &"[redacted]")
            .field("storefront_token", &"[redacted]")
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("default_per_page", &self.default_per_page)
            .field("scan_page_size", &self.scan_page_size)
            .field("scan_max_pages", &self.scan_max_pages)
            .field("facets_max_pages", &self.facets_max_pages)
            .field("index_page_size", &self.index_page_size)
            .field("index_max_pages", &self.index_max_pages)
            .field("backorder_metafield", &self.backorder_metafield)
            .finish()
    }
}
