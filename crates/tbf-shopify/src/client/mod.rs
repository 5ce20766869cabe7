//! GraphQL client for the Shopify Admin and Storefront APIs.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tbf_core::{AppConfig, MetafieldKey};

use crate::error::ShopifyError;
use crate::rate_limit::retry_with_backoff;

/// Which GraphQL API a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Admin,
    Storefront,
}

/// Connection settings for [`ShopifyClient`].
#[derive(Clone)]
pub struct ClientSettings {
    /// Shop domain, or a full origin such as `http://127.0.0.1:4010`.
    pub shop: String,
    pub api_version: String,
    pub admin_token: String,
    pub storefront_token: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    /// Variant metafield carrying the allow-backorder flag.
    pub backorder_metafield: MetafieldKey,
}

impl ClientSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            shop: config.shop.clone(),
            api_version: config.api_version.clone(),
            admin_token: config.admin_token.clone(),
            storefront_token: config.storefront_token.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
            backorder_metafield: config.backorder_metafield.clone(),
        }
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("shop", &self.shop)
            .field("api_version", &self.api_version)
            .field("admin_token", &"[redacted]")
            .field("storefront_token", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("backorder_metafield", &self.backorder_metafield)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
    #[serde(default)]
    extensions: Option<serde_json::Value>,
}

impl GraphQlErrorEntry {
    fn is_throttled(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(serde_json::Value::as_str)
            == Some("THROTTLED")
    }
}

/// Shopify GraphQL client shared by the catalog, facet index and template
/// operations.
///
/// Throttling (HTTP 429, `THROTTLED` errors) and network failures are
/// retried with exponential backoff up to `max_retries` extra attempts.
pub struct ShopifyClient {
    client: Client,
    origin: String,
    settings: ClientSettings,
}

impl ShopifyClient {
    /// # Errors
    ///
    /// Returns [`ShopifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: ClientSettings) -> Result<Self, ShopifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            origin: shop_origin(&settings.shop),
            settings,
        })
    }

    /// # Errors
    ///
    /// See [`ShopifyClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ShopifyError> {
        Self::new(ClientSettings::from_config(config))
    }

    #[must_use]
    pub fn shop(&self) -> &str {
        &self.settings.shop
    }

    #[must_use]
    pub fn backorder_metafield(&self) -> &MetafieldKey {
        &self.settings.backorder_metafield
    }

    fn endpoint(&self, api: Api) -> String {
        let version = &self.settings.api_version;
        match api {
            Api::Admin => format!("{}/admin/api/{version}/graphql.json", self.origin),
            Api::Storefront => format!("{}/api/{version}/graphql.json", self.origin),
        }
    }

    /// Runs one GraphQL operation and decodes its `data`.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::RateLimited`]: throttled after all retries.
    /// - [`ShopifyError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ShopifyError::GraphQl`]: top-level `errors`, or no `data`.
    /// - [`ShopifyError::Deserialize`]: body does not match `T`.
    /// - [`ShopifyError::Http`]: network failure after all retries.
    pub(crate) async fn graphql<T: DeserializeOwned>(
        &self,
        api: Api,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let url = self.endpoint(api);
        let (token_header, token) = match api {
            Api::Admin => ("X-Shopify-Access-Token", &self.settings.admin_token),
            Api::Storefront => (
                "X-Shopify-Storefront-Access-Token",
                &self.settings.storefront_token,
            ),
        };
        let body = serde_json::json!({ "query": query, "variables": variables });

        retry_with_backoff(
            self.settings.max_retries,
            self.settings.backoff_base_secs,
            || {
                let url = url.clone();
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .post(&url)
                        .header(token_header, token.as_str())
                        .json(&body)
                        .send()
                        .await?;
                    let status = response.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after_secs = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(1);
                        return Err(ShopifyError::RateLimited {
                            shop: self.settings.shop.clone(),
                            retry_after_secs,
                        });
                    }

                    if !status.is_success() {
                        return Err(ShopifyError::UnexpectedStatus {
                            status: status.as_u16(),
                            url,
                        });
                    }

                    let text = response.text().await?;
                    let parsed = serde_json::from_str::<GraphQlResponse<T>>(&text).map_err(
                        |e| ShopifyError::Deserialize {
                            context: operation.to_owned(),
                            source: e,
                        },
                    )?;

                    if parsed.errors.iter().any(GraphQlErrorEntry::is_throttled) {
                        return Err(ShopifyError::RateLimited {
                            shop: self.settings.shop.clone(),
                            retry_after_secs: self.settings.backoff_base_secs,
                        });
                    }
                    if !parsed.errors.is_empty() {
                        return Err(ShopifyError::GraphQl {
                            operation: operation.to_owned(),
                            messages: parsed.errors.into_iter().map(|e| e.message).collect(),
                        });
                    }
                    parsed.data.ok_or_else(|| ShopifyError::GraphQl {
                        operation: operation.to_owned(),
                        messages: vec!["response carried no data".to_owned()],
                    })
                }
            },
        )
        .await
    }
}

/// Base URL of a shop: full origins pass through, bare domains get
/// `https://`.
pub(crate) fn shop_origin(shop: &str) -> String {
    let shop = shop.trim().trim_end_matches('/');
    if shop.starts_with("http://") || shop.starts_with("https://") {
        shop.to_string()
    } else {
        format!("https://{shop}")
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
