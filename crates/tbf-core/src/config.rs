use crate::app_config::{AppConfig, Environment};
use crate::facets::MetafieldKey;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does not load `.env` files; useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests can
/// drive this with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let shop = require("SHOPIFY_SHOP")?;
    let admin_token = require("SHOPIFY_ADMIN_TOKEN")?;
    let storefront_token = require("SHOPIFY_STOREFRONT_TOKEN")?;
    let api_version = or_default("SHOPIFY_API_VERSION", "2024-04");

    let env = parse_environment(&or_default("TBF_ENV", "development"))?;
    let bind_addr = parse_addr("TBF_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("TBF_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("TBF_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("TBF_USER_AGENT", "tb-filters/0.1");
    let max_retries = parse_u32("TBF_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("TBF_RETRY_BACKOFF_BASE_SECS", "1")?;

    let default_per_page = parse_u32("TBF_DEFAULT_PER_PAGE", "16")?;
    let scan_page_size =
        parse_page_size("TBF_SCAN_PAGE_SIZE", parse_u32("TBF_SCAN_PAGE_SIZE", "250")?)?;
    let scan_max_pages = parse_usize("TBF_SCAN_MAX_PAGES", "50")?;
    let facets_max_pages = parse_usize("TBF_FACETS_MAX_PAGES", "40")?;
    let index_page_size =
        parse_page_size("TBF_INDEX_PAGE_SIZE", parse_u32("TBF_INDEX_PAGE_SIZE", "50")?)?;
    let index_max_pages = parse_usize("TBF_INDEX_MAX_PAGES", "1000")?;

    let backorder_metafield = parse_metafield_key(
        "TBF_BACKORDER_METAFIELD",
        &or_default("TBF_BACKORDER_METAFIELD", "upng.permite_pedidos"),
    )?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        shop,
        admin_token,
        storefront_token,
        api_version,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        default_per_page,
        scan_page_size,
        scan_max_pages,
        facets_max_pages,
        index_page_size,
        index_max_pages,
        backorder_metafield,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TBF_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Shopify connections cap `first:` at 250.
fn parse_page_size(var: &str, value: u32) -> Result<u32, ConfigError> {
    if (1..=250).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("page size must be between 1 and 250, got {value}"),
        })
    }
}

fn parse_metafield_key(var: &str, raw: &str) -> Result<MetafieldKey, ConfigError> {
    match raw.split_once('.') {
        Some((namespace, key))
            if !namespace.is_empty() && !key.is_empty() && !key.contains('.') =>
        {
            Ok(MetafieldKey::new(namespace, key))
        }
        _ => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected \"namespace.key\", got \"{raw}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
