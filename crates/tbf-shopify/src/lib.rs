//! Shopify GraphQL transport: collection product pages for the filter
//! engine, facet index storage, metafield definitions and filter templates.

pub mod catalog;
pub mod client;
pub mod definitions;
pub mod error;
mod query;
mod rate_limit;
pub mod templates;

pub use catalog::{AdminCatalog, StorefrontCatalog};
pub use client::{Api, ClientSettings, ShopifyClient};
pub use error::ShopifyError;
pub use templates::{SaveOutcome, SavedTemplate, TemplatePage};
