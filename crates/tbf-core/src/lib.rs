pub mod app_config;
pub mod config;
pub mod facets;
pub mod gid;
pub mod templates;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use facets::{parse_facet_index, Facet, FacetValue, MetafieldKey, MetafieldOwner};
pub use templates::{FilterTemplate, TemplateAction, TemplateInput, UserError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
