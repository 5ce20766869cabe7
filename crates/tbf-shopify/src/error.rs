use tbf_core::UserError;
use tbf_engine::RebuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("GraphQL errors from {operation}: {}", .messages.join("; "))]
    GraphQl {
        operation: String,
        messages: Vec<String>,
    },

    #[error("rate limited by {shop} (retry after {retry_after_secs}s)")]
    RateLimited { shop: String, retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{operation} rejected: {}", describe(.errors))]
    UserErrors {
        operation: String,
        errors: Vec<UserError>,
    },

    #[error("invalid id: {}", describe(.0))]
    InvalidId(Vec<UserError>),

    #[error(transparent)]
    Rebuild(#[from] RebuildError),
}

impl ShopifyError {
    /// Field-level errors meant to be shown to the merchant as-is.
    #[must_use]
    pub fn user_errors(&self) -> Option<&[UserError]> {
        match self {
            ShopifyError::UserErrors { errors, .. } | ShopifyError::InvalidId(errors) => {
                Some(errors)
            }
            _ => None,
        }
    }
}

fn describe(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
