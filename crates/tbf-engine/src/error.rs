use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("fetching products of {collection_id} failed: {source}")]
    Fetch {
        collection_id: String,
        #[source]
        source: BoxError,
    },

    #[error("writing facet index of {collection_id} failed: {source}")]
    Write {
        collection_id: String,
        #[source]
        source: BoxError,
    },
}

impl RebuildError {
    #[must_use]
    pub fn collection_id(&self) -> &str {
        match self {
            RebuildError::Fetch { collection_id, .. } | RebuildError::Write { collection_id, .. } => {
                collection_id
            }
        }
    }
}
