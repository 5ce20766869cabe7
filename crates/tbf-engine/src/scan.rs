//! Cursor-driven page scanning.

use crate::source::ProductSource;
use crate::types::{PageInfo, ProductNode, ProductQuery};

/// What a batch handler wants after seeing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchControl<T> {
    Continue,
    Done(T),
}

/// Result of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome<T> {
    /// Payload of the handler that stopped the scan, if any.
    pub payload: Option<T>,
    pub pages_fetched: usize,
    /// `true` when the page ceiling stopped the scan while upstream still
    /// reported more pages.
    pub truncated: bool,
}

/// Fetches pages starting at `after` and feeds each one to `on_batch`.
///
/// Stops when the handler returns [`BatchControl::Done`], when upstream has
/// no next page, or after `max_pages` fetches. Hitting the ceiling is not an
/// error: the outcome is flagged `truncated` and a warning is logged.
///
/// # Errors
///
/// Returns the source's error from the first failed fetch, unretried.
pub async fn scan_until<S, T, F>(
    source: &S,
    query: &ProductQuery,
    after: Option<String>,
    max_pages: usize,
    mut on_batch: F,
) -> Result<ScanOutcome<T>, S::Error>
where
    S: ProductSource,
    F: FnMut(Vec<ProductNode>, &PageInfo) -> BatchControl<T>,
{
    let mut cursor = after;
    let mut pages_fetched = 0usize;

    while pages_fetched < max_pages {
        let page = source.fetch_page(query, cursor.as_deref()).await?;
        pages_fetched += 1;

        tracing::debug!(
            collection_id = %query.collection_id,
            page = pages_fetched,
            products = page.nodes.len(),
            has_next_page = page.page_info.has_next_page,
            "scanned collection page"
        );

        let page_info = page.page_info;
        if let BatchControl::Done(payload) = on_batch(page.nodes, &page_info) {
            return Ok(ScanOutcome {
                payload: Some(payload),
                pages_fetched,
                truncated: false,
            });
        }

        match page_info.end_cursor {
            Some(next) if page_info.has_next_page => cursor = Some(next),
            _ => {
                return Ok(ScanOutcome {
                    payload: None,
                    pages_fetched,
                    truncated: false,
                });
            }
        }
    }

    tracing::warn!(
        collection_id = %query.collection_id,
        max_pages,
        "page ceiling reached; results truncated"
    );
    Ok(ScanOutcome {
        payload: None,
        pages_fetched,
        truncated: true,
    })
}
