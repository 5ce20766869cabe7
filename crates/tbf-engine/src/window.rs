//! One page of filtered results over an unfiltered upstream stream.
//!
//! Matching products are counted in upstream order. The first
//! `(page - 1) * per_page` are skipped, then `per_page + 1` are collected;
//! the extra slot only tells whether a next filtered page exists. The scan
//! stops as soon as the window is full.

use serde::Serialize;

use crate::matcher::ProductMatcher;
use crate::scan::{scan_until, BatchControl};
use crate::source::ProductSource;
use crate::types::ProductQuery;

/// Skip/collect accumulator for one requested page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterWindow {
    per_page: usize,
    start_index: usize,
    skipped: usize,
    collected: Vec<String>,
}

impl FilterWindow {
    /// `page` is 1-indexed; `0` is treated as `1`.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        let per_page = per_page as usize;
        let page = page.max(1) as usize;
        Self {
            per_page,
            start_index: (page - 1).saturating_mul(per_page),
            skipped: 0,
            collected: Vec::with_capacity(per_page + 1),
        }
    }

    fn window_size(&self) -> usize {
        self.per_page + 1
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.collected.len() >= self.window_size()
    }

    /// Offers one matching handle. Returns `true` once the window is full.
    pub fn offer(&mut self, handle: &str) -> bool {
        if self.skipped < self.start_index {
            self.skipped += 1;
        } else if !self.is_full() {
            self.collected.push(handle.to_string());
        }
        self.is_full()
    }

    #[must_use]
    pub fn finish(mut self) -> WindowPage {
        let has_next_page_filtered = self.collected.len() > self.per_page;
        self.collected.truncate(self.per_page);
        WindowPage {
            handles: self.collected,
            has_next_page_filtered,
        }
    }
}

/// The requested slice of filtered handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowPage {
    pub handles: Vec<String>,
    pub has_next_page_filtered: bool,
}

/// Scans `query` until page `page` of matching products is filled.
///
/// A page past the last match comes back short (possibly empty) with
/// `has_next_page_filtered = false`.
///
/// # Errors
///
/// Propagates the first fetch error from `source`.
pub async fn filtered_window<S: ProductSource>(
    source: &S,
    query: &ProductQuery,
    matcher: &ProductMatcher<'_>,
    page: u32,
    per_page: u32,
    max_pages: usize,
) -> Result<WindowPage, S::Error> {
    let mut window = FilterWindow::new(page, per_page);

    scan_until(source, query, None, max_pages, |nodes, _| {
        for product in nodes.iter().filter(|p| matcher.matches(p)) {
            if window.offer(&product.handle) {
                return BatchControl::Done(());
            }
        }
        BatchControl::Continue
    })
    .await?;

    Ok(window.finish())
}
