//! Offset pagination.
//!
//! Pages are requested one at a time: the next offset is only known once
//! the previous page's length is. A page shorter than the page size
//! (including an empty one) ends the collection. Any page error aborts
//! the whole collection; no partial result is returned.

use crate::analytics::client::{result_rows, AnalyticsApi};
use crate::error::TransportError;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

/// Page size and the safety bound on how many pages one collection may fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 500,
        }
    }
}

/// Call `fetch_page(offset)` with offsets 0, P, 2P, ... until a short page.
///
/// Returns every row in fetch order. A source holding exactly
/// `max_pages * page_size` rows still succeeds: after `max_pages` full pages
/// one more page is requested, and only if that one is full too does the
/// collection fail with [`TransportError::PageLimit`].
pub async fn collect_pages<T, F, Fut>(
    limits: PageLimits,
    mut fetch_page: F,
) -> Result<Vec<T>, TransportError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, TransportError>>,
{
    let mut rows = Vec::new();
    let mut offset = 0;
    let mut full_pages = 0;

    loop {
        let page = fetch_page(offset).await?;
        let page_len = page.len();
        rows.extend(page);
        debug!("Fetched page at offset {} with {} rows", offset, page_len);

        if page_len != limits.page_size {
            return Ok(rows);
        }
        if full_pages == limits.max_pages {
            warn!(
                "Stopping pagination after {} full pages of {}",
                limits.max_pages, limits.page_size
            );
            return Err(TransportError::PageLimit {
                max_pages: limits.max_pages,
            });
        }
        full_pages += 1;
        offset += limits.page_size;
    }
}

/// Collect every row of a paginated `{result: {rows}}` endpoint.
///
/// `limit` and `offset` are appended to `params` on each request.
pub async fn fetch_all_pages(
    api: &dyn AnalyticsApi,
    path: &str,
    params: &[(String, String)],
    limits: PageLimits,
) -> Result<Vec<Value>, TransportError> {
    collect_pages(limits, |offset| async move {
        let mut page_params = params.to_vec();
        page_params.push(("limit".to_string(), limits.page_size.to_string()));
        page_params.push(("offset".to_string(), offset.to_string()));
        let body = api.get(path, &page_params).await?;
        result_rows(body)
    })
    .await
}
