//! `nextPageToken` following for the Google list endpoints.

use crate::error::{Result, ScanError};
use std::future::Future;

/// Upper bound on requests for one listing.
pub(crate) const MAX_LIST_PAGES: usize = 500;

/// One page of a list response.
#[derive(Debug)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Call `fetch_page` with the previous page's token until a page comes back
/// without one. An empty token ends the listing too.
///
/// # Errors
///
/// Propagates the first fetch error, and returns [`ScanError::Transport`]
/// when the listing is still going after [`MAX_LIST_PAGES`] requests.
pub(crate) async fn collect_pages<T, F, Fut>(what: &str, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page_token = None;

    for _ in 0..MAX_LIST_PAGES {
        let page = fetch_page(page_token.take()).await?;
        items.extend(page.items);
        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => return Ok(items),
        }
    }

    Err(ScanError::Transport(format!(
        "{what} still had more pages after {MAX_LIST_PAGES} requests"
    )))
}
