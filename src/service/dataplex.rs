//! Dataplex data-scan API client.

use super::ScanService;
use super::http::HttpTransport;
use super::paging::{Page, collect_pages};
use crate::auth::TokenSource;
use crate::error::{Result, ResultExt as _};
use crate::scan::take_listing_entries;
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_DATAPLEX_BASE_URL: &str = "https://dataplex.googleapis.com/v1";

/// HTTP client for `dataScans.list` / `dataScans.get`.
pub struct DataplexClient<T> {
    http: HttpTransport<T>,
    base_url: String,
}

impl<T: TokenSource> DataplexClient<T> {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(tokens: T, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(tokens, timeout)?,
            base_url: base_url
                .unwrap_or(DEFAULT_DATAPLEX_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
        })
    }

    fn list_url(&self, project_id: &str, location: &str) -> String {
        format!(
            "{}/projects/{project_id}/locations/{location}/dataScans",
            self.base_url
        )
    }
}

impl<T: TokenSource> ScanService for DataplexClient<T> {
    async fn list_scans(&self, project_id: &str, location: &str) -> Result<String> {
        let url = self.list_url(project_id, location);
        let (http, url) = (&self.http, url.as_str());

        let scans = collect_pages("scan listing", move |page_token| async move {
            let query: Vec<(&str, &str)> = match page_token.as_deref() {
                Some(token) => vec![("pageToken", token)],
                None => Vec::new(),
            };
            listing_page(&http.get_text(url, &query).await?)
        })
        .await?;

        tracing::debug!(count = scans.len(), %project_id, %location, "listed data scans");
        Ok(json!({ "dataScans": scans }).to_string())
    }

    async fn get_scan(&self, resource_name: &str, full_view: bool) -> Result<String> {
        let url = format!("{}/{resource_name}", self.base_url);
        let query: &[(&str, &str)] = if full_view { &[("view", "FULL")] } else { &[] };
        self.http.get_text(&url, query).await
    }
}

/// Decode one `dataScans.list` page.
fn listing_page(body: &str) -> Result<Page<Value>> {
    let mut root: Value = serde_json::from_str(body).context("scan listing page")?;
    let items = take_listing_entries(&mut root)?;
    let next_page_token = root
        .get("nextPageToken")
        .and_then(Value::as_str)
        .map(str::to_owned);
    Ok(Page {
        items,
        next_page_token,
    })
}
