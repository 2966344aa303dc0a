//! Authenticated JSON-over-HTTPS transport shared by the Google API clients.

use crate::auth::TokenSource;
use crate::error::{Result, ScanError};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret as _;
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A `reqwest` client paired with a bearer-token source.
pub struct HttpTransport<T> {
    client: Client,
    tokens: T,
}

impl<T: TokenSource> HttpTransport<T> {
    /// # Errors
    ///
    /// Returns [`ScanError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(tokens: T, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, tokens })
    }

    /// GET `url` with the given query parameters and return the body text.
    ///
    /// # Errors
    ///
    /// See [`check_status`] for the status mapping; connection failures are
    /// [`ScanError::Transport`].
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        self.send(self.client.get(url).query(query), url).await
    }

    /// POST a JSON body to `url` and return the response text.
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::get_text`].
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<String> {
        self.send(self.client.post(url).json(body), url).await
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<String> {
        let token = self.tokens.token().await?;
        tracing::debug!(%url, "sending request");

        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| ScanError::Transport(format!("network error fetching {url}: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ScanError::Transport(format!("failed to read response from {url}: {e}")))?;

        check_status(status, url, body)
    }
}

/// Map an HTTP status to the error taxonomy; success returns the body.
///
/// # Errors
///
/// 401/403 are [`ScanError::Authentication`]; any other non-2xx status is
/// [`ScanError::Request`] carrying the body.
pub fn check_status(status: u16, url: &str, body: String) -> Result<String> {
    match status {
        200..=299 => Ok(body),
        401 | 403 => Err(ScanError::Authentication(format!(
            "access denied (HTTP {status}) fetching {url}; ensure the caller has the necessary IAM roles"
        ))),
        _ => Err(ScanError::Request {
            status,
            url: url.to_owned(),
            body,
        }),
    }
}
