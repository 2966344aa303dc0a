//! Error taxonomy for scan resolution.
//!
//! Every fallible operation in the library returns [`Result<T>`], whose error
//! side is [`ScanError`]. The variants map one-to-one onto the conditions a
//! caller has to tell apart:
//!
//! ```
//! use scanlens::error::ScanError;
//!
//! fn describe(err: &ScanError) -> &'static str {
//!     match err {
//!         ScanError::Authentication(_) => "check credentials / IAM roles",
//!         ScanError::NotFound(_) => "dataset is not documented yet",
//!         ScanError::Validation(_) => "upstream payload changed shape",
//!         _ => "request failed",
//!     }
//! }
//! ```
//!
//! Nothing in the library retries. Authentication and transport failures are
//! surfaced as-is; retry policy belongs to whoever owns the transport.
//!
//! ## Context Extension Trait
//!
//! [`ResultExt`] adds `.context()` to any result whose error converts into
//! [`ScanError`], prefixing the message while keeping the variant:
//!
//! ```
//! use scanlens::error::{ResultExt as _, ScanError};
//!
//! let parsed: Result<serde_json::Value, _> = serde_json::from_str("{");
//! let err = parsed.context("scan listing").unwrap_err();
//! assert!(matches!(err, ScanError::Validation(_)));
//! assert!(err.to_string().contains("scan listing"));
//! ```

use std::collections::BTreeSet;

/// Main error type for scan resolution.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Credential failure, or a 401/403 from any call.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The service could not be reached (DNS, connect, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-auth 4xx/5xx response.
    #[error("HTTP {status} fetching {url}: {body}")]
    Request {
        status: u16,
        url: String,
        body: String,
    },

    /// A fetched payload does not match the shape expected for its type.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Allow/block lists overlap, or an invalid optimization kind was requested.
    #[error("Policy configuration error: {0}")]
    PolicyConfig(String),

    /// No documentation scan exists for the requested dataset or table.
    #[error("No scan found: {0}")]
    NotFound(String),

    /// Settings file could not be interpreted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O (settings file, log directory, token helper process).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Builds the error raised when the allow and block lists share entries.
    pub fn overlapping_lists(overlap: &BTreeSet<String>) -> Self {
        let names: Vec<&str> = overlap.iter().map(String::as_str).collect();
        Self::PolicyConfig(format!(
            "allow list and block list cannot contain the same tables: {}",
            names.join(", ")
        ))
    }

    /// Whether the error came from the credential layer or an access-denied response.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for scan resolution.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Prefix the error message with `msg`, keeping the error category.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`] but builds the message lazily.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ScanError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| prefix(e.into(), &msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| prefix(e.into(), &f()))
    }
}

fn prefix(err: ScanError, msg: &str) -> ScanError {
    match err {
        ScanError::Authentication(m) => ScanError::Authentication(format!("{msg}: {m}")),
        ScanError::Transport(m) => ScanError::Transport(format!("{msg}: {m}")),
        ScanError::Validation(m) => ScanError::Validation(format!("{msg}: {m}")),
        ScanError::PolicyConfig(m) => ScanError::PolicyConfig(format!("{msg}: {m}")),
        ScanError::NotFound(m) => ScanError::NotFound(format!("{msg}: {m}")),
        ScanError::Config(m) => ScanError::Config(format!("{msg}: {m}")),
        ScanError::Request { status, url, body } => ScanError::Request {
            status,
            url,
            body: format!("{msg}: {body}"),
        },
        ScanError::Io(e) => ScanError::Io(std::io::Error::new(e.kind(), format!("{msg}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::NotFound("dataset thelook".to_owned());
        assert_eq!(err.to_string(), "No scan found: dataset thelook");
    }

    #[test]
    fn test_request_error_display_includes_status_and_body() {
        let err = ScanError::Request {
            status: 500,
            url: "https://example.test/x".to_owned(),
            body: "boom".to_owned(),
        };
        assert_eq!(err.to_string(), "HTTP 500 fetching https://example.test/x: boom");
        assert!(!err.is_access_denied());
    }

    #[test]
    fn test_overlapping_lists_names_entries() {
        let overlap: BTreeSet<String> = ["orders", "users"].iter().map(|s| (*s).to_owned()).collect();
        let err = ScanError::overlapping_lists(&overlap);
        assert!(matches!(err, ScanError::PolicyConfig(_)));
        assert!(err.to_string().contains("orders, users"));
    }

    #[test]
    fn test_result_context_keeps_category() {
        let result: std::result::Result<(), ScanError> =
            Err(ScanError::Authentication("token expired".to_owned()));

        let err = result.context("listing scans").unwrap_err();
        assert!(err.is_access_denied());
        assert_eq!(
            err.to_string(),
            "Authentication error: listing scans: token expired"
        );
    }

    #[test]
    fn test_json_error_is_validation() {
        let err: ScanError = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ScanError::Validation(_)));
    }
}
