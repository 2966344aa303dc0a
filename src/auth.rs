//! Bearer-token capability for the Google APIs.
//!
//! HTTP clients take a [`TokenSource`] instead of reaching for ambient
//! credentials. Two sources are provided:
//!
//! - [`StaticToken`]: a token handed in by the caller (e.g. `SCANLENS_ACCESS_TOKEN`)
//! - [`GoogleCredentials`]: Application Default Credentials through `gcp_auth`,
//!   which caches tokens and refreshes them from their real expiry
//!
//! ```no_run
//! use scanlens::auth::{GoogleCredentials, TokenSource as _};
//! use secrecy::ExposeSecret as _;
//!
//! # async fn example() -> scanlens::error::Result<()> {
//! let source = GoogleCredentials::from_environment().await?;
//! let token = source.token().await?;
//! assert!(!token.expose_secret().is_empty());
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, ScanError};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use secrecy::{ExposeSecret as _, SecretString};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// OAuth scope covering both the Dataplex and BigQuery APIs.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Something that can produce a currently valid bearer token.
pub trait TokenSource: Send + Sync {
    /// Returns a token valid for at least the next request.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Authentication`] when no token can be obtained.
    fn token(&self) -> impl Future<Output = Result<SecretString>> + Send;
}

impl<T: TokenSource> TokenSource for Arc<T> {
    fn token(&self) -> impl Future<Output = Result<SecretString>> + Send {
        self.as_ref().token()
    }
}

/// A fixed token supplied by the caller.
pub struct StaticToken {
    token: SecretString,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl TokenSource for StaticToken {
    async fn token(&self) -> Result<SecretString> {
        if self.token.expose_secret().is_empty() {
            return Err(ScanError::Authentication("access token is empty".to_owned()));
        }
        Ok(SecretString::from(self.token.expose_secret().to_owned()))
    }
}

/// Tokens from a `gcp_auth` provider, requested with [`CLOUD_PLATFORM_SCOPE`].
pub struct GoogleCredentials {
    provider: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials").finish_non_exhaustive()
    }
}

impl GoogleCredentials {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    /// Discover Application Default Credentials: `GOOGLE_APPLICATION_CREDENTIALS`,
    /// the gcloud user credentials, or the metadata server.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Authentication`] when no credentials are available.
    pub async fn from_environment() -> Result<Self> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            ScanError::Authentication(format!("failed to initialize Google credentials: {e}"))
        })?;
        Ok(Self::new(provider))
    }

    /// Use the service-account key file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Authentication`] when the file cannot be read or
    /// is not a service-account key.
    pub fn from_service_account_file(path: &Path) -> Result<Self> {
        let account = CustomServiceAccount::from_file(path).map_err(|e| {
            ScanError::Authentication(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::new(Arc::new(account)))
    }
}

impl TokenSource for GoogleCredentials {
    async fn token(&self) -> Result<SecretString> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| ScanError::Authentication(format!("failed to get access token: {e}")))?;
        Ok(SecretString::from(token.as_str().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let source = Arc::new(StaticToken::new("abc"));
        assert_eq!(source.token().await.unwrap().expose_secret(), "abc");
        assert!(StaticToken::new("").token().await.is_err());
    }

    #[test]
    fn test_missing_key_file_is_authentication_error() {
        let path = std::env::temp_dir().join("scanlens-auth-missing/key.json");
        let err = GoogleCredentials::from_service_account_file(&path).unwrap_err();
        assert!(err.is_access_denied());
        assert!(err.to_string().contains("key.json"));
    }

    #[test]
    fn test_malformed_key_file_is_authentication_error() {
        let dir = std::env::temp_dir().join(format!("scanlens-auth-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("key.json");
        std::fs::write(&path, r#"{ "type": "service_account" }"#).unwrap();

        let err = GoogleCredentials::from_service_account_file(&path).unwrap_err();
        assert!(err.is_access_denied());
        std::fs::remove_file(&path).ok();
    }
}
