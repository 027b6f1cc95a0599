//! Top-level Garmin Connect client.
//!
//! Wires the authenticator, transport, and storage together behind the
//! two narrow contracts consumers use: "log in / out" and "execute this
//! request under the current session".

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use secrecy::SecretString;
use tracing::debug;

use garmin_config::Endpoints;
use garmin_config::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_DOMAIN, DEFAULT_EXPIRY_BUFFER_SECS, DEFAULT_MAX_REDIRECTS,
    DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};

use crate::error::{ClientError, Result};
use crate::sso::{Authenticator, LoginOutcome};
use crate::storage::{MemoryTokenStorage, TokenStorage};
use crate::token::{Token, UserProfile};
use crate::transport::AuthenticatedTransport;

/// Builder for creating a new [`GarminClient`].
pub struct GarminClientBuilder {
    domain: String,
    timeout: Duration,
    max_retries: usize,
    backoff_base: Duration,
    expiry_buffer: Duration,
    storage: Option<Arc<dyn TokenStorage>>,
    endpoints: Option<Endpoints>,
}

impl Default for GarminClientBuilder {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            expiry_buffer: Duration::from_secs(DEFAULT_EXPIRY_BUFFER_SECS),
            storage: None,
            endpoints: None,
        }
    }
}

impl GarminClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the owning domain (e.g. "garmin.com", "garmin.cn").
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for transient failures.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set the buffer before expiry within which tokens are renewed
    /// proactively.
    pub fn expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Set the token storage backend. Defaults to in-memory storage.
    pub fn storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Override the resolved endpoint set (used by tests to point the
    /// flow at a mock server).
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GarminClient> {
        if self.domain.trim().is_empty() {
            return Err(ClientError::InvalidUrl("domain is required".to_string()));
        }

        let endpoints = match self.endpoints {
            Some(endpoints) => endpoints,
            None => Endpoints::for_domain(&self.domain)
                .map_err(|e| ClientError::InvalidUrl(e.to_string()))?,
        };

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(DEFAULT_MAX_REDIRECTS))
            .build()?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryTokenStorage::new()));

        let authenticator = Arc::new(Authenticator::new(
            http.clone(),
            endpoints.clone(),
            self.domain.clone(),
            Arc::clone(&storage),
        ));

        let transport = AuthenticatedTransport::new(Arc::clone(&authenticator), Arc::clone(&storage))
            .with_max_retries(self.max_retries)
            .with_backoff_base(self.backoff_base)
            .with_expiry_buffer(self.expiry_buffer);

        Ok(GarminClient {
            http,
            endpoints,
            domain: self.domain,
            authenticator,
            transport,
            storage,
        })
    }
}

/// Garmin Connect client.
///
/// Resource services issue requests through [`GarminClient::execute`];
/// they never touch the authenticator or tokens directly.
pub struct GarminClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    domain: String,
    authenticator: Arc<Authenticator>,
    transport: AuthenticatedTransport,
    storage: Arc<dyn TokenStorage>,
}

impl std::fmt::Debug for GarminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarminClient")
            .field("domain", &self.domain)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl GarminClient {
    /// Create a new client builder.
    pub fn builder() -> GarminClientBuilder {
        GarminClientBuilder::new()
    }

    /// Run the SSO login flow and persist the resulting session.
    ///
    /// Returns [`LoginOutcome::MfaRequired`] when a multi-factor code is
    /// needed; re-invoke with the code supplied.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        mfa_code: Option<&str>,
    ) -> Result<LoginOutcome> {
        self.authenticator.login(username, password, mfa_code).await
    }

    /// Wipe the current session.
    pub async fn logout(&self) -> Result<()> {
        debug!("Clearing session");
        self.storage.clear().await
    }

    /// Build a request against an absolute URL for use with
    /// [`GarminClient::execute`].
    pub fn request(&self, method: Method, url: url::Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Execute a request under the current session, with automatic
    /// bearer injection, refresh, and transient-failure retry.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        self.transport.execute(builder).await
    }

    /// Fetch the signed-in user's profile and cache it on the stored
    /// token.
    pub async fn user_profile(&self) -> Result<UserProfile> {
        let response = self
            .transport
            .execute(self.http.get(self.endpoints.profile()))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                url: response.url().to_string(),
                message: "profile request failed".to_string(),
            });
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("profile body: {e}")))?;

        // Cache the identity on the current session, if one still exists.
        if let Some(token) = self.storage.get().await? {
            self.storage
                .store(&token.with_profile(profile.clone()))
                .await?;
        }

        Ok(profile)
    }

    /// The current session token, if any. Used by application start-up
    /// and shutdown code to inspect or seed a session.
    pub async fn session(&self) -> Result<Option<Token>> {
        self.storage.get().await
    }

    /// The owning domain this client was built for.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = GarminClient::builder().build().unwrap();
        assert_eq!(client.domain(), DEFAULT_DOMAIN);
    }

    #[test]
    fn test_builder_rejects_empty_domain() {
        let result = GarminClient::builder().domain("").build();
        assert!(matches!(result.unwrap_err(), ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_builder_custom_domain() {
        let client = GarminClient::builder().domain("garmin.cn").build().unwrap();
        assert_eq!(client.domain(), "garmin.cn");
    }

    #[tokio::test]
    async fn test_fresh_client_has_no_session() {
        let client = GarminClient::builder().build().unwrap();
        assert!(client.session().await.unwrap().is_none());
    }
}
