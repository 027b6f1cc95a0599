//! Authenticated HTTP transport with retry, backoff, and coordinated
//! token refresh.
//!
//! Responsibilities:
//! - Attach the bearer and client identity headers to every request.
//! - Renew the token before use when stale, and once on a mid-flight 401.
//! - Retry transient failures (connection errors, 5xx, 429) with
//!   exponential backoff.
//!
//! Does NOT handle:
//! - Business-level response codes: anything that is not transient or a
//!   401 is returned to the caller unmodified.
//!
//! Invariants:
//! - Refresh is mutually exclusive across concurrent callers: the first
//!   caller to detect staleness takes the lock, re-checks storage, and
//!   only then performs the network refresh. Everyone else re-reads the
//!   now-fresh token.
//! - Backoff doubles from a fixed base on each retry attempt.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info};

use garmin_config::constants::{
    CLIENT_HEADER_NAME, CLIENT_HEADER_VALUE, DEFAULT_BACKOFF_BASE_MS, DEFAULT_EXPIRY_BUFFER_SECS,
    DEFAULT_MAX_RETRIES,
};

use crate::error::{ClientError, Result};
use crate::sso::Authenticator;
use crate::storage::TokenStorage;
use crate::token::Token;

/// Wraps all outbound API calls so they behave as authenticated,
/// self-healing, and resilient to transient failure.
pub struct AuthenticatedTransport {
    authenticator: Arc<Authenticator>,
    storage: Arc<dyn TokenStorage>,
    refresh_lock: Mutex<()>,
    max_retries: usize,
    backoff_base: Duration,
    expiry_buffer: Duration,
}

impl AuthenticatedTransport {
    /// Create a transport over the given authenticator and storage.
    pub fn new(authenticator: Arc<Authenticator>, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            authenticator,
            storage,
            refresh_lock: Mutex::new(()),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            expiry_buffer: Duration::from_secs(DEFAULT_EXPIRY_BUFFER_SECS),
        }
    }

    /// Set the maximum number of retries for transient failures.
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set the buffer before expiry within which tokens are renewed
    /// proactively.
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Execute a request under the current session.
    ///
    /// The sole entry point resource-specific services use; they never
    /// see tokens directly.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let mut token = self.current_token().await?;

        let mut attempt: usize = 0;
        let mut refreshed_after_401 = false;

        loop {
            let attempt_builder = match builder.try_clone() {
                Some(cloned) => cloned,
                None => {
                    // Streaming bodies cannot be replayed; single attempt.
                    debug!("Request builder cannot be cloned, single attempt only");
                    return self
                        .authorize(builder, &token)
                        .send()
                        .await
                        .map_err(ClientError::from);
                }
            };

            match self.authorize(attempt_builder, &token).send().await {
                Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                    if refreshed_after_401 {
                        // Second rejection with a fresh credential; hand
                        // the response back rather than loop.
                        return Ok(response);
                    }
                    info!("Credential rejected mid-flight (401), refreshing session");
                    refreshed_after_401 = true;
                    token = self.coordinated_refresh(Some(&token.access_token)).await?;
                }
                Ok(response) if ClientError::is_retryable_status(response.status().as_u16()) => {
                    let status = response.status().as_u16();
                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries = self.max_retries + 1,
                            delay_ms = delay.as_millis() as u64,
                            status,
                            "Transient failure, retrying with exponential backoff"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        let url = response.url().to_string();
                        let message = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Could not read error response body".to_string());
                        return Err(ClientError::MaxRetriesExceeded(
                            self.max_retries + 1,
                            Box::new(ClientError::ApiError {
                                status,
                                url,
                                message,
                            }),
                        ));
                    }
                }
                Ok(response) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if is_transient_send_error(&e) => {
                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Connection-level failure, retrying with exponential backoff"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        return Err(ClientError::MaxRetriesExceeded(
                            self.max_retries + 1,
                            Box::new(ClientError::from(e)),
                        ));
                    }
                }
                Err(e) => return Err(ClientError::from(e)),
            }
        }
    }

    /// Read the current token, renewing it first if stale.
    async fn current_token(&self) -> Result<Token> {
        let token = self
            .storage
            .get()
            .await?
            .ok_or(ClientError::NotAuthenticated)?;

        if token.expires_within(self.expiry_buffer) {
            return self.coordinated_refresh(None).await;
        }

        Ok(token)
    }

    /// Refresh the token under the transport's exclusive lock.
    ///
    /// `rejected_access_token` marks a credential the server just turned
    /// away, so the double-check treats it as stale even when its expiry
    /// has not passed.
    async fn coordinated_refresh(&self, rejected_access_token: Option<&str>) -> Result<Token> {
        let _guard = self.refresh_lock.lock().await;

        // Double-check under the lock: another caller may have already
        // refreshed while this one waited.
        let current = self
            .storage
            .get()
            .await?
            .ok_or(ClientError::NotAuthenticated)?;

        let still_stale = current.expires_within(self.expiry_buffer)
            || rejected_access_token.is_some_and(|rejected| rejected == current.access_token);

        if !still_stale {
            debug!("Token already refreshed by a concurrent caller");
            return Ok(current);
        }

        self.authenticator.refresh(&current.refresh_token).await
    }

    fn authorize(&self, builder: RequestBuilder, token: &Token) -> RequestBuilder {
        builder
            .bearer_auth(&token.access_token)
            .header(CLIENT_HEADER_NAME, CLIENT_HEADER_VALUE)
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt as u32)
    }
}

/// Connection-level errors worth replaying: the request never produced a
/// response. Errors while reading a body are not replayed here.
fn is_transient_send_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request()
}

impl std::fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("expiry_buffer", &self.expiry_buffer)
            .finish_non_exhaustive()
    }
}
