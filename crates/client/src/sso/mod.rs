//! SSO authentication flow.
//!
//! Responsibilities:
//! - Drive the full sign-in protocol: ticket acquisition, credential
//!   submission, the optional MFA sub-flow, and the service-ticket
//!   exchange.
//! - Exchange a refresh credential for a new token (OAuth2 grant).
//!
//! Does NOT handle:
//! - Retry/backoff (transport responsibility).
//! - Per-request bearer injection (transport responsibility).
//!
//! Invariants:
//! - The protocol is a strict linear sequence with exactly one
//!   conditional branch (MFA); every step fails closed.
//! - Every request carries a realistic browser header set. The SSO
//!   endpoints reject bare requests outright (bot detection).
//! - Tokens are persisted immediately on creation, before being returned.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::header;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use url::Url;

use garmin_config::Endpoints;
use garmin_config::constants::{BROWSER_ACCEPT, BROWSER_USER_AGENT, SSO_CLIENT_ID};

use crate::error::{AuthFailureKind, ClientError, Result};
use crate::storage::TokenStorage;
use crate::token::Token;

mod extract;
mod models;

pub use extract::{LoginTicket, TokenParams, extract_login_ticket, extract_mfa_csrf, extract_token_params};
pub use models::{LoginOutcome, MfaChallenge, RefreshResponse, TicketResponse};

/// Executes the SSO login protocol end-to-end and performs refresh-token
/// exchanges. All endpoint and identity state is explicit configuration;
/// nothing is mutated across calls.
pub struct Authenticator {
    http: reqwest::Client,
    endpoints: Endpoints,
    domain: String,
    storage: Arc<dyn TokenStorage>,
}

impl Authenticator {
    /// Create an authenticator over the given HTTP client, endpoint set,
    /// and token storage.
    pub fn new(
        http: reqwest::Client,
        endpoints: Endpoints,
        domain: String,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        Self {
            http,
            endpoints,
            domain,
            storage,
        }
    }

    /// Run the sign-in protocol.
    ///
    /// Returns [`LoginOutcome::MfaRequired`] when the account needs a
    /// multi-factor code and none was supplied; the caller re-invokes
    /// with the code. On success the token is already persisted.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        mfa_code: Option<&str>,
    ) -> Result<LoginOutcome> {
        let signin = self.endpoints.signin();

        let ticket = self.acquire_login_ticket(&signin).await?;
        debug!(variant = ticket.field_name(), "Login ticket acquired");

        let service_ticket =
            match self.submit_credentials(&signin, username, password, &ticket).await? {
                SubmitResult::Ticket(ticket) => ticket,
                SubmitResult::MfaChallenge(challenge) => {
                    let Some(code) = mfa_code else {
                        info!("MFA challenge received and no code supplied");
                        return Ok(LoginOutcome::MfaRequired);
                    };
                    self.submit_mfa(&signin, username, password, code, &challenge)
                        .await?
                }
            };

        let token = self.exchange_ticket(&signin, &service_ticket).await?;
        self.storage.store(&token).await?;
        info!(domain = %self.domain, "Login complete, token persisted");

        Ok(LoginOutcome::Complete(token))
    }

    /// Exchange a refresh credential for a new token via the OAuth2
    /// `refresh_token` grant.
    ///
    /// Performs no retry itself; retry policy belongs to the transport.
    /// The new token is persisted before being returned.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        debug!("Exchanging refresh token");

        let response = self
            .browser_request(self.http.post(self.endpoints.token()), None)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", SSO_CLIENT_ID),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::AuthFailed {
                kind: AuthFailureKind::Rejected,
                status: Some(status.as_u16()),
                message: "refresh token rejected".to_string(),
            });
        }

        let grant: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("refresh grant body: {e}")))?;

        // Carry the cached identity across the wholesale replacement.
        let profile = self.storage.get().await?.and_then(|t| t.profile);

        let token = Token {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at: Utc::now() + Duration::seconds(grant.expires_in),
            domain: self.domain.clone(),
            profile,
        };

        self.storage.store(&token).await?;
        info!("Token refreshed and persisted");
        Ok(token)
    }

    /// Step 1: fetch the sign-in page and scrape a login ticket out of it.
    async fn acquire_login_ticket(&self, signin: &Url) -> Result<LoginTicket> {
        debug!(url = %signin, "Requesting sign-in page");

        let response = self
            .browser_request(self.http.get(signin.clone()), None)
            .query(&self.endpoints.signin_params())
            .send()
            .await?;

        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                url,
                message: "sign-in page unavailable".to_string(),
            });
        }

        extract_login_ticket(&body).ok_or_else(|| {
            warn!(bytes = body.len(), "No login ticket pattern matched sign-in page");
            ClientError::TicketNotFound { body }
        })
    }

    /// Step 2: submit credentials with the login ticket.
    async fn submit_credentials(
        &self,
        signin: &Url,
        username: &str,
        password: &SecretString,
        ticket: &LoginTicket,
    ) -> Result<SubmitResult> {
        debug!(username, "Submitting credentials");

        let response = self
            .browser_request(self.http.post(signin.clone()), Some(signin))
            .query(&self.endpoints.signin_params())
            .form(&[
                ("username", username),
                ("password", password.expose_secret()),
                ("embed", "true"),
                (ticket.field_name(), ticket.value()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::PRECONDITION_FAILED {
            let body = response.text().await?;
            let csrf = extract_mfa_csrf(&body).ok_or_else(|| {
                ClientError::InvalidResponse("MFA challenge without CSRF token".to_string())
            })?;
            return Ok(SubmitResult::MfaChallenge(MfaChallenge { csrf }));
        }

        if !status.is_success() {
            return Err(ClientError::AuthFailed {
                kind: AuthFailureKind::Rejected,
                status: Some(status.as_u16()),
                message: "credentials rejected".to_string(),
            });
        }

        let ticket_response: TicketResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("credential response body: {e}")))?;

        match ticket_response.service_ticket() {
            Some(ticket) => Ok(SubmitResult::Ticket(ticket.to_string())),
            None => Err(ClientError::AuthFailed {
                kind: AuthFailureKind::Rejected,
                status: Some(status.as_u16()),
                message: "no service ticket in credential response".to_string(),
            }),
        }
    }

    /// Step 3 (conditional): answer the MFA challenge.
    async fn submit_mfa(
        &self,
        signin: &Url,
        username: &str,
        password: &SecretString,
        code: &str,
        challenge: &MfaChallenge,
    ) -> Result<String> {
        debug!(username, "Submitting MFA code");

        let response = self
            .browser_request(self.http.post(signin.clone()), Some(signin))
            .query(&self.endpoints.signin_params())
            .form(&[
                ("username", username),
                ("password", password.expose_secret()),
                ("mfa-code", code),
                ("embed", "true"),
                ("_csrf", challenge.csrf.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::AuthFailed {
                kind: AuthFailureKind::Rejected,
                status: Some(status.as_u16()),
                message: "MFA code rejected".to_string(),
            });
        }

        let ticket_response: TicketResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("MFA response body: {e}")))?;

        // A 200 with no ticket is the service's way of saying the code
        // did not verify.
        ticket_response
            .service_ticket()
            .map(|t| t.to_string())
            .ok_or(ClientError::AuthFailed {
                kind: AuthFailureKind::InvalidMfa,
                status: Some(status.as_u16()),
                message: "no service ticket in MFA response".to_string(),
            })
    }

    /// Step 4: exchange the service ticket for tokens at the callback URL.
    async fn exchange_ticket(&self, signin: &Url, service_ticket: &str) -> Result<Token> {
        debug!("Exchanging service ticket");

        let response = self
            .browser_request(self.http.get(self.endpoints.exchange()), Some(signin))
            .query(&[("ticket", service_ticket)])
            .send()
            .await?;

        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                url,
                message: "ticket exchange failed".to_string(),
            });
        }

        let body = response.text().await?;
        let params = extract_token_params(&body)?;

        let expires_at = DateTime::from_timestamp(params.expires_at, 0).ok_or_else(|| {
            ClientError::InvalidResponse(format!("expiresAt out of range: {}", params.expires_at))
        })?;

        Ok(Token {
            access_token: params.access_token,
            refresh_token: params.refresh_token,
            expires_at,
            domain: self.domain.clone(),
            profile: None,
        })
    }

    /// Attach the browser-like header set every SSO step requires.
    fn browser_request(&self, builder: RequestBuilder, referer: Option<&Url>) -> RequestBuilder {
        let builder = builder
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::ACCEPT, BROWSER_ACCEPT);
        match referer {
            Some(referer) => builder.header(header::REFERER, referer.as_str()),
            None => builder,
        }
    }
}

/// Outcome of the credential submission step.
enum SubmitResult {
    Ticket(String),
    MfaChallenge(MfaChallenge),
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}
