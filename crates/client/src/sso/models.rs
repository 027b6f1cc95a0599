//! Wire shapes for the SSO protocol endpoints.
//!
//! Remote response bodies are only partially known, so every field that
//! the service may omit is optional and absence is handled explicitly at
//! the call site.

use serde::Deserialize;

use crate::token::Token;

/// JSON body returned by a successful credential or MFA submission.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketResponse {
    /// Opaque service ticket; absent or empty means the submission did
    /// not actually complete.
    #[serde(default)]
    pub ticket: Option<String>,
}

impl TicketResponse {
    /// The service ticket, if present and non-empty.
    pub fn service_ticket(&self) -> Option<&str> {
        self.ticket.as_deref().filter(|t| !t.is_empty())
    }
}

/// JSON body returned by the OAuth2 refresh-token grant.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// The service may rotate the refresh credential; absence means the
    /// previous one stays valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, converted to an absolute expiry on receipt.
    pub expires_in: i64,
}

/// Ephemeral MFA challenge scraped from a precondition-failed response.
///
/// Exists only between detection of the challenge and submission of the
/// code; discarded after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaChallenge {
    /// Challenge-specific CSRF token required by the MFA submission.
    pub csrf: String,
}

/// Result of a login attempt. Callers branch on data, not control flow.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Fully authenticated; the token has already been persisted.
    Complete(Token),
    /// The account requires a multi-factor code. Re-invoke login with the
    /// code supplied.
    MfaRequired,
}
