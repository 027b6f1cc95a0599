//! Error types for the Garmin Connect client.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Sub-kind of an authentication rejection, so callers can distinguish a
/// bad MFA exchange from a plain credential rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    /// Credentials or ticket rejected outright by the remote service.
    Rejected,
    /// MFA submission returned HTTP success but no service ticket.
    InvalidMfa,
}

impl std::fmt::Display for AuthFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::InvalidMfa => write!(f, "invalid_mfa_response"),
        }
    }
}

/// Errors that can occur during Garmin Connect client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The remote service rejected the credentials or ticket.
    /// Not retried automatically.
    #[error("Authentication failed ({kind}, status {status:?}): {message}")]
    AuthFailed {
        kind: AuthFailureKind,
        status: Option<u16>,
        message: String,
    },

    /// No login ticket or CSRF token could be scraped from the sign-in
    /// page. The raw body is retained for offline inspection since this
    /// usually means the page shape changed or the request was blocked.
    #[error("No login ticket found in sign-in page ({} bytes retained)", body.len())]
    TicketNotFound { body: String },

    /// The ticket exchange response was missing one of the required
    /// token parameters.
    #[error("Token exchange response missing field `{0}`")]
    MissingTokenField(&'static str),

    /// No valid session exists. Callers should log in rather than retry.
    #[error("Not authenticated, please log in")]
    NotAuthenticated,

    /// HTTP request error (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success API response passed through by the transport.
    #[error("API error ({status}) at {url}: {message}")]
    ApiError {
        status: u16,
        url: String,
        message: String,
    },

    /// Retries exhausted for a transient failure; carries the last error.
    #[error("Maximum retries exceeded ({0} attempts): {1}")]
    MaxRetriesExceeded(usize, Box<ClientError>),

    /// Token storage I/O failure. Always surfaced: a lost session must
    /// not masquerade as "never logged in".
    #[error("Token storage failure at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid response format from the remote service.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Invalid URL or domain.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Check whether an HTTP status code represents a transient failure
    /// the transport should retry with backoff.
    ///
    /// Retryable: 429 (rate limiting) and all 5xx server errors.
    /// Everything in the 4xx range other than 429 fails immediately;
    /// protocol-shape and authentication errors are never retried.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    /// Check if this error indicates an authentication failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthFailed { .. } | Self::NotAuthenticated)
    }

    /// Check if this error is a transient transport failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::ApiError { status, .. } => Self::is_retryable_status(*status),
            _ => false,
        }
    }
}
