//! Token and ticket extraction from semi-structured SSO responses.
//!
//! Responsibilities:
//! - Scrape the login ticket (or CSRF fallback) from the sign-in page.
//! - Scrape the MFA challenge CSRF token from a precondition-failed body.
//! - Scrape the three token parameters from the ticket-exchange body.
//!
//! Does NOT handle:
//! - HTTP or flow control (see `sso::Authenticator`).
//!
//! Invariants:
//! - Extractors run in a fixed priority order; the first match wins.
//! - Extraction failure is an expected outcome, not a panic: the remote
//!   page shape can change without notice. Adding a pattern means
//!   appending a row, never editing existing ones.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ClientError, Result};

/// Single-use value scraped from the sign-in page, tagged with which
/// hidden-field variant it came from. The variant decides the form field
/// name used when submitting credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginTicket {
    /// Legacy login ticket (`lt` hidden input).
    Legacy(String),
    /// CSRF token (`_csrf` input or `csrf-token` meta tag).
    Csrf(String),
}

impl LoginTicket {
    /// Form field name this ticket is submitted under.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "lt",
            Self::Csrf(_) => "_csrf",
        }
    }

    /// The scraped ticket value.
    pub fn value(&self) -> &str {
        match self {
            Self::Legacy(v) | Self::Csrf(v) => v,
        }
    }
}

type TicketCtor = fn(String) -> LoginTicket;

/// Ordered login-ticket extractor table. The legacy `lt` field takes
/// precedence over the CSRF variants when a page carries both.
static LOGIN_TICKET_PATTERNS: LazyLock<Vec<(Regex, TicketCtor)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r#"name="lt"[^>]*\bvalue="([^"]+)""#).expect("static pattern"),
            LoginTicket::Legacy as TicketCtor,
        ),
        (
            Regex::new(r#"name="_csrf"[^>]*\bvalue="([^"]+)""#).expect("static pattern"),
            LoginTicket::Csrf as TicketCtor,
        ),
        (
            Regex::new(r#"<meta\s+name="csrf-token"\s+content="([^"]+)""#).expect("static pattern"),
            LoginTicket::Csrf as TicketCtor,
        ),
    ]
});

static CSRF_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"name="_csrf"[^>]*\bvalue="([^"]+)""#).expect("static pattern"),
        Regex::new(r#"<meta\s+name="csrf-token"\s+content="([^"]+)""#).expect("static pattern"),
    ]
});

static ACCESS_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""accessToken"\s*:\s*"([^"]+)""#).expect("static pattern"));

static REFRESH_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""refreshToken"\s*:\s*"([^"]+)""#).expect("static pattern"));

static EXPIRES_AT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""expiresAt"\s*:\s*(\d+)"#).expect("static pattern"));

/// Scrape a login ticket from the sign-in page.
pub fn extract_login_ticket(html: &str) -> Option<LoginTicket> {
    for (pattern, ctor) in LOGIN_TICKET_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(html) {
            return Some(ctor(captures[1].to_string()));
        }
    }
    None
}

/// Scrape the challenge-specific CSRF token from an MFA challenge body.
pub fn extract_mfa_csrf(html: &str) -> Option<String> {
    for pattern in CSRF_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(html) {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// The three named parameters embedded in the ticket-exchange body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParams {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Scrape the token parameters from the ticket-exchange response body.
///
/// Missing any one of the three is a hard failure naming the absent
/// field.
pub fn extract_token_params(body: &str) -> Result<TokenParams> {
    let access_token = ACCESS_TOKEN_PATTERN
        .captures(body)
        .map(|c| c[1].to_string())
        .ok_or(ClientError::MissingTokenField("accessToken"))?;

    let refresh_token = REFRESH_TOKEN_PATTERN
        .captures(body)
        .map(|c| c[1].to_string())
        .ok_or(ClientError::MissingTokenField("refreshToken"))?;

    let expires_at = EXPIRES_AT_PATTERN
        .captures(body)
        .and_then(|c| c[1].parse::<i64>().ok())
        .ok_or(ClientError::MissingTokenField("expiresAt"))?;

    Ok(TokenParams {
        access_token,
        refresh_token,
        expires_at,
    })
}
