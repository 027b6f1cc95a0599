//! Centralized constants for the Garmin Connect workspace.
//!
//! This module contains default values used across crates to avoid
//! magic number duplication and improve maintainability.

// =============================================================================
// Connection & Timeout Defaults
// =============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default buffer time before token expiry to proactively refresh.
/// This prevents race conditions where a token expires during an API call.
pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 60;

/// Default maximum number of HTTP redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

// =============================================================================
// Retry & Backoff Defaults
// =============================================================================

/// Default maximum number of retries for transient request failures.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Base delay for exponential backoff in milliseconds.
/// The delay doubles on each attempt: 1s, 2s, 4s, ...
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

// =============================================================================
// SSO Defaults
// =============================================================================

/// Default owning domain for the Garmin SSO and API hosts.
pub const DEFAULT_DOMAIN: &str = "garmin.com";

/// Client application identifier sent on every SSO request.
pub const SSO_CLIENT_ID: &str = "gauth-widget";

/// Browser-like user agent. The SSO endpoints reject requests that do not
/// carry a realistic browser signature (bot detection), so this is attached
/// to every step of the login flow, not just the first.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Accept header matching what a browser sends when loading the sign-in page.
pub const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Name of the fixed client identity header attached to API requests.
pub const CLIENT_HEADER_NAME: &str = "NK";

/// Value of the fixed client identity header attached to API requests.
pub const CLIENT_HEADER_VALUE: &str = "NT";
