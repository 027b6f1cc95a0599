//! Common test utilities for integration tests.
//!
//! This module provides shared helper functions and re-exports commonly
//! used types for testing the Garmin Connect client. All integration
//! tests should use these utilities to ensure consistency.
//!
//! # Invariants
//! - Fixtures are loaded from the `fixtures/` directory relative to the
//!   crate root.
//!
//! # What this does NOT handle
//! - Mock server setup (use wiremock directly in tests).
//! - Test-specific assertions or test logic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use url::Url;

use garmin_client::{GarminClient, Token, TokenStorage};
use garmin_config::Endpoints;

// Re-export commonly used types for test convenience.
// These are used via `use common::*;` in test files.
#[allow(unused_imports)]
pub use wiremock::matchers::{body_string_contains, header, method, path, query_param};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

/// Load a fixture file from `tests/fixtures/` as a string.
#[allow(dead_code)]
pub fn load_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to load fixture {}: {e}", path.display()))
}

/// Endpoint set pointing every host at the given mock server.
#[allow(dead_code)]
pub fn mock_endpoints(server: &MockServer) -> Endpoints {
    let base = Url::parse(&server.uri()).unwrap();
    Endpoints::with_bases(base.clone(), base)
}

/// Build a client against a mock server with the given storage backend
/// and a short backoff base so retry tests stay fast.
#[allow(dead_code)]
pub fn mock_client(server: &MockServer, storage: Arc<dyn TokenStorage>) -> GarminClient {
    GarminClient::builder()
        .domain("garmin.com")
        .endpoints(mock_endpoints(server))
        .storage(storage)
        .backoff_base(Duration::from_millis(50))
        .build()
        .unwrap()
}

/// A token expiring the given number of seconds from now (negative for
/// already expired).
#[allow(dead_code)]
pub fn token_expiring_in(secs: i64) -> Token {
    Token {
        access_token: "AT-current".to_string(),
        refresh_token: "RT-current".to_string(),
        expires_at: Utc::now() + chrono::Duration::seconds(secs),
        domain: "garmin.com".to_string(),
        profile: None,
    }
}
