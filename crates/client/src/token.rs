//! Bearer token value object and expiry semantics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cached identity of the signed-in user, resolved from the social
/// profile endpoint after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Numeric profile identifier.
    pub id: u64,
    /// Account username (usually an email address).
    pub user_name: String,
    /// Public display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A completed authentication session.
///
/// Immutable once issued: refresh replaces the whole value, never mutates
/// fields in place. Created only by the authenticator's login and refresh
/// operations and persisted by the storage backend immediately on creation.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
    /// Bearer access credential attached to every API request.
    pub access_token: String,
    /// Longer-lived credential used to obtain a new access token.
    pub refresh_token: String,
    /// Absolute expiry instant, serialized as epoch seconds. Always an
    /// absolute timestamp, never a duration, to avoid clock-drift
    /// ambiguity between issuance and use.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    /// Owning domain this session was issued for.
    pub domain: String,
    /// Optional cached identity of the signed-in user.
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl Token {
    /// Check whether the token is expired at the given instant.
    ///
    /// A token whose expiry is exactly `at` is treated as expired, not
    /// valid.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }

    /// Check whether the token is expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check whether the token is expired or will expire within the given
    /// buffer, used to renew proactively before the boundary.
    pub fn expires_within(&self, buffer: std::time::Duration) -> bool {
        let buffer = Duration::from_std(buffer).unwrap_or_else(|_| Duration::zero());
        Utc::now() + buffer >= self.expires_at
    }

    /// Attach a resolved user profile, returning the updated token.
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

// Tokens are credentials; keep them out of Debug output.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("domain", &self.domain)
            .field("profile", &self.profile)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_at(expires_at: DateTime<Utc>) -> Token {
        Token {
            access_token: "access-secret".to_string(),
            refresh_token: "refresh-secret".to_string(),
            expires_at,
            domain: "garmin.com".to_string(),
            profile: None,
        }
    }

    #[test]
    fn test_expiry_boundary_exactly_now_is_expired() {
        let now = Utc::now();
        let token = token_expiring_at(now);
        assert!(token.is_expired_at(now));
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let now = Utc::now();
        let token = token_expiring_at(now + Duration::hours(1));
        assert!(!token.is_expired_at(now));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let now = Utc::now();
        let token = token_expiring_at(now - Duration::seconds(1));
        assert!(token.is_expired_at(now));
    }

    #[test]
    fn test_expires_within_buffer() {
        let token = token_expiring_at(Utc::now() + Duration::seconds(30));
        assert!(token.expires_within(std::time::Duration::from_secs(60)));
        assert!(!token.expires_within(std::time::Duration::from_secs(0)));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let token = token_expiring_at(Utc::now());
        let debug_output = format!("{token:?}");
        assert!(!debug_output.contains("access-secret"));
        assert!(!debug_output.contains("refresh-secret"));
        assert!(debug_output.contains("garmin.com"));
    }

    #[test]
    fn test_serde_round_trip_epoch_seconds() {
        let expires_at = DateTime::from_timestamp(9_999_999_999, 0).unwrap();
        let token = token_expiring_at(expires_at);

        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains("9999999999"));

        let parsed: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.expires_at, expires_at);
        assert_eq!(parsed.access_token, "access-secret");
        assert!(parsed.profile.is_none());
    }

    #[test]
    fn test_profile_deserializes_from_camel_case() {
        let json = r#"{"id":42,"userName":"runner@example.com","displayName":"Runner"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, 42);
        assert_eq!(profile.user_name, "runner@example.com");
        assert_eq!(profile.display_name.as_deref(), Some("Runner"));
    }
}
