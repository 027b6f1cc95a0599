//! SSO and API endpoint construction.
//!
//! Responsibilities:
//! - Build the sign-in, ticket-exchange, token, and profile URLs from an
//!   owning domain (e.g. "garmin.com").
//! - Provide the fixed query parameter set the SSO sign-in page expects.
//!
//! Does NOT handle:
//! - HTTP requests or header construction (client crate).
//! - Response parsing.
//!
//! Invariants:
//! - Base URLs are validated once at construction; per-endpoint URLs are
//!   derived infallibly from them.

use url::Url;

use crate::constants::SSO_CLIENT_ID;

/// Resolved endpoint set for one deployment of the service.
///
/// Production callers build this from a domain; tests substitute mock
/// server bases via [`Endpoints::with_bases`].
#[derive(Debug, Clone)]
pub struct Endpoints {
    sso_base: Url,
    api_base: Url,
}

impl Endpoints {
    /// Build the endpoint set for an owning domain.
    ///
    /// The SSO host is `sso.<domain>` and the API host is `connect.<domain>`.
    pub fn for_domain(domain: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            sso_base: Url::parse(&format!("https://sso.{domain}"))?,
            api_base: Url::parse(&format!("https://connect.{domain}"))?,
        })
    }

    /// Build an endpoint set from explicit base URLs (used by tests to
    /// point the flow at a mock server).
    pub fn with_bases(sso_base: Url, api_base: Url) -> Self {
        Self { sso_base, api_base }
    }

    fn at(base: &Url, path: &str) -> Url {
        let mut url = base.clone();
        url.set_path(path);
        url
    }

    /// The SSO sign-in page. Both the initial GET and the credential/MFA
    /// POSTs go here.
    pub fn signin(&self) -> Url {
        Self::at(&self.sso_base, "/sso/signin")
    }

    /// The embedded SSO widget URL, used as the service/callback target in
    /// the sign-in query parameters.
    pub fn embed(&self) -> Url {
        Self::at(&self.sso_base, "/sso/embed")
    }

    /// The callback URL where a service ticket is exchanged for tokens.
    pub fn exchange(&self) -> Url {
        Self::at(&self.api_base, "/modern/")
    }

    /// The OAuth2 token endpoint used for refresh-token grants.
    pub fn token(&self) -> Url {
        Self::at(&self.api_base, "/services/auth/token")
    }

    /// The social profile endpoint, used to resolve the signed-in identity.
    pub fn profile(&self) -> Url {
        Self::at(&self.api_base, "/userprofile-service/socialProfile")
    }

    /// The fixed query parameter set identifying the requesting client
    /// application and callback target on the sign-in page.
    pub fn signin_params(&self) -> Vec<(&'static str, String)> {
        let embed = self.embed().to_string();
        vec![
            ("id", SSO_CLIENT_ID.to_string()),
            ("embedWidget", "true".to_string()),
            ("gauthHost", embed.clone()),
            ("service", embed.clone()),
            ("source", embed.clone()),
            ("redirectAfterAccountLoginUrl", embed.clone()),
            ("redirectAfterAccountCreationUrl", embed),
        ]
    }
}
