//! Garmin Connect API client.
//!
//! This crate provides authenticated access to the Garmin Connect web
//! service, which uses a legacy browser-oriented SSO flow rather than a
//! conventional token endpoint. It drives the hybrid two-stage sign-in
//! protocol (credential exchange, service ticket, bearer token) including
//! the embedded MFA sub-flow, and wraps every outbound request with
//! bearer injection, coordinated token refresh, and retry with
//! exponential backoff.

pub mod client;
pub mod error;
pub mod sso;
pub mod storage;
pub mod token;
pub mod transport;

pub use client::{GarminClient, GarminClientBuilder};
pub use error::{AuthFailureKind, ClientError, Result};
pub use sso::{Authenticator, LoginOutcome, LoginTicket, MfaChallenge};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use token::{Token, UserProfile};
pub use transport::AuthenticatedTransport;
