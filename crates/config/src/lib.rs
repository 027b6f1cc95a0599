//! Configuration for the Garmin Connect client workspace.
//!
//! This crate provides the centralized constants, endpoint construction,
//! and token file path helpers shared by the client crate and its
//! consumers.

pub mod constants;
mod paths;
mod urls;

pub use paths::default_token_path;
pub use urls::Endpoints;
