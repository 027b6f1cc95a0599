//! Token persistence backends.
//!
//! Responsibilities:
//! - Define the single-slot [`TokenStorage`] contract.
//! - Provide the file-backed and in-memory implementations.
//!
//! Does NOT handle:
//! - Refresh logic (authenticator/transport responsibility).
//!
//! Invariants:
//! - At most one token is current at a time.
//! - Writers replace the slot atomically; readers never observe a
//!   half-written value.

use async_trait::async_trait;

use crate::error::Result;
use crate::token::Token;

mod file;
mod memory;

pub use file::FileTokenStorage;
pub use memory::MemoryTokenStorage;

/// Single-slot holder of the current session token.
///
/// Backends are a pure durability boundary: they never refresh or
/// validate tokens themselves.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Read the current token, or `None` when no session exists.
    async fn get(&self) -> Result<Option<Token>>;

    /// Replace the current token wholesale.
    async fn store(&self, token: &Token) -> Result<()>;

    /// Wipe the current session.
    async fn clear(&self) -> Result<()>;
}
