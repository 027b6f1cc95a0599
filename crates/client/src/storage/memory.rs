//! In-memory token storage for short-lived or test usage.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::token::Token;

use super::TokenStorage;

/// Memory-backed single-slot token holder.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    slot: RwLock<Option<Token>>,
}

impl MemoryTokenStorage {
    /// Create an empty storage slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage slot seeded with a token.
    pub fn with_token(token: Token) -> Self {
        Self {
            slot: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn get(&self) -> Result<Option<Token>> {
        Ok(self.slot.read().await.clone())
    }

    async fn store(&self, token: &Token) -> Result<()> {
        *self.slot.write().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_token() -> Token {
        Token {
            access_token: "AT-1".to_string(),
            refresh_token: "RT-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            domain: "garmin.com".to_string(),
            profile: None,
        }
    }

    #[tokio::test]
    async fn test_store_get_clear() {
        let storage = MemoryTokenStorage::new();
        assert!(storage.get().await.unwrap().is_none());

        storage.store(&sample_token()).await.unwrap();
        let token = storage.get().await.unwrap().unwrap();
        assert_eq!(token.access_token, "AT-1");

        storage.clear().await.unwrap();
        assert!(storage.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_replaces_wholesale() {
        let storage = MemoryTokenStorage::with_token(sample_token());

        let mut replacement = sample_token();
        replacement.access_token = "AT-2".to_string();
        replacement.refresh_token = "RT-2".to_string();
        storage.store(&replacement).await.unwrap();

        let token = storage.get().await.unwrap().unwrap();
        assert_eq!(token.access_token, "AT-2");
        assert_eq!(token.refresh_token, "RT-2");
    }
}
