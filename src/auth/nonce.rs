//! Single-use challenge nonces
//!
//! Nonces live in the key-value store under `nonce:<value>` with a TTL
//! equal to the authentication window, so expiry is enforced by the store
//! itself.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::AuthError;
use crate::store::KeyValueStore;

const NONCE_KEY_PREFIX: &str = "nonce:";

/// A freshly issued challenge
#[derive(Debug, Clone)]
pub struct IssuedNonce {
    /// 64 hex characters (32 random bytes)
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NonceRecord {
    nonce: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Issues, validates, and consumes challenge nonces
pub struct NonceStore {
    kv: Arc<dyn KeyValueStore>,
    ttl_seconds: i64,
}

impl NonceStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl_seconds: i64) -> Self {
        Self { kv, ttl_seconds }
    }

    /// Generate and persist a fresh nonce
    pub async fn issue(&self) -> Result<IssuedNonce, AuthError> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);

        let created_at = Utc::now();
        let expires_at = created_at + ChronoDuration::seconds(self.ttl_seconds);

        let record = NonceRecord {
            nonce: nonce.clone(),
            created_at,
            expires_at,
        };
        let value = serde_json::to_string(&record)
            .map_err(|e| AuthError::Infrastructure(e.to_string()))?;

        self.kv
            .put(
                &format!("{NONCE_KEY_PREFIX}{nonce}"),
                value,
                Duration::from_secs(self.ttl_seconds.max(0) as u64),
            )
            .await?;

        Ok(IssuedNonce { nonce, expires_at })
    }

    /// Check that a nonce is still live; does not consume it
    pub async fn validate(&self, nonce: &str) -> Result<bool, AuthError> {
        let value = self.kv.get(&format!("{NONCE_KEY_PREFIX}{nonce}")).await?;
        Ok(value.is_some())
    }

    /// Delete a nonce; idempotent
    pub async fn consume(&self, nonce: &str) -> Result<(), AuthError> {
        self.kv.remove(&format!("{NONCE_KEY_PREFIX}{nonce}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;

    fn store(ttl_seconds: i64) -> NonceStore {
        NonceStore::new(Arc::new(InMemoryKvStore::new()), ttl_seconds)
    }

    #[tokio::test]
    async fn test_issue_produces_64_hex_chars() {
        let nonces = store(300);
        let issued = nonces.issue().await.unwrap();

        assert_eq!(issued.nonce.len(), 64);
        assert!(issued.nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(issued.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_validate_then_consume() {
        let nonces = store(300);
        let issued = nonces.issue().await.unwrap();

        assert!(nonces.validate(&issued.nonce).await.unwrap());
        nonces.consume(&issued.nonce).await.unwrap();
        assert!(!nonces.validate(&issued.nonce).await.unwrap());

        // Consuming again is not an error
        nonces.consume(&issued.nonce).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_nonce_fails_validation() {
        let nonces = store(0);
        let issued = nonces.issue().await.unwrap();

        assert!(!nonces.validate(&issued.nonce).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_nonce_fails_validation() {
        let nonces = store(300);
        assert!(!nonces.validate("doesnotexist").await.unwrap());
    }
}
