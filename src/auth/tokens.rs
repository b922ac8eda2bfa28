//! Access/refresh token lifecycle
//!
//! Refresh tokens are persisted in the key-value store under
//! `refresh-token:<normalized address>`, one slot per address with
//! last-write-wins semantics. Access tokens are never persisted.

use std::sync::Arc;
use std::time::Duration;

use super::jwt::{self, JwtError};
use super::AuthError;
use crate::store::KeyValueStore;

const REFRESH_KEY_PREFIX: &str = "refresh-token:";

/// Identity baked into issued tokens
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    /// Normalized (lower-cased) wallet address
    pub wallet_address: String,
    pub user_id: String,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, persists, rotates, and revokes token pairs
pub struct TokenService {
    kv: Arc<dyn KeyValueStore>,
    jwt_secret: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        jwt_secret: String,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            kv,
            jwt_secret,
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Issue an access/refresh pair and persist the refresh half,
    /// overwriting any prior token for the address
    pub async fn issue_pair(&self, identity: &TokenIdentity) -> Result<TokenPair, AuthError> {
        let access_token = jwt::generate_token(identity, &self.jwt_secret, self.access_ttl_seconds)
            .map_err(encoding_failure)?;
        let refresh_token =
            jwt::generate_token(identity, &self.jwt_secret, self.refresh_ttl_seconds)
                .map_err(encoding_failure)?;

        self.kv
            .put(
                &refresh_key(&identity.wallet_address),
                refresh_token.clone(),
                Duration::from_secs(self.refresh_ttl_seconds.max(0) as u64),
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Mint a fresh access token for an address holding a valid persisted
    /// refresh token. The refresh token itself is not rotated.
    ///
    /// Any failure other than a missing token deletes the persisted value,
    /// forcing a full re-login rather than indefinite retries.
    pub async fn refresh(&self, claimed_address: &str) -> Result<String, AuthError> {
        let key = refresh_key(claimed_address);

        let stored = self
            .kv
            .get(&key)
            .await?
            .ok_or(AuthError::RefreshTokenMissing)?;

        let claims = match jwt::verify_token(&stored, &self.jwt_secret) {
            Ok(claims) => claims,
            Err(_) => {
                self.kv.remove(&key).await?;
                return Err(AuthError::RefreshTokenInvalid);
            }
        };

        if !claims
            .sub
            .wallet_address
            .eq_ignore_ascii_case(claimed_address)
        {
            self.kv.remove(&key).await?;
            return Err(AuthError::RefreshTokenInvalid);
        }

        let identity = TokenIdentity {
            wallet_address: claims.sub.wallet_address,
            user_id: claims.sub.user_id,
        };
        jwt::generate_token(&identity, &self.jwt_secret, self.access_ttl_seconds)
            .map_err(encoding_failure)
    }

    /// Delete the persisted refresh token for an address; idempotent
    pub async fn revoke(&self, address: &str) -> Result<(), AuthError> {
        self.kv.remove(&refresh_key(address)).await?;
        Ok(())
    }
}

fn refresh_key(address: &str) -> String {
    format!("{REFRESH_KEY_PREFIX}{}", address.to_lowercase())
}

fn encoding_failure(e: JwtError) -> AuthError {
    AuthError::Infrastructure(e.to_string())
}
