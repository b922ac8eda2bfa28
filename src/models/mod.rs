//! Domain models and request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::message::SignInPayload;

/// Server-custodied wallet attached to a user on first login
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WalletProfile {
    pub wallet_address: String,
    pub network: String,
    pub encrypted_private_key: String,
    pub created_at: DateTime<Utc>,
}

/// User record, keyed by normalized (lower-cased) wallet address
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub wallet_address: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub wallet: Option<WalletProfile>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh user for a wallet address seen for the first time
    pub fn new(wallet_address: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_address: wallet_address.to_lowercase(),
            name: None,
            avatar: None,
            wallet: None,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Response containing a freshly issued challenge nonce
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub nonce: String,
    /// Absolute expiry as epoch milliseconds
    pub expires_at: i64,
}

/// Request to verify a signed message and log in
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub payload: SignInPayload,
    /// Nonce the client claims to answer; cross-checked against the
    /// structured message content when present
    pub nonce: Option<String>,
}

/// User profile as exposed over the API
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            wallet_address: user.wallet_address,
            name: user.name,
            avatar: user.avatar,
        }
    }
}

/// Token pair plus user returned on successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Fresh access token returned on refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}
