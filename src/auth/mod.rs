//! Wallet-based authentication
//!
//! Challenge-response login for blockchain accounts:
//! - single-use nonce issuance and consumption
//! - signed-message verification (structured and legacy formats)
//! - JWT access/refresh token lifecycle
//! - one-time custodial wallet provisioning on first login

pub mod jwt;
pub mod message;
pub mod nonce;
pub mod service;
pub mod tokens;
pub mod wallet;

pub use nonce::{IssuedNonce, NonceStore};
pub use service::AuthService;
pub use tokens::{TokenIdentity, TokenPair, TokenService};
pub use wallet::WalletProvisioner;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication protocol and infrastructure failures
///
/// Protocol failures are caller-visible and carry no partial side effects
/// on credential state; infrastructure failures indicate an unreachable
/// backing store and are never retried internally.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Nonce not found or expired")]
    NonceNotFoundOrExpired,

    #[error("Unsupported sign-in message format")]
    UnsupportedMessageFormat,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Message content mismatch: {0}")]
    MessageContentMismatch(String),

    #[error("No refresh token found for this address")]
    RefreshTokenMissing,

    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    #[error("User not found")]
    UserNotFound,

    #[error("Wallet provisioning failed: {0}")]
    ProvisioningFailure(String),

    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Infrastructure(e.to_string())
    }
}
