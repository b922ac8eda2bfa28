//! Authentication orchestrator
//!
//! Composes the nonce store, message verifier, wallet provisioner, and
//! token service into the end-to-end login, refresh, and logout flows.
//! This is the only component that talks to the user store.

use std::sync::Arc;

use super::message::{self, MessagePolicy, SignInPayload};
use super::nonce::{IssuedNonce, NonceStore};
use super::tokens::{TokenIdentity, TokenPair, TokenService};
use super::wallet::{KeyEncryptor, WalletProvisioner};
use super::{jwt, AuthError};
use crate::config::Config;
use crate::models::User;
use crate::store::{KeyValueStore, UserStore};

/// Result of a successful login
#[derive(Debug)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: User,
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    nonces: NonceStore,
    tokens: TokenService,
    provisioner: WalletProvisioner,
    policy: MessagePolicy,
}

impl AuthService {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AuthError> {
        let access_ttl_seconds = jwt::parse_ttl_seconds(&config.access_token_ttl, 900);
        let refresh_ttl_seconds = config.refresh_token_ttl_days * 86400;

        let tokens = TokenService::new(
            kv.clone(),
            config.jwt_secret.clone(),
            access_ttl_seconds,
            refresh_ttl_seconds,
        );
        let nonces = NonceStore::new(kv, config.nonce_ttl_seconds);
        let provisioner = WalletProvisioner::new(
            users.clone(),
            KeyEncryptor::from_hex_key(&config.custodial_key_hex)?,
            config.custodial_network.clone(),
        );

        Ok(Self {
            users,
            nonces,
            tokens,
            provisioner,
            policy: MessagePolicy {
                domain: config.sign_in_domain.clone(),
                statement: config.sign_in_statement.clone(),
                allow_legacy: config.allow_legacy_messages,
            },
        })
    }

    pub fn jwt_secret(&self) -> &str {
        self.tokens.jwt_secret()
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.tokens.access_ttl_seconds()
    }

    /// Issue a fresh challenge nonce
    pub async fn issue_nonce(&self) -> Result<IssuedNonce, AuthError> {
        self.nonces.issue().await
    }

    /// Verify a signed payload and establish a session.
    ///
    /// The nonce is consumed only after every other step has succeeded, so
    /// a failure in user creation, provisioning, or token issuance leaves
    /// it valid for a retry. Two concurrent logins with the same nonce can
    /// therefore both pass validation before either consumes it; single
    /// strict use is enforced at the store level only by expiry.
    pub async fn login(
        &self,
        payload: &SignInPayload,
        expected_nonce: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let verified = message::verify_payload(payload, expected_nonce, &self.policy)?;

        // The verifier checked message content; the store check catches a
        // nonce that was never issued, already used, or expired in flight
        if !self.nonces.validate(&verified.nonce).await? {
            return Err(AuthError::NonceNotFoundOrExpired);
        }

        let user = self.find_or_create_user(&verified.wallet_address).await?;
        self.provisioner.provision_if_absent(&user).await?;

        let identity = TokenIdentity {
            wallet_address: user.wallet_address.clone(),
            user_id: user.id.to_string(),
        };
        let tokens = self.tokens.issue_pair(&identity).await?;

        self.nonces.consume(&verified.nonce).await?;

        tracing::info!(wallet = %user.wallet_address, "Login succeeded");
        Ok(LoginOutcome { tokens, user })
    }

    /// Mint a fresh access token for an address with a live session
    pub async fn refresh_session(&self, claimed_address: &str) -> Result<String, AuthError> {
        let access_token = self.tokens.refresh(claimed_address).await?;

        // The session outlives the user record only by mistake
        self.users
            .find_by_address(claimed_address)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(access_token)
    }

    /// Drop the persisted session for an address; idempotent
    pub async fn logout(&self, address: &str) -> Result<(), AuthError> {
        self.tokens.revoke(address).await
    }

    /// Look up a user by wallet address
    pub async fn get_user(&self, address: &str) -> Result<User, AuthError> {
        self.users
            .find_by_address(address)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn find_or_create_user(&self, address: &str) -> Result<User, AuthError> {
        if let Some(user) = self.users.find_by_address(address).await? {
            return Ok(user);
        }
        let user = self.users.create(User::new(address)).await?;
        tracing::info!(wallet = %user.wallet_address, "Created user on first login");
        Ok(user)
    }
}
