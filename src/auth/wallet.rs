//! Custodial wallet provisioning
//!
//! On first successful login a server-custodied Ed25519 keypair is
//! generated for the user. The secret key is encrypted with AES-256-GCM
//! under a server-held key before it is stored; the plaintext lives only
//! in a zeroizing buffer and is never logged.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{AeadCore, Aes256Gcm, KeyInit};
use chrono::Utc;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};
use std::sync::Arc;
use zeroize::Zeroizing;

use super::AuthError;
use crate::models::{User, WalletProfile};
use crate::store::UserStore;

/// AES-256-GCM wrapper for custodial key material
///
/// Ciphertext layout: 12-byte nonce followed by the sealed payload.
pub struct KeyEncryptor {
    cipher: Aes256Gcm,
}

impl KeyEncryptor {
    pub fn new(key: &[u8]) -> Result<Self, AuthError> {
        if key.len() != 32 {
            return Err(AuthError::ProvisioningFailure(
                "encryption key must be 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            cipher: Aes256Gcm::new(GenericArray::from_slice(key)),
        })
    }

    pub fn from_hex_key(key_hex: &str) -> Result<Self, AuthError> {
        let key = Zeroizing::new(hex::decode(key_hex).map_err(|_| {
            AuthError::ProvisioningFailure("encryption key is not valid hex".to_string())
        })?);
        Self::new(&key)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| AuthError::ProvisioningFailure("encryption failed".to_string()))?;
        Ok([nonce.as_slice(), &sealed].concat())
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>, AuthError> {
        if data.len() < 12 {
            return Err(AuthError::ProvisioningFailure(
                "ciphertext too short".to_string(),
            ));
        }
        let nonce = GenericArray::from_slice(&data[..12]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &data[12..])
            .map_err(|_| AuthError::ProvisioningFailure("decryption failed".to_string()))?;
        Ok(Zeroizing::new(plaintext))
    }
}

/// Generates and attaches a custodial wallet to a user exactly once
pub struct WalletProvisioner {
    users: Arc<dyn UserStore>,
    encryptor: KeyEncryptor,
    network: String,
}

impl WalletProvisioner {
    pub fn new(users: Arc<dyn UserStore>, encryptor: KeyEncryptor, network: String) -> Self {
        Self {
            users,
            encryptor,
            network,
        }
    }

    /// Provision a custodial wallet for the user if they have none.
    ///
    /// The write is conditional inside the user store, so a concurrent
    /// first login that loses the race turns into a no-op here.
    pub async fn provision_if_absent(&self, user: &User) -> Result<(), AuthError> {
        if user.wallet.is_some() {
            return Ok(());
        }

        let signing_key = SigningKey::generate(&mut OsRng);
        let secret = Zeroizing::new(signing_key.to_bytes());

        let encrypted = self.encryptor.encrypt(secret.as_slice())?;
        let profile = WalletProfile {
            wallet_address: derive_address(&signing_key.verifying_key()),
            network: self.network.clone(),
            encrypted_private_key: hex::encode(encrypted),
            created_at: Utc::now(),
        };

        let written = self
            .users
            .set_wallet_profile_if_absent(user.id, profile)
            .await
            .map_err(|e| AuthError::ProvisioningFailure(e.to_string()))?;

        if written {
            tracing::info!(user_id = %user.id, "Provisioned custodial wallet");
        } else {
            tracing::debug!(user_id = %user.id, "Custodial wallet already present, skipping");
        }
        Ok(())
    }
}

/// Derive the on-chain account address: SHA3-256 over the public key bytes
/// plus the single-signature scheme identifier byte.
fn derive_address(public_key: &VerifyingKey) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key.as_bytes());
    hasher.update([0u8]);
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserStore;

    const TEST_KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let encryptor = KeyEncryptor::new(&TEST_KEY).unwrap();
        let sealed = encryptor.encrypt(b"secret key material").unwrap();

        assert_ne!(&sealed[12..], b"secret key material");
        let opened = encryptor.decrypt(&sealed).unwrap();
        assert_eq!(opened.as_slice(), b"secret key material");
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let sealed = KeyEncryptor::new(&TEST_KEY)
            .unwrap()
            .encrypt(b"secret")
            .unwrap();
        let other = KeyEncryptor::new(&[9u8; 32]).unwrap();
        assert!(other.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(KeyEncryptor::new(&[0u8; 16]).is_err());
        assert!(KeyEncryptor::from_hex_key("abcd").is_err());
    }

    #[test]
    fn test_derived_address_shape() {
        let key = SigningKey::generate(&mut OsRng);
        let address = derive_address(&key.verifying_key());

        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 66);
    }

    #[tokio::test]
    async fn test_provision_happens_once() {
        let users = Arc::new(InMemoryUserStore::new());
        let provisioner = WalletProvisioner::new(
            users.clone(),
            KeyEncryptor::new(&TEST_KEY).unwrap(),
            "mainnet".to_string(),
        );

        let user = users.create(User::new("0xabc")).await.unwrap();
        provisioner.provision_if_absent(&user).await.unwrap();

        let provisioned = users.find_by_address("0xabc").await.unwrap().unwrap();
        let first = provisioned.wallet.clone().unwrap();
        assert_eq!(first.network, "mainnet");

        // Second call with the refreshed record is a no-op
        provisioner.provision_if_absent(&provisioned).await.unwrap();
        let after = users.find_by_address("0xabc").await.unwrap().unwrap();
        let second = after.wallet.unwrap();
        assert_eq!(second.wallet_address, first.wallet_address);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_provision_race_loser_is_noop() {
        let users = Arc::new(InMemoryUserStore::new());
        let provisioner = WalletProvisioner::new(
            users.clone(),
            KeyEncryptor::new(&TEST_KEY).unwrap(),
            "mainnet".to_string(),
        );

        // Both callers hold the same stale snapshot without a wallet
        let stale = users.create(User::new("0xabc")).await.unwrap();
        provisioner.provision_if_absent(&stale).await.unwrap();
        provisioner.provision_if_absent(&stale).await.unwrap();

        let stored = users.find_by_address("0xabc").await.unwrap().unwrap();
        assert!(stored.wallet.is_some());
    }
}
