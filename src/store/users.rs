//! User store seam

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::StoreError;
use crate::models::{User, WalletProfile};

/// User record store, keyed by normalized (lower-cased) wallet address
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_address(&self, address: &str) -> Result<Option<User>, StoreError>;

    async fn create(&self, user: User) -> Result<User, StoreError>;

    /// Attach a custodial wallet profile to a user only if none exists.
    ///
    /// Returns `true` when the profile was written, `false` when the user
    /// already had one. The check-and-write is a single atomic operation
    /// so concurrent first logins cannot both provision.
    async fn set_wallet_profile_if_absent(
        &self,
        user_id: Uuid,
        profile: WalletProfile,
    ) -> Result<bool, StoreError>;
}

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&address.to_lowercase()).cloned())
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        users.insert(user.wallet_address.clone(), user.clone());
        Ok(user)
    }

    async fn set_wallet_profile_if_absent(
        &self,
        user_id: Uuid,
        profile: WalletProfile,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::Operation(format!("unknown user id {user_id}")))?;

        if user.wallet.is_some() {
            return Ok(false);
        }
        user.wallet = Some(profile);
        Ok(true)
    }
}
