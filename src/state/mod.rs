//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthError, AuthService};
use crate::config::Config;
use crate::store::{KeyValueStore, UserStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            auth_service: Arc::new(AuthService::new(config, users, kv)?),
        })
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}
