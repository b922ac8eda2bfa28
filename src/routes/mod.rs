//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/nonce", post(auth::request_nonce))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
}
