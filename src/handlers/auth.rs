//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::ApiError;
use crate::middleware::BearerIdentity;
use crate::models::{LoginRequest, LoginResponse, NonceResponse, RefreshResponse, UserResponse};
use crate::state::AppState;

/// POST /auth/nonce - Issue a challenge nonce
pub async fn request_nonce(State(state): State<AppState>) -> Result<Json<NonceResponse>, ApiError> {
    let issued = state.auth_service.issue_nonce().await?;

    Ok(Json(NonceResponse {
        nonce: issued.nonce,
        expires_at: issued.expires_at.timestamp_millis(),
    }))
}

/// POST /auth/login - Verify a signed message and establish a session
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .auth_service
        .login(&req.payload, req.nonce.as_deref())
        .await?;

    Ok(Json(LoginResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        user: outcome.user.into(),
        expires_in: state.auth_service.access_ttl_seconds(),
    }))
}

/// POST /auth/refresh - Mint a fresh access token
pub async fn refresh(
    State(state): State<AppState>,
    identity: BearerIdentity,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access_token = state
        .auth_service
        .refresh_session(&identity.wallet_address)
        .await?;

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: state.auth_service.access_ttl_seconds(),
    }))
}

/// POST /auth/logout - Drop the current session
pub async fn logout(
    State(state): State<AppState>,
    identity: BearerIdentity,
) -> Result<StatusCode, ApiError> {
    state.auth_service.logout(&identity.wallet_address).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Current authenticated user
pub async fn me(
    State(state): State<AppState>,
    identity: BearerIdentity,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .auth_service
        .get_user(&identity.wallet_address)
        .await?;

    Ok(Json(user.into()))
}
