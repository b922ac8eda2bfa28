//! JWT token generation and validation

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::TokenIdentity;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,
}

/// Subject claim carrying both halves of the identity
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubjectClaims {
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Claims shared by access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    pub sub: SubjectClaims,
    /// Unique token id; makes every issued token distinct
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Sign a token for the given identity with the given lifetime
pub fn generate_token(
    identity: &TokenIdentity,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        wallet_address: identity.wallet_address.clone(),
        sub: SubjectClaims {
            wallet_address: identity.wallet_address.clone(),
            user_id: identity.user_id.clone(),
        },
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify a token signature and expiry, returning its claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Parse a duration string like `"15m"`, `"1h"`, or `"30d"` into seconds.
///
/// A bare number is taken as seconds. Anything unrecognized falls back to
/// the supplied default rather than producing a zero or unbounded expiry.
pub fn parse_ttl_seconds(value: &str, default_seconds: i64) -> i64 {
    let value = value.trim();

    let parsed = match value.char_indices().last() {
        Some((idx, suffix)) if suffix.is_ascii_alphabetic() => {
            let multiplier = match suffix {
                's' => Some(1),
                'm' => Some(60),
                'h' => Some(3600),
                'd' => Some(86400),
                _ => None,
            };
            multiplier.and_then(|m| {
                value[..idx]
                    .parse::<i64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(|n| n * m)
            })
        }
        Some(_) => value.parse::<i64>().ok().filter(|n| *n > 0),
        None => None,
    };

    match parsed {
        Some(seconds) => seconds,
        None => {
            tracing::warn!(
                value,
                default_seconds,
                "Unrecognized token TTL, falling back to default"
            );
            default_seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> TokenIdentity {
        TokenIdentity {
            wallet_address: "0xabc123".to_string(),
            user_id: "11111111-2222-3333-4444-555555555555".to_string(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let identity = test_identity();
        let secret = "test-secret-key";

        let token = generate_token(&identity, secret, 900).unwrap();
        let claims = verify_token(&token, secret).unwrap();

        assert_eq!(claims.wallet_address, "0xabc123");
        assert_eq!(claims.sub.wallet_address, "0xabc123");
        assert_eq!(claims.sub.user_id, identity.user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tokens_are_unique_per_issuance() {
        let identity = test_identity();
        let first = generate_token(&identity, "secret", 900).unwrap();
        let second = generate_token(&identity, "secret", 900).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = generate_token(&test_identity(), "secret1", 900).unwrap();
        assert!(verify_token(&token, "secret2").is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("not.a.token", "secret").is_err());
    }

    #[test]
    fn test_parse_ttl_suffixes() {
        assert_eq!(parse_ttl_seconds("15m", 900), 900);
        assert_eq!(parse_ttl_seconds("1h", 900), 3600);
        assert_eq!(parse_ttl_seconds("30d", 900), 2_592_000);
        assert_eq!(parse_ttl_seconds("45s", 900), 45);
        assert_eq!(parse_ttl_seconds("120", 900), 120);
    }

    #[test]
    fn test_parse_ttl_fails_closed() {
        assert_eq!(parse_ttl_seconds("15w", 900), 900);
        assert_eq!(parse_ttl_seconds("", 900), 900);
        assert_eq!(parse_ttl_seconds("abc", 900), 900);
        assert_eq!(parse_ttl_seconds("0m", 900), 900);
        assert_eq!(parse_ttl_seconds("-5m", 900), 900);
    }
}
