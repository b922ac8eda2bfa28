//! Configuration management
//!
//! Loads and validates configuration from environment variables, with
//! defaults suitable for local development.

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL as a duration string ("15m", "1h", "30d")
    pub access_token_ttl: String,

    /// Refresh token TTL in days (default: 30)
    pub refresh_token_ttl_days: i64,

    /// Auth nonce TTL in seconds (default: 300 = 5 minutes)
    pub nonce_ttl_seconds: i64,

    /// Domain expected inside structured sign-in messages
    pub sign_in_domain: String,

    /// Statement expected inside structured sign-in messages
    pub sign_in_statement: String,

    /// Whether legacy (free-text) sign-in messages are accepted
    pub allow_legacy_messages: bool,

    /// Network name recorded on provisioned custodial wallets
    pub custodial_network: String,

    /// Hex-encoded 32-byte key encrypting custodial private keys
    pub custodial_key_hex: String,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// CORS allowed origins (comma separated)
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "development-secret-change-in-production".to_string());

        let access_token_ttl =
            env::var("JWT_ACCESS_TOKEN_TTL").unwrap_or_else(|_| "15m".to_string());

        let refresh_token_ttl_days = env::var("JWT_REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<i64>()
            .unwrap_or(30);

        let nonce_ttl_seconds = env::var("AUTH_NONCE_TTL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<i64>()
            .unwrap_or(300);

        let sign_in_domain =
            env::var("AUTH_SIGN_IN_DOMAIN").unwrap_or_else(|_| "relay-agent.io".to_string());

        let sign_in_statement = env::var("AUTH_SIGN_IN_STATEMENT")
            .unwrap_or_else(|_| "Sign in to Relay Agent.".to_string());

        let allow_legacy_messages = env::var("AUTH_ALLOW_LEGACY_MESSAGES")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);

        let custodial_network =
            env::var("CUSTODIAL_NETWORK").unwrap_or_else(|_| "mainnet".to_string());

        // 32 bytes of hex; the default is only usable for local development
        let custodial_key_hex = env::var("CUSTODIAL_ENCRYPTION_KEY").unwrap_or_else(|_| {
            "0101010101010101010101010101010101010101010101010101010101010101".to_string()
        });
        if custodial_key_hex.len() != 64 || hex::decode(&custodial_key_hex).is_err() {
            return Err(ConfigError::InvalidValue(
                "CUSTODIAL_ENCRYPTION_KEY must be 32 bytes of hex".to_string(),
            ));
        }

        let rate_limit_rps = env::var("RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .unwrap_or(100);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        Ok(Config {
            port,
            log_level,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl_days,
            nonce_ttl_seconds,
            sign_in_domain,
            sign_in_statement,
            allow_legacy_messages,
            custodial_network,
            custodial_key_hex,
            rate_limit_rps,
            cors_allowed_origins,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            log_level: "info".to_string(),
            jwt_secret: "development-secret-change-in-production".to_string(),
            access_token_ttl: "15m".to_string(),
            refresh_token_ttl_days: 30,
            nonce_ttl_seconds: 300,
            sign_in_domain: "relay-agent.io".to_string(),
            sign_in_statement: "Sign in to Relay Agent.".to_string(),
            allow_legacy_messages: true,
            custodial_network: "mainnet".to_string(),
            custodial_key_hex:
                "0101010101010101010101010101010101010101010101010101010101010101".to_string(),
            rate_limit_rps: 100,
            cors_allowed_origins: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_key_is_valid_hex() {
        let config = Config::default();
        let key = hex::decode(&config.custodial_key_hex).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("JWT_SECRET".to_string());
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = ConfigError::InvalidPort("abc".to_string());
        assert!(err.to_string().contains("abc"));
    }
}
