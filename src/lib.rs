//! Wallet challenge-response authentication service
//!
//! Users prove ownership of a blockchain account by signing a server-issued
//! nonce; successful verification yields a JWT access/refresh pair and, on
//! first login, a server-custodied wallet.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
