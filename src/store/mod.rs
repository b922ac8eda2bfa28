//! External store seams
//!
//! The service keeps no durable state of its own. Nonces and refresh
//! tokens live in a key-value store with per-key TTL; user records live
//! in a user store. Both are trait seams with bundled in-memory
//! implementations used for local runs and tests.

mod kv;
mod users;

pub use kv::{InMemoryKvStore, KeyValueStore};
pub use users::{InMemoryUserStore, UserStore};

use thiserror::Error;

/// Store-level failures, surfaced as infrastructure errors upstream
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation failed: {0}")]
    Operation(String),
}
