//! Error types for js5-crypto operations.

use thiserror::Error;

/// Errors that can occur during crypto and key-management operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// An XTEA key word is zero, so the lenient cipher path would silently
    /// skip encryption.
    #[error("weak XTEA key: word {0} is zero")]
    WeakKey(usize),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key file is not valid JSON.
    #[error("key file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
