//! Error types for payload and container codecs.

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Codec error types.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown compression tag byte.
    #[error("unknown compression tag: {0:#04x}")]
    UnknownCompression(u8),

    /// Decompressed data does not match the declared length.
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Truncated data.
    #[error("truncated data: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    /// A container must hold at least one member.
    #[error("container has no members")]
    EmptyContainer,

    /// The container size footer does not fit in the data.
    #[error("container footer overruns the data: footer {footer} bytes, data {len}")]
    FooterOverrun { footer: usize, len: usize },

    /// Crypto error from js5-crypto.
    #[error("crypto error: {0}")]
    Crypto(#[from] js5_crypto::CryptoError),
}
