//! Cipher and digest primitives for JS5 sector caches.
//!
//! This crate provides:
//! - XTEA block ciphering over archive payload ranges
//! - The modified djb2 hash used for name-based lookups
//! - RSA wrapping for checksum-table digest trailers
//! - Whirlpool digests
//! - XTEA key management with JSON key-file loading

pub mod djb2;
pub mod error;
pub mod key_service;
pub mod rsa;
pub mod whirlpool;
pub mod xtea;

pub use error::CryptoError;
pub use key_service::XteaKeyService;
pub use xtea::{XteaKey, NULL_KEY};

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
