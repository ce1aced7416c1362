//! Region-to-key management for XTEA-enciphered archives.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::CryptoError;
use crate::xtea::XteaKey;

/// Service mapping region ids to XTEA keys.
///
/// Defaults to empty, in which case every archive is read with the null
/// key. Keys are scoped to one service instance; nothing is shared across
/// caches.
#[derive(Debug, Default, Clone)]
pub struct XteaKeyService {
    keys: HashMap<u32, XteaKey>,
}

#[derive(Deserialize)]
struct KeyFileEntry {
    region: u32,
    key: XteaKey,
}

impl XteaKeyService {
    /// Create an empty key service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the key for a region.
    pub fn get_key(&self, region: u32) -> Option<XteaKey> {
        self.keys.get(&region).copied()
    }

    /// Add a key for a region.
    pub fn add_key(&mut self, region: u32, key: XteaKey) {
        self.keys.insert(region, key);
    }

    /// Number of keys in the service.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Load keys from a JSON key file.
    ///
    /// The file is an array of `{ "region": <id>, "key": [w0, w1, w2, w3] }`
    /// objects. Malformed entries are skipped with a warning.
    pub fn load_key_file(&mut self, path: &Path) -> Result<usize, CryptoError> {
        let content = fs::read_to_string(path)?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let mut loaded = 0;
        for (i, value) in entries.into_iter().enumerate() {
            match serde_json::from_value::<KeyFileEntry>(value) {
                Ok(entry) => {
                    self.add_key(entry.region, entry.key);
                    loaded += 1;
                }
                Err(e) => warn!("skipping malformed key entry {i}: {e}"),
            }
        }

        info!("loaded {loaded} XTEA keys from {}", path.display());
        Ok(loaded)
    }
}
