//! Cache store façade wiring the file store, codecs and reference tables.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use js5_codec::{container, ArchivePayload};
use js5_crypto::djb2::djb2;
use js5_crypto::whirlpool::whirlpool;
use js5_crypto::xtea::{XteaKey, NULL_KEY};
use js5_crypto::XteaKeyService;

use crate::checksum::{ChecksumEntry, ChecksumTable};
use crate::error::{Result, StoreError};
use crate::reference::ReferenceTable;
use crate::store::{FileStore, META_INDEX};

/// High-level read access to a cache: archives, container members, name
/// lookup and the checksum table.
///
/// Opening the store decodes every reference table once; they stay
/// immutable for the store's lifetime. The store is single-threaded;
/// callers sharing one instance wrap it in their own lock.
pub struct CacheStore {
    store: FileStore,
    references: Vec<ReferenceTable>,
    keys: XteaKeyService,
    /// Per-store name lookup memo; never shared across caches.
    name_cache: HashMap<(u8, i32), i32>,
}

impl CacheStore {
    /// Open the cache under `root`, eagerly decoding the reference table
    /// of every data-plane index from the meta index.
    pub fn open(root: impl AsRef<Path>, keys: XteaKeyService) -> Result<CacheStore> {
        let mut store = FileStore::open(root)?;

        let count = store.index_file_count();
        let mut references = Vec::with_capacity(count);
        for index_id in 0..count {
            let raw = store.read_archive(META_INDEX, index_id as u32)?;
            let payload = ArchivePayload::decode(&raw, &NULL_KEY)?;
            references.push(ReferenceTable::decode(&payload.data)?);
            debug!("decoded reference table for index {index_id}");
        }

        info!("opened cache with {count} reference tables");
        Ok(CacheStore {
            store,
            references,
            keys,
            name_cache: HashMap::new(),
        })
    }

    /// The reference table describing index `idx`.
    pub fn reference_table(&self, idx: u8) -> Result<&ReferenceTable> {
        self.references
            .get(usize::from(idx))
            .ok_or(StoreError::IndexNotFound(idx))
    }

    /// The configured XTEA key for `region`, if any.
    pub fn xtea_key(&self, region: u32) -> Option<XteaKey> {
        self.keys.get_key(region)
    }

    /// Read and decode the payload of archive `(idx, aid)`.
    ///
    /// The meta index is rejected here; reference tables are decoded at
    /// open time and raw meta reads go through [`FileStore`].
    pub fn read(&mut self, idx: u8, aid: u32, keys: Option<XteaKey>) -> Result<ArchivePayload> {
        if idx == META_INDEX {
            return Err(StoreError::MetaIndexDenied);
        }
        let raw = self.store.read_archive(idx, aid)?;
        Ok(ArchivePayload::decode(&raw, &keys.unwrap_or(NULL_KEY))?)
    }

    /// Read one member out of a container archive.
    pub fn read_member(
        &mut self,
        idx: u8,
        aid: u32,
        member: u32,
        keys: Option<XteaKey>,
    ) -> Result<Vec<u8>> {
        let capacity = {
            let table = self.reference_table(idx)?;
            let entry = table.entry(aid).ok_or(StoreError::ArchiveNotFound {
                index: idx,
                archive: aid,
            })?;
            entry.capacity()
        };
        if member >= capacity {
            return Err(StoreError::MemberNotFound {
                index: idx,
                archive: aid,
                member,
            });
        }

        let payload = self.read(idx, aid, keys)?;
        let mut members = container::decode(&payload.data, capacity as usize)?;
        Ok(members.swap_remove(member as usize))
    }

    /// Resolve an archive id in index `idx` from its name, or -1 when the
    /// name is unknown. Results are memoised per store.
    pub fn file_id_by_name(&mut self, idx: u8, name: &str) -> Result<i32> {
        let hash = djb2(name);
        if let Some(&id) = self.name_cache.get(&(idx, hash)) {
            return Ok(id);
        }

        let table = self.reference_table(idx)?;
        let id = table.identifiers().map_or(-1, |t| t.lookup(hash));
        self.name_cache.insert((idx, hash), id);
        Ok(id)
    }

    /// Build the checksum table over every index file.
    ///
    /// Each entry digests the index's still-compressed reference table
    /// bytes; version, capacity and total size come from the table decoded
    /// at open time. Indexes with no stored table contribute a zero entry.
    pub fn create_checksum_table(&mut self) -> Result<ChecksumTable> {
        let count = self.store.index_file_count();
        let mut entries = Vec::with_capacity(count);

        for index_id in 0..count {
            let raw = if self.store.has_data() {
                match self.store.read_archive(META_INDEX, index_id as u32) {
                    Ok(raw) => Some(raw),
                    Err(StoreError::ArchiveNotFound { .. }) => None,
                    Err(e) => return Err(e),
                }
            } else {
                None
            };

            let entry = match raw {
                Some(raw) => {
                    let table = &self.references[index_id];
                    ChecksumEntry {
                        crc: crc32fast::hash(&raw) as i32,
                        version: table.version,
                        file_count: table.capacity() as i32,
                        size: table.total_uncompressed_size(),
                        whirlpool: whirlpool(&raw),
                    }
                }
                None => ChecksumEntry {
                    whirlpool: whirlpool(&[]),
                    ..Default::default()
                },
            };
            entries.push(entry);
        }

        Ok(ChecksumTable::new(entries))
    }
}
