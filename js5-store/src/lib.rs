//! Sector-based asset cache store.
//!
//! This crate reads a game client's on-disk asset cache: a data file of
//! chained 520-byte sectors addressed through per-index files, reference
//! tables describing every archive of an index, and the checksum table a
//! client uses to verify cache freshness.
//!
//! [`CacheStore`] is the entry point. It opens the files under a root
//! directory, eagerly decodes every reference table from the meta index,
//! and serves archives, container members and name lookups.

pub mod cache;
pub mod checksum;
pub mod error;
pub mod reference;
pub mod store;

pub use cache::CacheStore;
pub use checksum::{ChecksumEntry, ChecksumTable};
pub use error::{Result, StoreError};
pub use reference::{ChildEntry, Entry, IdentifierTable, ReferenceTable};
pub use store::{FileStore, IndexRecord};
