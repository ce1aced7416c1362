//! On-disk file store: sector records, index records, and the chain walk.

mod file_store;
mod sector;

pub use file_store::{FileStore, IndexRecord, DATA_FILE, INDEX_FILE_PREFIX, META_INDEX};
pub use sector::{SectorHeader, SECTOR_SIZE};
