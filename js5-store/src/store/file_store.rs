//! Random-access store over one data file and its index files.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, trace};

use crate::error::{Result, StoreError};

use super::sector::{SectorHeader, SECTOR_SIZE};

/// Name of the data file.
pub const DATA_FILE: &str = "main_file_cache.dat2";

/// Common prefix of the index files; the index id is appended.
pub const INDEX_FILE_PREFIX: &str = "main_file_cache.idx";

/// Id of the meta index holding the reference tables.
pub const META_INDEX: u8 = 255;

/// Bytes per index record.
const INDEX_RECORD_SIZE: u64 = 6;

/// A six-byte index record locating an archive in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Total archive length in bytes.
    pub size: u32,
    /// First sector of the archive's chain.
    pub sector: u32,
}

/// Byte-level access to the cache files and the sector-chain walk.
///
/// Owns every file handle; dropping the store closes them.
pub struct FileStore {
    data: File,
    data_len: u64,
    indexes: Vec<File>,
    meta: File,
}

impl FileStore {
    /// Open the cache files under `root`.
    ///
    /// Requires the data file and the meta index file. Data-plane index
    /// files are scanned upwards from 0; the first gap ends the scan, and
    /// at least one must exist.
    pub fn open(root: impl AsRef<Path>) -> Result<FileStore> {
        let root = root.as_ref();

        let data_path = root.join(DATA_FILE);
        let data = match File::open(&data_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::DataFileNotFound(data_path))
            }
            Err(e) => return Err(e.into()),
        };
        let data_len = data.metadata()?.len();

        let mut indexes = Vec::new();
        for i in 0..u32::from(META_INDEX) {
            let path = root.join(format!("{INDEX_FILE_PREFIX}{i}"));
            match File::open(&path) {
                Ok(file) => indexes.push(file),
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            }
        }
        if indexes.is_empty() {
            return Err(StoreError::NoIndexFiles);
        }

        let meta_path = root.join(format!("{INDEX_FILE_PREFIX}{META_INDEX}"));
        let meta = match File::open(&meta_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::MetaIndexNotFound(meta_path))
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            "opened cache at {} with {} index files",
            root.display(),
            indexes.len()
        );
        Ok(FileStore {
            data,
            data_len,
            indexes,
            meta,
        })
    }

    /// Number of data-plane index files.
    pub fn index_file_count(&self) -> usize {
        self.indexes.len()
    }

    /// Whether the data file holds any sectors.
    pub fn has_data(&self) -> bool {
        self.data_len > 0
    }

    /// Number of records index file `idx` can address.
    pub fn index_entry_count(&mut self, idx: u8) -> Result<u64> {
        let file = self.index_file(idx)?;
        Ok(file.metadata()?.len() / INDEX_RECORD_SIZE)
    }

    /// Read the index record for archive `aid` of index `idx`.
    pub fn read_index(&mut self, idx: u8, aid: u32) -> Result<IndexRecord> {
        let offset = u64::from(aid) * INDEX_RECORD_SIZE;
        let file = self.index_file(idx)?;
        if offset >= file.metadata()?.len() {
            return Err(StoreError::ArchiveNotFound {
                index: idx,
                archive: aid,
            });
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut record = [0u8; INDEX_RECORD_SIZE as usize];
        read_fully(file, &mut record)?;

        Ok(IndexRecord {
            size: BigEndian::read_u24(&record[0..3]),
            sector: BigEndian::read_u24(&record[3..6]),
        })
    }

    /// Read the full bytes of archive `(idx, aid)` by walking its sector
    /// chain.
    ///
    /// Every sector on the chain must name this index, this archive, and
    /// its own position; the final sector contributes only the prefix the
    /// archive size calls for.
    pub fn read_archive(&mut self, idx: u8, aid: u32) -> Result<Vec<u8>> {
        let record = self.read_index(idx, aid)?;
        let size = record.size as usize;
        let header_len = SectorHeader::header_len(aid);
        let data_len = SectorHeader::data_len(aid);
        trace!(
            "reading archive {aid} of index {idx}: {size} bytes from sector {}",
            record.sector
        );

        let mut out = Vec::with_capacity(size);
        let mut sector = record.sector;
        let mut chunk = 0u16;
        let mut buf = [0u8; SECTOR_SIZE];

        while out.len() < size {
            let take = (size - out.len()).min(data_len);
            let read_len = header_len + take;

            self.data
                .seek(SeekFrom::Start(u64::from(sector) * SECTOR_SIZE as u64))?;
            read_fully(&mut self.data, &mut buf[..read_len])?;

            let header = SectorHeader::decode(&buf, aid);
            if header.archive_id != aid {
                return Err(StoreError::SectorMismatch {
                    archive: aid,
                    field: "archive id",
                    expected: aid,
                    actual: header.archive_id,
                });
            }
            if header.chunk != chunk {
                return Err(StoreError::SectorMismatch {
                    archive: aid,
                    field: "chunk",
                    expected: u32::from(chunk),
                    actual: u32::from(header.chunk),
                });
            }
            if header.index_id != idx {
                return Err(StoreError::SectorMismatch {
                    archive: aid,
                    field: "index id",
                    expected: u32::from(idx),
                    actual: u32::from(header.index_id),
                });
            }

            out.extend_from_slice(&buf[header_len..read_len]);
            chunk += 1;
            sector = header.next;
            if sector == 0 && out.len() < size {
                return Err(StoreError::BrokenChain {
                    archive: aid,
                    remaining: size - out.len(),
                });
            }
        }
        Ok(out)
    }

    fn index_file(&mut self, idx: u8) -> Result<&mut File> {
        if idx == META_INDEX {
            Ok(&mut self.meta)
        } else {
            self.indexes
                .get_mut(usize::from(idx))
                .ok_or(StoreError::IndexNotFound(idx))
        }
    }
}

/// Read exactly `buf.len()` bytes, looping over short reads. End of file
/// before the buffer is full is fatal for the record being read.
fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(StoreError::UnexpectedEof);
        }
        filled += n;
    }
    Ok(())
}
