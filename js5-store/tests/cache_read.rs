//! End-to-end reads over synthesised cache directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use js5_codec::{container, ArchivePayload, CompressionType};
use js5_crypto::djb2::djb2;
use js5_crypto::whirlpool::whirlpool;
use js5_crypto::XteaKeyService;
use js5_store::reference::{ReferenceTable, FLAG_IDENTIFIERS, FLAG_SIZES};
use js5_store::store::{SectorHeader, SECTOR_SIZE};
use js5_store::{CacheStore, FileStore, StoreError};

/// Append `data` to the data file as a chain of sectors, returning the
/// archive's (size, start sector).
fn append_archive(dat2: &mut Vec<u8>, index_id: u8, archive_id: u32, data: &[u8]) -> (u32, u32) {
    let start = (dat2.len() / SECTOR_SIZE) as u32;
    let header_len = SectorHeader::header_len(archive_id);
    let data_len = SectorHeader::data_len(archive_id);

    let chunks: Vec<&[u8]> = data.chunks(data_len).collect();
    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let sector_number = (dat2.len() / SECTOR_SIZE) as u32;
        let next = if chunk_index + 1 == chunks.len() {
            0
        } else {
            sector_number + 1
        };

        let header = SectorHeader {
            archive_id,
            chunk: chunk_index as u16,
            next,
            index_id,
        };
        let mut sector = [0u8; SECTOR_SIZE];
        header.encode(&mut sector);
        sector[header_len..header_len + chunk.len()].copy_from_slice(chunk);
        dat2.extend_from_slice(&sector);
    }
    (data.len() as u32, start)
}

/// Write the 6-byte record for `archive_id` into an index file image.
fn put_index_record(index: &mut Vec<u8>, archive_id: u32, size: u32, sector: u32) {
    let off = archive_id as usize * 6;
    if index.len() < off + 6 {
        index.resize(off + 6, 0);
    }
    index[off..off + 3].copy_from_slice(&size.to_be_bytes()[1..]);
    index[off + 3..off + 6].copy_from_slice(&sector.to_be_bytes()[1..]);
}

/// Write a cache directory from in-memory file images.
fn write_cache(dir: &Path, dat2: &[u8], indexes: &BTreeMap<u8, Vec<u8>>) {
    fs::write(dir.join("main_file_cache.dat2"), dat2).unwrap();
    for (id, image) in indexes {
        fs::write(dir.join(format!("main_file_cache.idx{id}")), image).unwrap();
    }
    // The meta index is mandatory even when empty.
    if !indexes.contains_key(&255) {
        fs::write(dir.join("main_file_cache.idx255"), b"").unwrap();
    }
}

#[test]
fn single_sector_read() {
    let dir = TempDir::new().unwrap();

    // One normal sector at sector number 0, holding three payload bytes.
    let mut dat2 = Vec::new();
    let (size, start) = append_archive(&mut dat2, 2, 7, &[0xAA, 0xBB, 0xCC]);
    assert_eq!((size, start), (3, 0));
    assert_eq!(dat2.len(), SECTOR_SIZE);

    let mut indexes = BTreeMap::new();
    indexes.insert(0, Vec::new());
    indexes.insert(1, Vec::new());
    let mut idx2 = Vec::new();
    put_index_record(&mut idx2, 7, size, start);
    indexes.insert(2, idx2);
    write_cache(dir.path(), &dat2, &indexes);

    let mut store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.index_file_count(), 3);
    assert!(store.has_data());
    assert_eq!(store.index_entry_count(2).unwrap(), 8);
    assert_eq!(store.read_archive(2, 7).unwrap(), [0xAA, 0xBB, 0xCC]);
}

#[test]
fn multi_sector_chain() {
    let dir = TempDir::new().unwrap();

    let data: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
    let mut dat2 = Vec::new();
    let (size, start) = append_archive(&mut dat2, 0, 42, &data);
    assert_eq!(dat2.len(), 2 * SECTOR_SIZE);

    let mut idx0 = Vec::new();
    put_index_record(&mut idx0, 42, size, start);
    let mut indexes = BTreeMap::new();
    indexes.insert(0, idx0);
    write_cache(dir.path(), &dat2, &indexes);

    let mut store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.read_archive(0, 42).unwrap(), data);
}

#[test]
fn extended_archive_layout() {
    let dir = TempDir::new().unwrap();

    let data = vec![0xE7u8; 600];
    let mut dat2 = Vec::new();
    let (size, start) = append_archive(&mut dat2, 0, 0x10001, &data);
    // 600 bytes only fit one 510-byte extended sector plus a second.
    assert_eq!(dat2.len(), 2 * SECTOR_SIZE);

    let mut idx0 = Vec::new();
    put_index_record(&mut idx0, 0x10001, size, start);
    // A normal-layout record over the same sectors misreads the extended
    // headers and must fail validation.
    put_index_record(&mut idx0, 7, size, start);
    let mut indexes = BTreeMap::new();
    indexes.insert(0, idx0);
    write_cache(dir.path(), &dat2, &indexes);

    let mut store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.read_archive(0, 0x10001).unwrap(), data);
    assert!(matches!(
        store.read_archive(0, 7),
        Err(StoreError::SectorMismatch { .. })
    ));
}

#[test]
fn broken_chain_and_header_mismatch() {
    let dir = TempDir::new().unwrap();

    let data = vec![1u8; 700];
    let mut dat2 = Vec::new();
    let (size, start) = append_archive(&mut dat2, 0, 5, &data);

    // Cut the chain: claim more bytes than the single-sector archive has.
    let mut idx0 = Vec::new();
    put_index_record(&mut idx0, 5, size, start);

    // A record pointing at the right sectors under the wrong archive id.
    put_index_record(&mut idx0, 6, size, start);

    // A record whose chain ends early.
    let (_, lone_start) = append_archive(&mut dat2, 0, 9, &[0u8; 100]);
    put_index_record(&mut idx0, 9, 2000, lone_start);

    let mut indexes = BTreeMap::new();
    indexes.insert(0, idx0);
    write_cache(dir.path(), &dat2, &indexes);

    let mut store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.read_archive(0, 5).unwrap(), data);
    assert!(matches!(
        store.read_archive(0, 6),
        Err(StoreError::SectorMismatch { field: "archive id", .. })
    ));
    assert!(matches!(
        store.read_archive(0, 9),
        Err(StoreError::BrokenChain { archive: 9, .. })
    ));
    assert!(matches!(
        store.read_archive(0, 1000),
        Err(StoreError::ArchiveNotFound { .. })
    ));
}

#[test]
fn missing_files_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        FileStore::open(dir.path()),
        Err(StoreError::DataFileNotFound(_))
    ));

    fs::write(dir.path().join("main_file_cache.dat2"), b"").unwrap();
    assert!(matches!(
        FileStore::open(dir.path()),
        Err(StoreError::NoIndexFiles)
    ));

    fs::write(dir.path().join("main_file_cache.idx0"), b"").unwrap();
    assert!(matches!(
        FileStore::open(dir.path()),
        Err(StoreError::MetaIndexNotFound(_))
    ));

    fs::write(dir.path().join("main_file_cache.idx255"), b"").unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    assert!(!store.has_data());
}

/// Build a complete cache: one data-plane index holding a two-member
/// container archive, described by a reference table in the meta index.
fn build_full_cache(dir: &Path) -> Vec<u8> {
    let members = vec![b"alpha".to_vec(), b"beta".to_vec()];
    let payload = ArchivePayload {
        compression: CompressionType::Gzip,
        data: container::encode(&members).unwrap(),
        version: 42,
    };
    let archive_bytes = payload.encode(&js5_crypto::NULL_KEY).unwrap();

    let mut table = ReferenceTable::new(6, 3, FLAG_IDENTIFIERS | FLAG_SIZES);
    {
        let entry = table.insert_entry(1);
        entry.identifier = djb2("map_archive");
        entry.version = 7;
        entry.compressed = archive_bytes.len() as i32;
        entry.uncompressed = 11;
        entry.children.insert(0, js5_store::ChildEntry::new(0));
        entry.children.insert(1, js5_store::ChildEntry::new(1));
    }
    table.build_identifiers();

    let table_payload = ArchivePayload {
        compression: CompressionType::None,
        data: table.encode().unwrap(),
        version: -1,
    };
    let table_bytes = table_payload.encode(&js5_crypto::NULL_KEY).unwrap();

    let mut dat2 = Vec::new();
    let mut idx0 = Vec::new();
    let mut idx255 = Vec::new();

    let (size, start) = append_archive(&mut dat2, 0, 1, &archive_bytes);
    put_index_record(&mut idx0, 1, size, start);

    let (size, start) = append_archive(&mut dat2, 255, 0, &table_bytes);
    put_index_record(&mut idx255, 0, size, start);

    let mut indexes = BTreeMap::new();
    indexes.insert(0, idx0);
    indexes.insert(255, idx255);
    write_cache(dir, &dat2, &indexes);

    table_bytes
}

#[test]
fn cache_store_end_to_end() {
    let dir = TempDir::new().unwrap();
    let table_bytes = build_full_cache(dir.path());

    let mut keys = XteaKeyService::new();
    keys.add_key(12850, [1, 2, 3, 4]);
    let mut cache = CacheStore::open(dir.path(), keys).unwrap();

    assert_eq!(cache.xtea_key(12850), Some([1, 2, 3, 4]));
    assert_eq!(cache.xtea_key(1), None);

    let table = cache.reference_table(0).unwrap();
    assert_eq!(table.capacity(), 2);
    assert_eq!(table.entry(1).unwrap().capacity(), 2);

    let payload = cache.read(0, 1, None).unwrap();
    assert_eq!(payload.version, 42);
    assert_eq!(payload.compression, CompressionType::Gzip);

    assert_eq!(cache.read_member(0, 1, 0, None).unwrap(), b"alpha");
    assert_eq!(cache.read_member(0, 1, 1, None).unwrap(), b"beta");
    assert!(matches!(
        cache.read_member(0, 1, 2, None),
        Err(StoreError::MemberNotFound { member: 2, .. })
    ));
    assert!(matches!(
        cache.read_member(0, 3, 0, None),
        Err(StoreError::ArchiveNotFound { .. })
    ));

    assert!(matches!(
        cache.read(255, 0, None),
        Err(StoreError::MetaIndexDenied)
    ));

    assert_eq!(cache.file_id_by_name(0, "map_archive").unwrap(), 1);
    assert_eq!(cache.file_id_by_name(0, "no_such_name").unwrap(), -1);
    // Memoised answers stay stable.
    assert_eq!(cache.file_id_by_name(0, "map_archive").unwrap(), 1);

    let checksums = cache.create_checksum_table().unwrap();
    assert_eq!(checksums.entries().len(), 1);
    let entry = &checksums.entries()[0];
    assert_eq!(entry.crc, crc32fast::hash(&table_bytes) as i32);
    assert_eq!(entry.version, 3);
    assert_eq!(entry.file_count, 2);
    assert_eq!(entry.size, 11);
    assert_eq!(entry.whirlpool, whirlpool(&table_bytes));
}

#[test]
fn enciphered_archive_roundtrip() {
    let dir = TempDir::new().unwrap();
    build_full_cache(dir.path());

    // Splice an enciphered archive in alongside the container.
    let key = [11, 22, 33, 44];
    let payload = ArchivePayload {
        compression: CompressionType::Gzip,
        data: b"locked region data".to_vec(),
        version: 9,
    };
    let bytes = payload.encode_forced(&key).unwrap();

    let mut dat2 = fs::read(dir.path().join("main_file_cache.dat2")).unwrap();
    let mut idx0 = fs::read(dir.path().join("main_file_cache.idx0")).unwrap();
    let (size, start) = append_archive(&mut dat2, 0, 2, &bytes);
    put_index_record(&mut idx0, 2, size, start);
    fs::write(dir.path().join("main_file_cache.dat2"), &dat2).unwrap();
    fs::write(dir.path().join("main_file_cache.idx0"), &idx0).unwrap();

    let mut keys = XteaKeyService::new();
    keys.add_key(2, key);
    let mut cache = CacheStore::open(dir.path(), keys).unwrap();

    let region_key = cache.xtea_key(2);
    let payload = cache.read(0, 2, region_key).unwrap();
    assert_eq!(payload.data, b"locked region data");
    assert_eq!(payload.version, 9);

    // Without the key the body stays ciphered and fails to inflate.
    assert!(cache.read(0, 2, None).is_err());
}
