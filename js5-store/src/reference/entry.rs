//! Reference table entries and their child entries.

use std::collections::BTreeMap;

use super::identifiers::IdentifierTable;

/// Metadata for one member file of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEntry {
    /// Zero-based insertion order within the parent entry.
    pub slot: usize,
    /// djb2 identifier of the member name, -1 when unnamed.
    pub identifier: i32,
}

impl ChildEntry {
    pub fn new(slot: usize) -> ChildEntry {
        ChildEntry {
            slot,
            identifier: -1,
        }
    }
}

/// Metadata for one archive of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Zero-based insertion order within the table.
    pub slot: usize,
    /// djb2 identifier of the archive name, -1 when unnamed.
    pub identifier: i32,
    /// CRC-32 of the archive's still-compressed bytes.
    pub crc: i32,
    /// Checksum of the uncompressed data.
    pub hash: i32,
    /// Whirlpool digest of the archive.
    pub whirlpool: [u8; 64],
    /// Compressed size in bytes.
    pub compressed: i32,
    /// Uncompressed size in bytes.
    pub uncompressed: i32,
    /// Archive version.
    pub version: i32,
    /// Member files keyed by child id.
    pub children: BTreeMap<u32, ChildEntry>,
}

impl Entry {
    pub fn new(slot: usize) -> Entry {
        Entry {
            slot,
            identifier: -1,
            crc: 0,
            hash: 0,
            whirlpool: [0; 64],
            compressed: 0,
            uncompressed: 0,
            version: 0,
            children: BTreeMap::new(),
        }
    }

    /// One past the highest child id, or 0 when there are no children.
    pub fn capacity(&self) -> u32 {
        self.children.keys().next_back().map_or(0, |&id| id + 1)
    }

    /// The child entry with the given id.
    pub fn child(&self, child_id: u32) -> Option<&ChildEntry> {
        self.children.get(&child_id)
    }

    /// Build the identifier lookup table over this entry's children.
    pub fn child_identifier_table(&self) -> IdentifierTable {
        let mut dense = vec![0i32; self.capacity() as usize];
        for (&id, child) in &self.children {
            dense[id as usize] = child.identifier;
        }
        IdentifierTable::new(&dense)
    }
}
