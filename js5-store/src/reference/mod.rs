//! Reference table codec.
//!
//! One reference table per data-plane index file describes every archive in
//! that index: the sparse id set, checksums, sizes, versions, digests, the
//! member (child) sets, and the identifier lookup table behind name-based
//! access. Ids are stored delta-encoded and monotonically increasing;
//! format 7 switches the id and count fields to the variable-length
//! smart-int encoding.

mod entry;
mod identifiers;

pub use entry::{ChildEntry, Entry};
pub use identifiers::IdentifierTable;

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::trace;

use crate::error::{Result, StoreError};

/// Entries carry djb2 identifiers.
pub const FLAG_IDENTIFIERS: u8 = 0x01;
/// Entries carry whirlpool digests.
pub const FLAG_WHIRLPOOL: u8 = 0x02;
/// Entries carry compressed and uncompressed sizes.
pub const FLAG_SIZES: u8 = 0x04;
/// Entries carry uncompressed-data checksums.
pub const FLAG_HASH: u8 = 0x08;

/// Decoded metadata for every archive of one index file.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    /// Table format, 5 through 7.
    pub format: u8,
    /// Table version; 0 when the format carries none.
    pub version: i32,
    /// Attribute flag bits.
    pub flags: u8,
    entries: BTreeMap<u32, Entry>,
    identifiers: Option<IdentifierTable>,
}

impl ReferenceTable {
    /// Create an empty table.
    pub fn new(format: u8, version: i32, flags: u8) -> ReferenceTable {
        ReferenceTable {
            format,
            version,
            flags,
            entries: BTreeMap::new(),
            identifiers: None,
        }
    }

    /// Decode a table from its uncompressed bytes.
    pub fn decode(buf: &[u8]) -> Result<ReferenceTable> {
        let mut csr = Cursor::new(buf);

        let format = csr.read_u8()?;
        if !(5..=7).contains(&format) {
            return Err(StoreError::UnsupportedFormat(format));
        }
        let version = if format >= 6 {
            csr.read_i32::<BigEndian>()?
        } else {
            0
        };
        let flags = csr.read_u8()?;

        let count = read_count(&mut csr, format)?;
        let mut ids = Vec::with_capacity(count as usize);
        let mut accumulator = 0u32;
        for _ in 0..count {
            accumulator = accumulator.wrapping_add(read_count(&mut csr, format)?);
            ids.push(accumulator);
        }
        let capacity = ids.last().map_or(0, |&id| id + 1);
        trace!("reference table format {format}: {count} entries, capacity {capacity}");

        let mut table = ReferenceTable::new(format, version, flags);
        for (slot, &id) in ids.iter().enumerate() {
            table.entries.insert(id, Entry::new(slot));
        }

        if flags & FLAG_IDENTIFIERS != 0 {
            for entry in table.entries.values_mut() {
                entry.identifier = csr.read_i32::<BigEndian>()?;
            }
            table.build_identifiers();
        }
        for entry in table.entries.values_mut() {
            entry.crc = csr.read_i32::<BigEndian>()?;
        }
        if flags & FLAG_HASH != 0 {
            for entry in table.entries.values_mut() {
                entry.hash = csr.read_i32::<BigEndian>()?;
            }
        }
        if flags & FLAG_WHIRLPOOL != 0 {
            for entry in table.entries.values_mut() {
                csr.read_exact(&mut entry.whirlpool)?;
            }
        }
        if flags & FLAG_SIZES != 0 {
            for entry in table.entries.values_mut() {
                entry.compressed = csr.read_i32::<BigEndian>()?;
                entry.uncompressed = csr.read_i32::<BigEndian>()?;
            }
        }
        for entry in table.entries.values_mut() {
            entry.version = csr.read_i32::<BigEndian>()?;
        }

        let mut child_counts = Vec::with_capacity(table.entries.len());
        for _ in 0..table.entries.len() {
            child_counts.push(read_count(&mut csr, format)?);
        }
        for (entry, &child_count) in table.entries.values_mut().zip(&child_counts) {
            let mut accumulator = 0u32;
            for slot in 0..child_count {
                accumulator = accumulator.wrapping_add(read_count(&mut csr, format)?);
                entry.children.insert(accumulator, ChildEntry::new(slot as usize));
            }
        }
        if flags & FLAG_IDENTIFIERS != 0 {
            for entry in table.entries.values_mut() {
                for child in entry.children.values_mut() {
                    child.identifier = csr.read_i32::<BigEndian>()?;
                }
            }
        }

        Ok(table)
    }

    /// Encode this table to the byte-exact mirror of [`ReferenceTable::decode`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        if !(5..=7).contains(&self.format) {
            return Err(StoreError::UnsupportedFormat(self.format));
        }

        let mut buf = Vec::new();
        buf.push(self.format);
        if self.format >= 6 {
            buf.write_i32::<BigEndian>(self.version)?;
        }
        buf.push(self.flags);

        write_count(&mut buf, self.format, self.entries.len() as u32)?;
        let mut prev = 0u32;
        for &id in self.entries.keys() {
            write_count(&mut buf, self.format, id.wrapping_sub(prev))?;
            prev = id;
        }

        if self.flags & FLAG_IDENTIFIERS != 0 {
            for entry in self.entries.values() {
                buf.write_i32::<BigEndian>(entry.identifier)?;
            }
        }
        for entry in self.entries.values() {
            buf.write_i32::<BigEndian>(entry.crc)?;
        }
        if self.flags & FLAG_HASH != 0 {
            for entry in self.entries.values() {
                buf.write_i32::<BigEndian>(entry.hash)?;
            }
        }
        if self.flags & FLAG_WHIRLPOOL != 0 {
            for entry in self.entries.values() {
                buf.extend_from_slice(&entry.whirlpool);
            }
        }
        if self.flags & FLAG_SIZES != 0 {
            for entry in self.entries.values() {
                buf.write_i32::<BigEndian>(entry.compressed)?;
                buf.write_i32::<BigEndian>(entry.uncompressed)?;
            }
        }
        for entry in self.entries.values() {
            buf.write_i32::<BigEndian>(entry.version)?;
        }

        for entry in self.entries.values() {
            write_count(&mut buf, self.format, entry.children.len() as u32)?;
        }
        for entry in self.entries.values() {
            let mut prev = 0u32;
            for &child_id in entry.children.keys() {
                write_count(&mut buf, self.format, child_id.wrapping_sub(prev))?;
                prev = child_id;
            }
        }
        if self.flags & FLAG_IDENTIFIERS != 0 {
            for entry in self.entries.values() {
                for child in entry.children.values() {
                    buf.write_i32::<BigEndian>(child.identifier)?;
                }
            }
        }

        Ok(buf)
    }

    /// The entry for archive `id`.
    pub fn entry(&self, id: u32) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// The child entry `child_id` of archive `id`.
    pub fn child(&self, id: u32, child_id: u32) -> Option<&ChildEntry> {
        self.entry(id)?.child(child_id)
    }

    /// Iterate entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = (&u32, &Entry)> {
        self.entries.iter()
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One past the highest archive id, or 0 when the table is empty.
    pub fn capacity(&self) -> u32 {
        self.entries.keys().next_back().map_or(0, |&id| id + 1)
    }

    /// Sum of the entries' uncompressed sizes, accumulated wide and
    /// narrowed to 32 bits.
    pub fn total_uncompressed_size(&self) -> i32 {
        self.entries
            .values()
            .map(|entry| i64::from(entry.uncompressed))
            .sum::<i64>() as i32
    }

    /// The identifier lookup table, present once built.
    pub fn identifiers(&self) -> Option<&IdentifierTable> {
        self.identifiers.as_ref()
    }

    /// Append an entry with the next slot index. Ids must be added in
    /// ascending order to keep slots aligned with the id order the codec
    /// writes.
    pub fn insert_entry(&mut self, id: u32) -> &mut Entry {
        let slot = self.entries.len();
        self.entries.entry(id).or_insert_with(|| Entry::new(slot))
    }

    /// Rebuild the identifier lookup table from the entries.
    ///
    /// The dense array spans the full capacity; ids with no entry
    /// contribute an identifier of 0.
    pub fn build_identifiers(&mut self) {
        let mut dense = vec![0i32; self.capacity() as usize];
        for (&id, entry) in &self.entries {
            dense[id as usize] = entry.identifier;
        }
        self.identifiers = Some(IdentifierTable::new(&dense));
    }
}

/// Structural equality; the derived lookup table is excluded.
impl PartialEq for ReferenceTable {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.version == other.version
            && self.flags == other.flags
            && self.entries == other.entries
    }
}

impl Eq for ReferenceTable {}

/// Read an id delta or count: smart-int for format 7, u16 below.
fn read_count(csr: &mut Cursor<&[u8]>, format: u8) -> Result<u32> {
    if format >= 7 {
        read_smart_int(csr)
    } else {
        Ok(u32::from(csr.read_u16::<BigEndian>()?))
    }
}

/// Write an id delta or count in the encoding `format` prescribes.
fn write_count(buf: &mut Vec<u8>, format: u8, value: u32) -> Result<()> {
    if format >= 7 {
        write_smart_int(buf, value)
    } else if value > 0xFFFF {
        Err(StoreError::ValueOutOfRange(value))
    } else {
        buf.write_u16::<BigEndian>(value as u16)?;
        Ok(())
    }
}

/// Variable-length integer: two bytes when the top bit of the next byte is
/// clear, otherwise four bytes with the top bit stripped.
fn read_smart_int(csr: &mut Cursor<&[u8]>) -> Result<u32> {
    let pos = csr.position() as usize;
    let next = *csr
        .get_ref()
        .get(pos)
        .ok_or(StoreError::TruncatedData {
            expected: pos + 1,
            actual: csr.get_ref().len(),
        })?;
    if next & 0x80 != 0 {
        Ok(csr.read_u32::<BigEndian>()? & 0x7FFF_FFFF)
    } else {
        Ok(u32::from(csr.read_u16::<BigEndian>()?))
    }
}

fn write_smart_int(buf: &mut Vec<u8>, value: u32) -> Result<()> {
    if value > 0x7FFF_FFFF {
        return Err(StoreError::ValueOutOfRange(value));
    }
    if value <= 0x7FFF {
        buf.write_u16::<BigEndian>(value as u16)?;
    } else {
        buf.write_u32::<BigEndian>(value | 0x8000_0000)?;
    }
    Ok(())
}
