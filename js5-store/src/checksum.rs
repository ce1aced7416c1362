//! Checksum table codec.
//!
//! The per-index digest a client uses to verify cache freshness: one entry
//! per index file. Two serialised shapes exist: the compact shape carries
//! only crc and version, the whirlpool shape carries the full entry plus a
//! signed trailer over everything before it. The trailer may additionally
//! be RSA-wrapped.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::BigInt;
use tracing::trace;

use js5_crypto::rsa;
use js5_crypto::whirlpool::{whirlpool, DIGEST_LEN};

use crate::error::{Result, StoreError};

/// Bytes per entry in the compact shape.
const COMPACT_ENTRY_SIZE: usize = 8;
/// Bytes per entry in the whirlpool shape.
const WHIRLPOOL_ENTRY_SIZE: usize = 80;
/// Size of the whirlpool-shape trailer: a lead byte plus the digest.
const TRAILER_SIZE: usize = 1 + DIGEST_LEN;

/// One checksum table entry, describing one index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// CRC-32 of the index's still-compressed reference table.
    pub crc: i32,
    /// Reference table version.
    pub version: i32,
    /// Archive capacity of the index.
    pub file_count: i32,
    /// Total uncompressed size of the index's archives.
    pub size: i32,
    /// Whirlpool digest of the still-compressed reference table.
    pub whirlpool: [u8; DIGEST_LEN],
}

impl Default for ChecksumEntry {
    fn default() -> ChecksumEntry {
        ChecksumEntry {
            crc: 0,
            version: 0,
            file_count: 0,
            size: 0,
            whirlpool: [0; DIGEST_LEN],
        }
    }
}

/// The checksum table over every index file of a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumTable {
    entries: Vec<ChecksumEntry>,
}

impl ChecksumTable {
    pub fn new(entries: Vec<ChecksumEntry>) -> ChecksumTable {
        ChecksumTable { entries }
    }

    /// The entries in index order.
    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    /// Serialise the table.
    ///
    /// With `whirlpool_shape` the output carries the entry count, the full
    /// entries, and the digest trailer; `rsa_key` is `(modulus, exponent)`
    /// to wrap the trailer with. Without it only crc and version are
    /// written per entry.
    pub fn encode(
        &self,
        whirlpool_shape: bool,
        rsa_key: Option<(&BigInt, &BigInt)>,
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if whirlpool_shape {
            buf.push(self.entries.len() as u8);
        }

        for entry in &self.entries {
            buf.write_i32::<BigEndian>(entry.crc)?;
            buf.write_i32::<BigEndian>(entry.version)?;
            if whirlpool_shape {
                buf.write_i32::<BigEndian>(entry.file_count)?;
                buf.write_i32::<BigEndian>(entry.size)?;
                buf.extend_from_slice(&entry.whirlpool);
            }
        }

        if whirlpool_shape {
            let mut trailer = Vec::with_capacity(TRAILER_SIZE);
            trailer.push(0);
            trailer.extend_from_slice(&whirlpool(&buf));
            if let Some((modulus, exponent)) = rsa_key {
                trailer = rsa::crypt(&trailer, modulus, exponent);
            }
            buf.extend_from_slice(&trailer);
        }
        Ok(buf)
    }

    /// Decode a serialised table, verifying the digest trailer when the
    /// whirlpool shape is expected.
    pub fn decode(
        buf: &[u8],
        whirlpool_shape: bool,
        rsa_key: Option<(&BigInt, &BigInt)>,
    ) -> Result<ChecksumTable> {
        let count = if whirlpool_shape {
            usize::from(*buf.first().ok_or(StoreError::TruncatedData {
                expected: 1,
                actual: 0,
            })?)
        } else {
            buf.len() / COMPACT_ENTRY_SIZE
        };

        let body_len = if whirlpool_shape {
            1 + count * WHIRLPOOL_ENTRY_SIZE
        } else {
            count * COMPACT_ENTRY_SIZE
        };
        if buf.len() < body_len {
            return Err(StoreError::TruncatedData {
                expected: body_len,
                actual: buf.len(),
            });
        }
        trace!("checksum table: {count} entries, whirlpool {whirlpool_shape}");

        let start = usize::from(whirlpool_shape);
        let mut csr = Cursor::new(&buf[start..body_len]);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let mut entry = ChecksumEntry {
                crc: csr.read_i32::<BigEndian>()?,
                version: csr.read_i32::<BigEndian>()?,
                ..Default::default()
            };
            if whirlpool_shape {
                entry.file_count = csr.read_i32::<BigEndian>()?;
                entry.size = csr.read_i32::<BigEndian>()?;
                csr.read_exact(&mut entry.whirlpool)?;
            }
            entries.push(entry);
        }

        if whirlpool_shape {
            let expected = whirlpool(&buf[..body_len]);
            let mut trailer = match rsa_key {
                Some((modulus, exponent)) => {
                    let mut plain = rsa::crypt(&buf[body_len..], modulus, exponent);
                    // The signed-integer encoding drops leading zero
                    // bytes; restore them before the length check.
                    if plain.len() < TRAILER_SIZE {
                        let mut padded = vec![0u8; TRAILER_SIZE - plain.len()];
                        padded.append(&mut plain);
                        plain = padded;
                    }
                    plain
                }
                None => buf[body_len..].to_vec(),
            };
            if trailer.len() != TRAILER_SIZE {
                return Err(StoreError::BadTrailer(trailer.len()));
            }
            if trailer.split_off(1) != expected {
                return Err(StoreError::DigestMismatch);
            }
        }

        Ok(ChecksumTable { entries })
    }
}
