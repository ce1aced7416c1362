//! Compression variants for archive payloads.

use std::io::{Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::trace;

use crate::error::{Error, Result};

/// Magic of a bzip2 stream at block size 1. Payload bodies are stored
/// without it, so it is stripped after compression and re-prepended before
/// decompression.
const BZIP2_MAGIC: [u8; 4] = *b"BZh1";

/// Compression applied to an archive payload, selected by the tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Tag 0: stored verbatim.
    None,
    /// Tag 1: bzip2 at block size 1, headerless on disk.
    Bzip2,
    /// Tag 2: gzip.
    Gzip,
}

impl CompressionType {
    /// Map a tag byte to its variant.
    pub fn from_tag(tag: u8) -> Option<CompressionType> {
        match tag {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Bzip2),
            2 => Some(CompressionType::Gzip),
            _ => None,
        }
    }

    /// The tag byte for this variant.
    pub fn tag(self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Bzip2 => 1,
            CompressionType::Gzip => 2,
        }
    }

    /// Size of the payload header for this variant: the tag and compressed
    /// length, plus the uncompressed length when a codec is in use.
    pub(crate) fn header_len(self) -> usize {
        match self {
            CompressionType::None => 5,
            _ => 9,
        }
    }

    /// Compress `data` into the on-disk body for this variant.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Bzip2 => {
                let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::new(1));
                encoder.write_all(data)?;
                let mut body = encoder.finish()?;
                body.drain(..BZIP2_MAGIC.len());
                trace!("bzip2: {} bytes -> {} bytes", data.len(), body.len());
                Ok(body)
            }
            CompressionType::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data)?;
                let body = encoder.finish()?;
                trace!("gzip: {} bytes -> {} bytes", data.len(), body.len());
                Ok(body)
            }
        }
    }

    /// Decompress an on-disk body, checking it inflates to exactly
    /// `uncompressed_len` bytes.
    pub fn decompress(self, body: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let data = match self {
            CompressionType::None => body.to_vec(),
            CompressionType::Bzip2 => {
                let mut stream = Vec::with_capacity(BZIP2_MAGIC.len() + body.len());
                stream.extend_from_slice(&BZIP2_MAGIC);
                stream.extend_from_slice(body);

                let mut data = Vec::with_capacity(uncompressed_len);
                BzDecoder::new(stream.as_slice()).read_to_end(&mut data)?;
                data
            }
            CompressionType::Gzip => {
                let mut data = Vec::with_capacity(uncompressed_len);
                GzDecoder::new(body).read_to_end(&mut data)?;
                data
            }
        };

        if self != CompressionType::None && data.len() != uncompressed_len {
            return Err(Error::SizeMismatch {
                expected: uncompressed_len,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}
