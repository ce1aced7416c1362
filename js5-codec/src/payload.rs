//! Archive payload envelope codec.
//!
//! The outermost encoding of every archive: a compression tag, a compressed
//! length, the uncompressed length when a codec is in use, the body, and an
//! optional trailing version word. When a usable XTEA key is supplied the
//! range from the end of the five-byte header through the end of the body
//! is enciphered; the header and the trailing version stay cleartext.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use tracing::trace;

use js5_crypto::xtea::{self, XteaKey};

use crate::compression::CompressionType;
use crate::error::{Error, Result};

/// Offset where the enciphered range starts.
const CIPHER_START: usize = 5;

/// A decoded archive payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePayload {
    /// Compression applied to the body on disk.
    pub compression: CompressionType,
    /// The archive bytes after decompression.
    pub data: Vec<u8>,
    /// Trailing version word, or -1 when absent.
    pub version: i16,
}

impl ArchivePayload {
    /// Decode an archive payload, deciphering with `key` when it is usable.
    pub fn decode(buf: &[u8], key: &XteaKey) -> Result<ArchivePayload> {
        if buf.len() < CIPHER_START {
            return Err(Error::TruncatedData {
                expected: CIPHER_START,
                actual: buf.len(),
            });
        }

        let tag = buf[0];
        let compression =
            CompressionType::from_tag(tag).ok_or(Error::UnknownCompression(tag))?;
        let compressed_len = BigEndian::read_u32(&buf[1..5]) as usize;

        let consumed = compression.header_len() + compressed_len;
        if buf.len() < consumed {
            return Err(Error::TruncatedData {
                expected: consumed,
                actual: buf.len(),
            });
        }

        let mut work = buf.to_vec();
        if xtea::is_usable(key) {
            trace!("deciphering payload bytes {CIPHER_START}..{consumed}");
            xtea::decipher(&mut work, CIPHER_START, consumed, key);
        }

        let data = match compression {
            CompressionType::None => work[CIPHER_START..CIPHER_START + compressed_len].to_vec(),
            _ => {
                let uncompressed_len = BigEndian::read_u32(&work[5..9]) as usize;
                let body = &work[9..9 + compressed_len];
                compression.decompress(body, uncompressed_len)?
            }
        };

        let version = if work.len() - consumed >= 2 {
            BigEndian::read_i16(&work[consumed..])
        } else {
            -1
        };

        Ok(ArchivePayload {
            compression,
            data,
            version,
        })
    }

    /// Encode this payload, enciphering with `key` when it is usable.
    pub fn encode(&self, key: &XteaKey) -> Result<Vec<u8>> {
        let body = self.compression.compress(&self.data)?;
        let header_len = self.compression.header_len();

        let mut buf = Vec::with_capacity(header_len + body.len() + 2);
        buf.push(self.compression.tag());
        buf.write_u32::<BigEndian>(body.len() as u32)?;
        if self.compression != CompressionType::None {
            buf.write_u32::<BigEndian>(self.data.len() as u32)?;
        }
        buf.extend_from_slice(&body);

        if xtea::is_usable(key) {
            let end = buf.len();
            xtea::encipher(&mut buf, CIPHER_START, end, key);
        }

        if self.version != -1 {
            buf.write_i16::<BigEndian>(self.version)?;
        }
        Ok(buf)
    }

    /// Like [`ArchivePayload::encode`], but refuse a key the lenient path
    /// would silently ignore.
    ///
    /// The cipher gate treats any key with a zero word as "do not encrypt",
    /// so a caller that requires ciphertext on disk should use this instead.
    pub fn encode_forced(&self, key: &XteaKey) -> Result<Vec<u8>> {
        if let Some(word) = key.iter().position(|&w| w == 0) {
            return Err(js5_crypto::CryptoError::WeakKey(word).into());
        }
        self.encode(key)
    }
}
