//! Archive payload and container codecs for JS5 sector caches.
//!
//! Every archive read out of the file store is wrapped in a payload
//! envelope: a compression tag, size fields, an optionally XTEA-enciphered
//! body and an optional trailing version. Archives that group several
//! member files additionally use the container layout, which interleaves
//! member data across chunks with a delta-encoded size footer.

pub mod compression;
pub mod container;
pub mod error;
pub mod payload;

pub use compression::CompressionType;
pub use error::{Error, Result};
pub use payload::ArchivePayload;
