//! Error types for store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The data file is missing.
    #[error("data file not found: {0}")]
    DataFileNotFound(PathBuf),

    /// Not a single data-plane index file exists.
    #[error("no index files found")]
    NoIndexFiles,

    /// The meta index file is missing.
    #[error("meta index file not found: {0}")]
    MetaIndexNotFound(PathBuf),

    /// No such index file is open.
    #[error("index {0} not found")]
    IndexNotFound(u8),

    /// The index file has no record for the archive.
    #[error("archive {archive} not found in index {index}")]
    ArchiveNotFound { index: u8, archive: u32 },

    /// Member id outside the archive's capacity.
    #[error("member {member} not found in archive {archive} of index {index}")]
    MemberNotFound {
        index: u8,
        archive: u32,
        member: u32,
    },

    /// A sector header does not match the chain being walked.
    #[error(
        "sector header mismatch reading archive {archive}: \
         {field} expected {expected}, got {actual}"
    )]
    SectorMismatch {
        archive: u32,
        field: &'static str,
        expected: u32,
        actual: u32,
    },

    /// The sector chain ended before the archive was complete.
    #[error("sector chain for archive {archive} ended with {remaining} bytes outstanding")]
    BrokenChain { archive: u32, remaining: usize },

    /// End of file in the middle of a record.
    #[error("unexpected end of file mid-record")]
    UnexpectedEof,

    /// Reference table format outside {5, 6, 7}.
    #[error("unsupported reference table format: {0}")]
    UnsupportedFormat(u8),

    /// A value does not fit the encoding the table format prescribes.
    #[error("value {0} does not fit the reference table format")]
    ValueOutOfRange(u32),

    /// Truncated data.
    #[error("truncated data: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    /// The checksum table digest does not match its contents.
    #[error("checksum table digest mismatch")]
    DigestMismatch,

    /// The checksum table trailer has the wrong size.
    #[error("checksum table trailer is {0} bytes, expected 65")]
    BadTrailer(usize),

    /// The meta index is only addressable through the low-level store.
    #[error("index 255 is reserved for reference tables")]
    MetaIndexDenied,

    /// Codec error from js5-codec.
    #[error("codec error: {0}")]
    Codec(#[from] js5_codec::Error),
}
