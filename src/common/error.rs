//! Error types for RidgeDB.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in RidgeDB.
///
/// A single crate-wide error type keeps handling consistent between the
/// buffer/storage layer and the index layer.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// A reopened index file's stored relation name, attribute offset,
    /// attribute type, or occupancies do not match the requested
    /// configuration, or its meta page failed the checksum.
    #[error("Bad index metadata in {0}")]
    BadIndexMetadata(String),

    /// Scan operators outside the allowed set: the low operator must be
    /// GT or GTE, the high operator LT or LTE.
    #[error("Scan low operator must be GT/GTE and high operator LT/LTE")]
    BadOperatorCombination,

    /// Scan range where the low bound exceeds the high bound.
    #[error("Scan low bound exceeds high bound")]
    BadScanRange,

    /// No key in the index satisfies the scan criteria.
    #[error("No key satisfies the scan criteria")]
    NoMatchingKey,

    /// `scan_next`/`end_scan` called without an active scan.
    #[error("No scan is active")]
    ScanNotActive,

    /// `scan_next` called after all matching entries were delivered.
    #[error("Index scan completed")]
    ScanExhausted,

    /// A bulk-load record is too short to hold a key at the configured
    /// byte offset.
    #[error("Record of {len} bytes cannot hold a key at offset {offset}")]
    InvalidRecord { len: usize, offset: usize },
}
