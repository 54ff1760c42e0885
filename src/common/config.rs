//! Configuration constants for RidgeDB.

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems and the common database page
/// size. Node capacities (`index::btree::node`) are derived from this value,
/// so it is fixed for the lifetime of every index file.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Maximum theoretical index file size in bytes.
pub const MAX_FILE_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;
