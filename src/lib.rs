//! RidgeDB - a disk-resident B+ tree index over a paged buffer pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         RidgeDB                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │                Index Layer (index/)                  │   │
//! │  │   BTreeIndex: insert · range scan · bulk load        │   │
//! │  │   node layouts + meta page + scan cursor             │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                            ↓                                │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                   │   │
//! │  │   BufferPoolManager + Frame + RAII page guards       │   │
//! │  │   FIFO eviction + statistics                         │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                            ↓                                │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                │   │
//! │  │              DiskManager + Page                      │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, RecordId, Error, config)
//! - [`buffer`] - Buffer pool management and page guards
//! - [`storage`] - Disk I/O and the raw page buffer
//! - [`index`] - The B+ tree index
//!
//! # Quick Start
//! ```no_run
//! use std::path::Path;
//! use ridgedb::{AttrType, BTreeIndex, RecordId, RecordSource, Result, ScanOp};
//!
//! struct NoRecords;
//!
//! impl RecordSource for NoRecords {
//!     fn next_record(&mut self) -> Result<Option<(RecordId, Vec<u8>)>> {
//!         Ok(None)
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut index = BTreeIndex::open_or_build(
//!         Path::new("."),
//!         "orders",
//!         8,
//!         AttrType::Integer,
//!         &mut NoRecords,
//!     )?;
//!
//!     index.insert_entry(42, RecordId::new(7, 3))?;
//!
//!     index.start_scan(0, ScanOp::Gte, 100, ScanOp::Lte)?;
//!     let rid = index.scan_next()?;
//!     index.end_scan()?;
//!     assert_eq!(rid, RecordId::new(7, 3));
//!     Ok(())
//! }
//! ```

// Core modules
pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, RecordId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use index::{index_file_name, AttrType, BTreeConfig, BTreeIndex, RecordSource, ScanOp};
pub use storage::DiskManager;
