//! Eviction policy.
//!
//! - [`FifoReplacer`] - evicts unpinned pages in load order

mod fifo;

pub use fifo::FifoReplacer;
