//! Disk-resident B+ tree index over one integer attribute of a relation.
//!
//! The tree lives in its own index file: page 0 is the meta page, page 1
//! the initial root (a leaf). Leaves hold sorted (key, record id) pairs and
//! chain through right-sibling links; non-leaf nodes hold separator keys
//! and child page ids. Insertion descends from the root, splits full nodes
//! bottom-up, and promotes a new root when the root itself splits. A range
//! scan descends on the low bound, then walks the sibling chain while the
//! predicate can still hold.
//!
//! # Components
//! - [`node`] - page layouts, capacities, and in-node mutation
//! - [`meta`] - the meta page codec
//! - [`scan`] - scan operators, predicate, and cursor
//! - [`BTreeIndex`] - construction, insertion, and scans
//!
//! All page access goes through the buffer pool: a page is pinned for the
//! lifetime of a guard and unpinned exactly once when the guard drops,
//! dirty only if it was fetched for writing. Insertion re-fetches a parent
//! for writing only when a child split actually hands it a separator.

mod meta;
mod node;
mod scan;

pub use meta::{AttrType, IndexMeta};
pub use scan::ScanOp;

use std::path::{Path, PathBuf};

use crate::buffer::{BufferPoolManager, PageWriteGuard};
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::DiskManager;

use node::{InternalMut, InternalRef, LeafMut, LeafRef};
pub use node::{INTERNAL_CAPACITY, LEAF_CAPACITY};

use scan::{ScanPredicate, ScanState};

/// Sequential source of base-relation records for bulk loading.
///
/// Yields raw record bytes plus the record's id; `Ok(None)` signals end of
/// data, which construction treats as normal termination of the load.
pub trait RecordSource {
    fn next_record(&mut self) -> Result<Option<(RecordId, Vec<u8>)>>;
}

/// Construction parameters for a [`BTreeIndex`].
///
/// Occupancies default to the page-filling capacities and are stored in
/// the meta page; reopening with different values fails metadata
/// validation. Smaller occupancies make split behavior observable with a
/// handful of keys.
#[derive(Debug, Clone)]
pub struct BTreeConfig {
    /// Frames in the index's buffer pool.
    pub pool_size: usize,
    /// (key, record id) slots per leaf.
    pub leaf_occupancy: usize,
    /// Separator keys per non-leaf node.
    pub node_occupancy: usize,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            pool_size: 64,
            leaf_occupancy: LEAF_CAPACITY,
            node_occupancy: INTERNAL_CAPACITY,
        }
    }
}

impl BTreeConfig {
    /// # Panics
    /// Panics if the occupancies do not fit a page or the pool is empty.
    fn validate(&self) {
        assert!(self.pool_size > 0, "pool_size must be > 0");
        node::assert_leaf_cap(self.leaf_occupancy);
        node::assert_internal_cap(self.node_occupancy);
    }
}

/// Result of a node split handed back to the parent: the new page and the
/// separator key that partitions it from the split page.
///
/// Owned and returned by value through the insertion recursion.
#[derive(Debug, Clone, Copy)]
struct SplitToken {
    page_id: PageId,
    key: i32,
}

/// Name of the index file for a relation/attribute pair. Deterministic, so
/// rerunning against the same pair reopens the same file.
pub fn index_file_name(relation_name: &str, attr_byte_offset: usize) -> String {
    format!("{relation_name}.{attr_byte_offset}")
}

/// A B+ tree index over a single integer attribute.
///
/// One scan may be positioned at a time; starting a new scan tears down
/// the previous one. Dropping the index ends any scan and flushes the
/// file, suppressing failures.
pub struct BTreeIndex {
    bpm: BufferPoolManager,
    path: PathBuf,
    relation_name: String,
    attr_byte_offset: usize,
    attr_type: AttrType,
    leaf_occupancy: usize,
    node_occupancy: usize,
    /// Meta page, always page 0.
    header_page_id: PageId,
    /// Current root; moves when the root splits.
    root_page_id: PageId,
    /// Root from construction time. The tree is a single leaf exactly
    /// while the current root still equals it.
    initial_root_page_id: PageId,
    /// Active scan, if any (None = idle).
    scan: Option<ScanState>,
}

impl BTreeIndex {
    /// Open the index for `relation_name`/`attr_byte_offset` in `dir`, or
    /// build it by bulk-loading every record from `source`.
    ///
    /// # Errors
    /// - `Error::BadIndexMetadata` when an existing file's stored
    ///   configuration does not match the requested one
    /// - I/O and buffer errors from page access
    pub fn open_or_build(
        dir: &Path,
        relation_name: &str,
        attr_byte_offset: usize,
        attr_type: AttrType,
        source: &mut dyn RecordSource,
    ) -> Result<Self> {
        Self::open_or_build_with(
            BTreeConfig::default(),
            dir,
            relation_name,
            attr_byte_offset,
            attr_type,
            source,
        )
    }

    /// [`open_or_build`](Self::open_or_build) with explicit configuration.
    pub fn open_or_build_with(
        config: BTreeConfig,
        dir: &Path,
        relation_name: &str,
        attr_byte_offset: usize,
        attr_type: AttrType,
        source: &mut dyn RecordSource,
    ) -> Result<Self> {
        config.validate();

        let file_name = index_file_name(relation_name, attr_byte_offset);
        let path = dir.join(&file_name);
        let exists = path.exists();

        let disk_manager = if exists {
            DiskManager::open(&path)?
        } else {
            DiskManager::create(&path)?
        };
        let bpm = BufferPoolManager::new(config.pool_size, disk_manager);

        let mut index = Self {
            bpm,
            path,
            relation_name: relation_name.to_string(),
            attr_byte_offset,
            attr_type,
            leaf_occupancy: config.leaf_occupancy,
            node_occupancy: config.node_occupancy,
            header_page_id: PageId::new(0),
            root_page_id: PageId::INVALID,
            initial_root_page_id: PageId::INVALID,
            scan: None,
        };

        if exists {
            index.open_existing(&file_name)?;
        } else {
            index.build_fresh(source)?;
        }

        Ok(index)
    }

    /// Validate the meta page of an existing file and adopt its roots.
    fn open_existing(&mut self, file_name: &str) -> Result<()> {
        let (root, initial_root) = {
            // guard drops on every path out, so the meta page is released
            // before a mismatch error reaches the caller
            let guard = self.bpm.fetch_page_read(self.header_page_id)?;
            let meta = IndexMeta::from_bytes(guard.as_slice())
                .ok_or_else(|| Error::BadIndexMetadata(file_name.to_string()))?;

            if !meta.matches(
                &self.relation_name,
                self.attr_byte_offset as u32,
                self.attr_type,
                self.leaf_occupancy as u32,
                self.node_occupancy as u32,
            ) {
                return Err(Error::BadIndexMetadata(file_name.to_string()));
            }
            (meta.root_page_id, meta.initial_root_page_id)
        };

        self.root_page_id = PageId::new(root);
        self.initial_root_page_id = PageId::new(initial_root);
        Ok(())
    }

    /// Lay out a fresh file (meta page + empty root leaf), then bulk-load.
    fn build_fresh(&mut self, source: &mut dyn RecordSource) -> Result<()> {
        let header_id = {
            let guard = self.bpm.new_page()?;
            guard.page_id()
        };
        debug_assert_eq!(header_id, self.header_page_id);

        // a zeroed page is a valid empty leaf with no sibling
        let root_id = {
            let guard = self.bpm.new_page()?;
            guard.page_id()
        };

        self.root_page_id = root_id;
        self.initial_root_page_id = root_id;
        self.write_meta()?;

        while let Some((rid, record)) = source.next_record()? {
            let key = key_at(&record, self.attr_byte_offset)?;
            self.insert_entry(key, rid)?;
        }
        self.bpm.flush_all_pages()?;

        Ok(())
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Type of the indexed attribute.
    pub fn attr_type(&self) -> AttrType {
        self.attr_type
    }

    /// Leaf slot count for this file.
    pub fn leaf_occupancy(&self) -> usize {
        self.leaf_occupancy
    }

    /// Non-leaf key count for this file.
    pub fn node_occupancy(&self) -> usize {
        self.node_occupancy
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert a (key, record id) entry.
    ///
    /// Descends to the target leaf and inserts there, splitting the leaf
    /// (and full ancestors, up to and including the root) when necessary.
    pub fn insert_entry(&mut self, key: i32, rid: RecordId) -> Result<()> {
        let root = self.root_page_id;
        let root_is_leaf = root == self.initial_root_page_id;

        // a token surviving to here means the root split, and the split
        // path already promoted a new root; nothing is left to absorb it
        self.insert_into(root, root_is_leaf, key, rid)?;
        Ok(())
    }

    /// Recursive descent. Returns the split token for the caller to absorb
    /// when this node had to split, None otherwise.
    fn insert_into(
        &mut self,
        page_id: PageId,
        is_leaf: bool,
        key: i32,
        rid: RecordId,
    ) -> Result<Option<SplitToken>> {
        if is_leaf {
            return self.insert_into_leaf(page_id, key, rid);
        }

        let node_cap = self.node_occupancy;
        let (child_id, child_is_leaf) = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let node = InternalRef::new(guard.as_slice(), node_cap);
            (node.child_for(key), node.level() == 1)
        };

        let Some(token) = self.insert_into(child_id, child_is_leaf, key, rid)? else {
            return Ok(None);
        };

        let mut guard = self.bpm.fetch_page_write(page_id)?;
        let mut node = InternalMut::new(guard.as_mut_slice(), node_cap);
        if node.len() < node_cap {
            node.insert(token.key, token.page_id);
            return Ok(None);
        }

        let up_token = self.split_internal(&mut guard, token)?;
        drop(guard);
        if page_id == self.root_page_id {
            self.promote_root(page_id, &up_token)?;
        }
        Ok(Some(up_token))
    }

    fn insert_into_leaf(
        &mut self,
        page_id: PageId,
        key: i32,
        rid: RecordId,
    ) -> Result<Option<SplitToken>> {
        let leaf_cap = self.leaf_occupancy;
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        let mut leaf = LeafMut::new(guard.as_mut_slice(), leaf_cap);
        if leaf.len() < leaf_cap {
            leaf.insert(key, rid);
            return Ok(None);
        }

        let token = self.split_leaf(&mut guard, page_id, key, rid)?;
        drop(guard);
        if page_id == self.root_page_id {
            self.promote_root(page_id, &token)?;
        }
        Ok(Some(token))
    }

    // ========================================================================
    // Splits
    // ========================================================================

    /// Split a full leaf, placing the pending entry in whichever half it
    /// sorts into. Returns the token for the parent.
    fn split_leaf(
        &self,
        old_guard: &mut PageWriteGuard<'_>,
        old_id: PageId,
        key: i32,
        rid: RecordId,
    ) -> Result<SplitToken> {
        let cap = self.leaf_occupancy;

        let mut new_guard = self.bpm.new_page()?;
        let new_id = new_guard.page_id();

        let mut old = LeafMut::new(old_guard.as_mut_slice(), cap);
        let mut new = LeafMut::new(new_guard.as_mut_slice(), cap);

        // midpoint, nudged right for odd capacities when the incoming key
        // lands in the upper half, so both halves stay balanced
        let mut mid = cap / 2;
        if cap % 2 == 1 && key > old.key(mid) {
            mid += 1;
        }
        old.move_upper_to(mid, &mut new);

        // keep the chain a single ascending list: the new leaf takes over
        // the old forward link, the old leaf points at the new one
        new.set_right_sibling(old.right_sibling());
        old.set_right_sibling(Some(new_id));

        if key > old.key(old.len() - 1) {
            new.insert(key, rid);
        } else {
            old.insert(key, rid);
        }

        debug_assert!(old_id != new_id);
        Ok(SplitToken {
            page_id: new_id,
            key: new.key(0),
        })
    }

    /// Split a full non-leaf node absorbing `pending`. The key at the push
    /// index is promoted, not duplicated. Returns the token for the parent.
    fn split_internal(
        &self,
        old_guard: &mut PageWriteGuard<'_>,
        pending: SplitToken,
    ) -> Result<SplitToken> {
        let cap = self.node_occupancy;

        let mut new_guard = self.bpm.new_page()?;
        let new_id = new_guard.page_id();

        let mut old = InternalMut::new(old_guard.as_mut_slice(), cap);
        let mut new = InternalMut::new(new_guard.as_mut_slice(), cap);

        // for even capacities, bias the push index so the fuller half is
        // the one the pending separator does not join
        let mid = cap / 2;
        let push_idx = if cap % 2 == 0 {
            if pending.key < old.key(mid) {
                mid - 1
            } else {
                mid
            }
        } else {
            mid
        };
        let push_key = old.split_upper_to(push_idx, &mut new);

        // the pending separator joins the side that covers its child's
        // range: left of the promoted key goes to the old node
        if pending.key < push_key {
            old.insert(pending.key, pending.page_id);
        } else {
            new.insert(pending.key, pending.page_id);
        }

        Ok(SplitToken {
            page_id: new_id,
            key: push_key,
        })
    }

    /// Install a new root over a just-split root page and persist the meta
    /// page's root pointer.
    fn promote_root(&mut self, old_root: PageId, token: &SplitToken) -> Result<()> {
        let old_root_was_leaf = old_root == self.initial_root_page_id;

        let new_root_id = {
            let mut guard = self.bpm.new_page()?;
            let id = guard.page_id();
            let mut root = InternalMut::new(guard.as_mut_slice(), self.node_occupancy);
            root.set_level(if old_root_was_leaf { 1 } else { 0 });
            root.set_child(0, old_root);
            root.set_child(1, token.page_id);
            root.set_key(0, token.key);
            root.set_len(1);
            id
        };

        self.root_page_id = new_root_id;
        self.write_meta()?;
        Ok(())
    }

    /// Rewrite the meta page from the current in-memory state.
    fn write_meta(&self) -> Result<()> {
        let meta = IndexMeta {
            relation_name: IndexMeta::stored_name(&self.relation_name),
            attr_byte_offset: self.attr_byte_offset as u32,
            attr_type: self.attr_type,
            root_page_id: self.root_page_id.0,
            initial_root_page_id: self.initial_root_page_id.0,
            leaf_occupancy: self.leaf_occupancy as u32,
            node_occupancy: self.node_occupancy as u32,
        };

        let mut guard = self.bpm.fetch_page_write(self.header_page_id)?;
        meta.write_to(guard.as_mut_slice());
        Ok(())
    }

    // ========================================================================
    // Scans
    // ========================================================================

    /// Position a scan at the first entry satisfying
    /// `low (low_op) key (high_op) high`.
    ///
    /// An active scan is torn down first. Fails with `NoMatchingKey` when
    /// nothing in the index satisfies the predicate, leaving the scan idle.
    pub fn start_scan(
        &mut self,
        low: i32,
        low_op: ScanOp,
        high: i32,
        high_op: ScanOp,
    ) -> Result<()> {
        let pred = ScanPredicate::new(low, low_op, high, high_op)?;

        // a second scan replaces the first
        self.scan = None;

        // descend on the low bound to the leftmost candidate leaf
        let mut page_id = self.root_page_id;
        if self.root_page_id != self.initial_root_page_id {
            loop {
                let (next, next_is_leaf) = {
                    let guard = self.bpm.fetch_page_read(page_id)?;
                    let inner = InternalRef::new(guard.as_slice(), self.node_occupancy);
                    (inner.child_for_low_bound(pred.low()), inner.level() == 1)
                };
                page_id = next;
                if next_is_leaf {
                    break;
                }
            }
        }

        // walk leaves forward to the first match
        loop {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let leaf = LeafRef::new(guard.as_slice(), self.leaf_occupancy);

            if leaf.len() == 0 {
                // only the never-split root leaf can be empty
                return Err(Error::NoMatchingKey);
            }

            for i in 0..leaf.len() {
                let key = leaf.key(i);
                if pred.matches(key) {
                    self.scan = Some(ScanState {
                        pred,
                        page_id,
                        next_entry: i,
                    });
                    return Ok(());
                }
                if pred.above_high(key) {
                    // sorted leaves: no later key can match either
                    return Err(Error::NoMatchingKey);
                }
            }

            let sibling = leaf.right_sibling();
            drop(guard);
            match sibling {
                Some(next) => page_id = next,
                None => return Err(Error::NoMatchingKey),
            }
        }
    }

    /// Yield the record id under the cursor and advance, crossing to the
    /// right sibling when this leaf is exhausted.
    ///
    /// # Errors
    /// - `Error::ScanNotActive` without an active scan
    /// - `Error::ScanExhausted` once every match has been delivered; the
    ///   scan stays positioned, so further calls keep failing the same way
    ///   until `end_scan`
    pub fn scan_next(&mut self) -> Result<RecordId> {
        let leaf_cap = self.leaf_occupancy;
        let state = self.scan.as_mut().ok_or(Error::ScanNotActive)?;

        let mut page_id = state.page_id;
        let mut entry = state.next_entry;

        // cursor ran past this leaf: step to the right sibling
        {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let leaf = LeafRef::new(guard.as_slice(), leaf_cap);
            if entry >= leaf.len() {
                match leaf.right_sibling() {
                    Some(sibling) => {
                        page_id = sibling;
                        entry = 0;
                    }
                    None => return Err(Error::ScanExhausted),
                }
            }
        }

        let guard = self.bpm.fetch_page_read(page_id)?;
        let leaf = LeafRef::new(guard.as_slice(), leaf_cap);
        if entry >= leaf.len() || !state.pred.matches(leaf.key(entry)) {
            return Err(Error::ScanExhausted);
        }

        let rid = leaf.rid(entry);
        state.page_id = page_id;
        state.next_entry = entry + 1;
        Ok(rid)
    }

    /// Terminate the active scan.
    ///
    /// # Errors
    /// `Error::ScanNotActive` when no scan is positioned.
    pub fn end_scan(&mut self) -> Result<()> {
        if self.scan.take().is_none() {
            return Err(Error::ScanNotActive);
        }
        Ok(())
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        // teardown must not propagate failures
        self.scan = None;
        let _ = self.bpm.flush_all_pages();
    }
}

/// Extract the little-endian i32 key at `offset` within a record.
fn key_at(record: &[u8], offset: usize) -> Result<i32> {
    let bytes = record
        .get(offset..offset + 4)
        .ok_or(Error::InvalidRecord {
            len: record.len(),
            offset,
        })?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
