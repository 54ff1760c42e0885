//! Index meta (header) page.
//!
//! The meta page is always page 0 of an index file. It records what the
//! index was built over - relation, attribute offset, attribute type - the
//! current and initial root pages, the node occupancies, and a CRC32 over
//! all of it. Reopening an index with a different configuration, or with a
//! corrupted meta page, fails with `BadIndexMetadata`.

/// Type of the indexed attribute.
///
/// Only `Integer` has an engine behind it; the other tags are stored and
/// validated so a mismatched reopen is caught.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    #[default]
    Integer = 0,
    Double = 1,
    String = 2,
}

impl AttrType {
    /// Convert from the stored tag, None for unknown values.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(AttrType::Integer),
            1 => Some(AttrType::Double),
            2 => Some(AttrType::String),
            _ => None,
        }
    }
}

/// Contents of the meta page.
///
/// # Layout (48 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       20    relation name (NUL-padded, truncated to 19 bytes)
/// 20      4     attribute byte offset (little-endian)
/// 24      4     attribute type tag
/// 28      4     current root page id
/// 32      4     initial root page id
/// 36      4     leaf occupancy
/// 40      4     node occupancy
/// 44      4     CRC32 over bytes 0..44
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Name of the base relation (already truncated to the stored form).
    pub relation_name: String,
    /// Byte offset of the indexed attribute inside a record.
    pub attr_byte_offset: u32,
    /// Type of the indexed attribute.
    pub attr_type: AttrType,
    /// Current root page (moves when the root splits).
    pub root_page_id: u32,
    /// Root page from construction time (never moves; the tree is a single
    /// leaf while the current root still equals it).
    pub initial_root_page_id: u32,
    /// Leaf slot count for this file.
    pub leaf_occupancy: u32,
    /// Non-leaf key count for this file.
    pub node_occupancy: u32,
}

impl IndexMeta {
    /// Size of the serialized meta payload in bytes.
    pub const SIZE: usize = 48;

    /// Stored width of the relation name, final byte always NUL.
    pub const RELATION_NAME_LEN: usize = 20;

    pub const OFFSET_RELATION_NAME: usize = 0;
    pub const OFFSET_ATTR_BYTE_OFFSET: usize = 20;
    pub const OFFSET_ATTR_TYPE: usize = 24;
    pub const OFFSET_ROOT: usize = 28;
    pub const OFFSET_INITIAL_ROOT: usize = 32;
    pub const OFFSET_LEAF_OCCUPANCY: usize = 36;
    pub const OFFSET_NODE_OCCUPANCY: usize = 40;
    pub const OFFSET_CHECKSUM: usize = 44;

    /// Truncate a relation name to its stored form (at most 19 bytes,
    /// cut at a character boundary).
    pub fn stored_name(name: &str) -> String {
        let mut end = name.len().min(Self::RELATION_NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name[..end].to_string()
    }

    /// Read and validate a meta payload from the beginning of a page.
    ///
    /// Returns `None` when the checksum does not match or the attribute
    /// type tag is unknown - both mean the page is not a meta page this
    /// build understands.
    ///
    /// # Panics
    /// Panics if `data.len() < IndexMeta::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        assert!(data.len() >= Self::SIZE, "buffer too small for IndexMeta");

        let stored_checksum = read_u32(data, Self::OFFSET_CHECKSUM);
        if stored_checksum != Self::compute_checksum(data) {
            return None;
        }

        let name_bytes = &data[Self::OFFSET_RELATION_NAME..Self::OFFSET_ATTR_BYTE_OFFSET];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let relation_name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();

        let attr_type = AttrType::from_u32(read_u32(data, Self::OFFSET_ATTR_TYPE))?;

        Some(Self {
            relation_name,
            attr_byte_offset: read_u32(data, Self::OFFSET_ATTR_BYTE_OFFSET),
            attr_type,
            root_page_id: read_u32(data, Self::OFFSET_ROOT),
            initial_root_page_id: read_u32(data, Self::OFFSET_INITIAL_ROOT),
            leaf_occupancy: read_u32(data, Self::OFFSET_LEAF_OCCUPANCY),
            node_occupancy: read_u32(data, Self::OFFSET_NODE_OCCUPANCY),
        })
    }

    /// Write this meta payload, including a freshly computed checksum, to
    /// the beginning of a page.
    ///
    /// # Panics
    /// Panics if `data.len() < IndexMeta::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for IndexMeta");

        let name = Self::stored_name(&self.relation_name);
        let name_field = &mut data[Self::OFFSET_RELATION_NAME..Self::OFFSET_ATTR_BYTE_OFFSET];
        name_field.fill(0);
        name_field[..name.len()].copy_from_slice(name.as_bytes());

        write_u32(data, Self::OFFSET_ATTR_BYTE_OFFSET, self.attr_byte_offset);
        write_u32(data, Self::OFFSET_ATTR_TYPE, self.attr_type as u32);
        write_u32(data, Self::OFFSET_ROOT, self.root_page_id);
        write_u32(data, Self::OFFSET_INITIAL_ROOT, self.initial_root_page_id);
        write_u32(data, Self::OFFSET_LEAF_OCCUPANCY, self.leaf_occupancy);
        write_u32(data, Self::OFFSET_NODE_OCCUPANCY, self.node_occupancy);

        let checksum = Self::compute_checksum(data);
        write_u32(data, Self::OFFSET_CHECKSUM, checksum);
    }

    /// CRC32 over everything before the checksum field.
    pub fn compute_checksum(data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data[..Self::OFFSET_CHECKSUM]);
        hasher.finalize()
    }

    /// Whether this stored configuration matches a requested one. The
    /// requested name is compared in its truncated stored form.
    pub fn matches(
        &self,
        relation_name: &str,
        attr_byte_offset: u32,
        attr_type: AttrType,
        leaf_occupancy: u32,
        node_occupancy: u32,
    ) -> bool {
        self.relation_name == Self::stored_name(relation_name)
            && self.attr_byte_offset == attr_byte_offset
            && self.attr_type == attr_type
            && self.leaf_occupancy == leaf_occupancy
            && self.node_occupancy == node_occupancy
    }
}

#[inline]
fn read_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

#[inline]
fn write_u32(data: &mut [u8], off: usize, v: u32) {
    data[off..off + 4].copy_from_slice(&v.to_le_bytes());
}
