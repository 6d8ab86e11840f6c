//! On-page node layout and typed accessor views.
//!
//! Every page is interpreted as either a leaf or an internal B-tree node.
//! All cross-component size math lives here as `const` items derived from
//! the page size and the serialized row size.
//!
//! # Common header (both node types, 6 bytes)
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     node type (0 = internal, 1 = leaf)
//! 1       1     is-root flag
//! 2       4     parent page number (back-reference, little-endian)
//! ```
//!
//! # Leaf node
//! ```text
//! ┌────────────────────┬───────────────┬──────────────────┬─────────────────────┐
//! │ common header (6)  │ num cells (4) │ next leaf (4)    │ cells (295 each)    │
//! └────────────────────┴───────────────┴──────────────────┴─────────────────────┘
//! ```
//! Cells are densely packed and sorted ascending by key. Each cell is a
//! 4-byte key followed by a serialized row. `next leaf` chains siblings
//! left to right for sequential scans; 0 means no sibling (page 0 is
//! always the root, so it can never be a sibling).
//!
//! # Internal node
//! ```text
//! ┌────────────────────┬──────────────┬─────────────────┬────────────────────┐
//! │ common header (6)  │ num keys (4) │ right child (4) │ cells (8 each)     │
//! └────────────────────┴──────────────┴─────────────────┴────────────────────┘
//! ```
//! Each cell is a (child page number, separator key) pair where the
//! separator is the maximum key in that child's subtree. All keys under
//! the right child exceed the last separator.

use std::fmt;

use crate::common::config::PAGE_SIZE;
use crate::common::PageId;
use crate::error::{Error, Result};
use crate::row::ROW_SIZE;
use crate::storage::Page;

// Common node header layout
pub const NODE_TYPE_SIZE: usize = 1;
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = 1;
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = 4;
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header layout
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
pub const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf node body layout
pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

// Fixed split point: the left (old) leaf keeps the ceiling half of the
// max+1 cells being redistributed.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header layout
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal node body layout
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_MAX_KEYS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

/// Type of node stored in a page.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation on disk.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Internal node: (child, separator key) cells plus a right child.
    Internal = 0,
    /// Leaf node: (key, row) cells chained to the next leaf.
    Leaf = 1,
}

impl NodeType {
    /// Convert from the on-disk byte.
    ///
    /// # Errors
    /// `Error::InvalidNodeType` for unknown values.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            other => Err(Error::InvalidNodeType(other)),
        }
    }
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// ============================================================================
// Common header accessors
// ============================================================================

/// Read the node-type byte of a page.
pub fn node_type(page: &Page) -> Result<NodeType> {
    NodeType::from_u8(page.as_slice()[NODE_TYPE_OFFSET])
}

pub fn set_node_type(page: &mut Page, node_type: NodeType) {
    page.as_mut_slice()[NODE_TYPE_OFFSET] = node_type as u8;
}

/// Whether this node is the tree root.
pub fn is_root(page: &Page) -> bool {
    page.as_slice()[IS_ROOT_OFFSET] != 0
}

pub fn set_root(page: &mut Page, is_root: bool) {
    page.as_mut_slice()[IS_ROOT_OFFSET] = is_root as u8;
}

/// Parent page number. A plain index back into the page table, never an
/// owning reference; meaningless for the root.
pub fn parent(page: &Page) -> PageId {
    PageId::new(read_u32(page.as_slice(), PARENT_POINTER_OFFSET))
}

pub fn set_parent(page: &mut Page, parent: PageId) {
    write_u32(page.as_mut_slice(), PARENT_POINTER_OFFSET, parent.0);
}

/// The maximum key stored under a node: the last cell's key for a leaf,
/// the last separator for an internal node.
///
/// # Panics
/// Panics if the node is empty; callers must guard.
pub fn max_key(page: &Page) -> Result<u32> {
    match node_type(page)? {
        NodeType::Leaf => {
            let num_cells = read_u32(page.as_slice(), LEAF_NODE_NUM_CELLS_OFFSET);
            assert!(num_cells > 0, "max_key on an empty leaf");
            let offset = LEAF_NODE_HEADER_SIZE
                + (num_cells as usize - 1) * LEAF_NODE_CELL_SIZE
                + LEAF_NODE_KEY_OFFSET;
            Ok(read_u32(page.as_slice(), offset))
        }
        NodeType::Internal => {
            let num_keys = read_u32(page.as_slice(), INTERNAL_NODE_NUM_KEYS_OFFSET);
            assert!(num_keys > 0, "max_key on an empty internal node");
            let offset = INTERNAL_NODE_HEADER_SIZE
                + (num_keys as usize - 1) * INTERNAL_NODE_CELL_SIZE
                + INTERNAL_NODE_CHILD_SIZE;
            Ok(read_u32(page.as_slice(), offset))
        }
    }
}

// ============================================================================
// Leaf node view
// ============================================================================

/// Typed view of a page holding a leaf node.
pub struct LeafNode<'a> {
    page: &'a mut Page,
}

impl<'a> LeafNode<'a> {
    /// Wrap a page known to hold a leaf node.
    pub fn new(page: &'a mut Page) -> Self {
        debug_assert!(matches!(node_type(page), Ok(NodeType::Leaf)));
        Self { page }
    }

    /// Reinitialize a page as an empty, non-root leaf with no sibling.
    pub fn init(page: &mut Page) {
        page.reset();
        set_node_type(page, NodeType::Leaf);
        set_root(page, false);
        // num_cells, next_leaf and parent are all zero after the reset.
    }

    pub fn num_cells(&self) -> u32 {
        read_u32(self.page.as_slice(), LEAF_NODE_NUM_CELLS_OFFSET)
    }

    pub fn set_num_cells(&mut self, num_cells: u32) {
        write_u32(
            self.page.as_mut_slice(),
            LEAF_NODE_NUM_CELLS_OFFSET,
            num_cells,
        );
    }

    /// The forward sibling, or `None` for the rightmost leaf.
    pub fn next_leaf(&self) -> Option<PageId> {
        match read_u32(self.page.as_slice(), LEAF_NODE_NEXT_LEAF_OFFSET) {
            0 => None,
            page_num => Some(PageId::new(page_num)),
        }
    }

    pub fn set_next_leaf(&mut self, next: Option<PageId>) {
        let raw = next.map_or(0, |page_num| page_num.0);
        write_u32(self.page.as_mut_slice(), LEAF_NODE_NEXT_LEAF_OFFSET, raw);
    }

    #[inline]
    fn cell_offset(cell_num: u32) -> usize {
        debug_assert!((cell_num as usize) <= LEAF_NODE_MAX_CELLS);
        LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE
    }

    pub fn key(&self, cell_num: u32) -> u32 {
        read_u32(
            self.page.as_slice(),
            Self::cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET,
        )
    }

    pub fn set_key(&mut self, cell_num: u32, key: u32) {
        write_u32(
            self.page.as_mut_slice(),
            Self::cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET,
            key,
        );
    }

    /// The full (key + value) bytes of a cell.
    pub fn cell(&self, cell_num: u32) -> &[u8] {
        let start = Self::cell_offset(cell_num);
        &self.page.as_slice()[start..start + LEAF_NODE_CELL_SIZE]
    }

    /// Overwrite a cell with raw (key + value) bytes.
    ///
    /// # Panics
    /// Panics unless `bytes` is exactly one cell long.
    pub fn write_cell(&mut self, cell_num: u32, bytes: &[u8]) {
        assert_eq!(bytes.len(), LEAF_NODE_CELL_SIZE);
        let start = Self::cell_offset(cell_num);
        self.page.as_mut_slice()[start..start + LEAF_NODE_CELL_SIZE].copy_from_slice(bytes);
    }

    /// Copy one cell over another within this leaf.
    pub fn copy_cell_within(&mut self, src: u32, dst: u32) {
        let src_start = Self::cell_offset(src);
        let dst_start = Self::cell_offset(dst);
        self.page
            .as_mut_slice()
            .copy_within(src_start..src_start + LEAF_NODE_CELL_SIZE, dst_start);
    }

    /// The value slice of a cell.
    pub fn value(&self, cell_num: u32) -> &[u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
        &self.page.as_slice()[start..start + LEAF_NODE_VALUE_SIZE]
    }

    /// The mutable value slice of a cell.
    pub fn value_mut(&mut self, cell_num: u32) -> &mut [u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
        &mut self.page.as_mut_slice()[start..start + LEAF_NODE_VALUE_SIZE]
    }

    /// Consume the view and return the mutable value slice of a cell with
    /// the page's full lifetime.
    pub fn into_value_mut(self, cell_num: u32) -> &'a mut [u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
        &mut self.page.as_mut_slice()[start..start + LEAF_NODE_VALUE_SIZE]
    }

    /// Move cells `[from, num_cells)` one slot to the right, opening a gap
    /// at `from`. A single `memmove`; the cell count is unchanged.
    ///
    /// # Panics
    /// Panics (via slice bounds) if the leaf is already at capacity.
    pub fn shift_cells_right(&mut self, from: u32) {
        let start = Self::cell_offset(from);
        let end = Self::cell_offset(self.num_cells());
        self.page
            .as_mut_slice()
            .copy_within(start..end, start + LEAF_NODE_CELL_SIZE);
    }
}

// ============================================================================
// Internal node view
// ============================================================================

/// Typed view of a page holding an internal node.
pub struct InternalNode<'a> {
    page: &'a mut Page,
}

impl<'a> InternalNode<'a> {
    /// Wrap a page known to hold an internal node.
    pub fn new(page: &'a mut Page) -> Self {
        debug_assert!(matches!(node_type(page), Ok(NodeType::Internal)));
        Self { page }
    }

    /// Reinitialize a page as an empty, non-root internal node.
    pub fn init(page: &mut Page) {
        page.reset();
        set_node_type(page, NodeType::Internal);
        set_root(page, false);
    }

    pub fn num_keys(&self) -> u32 {
        read_u32(self.page.as_slice(), INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn set_num_keys(&mut self, num_keys: u32) {
        write_u32(
            self.page.as_mut_slice(),
            INTERNAL_NODE_NUM_KEYS_OFFSET,
            num_keys,
        );
    }

    /// The rightmost child, holding all keys above the last separator.
    pub fn right_child(&self) -> PageId {
        PageId::new(read_u32(
            self.page.as_slice(),
            INTERNAL_NODE_RIGHT_CHILD_OFFSET,
        ))
    }

    pub fn set_right_child(&mut self, child: PageId) {
        write_u32(
            self.page.as_mut_slice(),
            INTERNAL_NODE_RIGHT_CHILD_OFFSET,
            child.0,
        );
    }

    #[inline]
    fn cell_offset(cell_num: u32) -> usize {
        debug_assert!((cell_num as usize) < INTERNAL_NODE_MAX_KEYS);
        INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE
    }

    /// The child at position `child_num`, where position `num_keys` is the
    /// right child.
    ///
    /// # Panics
    /// Panics if `child_num` exceeds the key count.
    pub fn child(&self, child_num: u32) -> PageId {
        let num_keys = self.num_keys();
        if child_num > num_keys {
            panic!("child index {child_num} out of range for internal node with {num_keys} keys");
        }
        if child_num == num_keys {
            self.right_child()
        } else {
            PageId::new(read_u32(self.page.as_slice(), Self::cell_offset(child_num)))
        }
    }

    /// Write the child half of a cell. Unlike [`InternalNode::child`] this
    /// always addresses the cell array, never the right child.
    pub fn set_child(&mut self, cell_num: u32, child: PageId) {
        write_u32(
            self.page.as_mut_slice(),
            Self::cell_offset(cell_num),
            child.0,
        );
    }

    pub fn key(&self, key_num: u32) -> u32 {
        read_u32(
            self.page.as_slice(),
            Self::cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE,
        )
    }

    pub fn set_key(&mut self, key_num: u32, key: u32) {
        write_u32(
            self.page.as_mut_slice(),
            Self::cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE,
            key,
        );
    }

    /// Move cells `[from, num_keys)` one slot to the right.
    pub fn shift_cells_right(&mut self, from: u32) {
        let start = Self::cell_offset(from);
        let end = Self::cell_offset(self.num_keys());
        self.page
            .as_mut_slice()
            .copy_within(start..end, start + INTERNAL_NODE_CELL_SIZE);
    }

    /// Binary search for the index of the child whose subtree should hold
    /// `key`: the first cell whose separator is >= `key`, or `num_keys`
    /// (the right child) when every separator is smaller.
    ///
    /// On the greater branch the midpoint is kept unless the window would
    /// stop shrinking; equal separators resolve to the matching index
    /// rather than advancing past it.
    pub fn find_child_index(&self, key: u32) -> u32 {
        let mut min_index = 0u32;
        let mut max_index = self.num_keys();

        while min_index < max_index {
            let index = (min_index + max_index) / 2;
            let key_to_right = self.key(index);
            if key == key_to_right {
                min_index = index;
                break;
            } else if key < key_to_right {
                max_index = index;
            } else {
                min_index = if index == min_index { index + 1 } else { index };
            }
        }

        min_index
    }
}

// ============================================================================
// Layout introspection
// ============================================================================

/// Snapshot of the computed layout constants, for debug introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub row_size: usize,
    pub common_node_header_size: usize,
    pub leaf_node_header_size: usize,
    pub leaf_node_cell_size: usize,
    pub leaf_node_space_for_cells: usize,
    pub leaf_node_max_cells: usize,
    pub internal_node_max_keys: usize,
}

impl Layout {
    pub fn new() -> Self {
        Self {
            row_size: ROW_SIZE,
            common_node_header_size: COMMON_NODE_HEADER_SIZE,
            leaf_node_header_size: LEAF_NODE_HEADER_SIZE,
            leaf_node_cell_size: LEAF_NODE_CELL_SIZE,
            leaf_node_space_for_cells: LEAF_NODE_SPACE_FOR_CELLS,
            leaf_node_max_cells: LEAF_NODE_MAX_CELLS,
            internal_node_max_keys: INTERNAL_NODE_MAX_KEYS,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ROW_SIZE: {}", self.row_size)?;
        writeln!(f, "COMMON_NODE_HEADER_SIZE: {}", self.common_node_header_size)?;
        writeln!(f, "LEAF_NODE_HEADER_SIZE: {}", self.leaf_node_header_size)?;
        writeln!(f, "LEAF_NODE_CELL_SIZE: {}", self.leaf_node_cell_size)?;
        writeln!(
            f,
            "LEAF_NODE_SPACE_FOR_CELLS: {}",
            self.leaf_node_space_for_cells
        )?;
        writeln!(f, "LEAF_NODE_MAX_CELLS: {}", self.leaf_node_max_cells)?;
        write!(f, "INTERNAL_NODE_MAX_KEYS: {}", self.internal_node_max_keys)
    }
}
