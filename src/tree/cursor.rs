//! Cursor - a stable position within the table's key order.
//!
//! A [`Cursor`] names a `(page, cell)` slot in a leaf node. It is the only
//! way row bytes are read or written: lookups produce a cursor, scans
//! advance one, and inserts write through one. Cursors hold no page
//! references, so they stay cheap to copy and never pin the cache.

use crate::common::PageId;
use crate::error::Result;
use crate::storage::Pager;
use crate::tree::node::{node_type, InternalNode, LeafNode, NodeType};

/// A position in the table, resolved to a leaf cell.
///
/// The position is *logical*: `cell_num` may equal the leaf's cell count,
/// denoting the insertion point one past the last cell.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    page_num: PageId,
    cell_num: u32,
    /// Set once the cursor has moved past the last cell of the last leaf.
    end_of_table: bool,
}

impl Cursor {
    /// Position a cursor on the first row in key order.
    ///
    /// Descends to the leftmost leaf by searching for key 0; any row with
    /// a smaller-or-equal key would sort first anyway.
    ///
    /// # Errors
    /// Propagates pager failures from the descent.
    pub fn start(pager: &mut Pager, root_page_num: PageId) -> Result<Self> {
        let mut cursor = Self::find(pager, root_page_num, 0)?;
        let leaf = LeafNode::new(pager.page(cursor.page_num)?);
        cursor.end_of_table = leaf.num_cells() == 0;
        Ok(cursor)
    }

    /// Position a cursor at `key`, or where `key` would be inserted.
    ///
    /// On return the cursor points at the first cell whose key is >=
    /// `key`; if every key in the tree is smaller it points one past the
    /// last cell of the rightmost reachable leaf.
    ///
    /// # Errors
    /// Propagates pager failures, and `Error::InvalidNodeType` if a page
    /// in the descent carries a corrupt type byte.
    pub fn find(pager: &mut Pager, root_page_num: PageId, key: u32) -> Result<Self> {
        match node_type(pager.page(root_page_num)?)? {
            NodeType::Leaf => Self::leaf_find(pager, root_page_num, key),
            NodeType::Internal => Self::internal_find(pager, root_page_num, key),
        }
    }

    /// Binary search within one leaf.
    fn leaf_find(pager: &mut Pager, page_num: PageId, key: u32) -> Result<Self> {
        let leaf = LeafNode::new(pager.page(page_num)?);
        let num_cells = leaf.num_cells();

        let mut min_index = 0u32;
        let mut one_past_max_index = num_cells;
        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = leaf.key(index);
            if key == key_at_index {
                min_index = index;
                break;
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        let end_of_table = min_index == num_cells && leaf.next_leaf().is_none();
        Ok(Self {
            page_num,
            cell_num: min_index,
            end_of_table,
        })
    }

    /// Descend one internal level toward `key` and recurse.
    fn internal_find(pager: &mut Pager, page_num: PageId, key: u32) -> Result<Self> {
        let child = {
            let node = InternalNode::new(pager.page(page_num)?);
            let child_index = node.find_child_index(key);
            node.child(child_index)
        };

        match node_type(pager.page(child)?)? {
            NodeType::Leaf => Self::leaf_find(pager, child, key),
            NodeType::Internal => Self::internal_find(pager, child, key),
        }
    }

    /// The leaf page this cursor points into.
    #[inline]
    pub fn page_num(&self) -> PageId {
        self.page_num
    }

    /// The cell index within the leaf.
    #[inline]
    pub fn cell_num(&self) -> u32 {
        self.cell_num
    }

    /// Whether the cursor has run off the end of the table.
    #[inline]
    pub fn end_of_table(&self) -> bool {
        self.end_of_table
    }

    /// The key stored at the cursor's cell.
    ///
    /// Only meaningful while `cell_num` addresses an existing cell.
    pub fn key(&self, pager: &mut Pager) -> Result<u32> {
        let leaf = LeafNode::new(pager.page(self.page_num)?);
        Ok(leaf.key(self.cell_num))
    }

    /// The mutable value slot at the cursor's position.
    ///
    /// # Errors
    /// Propagates pager failures loading the leaf.
    ///
    /// # Panics
    /// Debug-asserts that the cursor has not run off the end of the
    /// table; a spent cursor addresses no cell.
    pub fn slot<'a>(&self, pager: &'a mut Pager) -> Result<&'a mut [u8]> {
        debug_assert!(!self.end_of_table, "slot on a cursor past the end of table");
        let leaf = LeafNode::new(pager.page(self.page_num)?);
        Ok(leaf.into_value_mut(self.cell_num))
    }

    /// Step to the next row in key order, following the sibling chain
    /// when the current leaf is exhausted.
    ///
    /// # Errors
    /// Propagates pager failures loading the leaf.
    pub fn advance(&mut self, pager: &mut Pager) -> Result<()> {
        self.cell_num += 1;

        let leaf = LeafNode::new(pager.page(self.page_num)?);
        if self.cell_num >= leaf.num_cells() {
            match leaf.next_leaf() {
                Some(next) => {
                    self.page_num = next;
                    self.cell_num = 0;
                }
                None => self.end_of_table = true,
            }
        }
        Ok(())
    }
}
