//! B-tree insertion and structure maintenance.
//!
//! All mutation of the tree shape lives here: sorted insertion into a
//! leaf, splitting a full leaf, promoting a new root, and registering a
//! split-off leaf with its parent. Read paths live in
//! [`crate::tree::cursor`].
//!
//! The tree grows to at most two levels: a root (leaf or internal) over
//! leaf children. Internal nodes never split; an insert that would
//! require one fails with `Error::Unsupported`.

use crate::common::config::TABLE_MAX_PAGES;
use crate::common::PageId;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::storage::Pager;
use crate::tree::cursor::Cursor;
use crate::tree::node::{
    is_root, max_key, node_type, parent, set_parent, set_root, InternalNode, LeafNode, NodeType,
    INTERNAL_NODE_MAX_KEYS, LEAF_NODE_CELL_SIZE, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_VALUE_OFFSET,
};

/// Insert a row, keyed by its id, keeping keys unique and sorted.
///
/// # Errors
/// - `Error::DuplicateKey` if the id is already present. The tree is
///   unchanged.
/// - `Error::TableFull` if a required split cannot get its new pages.
///   The tree is unchanged.
/// - `Error::Unsupported` if the insert would split an internal node.
pub fn insert(pager: &mut Pager, root_page_num: PageId, row: &Row) -> Result<()> {
    let key = row.id();
    let cursor = Cursor::find(pager, root_page_num, key)?;

    let leaf = LeafNode::new(pager.page(cursor.page_num())?);
    let num_cells = leaf.num_cells();
    if cursor.cell_num() < num_cells && leaf.key(cursor.cell_num()) == key {
        return Err(Error::DuplicateKey(key));
    }

    if num_cells as usize >= LEAF_NODE_MAX_CELLS {
        leaf_split_and_insert(pager, root_page_num, &cursor, key, row)
    } else {
        leaf_insert(pager, &cursor, key, row)
    }
}

/// Insert into a leaf with spare capacity, shifting later cells right.
fn leaf_insert(pager: &mut Pager, cursor: &Cursor, key: u32, row: &Row) -> Result<()> {
    let mut leaf = LeafNode::new(pager.page(cursor.page_num())?);
    let num_cells = leaf.num_cells();
    debug_assert!((num_cells as usize) < LEAF_NODE_MAX_CELLS);

    if cursor.cell_num() < num_cells {
        leaf.shift_cells_right(cursor.cell_num());
    }
    leaf.set_num_cells(num_cells + 1);
    leaf.set_key(cursor.cell_num(), key);
    row.write_to(leaf.into_value_mut(cursor.cell_num()));
    Ok(())
}

/// Split a full leaf and insert the new cell into the correct half.
///
/// The upper (right) half of the max+1 cells moves to a fresh leaf that
/// takes over the old leaf's place in the sibling chain. If the old leaf
/// was the root, a new internal root is promoted above the two halves;
/// otherwise the existing parent is updated in place.
///
/// Page allocation is checked up front so a full table fails before any
/// page is modified.
fn leaf_split_and_insert(
    pager: &mut Pager,
    root_page_num: PageId,
    cursor: &Cursor,
    key: u32,
    row: &Row,
) -> Result<()> {
    let old_page_num = cursor.page_num();
    let (old_max, splitting_root) = {
        let page = pager.page(old_page_num)?;
        (max_key(page)?, is_root(page))
    };

    // One page for the new leaf, plus one for the promoted root.
    let pages_needed: u32 = if splitting_root { 2 } else { 1 };
    if pager.num_pages() + pages_needed > TABLE_MAX_PAGES {
        return Err(Error::TableFull);
    }

    // Stage the incoming cell so the redistribution loop can treat it
    // like any other source cell.
    let mut incoming = [0u8; LEAF_NODE_CELL_SIZE];
    incoming[..4].copy_from_slice(&key.to_le_bytes());
    row.write_to(&mut incoming[LEAF_NODE_VALUE_OFFSET..]);

    let new_page_num = pager.unused_page_num();
    {
        let (old_page, new_page) = pager.page_pair(old_page_num, new_page_num)?;
        LeafNode::init(new_page);
        set_parent(new_page, parent(old_page));

        let mut old_leaf = LeafNode::new(old_page);
        let mut new_leaf = LeafNode::new(new_page);

        // Splice the new leaf into the sibling chain.
        new_leaf.set_next_leaf(old_leaf.next_leaf());
        old_leaf.set_next_leaf(Some(new_page_num));

        // Redistribute all max+1 cells across the two halves, walking
        // from the highest position down so in-place moves within the
        // old leaf never clobber an unread cell.
        for i in (0..=LEAF_NODE_MAX_CELLS as u32).rev() {
            let goes_right = i as usize >= LEAF_NODE_LEFT_SPLIT_COUNT;
            let index_within = i % LEAF_NODE_LEFT_SPLIT_COUNT as u32;

            if i == cursor.cell_num() {
                if goes_right {
                    new_leaf.write_cell(index_within, &incoming);
                } else {
                    old_leaf.write_cell(index_within, &incoming);
                }
            } else {
                // Cells above the insertion point shift up by one.
                let src = if i > cursor.cell_num() { i - 1 } else { i };
                if goes_right {
                    new_leaf.write_cell(index_within, old_leaf.cell(src));
                } else {
                    old_leaf.copy_cell_within(src, index_within);
                }
            }
        }

        old_leaf.set_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
        new_leaf.set_num_cells((LEAF_NODE_MAX_CELLS + 1 - LEAF_NODE_LEFT_SPLIT_COUNT) as u32);
    }

    if splitting_root {
        create_new_root(pager, root_page_num, new_page_num)
    } else {
        let parent_page_num = parent(pager.page(old_page_num)?);
        let new_old_max = max_key(pager.page(old_page_num)?)?;
        update_internal_node_key(pager, parent_page_num, old_max, new_old_max)?;
        internal_insert(pager, parent_page_num, new_page_num)
    }
}

/// Promote a new internal root above a just-split root leaf.
///
/// The old root's contents move to a fresh page (the left child) so the
/// root keeps its fixed page number; the root page is then rebuilt as an
/// internal node over the two halves.
fn create_new_root(
    pager: &mut Pager,
    root_page_num: PageId,
    right_child_page_num: PageId,
) -> Result<()> {
    let left_child_page_num = pager.unused_page_num();

    {
        let (root_page, left_page) = pager.page_pair(root_page_num, left_child_page_num)?;

        // The old root's cells move wholesale to the left child.
        left_page.as_mut_slice().copy_from_slice(root_page.as_slice());
        set_root(left_page, false);
        set_parent(left_page, root_page_num);
        let left_max = max_key(left_page)?;

        InternalNode::init(root_page);
        set_root(root_page, true);
        let mut root = InternalNode::new(root_page);
        root.set_num_keys(1);
        root.set_child(0, left_child_page_num);
        root.set_key(0, left_max);
        root.set_right_child(right_child_page_num);
    }

    set_parent(pager.page(right_child_page_num)?, root_page_num);
    Ok(())
}

/// Rewrite the separator for a child whose maximum key changed.
///
/// No-op when the child is the right child, which has no separator.
fn update_internal_node_key(
    pager: &mut Pager,
    page_num: PageId,
    old_key: u32,
    new_key: u32,
) -> Result<()> {
    let mut node = InternalNode::new(pager.page(page_num)?);
    let child_index = node.find_child_index(old_key);
    if child_index < node.num_keys() {
        node.set_key(child_index, new_key);
    }
    Ok(())
}

/// Register a new child (and its max key) with an internal node.
///
/// A child whose keys exceed the current right child's becomes the new
/// right child, demoting the old one into the cell array; otherwise a
/// cell is opened at the sorted position. Exposed to tests.
///
/// # Errors
/// `Error::Unsupported` when the node is already at capacity, since
/// internal nodes do not split.
pub(crate) fn internal_insert(
    pager: &mut Pager,
    parent_page_num: PageId,
    child_page_num: PageId,
) -> Result<()> {
    let child_max = max_key(pager.page(child_page_num)?)?;

    let (child_index, original_num_keys, right_child_page_num) = {
        let node = InternalNode::new(pager.page(parent_page_num)?);
        (
            node.find_child_index(child_max),
            node.num_keys(),
            node.right_child(),
        )
    };

    if original_num_keys as usize >= INTERNAL_NODE_MAX_KEYS {
        return Err(Error::Unsupported("internal node splitting"));
    }

    let right_max = max_key(pager.page(right_child_page_num)?)?;
    let mut node = InternalNode::new(pager.page(parent_page_num)?);

    if child_max > right_max {
        // New child sorts past the right child: demote the old right
        // child into the last cell and take its place.
        node.set_child(original_num_keys, right_child_page_num);
        node.set_key(original_num_keys, right_max);
        node.set_right_child(child_page_num);
    } else {
        node.shift_cells_right(child_index);
        node.set_child(child_index, child_page_num);
        node.set_key(child_index, child_max);
    }
    node.set_num_keys(original_num_keys + 1);
    Ok(())
}

/// Render the tree structure as an indented outline, pre-order.
///
/// Internal nodes list each child followed by the separator key above
/// it; leaves list their keys.
pub fn dump(pager: &mut Pager, root_page_num: PageId) -> Result<String> {
    let mut out = String::new();
    dump_node(pager, root_page_num, 0, &mut out)?;
    Ok(out)
}

fn dump_node(pager: &mut Pager, page_num: PageId, depth: usize, out: &mut String) -> Result<()> {
    let page = pager.page(page_num)?;
    match node_type(page)? {
        NodeType::Leaf => {
            let leaf = LeafNode::new(page);
            let num_cells = leaf.num_cells();
            let keys: Vec<u32> = (0..num_cells).map(|i| leaf.key(i)).collect();

            push_line(out, depth, &format!("- leaf (size {num_cells})"));
            for key in keys {
                push_line(out, depth + 1, &format!("- {key}"));
            }
        }
        NodeType::Internal => {
            let node = InternalNode::new(page);
            let num_keys = node.num_keys();
            let cells: Vec<(PageId, u32)> =
                (0..num_keys).map(|i| (node.child(i), node.key(i))).collect();
            let right_child = node.right_child();

            push_line(out, depth, &format!("- internal (size {num_keys})"));
            for (child, key) in cells {
                dump_node(pager, child, depth + 1, out)?;
                push_line(out, depth + 1, &format!("- key {key}"));
            }
            dump_node(pager, right_child, depth + 1, out)?;
        }
    }
    Ok(())
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}
