//! Table - the top-level handle over one database file.
//!
//! A [`Table`] owns the pager for a single file and exposes the public
//! operations: keyed insert, full scan in key order, and structure/layout
//! introspection. The root is always page 0; opening an empty file
//! initializes it as an empty root leaf.

use std::path::Path;

use log::{debug, warn};

use crate::common::PageId;
use crate::error::Result;
use crate::row::Row;
use crate::storage::Pager;
use crate::tree::node::{set_root, LeafNode};
use crate::tree::{btree, Cursor, Layout};

/// A single-file, single-table record store.
///
/// One `Table` per file; operations are strictly sequential. Mutations
/// live in the page cache until [`Table::close`] (or drop) flushes them.
pub struct Table {
    pager: Pager,
    root_page_num: PageId,
    closed: bool,
}

impl Table {
    /// Open a database file, creating and initializing it if empty.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened.
    /// - `Error::CorruptFile` if the file length is not page-aligned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pager = Pager::open(&path)?;
        let root_page_num = PageId::new(0);

        if pager.num_pages() == 0 {
            // New file: page 0 becomes an empty root leaf.
            let page = pager.page(root_page_num)?;
            LeafNode::init(page);
            set_root(page, true);
            debug!("initialized empty table at {:?}", path.as_ref());
        }

        Ok(Self {
            pager,
            root_page_num,
            closed: false,
        })
    }

    /// Insert a row, keyed by its id.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if a row with this id already exists.
    /// - `Error::TableFull` if the table has no room for a required split.
    /// - `Error::Unsupported` if the insert would split an internal node.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        btree::insert(&mut self.pager, self.root_page_num, row)
    }

    /// Iterate over every row in ascending key order.
    ///
    /// # Errors
    /// Propagates pager failures positioning at the first row.
    pub fn select_all(&mut self) -> Result<Rows<'_>> {
        let cursor = Cursor::start(&mut self.pager, self.root_page_num)?;
        Ok(Rows {
            pager: &mut self.pager,
            cursor,
            done: false,
        })
    }

    /// Render the tree structure as an indented outline.
    ///
    /// # Errors
    /// Propagates pager failures walking the tree.
    pub fn dump_tree(&mut self) -> Result<String> {
        btree::dump(&mut self.pager, self.root_page_num)
    }

    /// The computed on-page layout constants.
    pub fn layout(&self) -> Layout {
        Layout::new()
    }

    /// Flush all cached pages and fsync the file.
    ///
    /// Consumes the table; dropping without calling this still flushes,
    /// but swallows errors with a warning.
    ///
    /// # Errors
    /// `Error::Io` on a failed write or fsync.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.pager.flush_all()
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.pager.flush_all() {
                warn!("failed to flush table on drop: {err}");
            }
        }
    }
}

/// Iterator over all rows of a table, in ascending key order.
///
/// Borrows the table mutably for its lifetime; each step deserializes
/// one row from its leaf cell.
pub struct Rows<'a> {
    pager: &'a mut Pager,
    cursor: Cursor,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor.end_of_table() {
            return None;
        }

        let row = match self.cursor.slot(self.pager) {
            Ok(slot) => Row::read_from(slot),
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if let Err(err) = self.cursor.advance(self.pager) {
            self.done = true;
            return Some(Err(err));
        }
        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_select() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();

        table
            .insert(&Row::new(2, "bob", "bob@example.com").unwrap())
            .unwrap();
        table
            .insert(&Row::new(1, "alice", "alice@example.com").unwrap())
            .unwrap();

        let rows: Vec<Row> = table.select_all().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(), 1);
        assert_eq!(rows[0].username(), "alice");
        assert_eq!(rows[1].id(), 2);
        assert_eq!(rows[1].email(), "bob@example.com");
    }

    #[test]
    fn test_empty_table_scans_nothing() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        assert_eq!(table.select_all().unwrap().count(), 0);
    }

    #[test]
    fn test_close_then_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut table = Table::open(&path).unwrap();
        table
            .insert(&Row::new(7, "carol", "carol@example.com").unwrap())
            .unwrap();
        table.close().unwrap();

        let mut table = Table::open(&path).unwrap();
        let rows: Vec<Row> = table.select_all().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), 7);
        assert_eq!(rows[0].username(), "carol");
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut table = Table::open(&path).unwrap();
            table
                .insert(&Row::new(1, "dave", "dave@example.com").unwrap())
                .unwrap();
        }

        let mut table = Table::open(&path).unwrap();
        assert_eq!(table.select_all().unwrap().count(), 1);
    }

    #[test]
    fn test_layout_snapshot() {
        let dir = tempdir().unwrap();
        let table = Table::open(dir.path().join("test.db")).unwrap();
        let layout = table.layout();
        assert_eq!(layout.row_size, 291);
        assert_eq!(layout.leaf_node_max_cells, 13);
    }
}
