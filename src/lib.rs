//! tinytable - a single-file, single-table embedded record store.
//!
//! Rows live in a B-tree of fixed-size 4KB pages backed by one flat file.
//! Leaf nodes hold sorted (key, row) cells and chain to their right
//! sibling for sequential scans; a single internal root fans out over the
//! leaves once the first leaf splits.
//!
//! # Architecture
//! ```text
//! ┌────────────────────────────┐
//! │           Table            │  open / insert / select_all / close
//! ├──────────────┬─────────────┤
//! │    Cursor    │    btree    │  key-order positions / splits
//! ├──────────────┴─────────────┤
//! │            node            │  on-page leaf & internal layout
//! ├────────────────────────────┤
//! │       Pager  /  Page       │  lazy page cache over the file
//! └────────────────────────────┘
//! ```
//!
//! # Example
//! ```no_run
//! use tinytable::{Row, Table};
//!
//! # fn main() -> tinytable::Result<()> {
//! let mut table = Table::open("users.db")?;
//! table.insert(&Row::new(1, "alice", "alice@example.com")?)?;
//! for row in table.select_all()? {
//!     println!("{}", row?);
//! }
//! table.close()?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod error;
pub mod row;
pub mod storage;
pub mod table;
pub mod tree;

pub use common::config::PAGE_SIZE;
pub use common::PageId;
pub use error::{Error, Result};
pub use row::Row;
pub use storage::{Page, Pager};
pub use table::{Rows, Table};
pub use tree::{Cursor, Layout};
