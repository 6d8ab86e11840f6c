//! B-tree layer - interprets pages as sorted key/row nodes.
//!
//! - [`node`] - On-page layout and typed node views
//! - [`Cursor`] - A position in key order, for lookups and scans
//! - [`btree`] - Insertion, leaf splitting, and root promotion
//! - [`Layout`] - Introspection over the computed layout constants

pub mod btree;
mod cursor;
pub mod node;

pub use cursor::Cursor;
pub use node::Layout;
