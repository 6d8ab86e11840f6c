//! Storage layer - the backing file and the page cache.
//!
//! - [`Page`] - The fixed-size unit of I/O and caching
//! - [`Pager`] - Lazy page cache over a single flat file

mod page;
mod pager;

pub use page::Page;
pub use pager::Pager;
