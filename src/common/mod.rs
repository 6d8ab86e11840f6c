//! Common types and utilities shared across tinytable.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - The page identifier type

pub mod config;
mod page_id;

pub use page_id::PageId;
