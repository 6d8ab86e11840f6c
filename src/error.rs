//! Error types for tinytable.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in tinytable.
///
/// A single error type keeps error handling consistent across the engine.
/// Two variants are recoverable and reported to the caller as ordinary
/// outcomes of an insert: [`Error::DuplicateKey`] and [`Error::TableFull`].
/// Everything else signals a condition the engine has no recovery strategy
/// for; the session should be abandoned.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file's length is not a whole multiple of the page size.
    ///
    /// Pages are the only unit of I/O, so a ragged file length means the
    /// file was truncated or written by something else.
    #[error("database file size {0} is not a whole number of pages; corrupt file")]
    CorruptFile(u64),

    /// A page number at or beyond the fixed page budget was requested.
    #[error("page number {0} is out of bounds for the fixed page table")]
    PageOutOfBounds(u32),

    /// Attempted to flush a page that was never loaded into memory.
    ///
    /// This indicates a bug - only materialized pages can be dirty.
    #[error("tried to flush page {0}, which was never loaded")]
    FlushUnloadedPage(u32),

    /// A page header carries an unknown node-type byte.
    #[error("unknown node type byte {0:#04x} in page header")]
    InvalidNodeType(u8),

    /// The key being inserted already exists; rows are never overwritten.
    #[error("duplicate key {0}")]
    DuplicateKey(u32),

    /// The table has used every page in its fixed budget.
    #[error("table full")]
    TableFull,

    /// The operation would need a code path that is deliberately not
    /// implemented (splitting a full internal node).
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A string column value exceeds its fixed capacity.
    #[error("value for column `{0}` exceeds its capacity")]
    StringTooLong(&'static str),
}
