//! Configuration constants for tinytable.

/// Size of a page in bytes (4KB).
///
/// Pages are the unit of I/O and caching. 4096 bytes matches the OS page
/// size on most systems, so a page read or write maps onto a single
/// kernel-level page operation.
pub const PAGE_SIZE: usize = 4096;

/// Fixed cap on the number of pages a table may use.
///
/// The pager's in-memory page table is sized to this constant at open time;
/// it is a design-time limit on table size, not a dynamic one. With 4KB
/// pages this bounds a database file at 400KB.
pub const TABLE_MAX_PAGES: u32 = 100;

/// Capacity of the `username` column in bytes.
pub const USERNAME_CAPACITY: usize = 32;

/// Capacity of the `email` column in bytes.
pub const EMAIL_CAPACITY: usize = 255;
