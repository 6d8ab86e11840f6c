//! Row - the fixed-width record type and its codec.
//!
//! A row is `(id, username, email)` serialized as `id ‖ username ‖ email`
//! with no delimiters. Strings are zero-padded to their column capacity,
//! so every row occupies exactly [`ROW_SIZE`] bytes in a leaf cell.

use std::fmt;

use crate::common::config::{EMAIL_CAPACITY, USERNAME_CAPACITY};
use crate::error::{Error, Result};

/// Serialized size of the `id` column.
pub const ID_SIZE: usize = std::mem::size_of::<u32>();
/// Byte offset of `id` within a serialized row.
pub const ID_OFFSET: usize = 0;
/// Byte offset of `username` within a serialized row.
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
/// Byte offset of `email` within a serialized row.
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_CAPACITY;
/// Total serialized size of a row.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_CAPACITY + EMAIL_CAPACITY;

/// A single record: id plus two fixed-capacity string columns.
///
/// The id doubles as the B-tree key. Construction validates column
/// capacities; the codec itself never truncates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    id: u32,
    username: [u8; USERNAME_CAPACITY],
    email: [u8; EMAIL_CAPACITY],
}

impl Row {
    /// Create a row, validating string lengths against column capacities.
    ///
    /// # Errors
    /// `Error::StringTooLong` if either string exceeds its column capacity.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self> {
        if username.len() > USERNAME_CAPACITY {
            return Err(Error::StringTooLong("username"));
        }
        if email.len() > EMAIL_CAPACITY {
            return Err(Error::StringTooLong("email"));
        }

        let mut row = Self {
            id,
            username: [0; USERNAME_CAPACITY],
            email: [0; EMAIL_CAPACITY],
        };
        row.username[..username.len()].copy_from_slice(username.as_bytes());
        row.email[..email.len()].copy_from_slice(email.as_bytes());
        Ok(row)
    }

    /// The row id (also the B-tree key).
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The username, with zero padding stripped.
    pub fn username(&self) -> &str {
        trim_padding(&self.username)
    }

    /// The email, with zero padding stripped.
    pub fn email(&self) -> &str {
        trim_padding(&self.email)
    }

    /// Serialize this row into a value slot.
    ///
    /// # Panics
    /// Panics if `slot` is shorter than [`ROW_SIZE`].
    pub fn write_to(&self, slot: &mut [u8]) {
        assert!(slot.len() >= ROW_SIZE, "slot too small for a Row");

        slot[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        slot[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_CAPACITY].copy_from_slice(&self.username);
        slot[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_CAPACITY].copy_from_slice(&self.email);
    }

    /// Deserialize a row from a value slot.
    ///
    /// # Panics
    /// Panics if `slot` is shorter than [`ROW_SIZE`].
    pub fn read_from(slot: &[u8]) -> Self {
        assert!(slot.len() >= ROW_SIZE, "slot too small for a Row");

        let id = u32::from_le_bytes([
            slot[ID_OFFSET],
            slot[ID_OFFSET + 1],
            slot[ID_OFFSET + 2],
            slot[ID_OFFSET + 3],
        ]);

        let mut username = [0u8; USERNAME_CAPACITY];
        username.copy_from_slice(&slot[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_CAPACITY]);

        let mut email = [0u8; EMAIL_CAPACITY];
        email.copy_from_slice(&slot[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_CAPACITY]);

        Self {
            id,
            username,
            email,
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}

/// Strip trailing zero padding and view the remainder as UTF-8.
fn trim_padding(bytes: &[u8]) -> &str {
    let len = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..len]).unwrap_or("<invalid utf-8>")
}
