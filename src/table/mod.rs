//! Generic keyed containers.
//!
//! Provides:
//! - [`SList`] - singly-linked list with tail-tracked O(1) append
//! - [`ChainedTable`] - separate-chaining hash table over [`SList`] buckets
//!
//! Both are plain data structures with no broker knowledge; the routing
//! layer builds on them.

mod chained;
mod list;

pub use chained::ChainedTable;
pub use list::SList;

use thiserror::Error;

/// Entries stored in a [`ChainedTable`] expose the key they are stored
/// under. Keeping key and entry distinct lets lookups probe with a bare key
/// instead of constructing a throwaway entry.
pub trait Keyed {
    /// Key type the table hashes and compares.
    type Key: ?Sized;

    /// The key this entry is stored under.
    fn key(&self) -> &Self::Key;
}

/// Errors local to the container layer. Recoverable; reported to the
/// immediate caller without affecting other entries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// An equal entry is already stored.
    #[error("an equal entry is already stored")]
    Duplicate,

    /// No entry matches the given key.
    #[error("no matching entry")]
    NotFound,

    /// Reserving the bucket array failed.
    #[error("allocation of {0} bytes failed")]
    Alloc(usize),
}
