//! Chained hash table with pluggable hash and equality functions.
//!
//! Separate chaining over [`SList`] buckets. The workload this serves is
//! build-once/read-many (a routing table populated at startup), so chains
//! are scanned linearly and inserts pay an up-front duplicate check.

use super::list::SList;
use super::{Keyed, TableError};

/// Hash table of entries keyed through the [`Keyed`] trait.
///
/// Hash and equality are plain function pointers over the key type, so a
/// single table type serves any entry layout. Invariant: no two stored
/// entries compare equal under `matches`, and `len` always equals the total
/// number of live entries across all chains.
pub struct ChainedTable<T: Keyed> {
    buckets: Vec<SList<T>>,
    hash: fn(&T::Key) -> u64,
    matches: fn(&T::Key, &T::Key) -> bool,
    len: usize,
}

impl<T: Keyed> ChainedTable<T> {
    /// Create a table with `bucket_count` empty chains.
    ///
    /// The bucket array is reserved fallibly; on memory exhaustion this
    /// returns [`TableError::Alloc`] rather than aborting.
    pub fn new(
        bucket_count: usize,
        hash: fn(&T::Key) -> u64,
        matches: fn(&T::Key, &T::Key) -> bool,
    ) -> Result<Self, TableError> {
        assert!(bucket_count > 0, "bucket count must be non-zero");

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|_| TableError::Alloc(bucket_count * std::mem::size_of::<SList<T>>()))?;
        buckets.resize_with(bucket_count, SList::new);

        Ok(Self {
            buckets,
            hash,
            matches,
            len: 0,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets the table was created with.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, key: &T::Key) -> usize {
        ((self.hash)(key) % self.buckets.len() as u64) as usize
    }

    /// Insert an entry, failing with [`TableError::Duplicate`] if an equal
    /// entry is already stored. New entries are prepended to the chain head.
    pub fn insert(&mut self, entry: T) -> Result<(), TableError> {
        let matches = self.matches;
        let bucket = self.bucket_of(entry.key());

        if self.buckets[bucket]
            .iter()
            .any(|stored| matches(entry.key(), stored.key()))
        {
            return Err(TableError::Duplicate);
        }

        self.buckets[bucket].push_front(entry);
        self.len += 1;
        Ok(())
    }

    /// Look up the entry stored under `key`.
    ///
    /// Returns the stored entry itself (not a boolean), so callers can
    /// deduplicate identical-but-distinct objects by reference.
    pub fn lookup(&self, key: &T::Key) -> Option<&T> {
        let matches = self.matches;
        let bucket = self.bucket_of(key);

        self.buckets[bucket]
            .iter()
            .find(|stored| matches(key, stored.key()))
    }

    /// Whether an entry is stored under `key`.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.lookup(key).is_some()
    }

    /// Unlink and return the entry stored under `key`, failing with
    /// [`TableError::NotFound`] if absent.
    pub fn remove(&mut self, key: &T::Key) -> Result<T, TableError> {
        let matches = self.matches;
        let bucket = self.bucket_of(key);

        match self.buckets[bucket].remove_where(|stored| matches(key, stored.key())) {
            Some(entry) => {
                self.len -= 1;
                Ok(entry)
            }
            None => Err(TableError::NotFound),
        }
    }

    /// Visit every live entry, in bucket order then chain order.
    ///
    /// Takes `&self`, so the table cannot be mutated mid-traversal.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(&T),
    {
        for bucket in &self.buckets {
            for entry in bucket.iter() {
                visitor(entry);
            }
        }
    }

    /// Drain all entries, keeping the bucket array for reuse.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }
}
