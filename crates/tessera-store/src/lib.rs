//! # tessera-store
//!
//! Ordered key-value storage for the oracle state machine.
//!
//! Every piece of module state lives in one byte-ordered key space. Iteration
//! order is part of the consensus contract: two replicas that hold the same
//! bytes must walk them in the same order, whichever backend they use.
//!
//! ## Modules
//!
//! - [`memory`] — `BTreeMap` backend, used by tests and simulations
//! - [`sqlite`] — SQLite backend with forward-only schema migrations
//! - [`codec`] — key encodings and the CBOR value codec
//! - [`collections`] — typed `Map` / `Item` views over a prefix

pub mod codec;
pub mod collections;
pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::ops::ControlFlow;

pub use collections::{Item, Map};
pub use memory::MemStore;
pub use sqlite::SqliteStore;

/// Current schema version of the SQLite backend.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    /// A stored value could not be encoded or decoded.
    #[error("codec error in {collection}: {detail}")]
    Codec {
        collection: &'static str,
        detail: String,
    },

    /// A stored key does not decode as the collection's key type.
    #[error("invalid key in {collection}: {detail}")]
    InvalidKey {
        collection: &'static str,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Iteration direction over the key space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Callback driven by [`KvStore::walk`]. Returning `Break` ends the walk.
pub type Visitor<'v> = &'v mut dyn FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>>;

/// Byte-ordered key-value store.
///
/// Keys compare lexicographically as unsigned bytes. Implementations must
/// visit keys in exactly that order (or its reverse) so that every backend
/// produces identical iteration sequences for identical contents.
pub trait KvStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Visit every entry whose key starts with `prefix`, in `order`.
    ///
    /// Entries are produced lazily; the walk stops as soon as `visit`
    /// returns `ControlFlow::Break` or an error.
    fn walk(&self, prefix: &[u8], order: Order, visit: Visitor<'_>) -> Result<()>;

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: KvStore + ?Sized> KvStore for &mut T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn walk(&self, prefix: &[u8], order: Order, visit: Visitor<'_>) -> Result<()> {
        (**self).walk(prefix, order, visit)
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns `None` when no such bound exists (empty prefix or all `0xFF`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// BLAKE3 digest of the entire key space in ascending key order.
///
/// Each entry contributes `len(key) || key || len(value) || value` with
/// big-endian u64 lengths, so distinct contents cannot collide by
/// concatenation.
pub fn state_hash<S: KvStore + ?Sized>(store: &S) -> Result<[u8; 32]> {
    let mut hasher = blake3::Hasher::new();
    store.walk(&[], Order::Ascending, &mut |key: &[u8], value: &[u8]| -> Result<ControlFlow<()>> {
        hasher.update(&(key.len() as u64).to_be_bytes());
        hasher.update(key);
        hasher.update(&(value.len() as u64).to_be_bytes());
        hasher.update(value);
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end(&[0x01]), Some(vec![0x02]));
        assert_eq!(prefix_end(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_end(&[0xFF, 0xFF]), None);
        assert_eq!(prefix_end(&[]), None);
    }

    #[test]
    fn test_state_hash_matches_across_backends() {
        let mut mem = MemStore::new();
        let mut sql = SqliteStore::open_memory().expect("open sqlite");

        for store in [&mut mem as &mut dyn KvStore, &mut sql as &mut dyn KvStore] {
            store.set(b"\x02b", b"two").expect("set");
            store.set(b"\x01a", b"one").expect("set");
            store.set(b"\x02a", b"three").expect("set");
            store.delete(b"\x02b").expect("delete");
        }

        let a = state_hash(&mem).expect("hash mem");
        let b = state_hash(&sql).expect("hash sqlite");
        assert_eq!(a, b);
    }

    #[test]
    fn test_state_hash_sensitive_to_boundaries() {
        let mut left = MemStore::new();
        left.set(b"ab", b"c").expect("set");
        let mut right = MemStore::new();
        right.set(b"a", b"bc").expect("set");

        assert_ne!(
            state_hash(&left).expect("hash"),
            state_hash(&right).expect("hash")
        );
    }

    #[test]
    fn test_empty_store_hash_is_stable() {
        let a = state_hash(&MemStore::new()).expect("hash");
        let b = state_hash(&MemStore::new()).expect("hash");
        assert_eq!(a, b);
    }
}
