//! In-memory backend.

use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};

use crate::{prefix_end, KvStore, Order, Result, Visitor};

/// `BTreeMap`-backed store. `Vec<u8>` ordering is lexicographic over
/// unsigned bytes, which is exactly the ordering the [`KvStore`] contract
/// requires.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn drive<'a>(
    entries: impl Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)>,
    visit: Visitor<'_>,
) -> Result<()> {
    for (key, value) in entries {
        if visit(key, value)?.is_break() {
            break;
        }
    }
    Ok(())
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn walk(&self, prefix: &[u8], order: Order, visit: Visitor<'_>) -> Result<()> {
        let end = prefix_end(prefix);
        let upper = match &end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        let range = self
            .entries
            .range::<[u8], _>((Bound::Included(prefix), upper));

        match order {
            Order::Ascending => drive(range, visit),
            Order::Descending => drive(range.rev(), visit),
        }
    }
}
