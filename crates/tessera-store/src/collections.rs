//! Typed views over prefixed ranges of the key space.
//!
//! A collection owns one prefix byte. Its entries live under
//! `prefix || encoded key`, so a prefix walk enumerates exactly that
//! collection in key order.

use std::marker::PhantomData;
use std::ops::ControlFlow;

use serde::{de::DeserializeOwned, Serialize};

use crate::codec::{decode_value, encode_value, KeyCodec};
use crate::{KvStore, Order, Result, StoreError};

/// Keyed collection of `V` values.
#[derive(Debug)]
pub struct Map<K, V> {
    prefix: u8,
    name: &'static str,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Map<K, V> {
    pub const fn new(prefix: u8, name: &'static str) -> Self {
        Self {
            prefix,
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<K: KeyCodec, V: Serialize + DeserializeOwned> Map<K, V> {
    fn storage_key(&self, key: &K) -> Vec<u8> {
        let mut buf = vec![self.prefix];
        key.encode_key(&mut buf);
        buf
    }

    pub fn get<S: KvStore + ?Sized>(&self, store: &S, key: &K) -> Result<Option<V>> {
        match store.get(&self.storage_key(key))? {
            Some(bytes) => Ok(Some(decode_value(self.name, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has<S: KvStore + ?Sized>(&self, store: &S, key: &K) -> Result<bool> {
        store.has(&self.storage_key(key))
    }

    pub fn set<S: KvStore + ?Sized>(&self, store: &mut S, key: &K, value: &V) -> Result<()> {
        let bytes = encode_value(self.name, value)?;
        store.set(&self.storage_key(key), &bytes)
    }

    pub fn remove<S: KvStore + ?Sized>(&self, store: &mut S, key: &K) -> Result<()> {
        store.delete(&self.storage_key(key))
    }

    /// Visit entries in key order until `f` breaks or fails.
    ///
    /// `f` may fail with the caller's own error type; store and codec
    /// failures are converted into it.
    pub fn walk<S, E, F>(&self, store: &S, order: Order, mut f: F) -> std::result::Result<(), E>
    where
        S: KvStore + ?Sized,
        E: From<StoreError>,
        F: FnMut(K, V) -> std::result::Result<ControlFlow<()>, E>,
    {
        let name = self.name;
        let mut failure: Option<E> = None;

        store
            .walk(
                &[self.prefix],
                order,
                &mut |raw_key: &[u8], raw_value: &[u8]| -> Result<ControlFlow<()>> {
                    let key = K::decode_key(&raw_key[1..]).map_err(|detail| {
                        StoreError::InvalidKey {
                            collection: name,
                            detail,
                        }
                    })?;
                    let value = decode_value(name, raw_value)?;
                    match f(key, value) {
                        Ok(flow) => Ok(flow),
                        Err(e) => {
                            failure = Some(e);
                            Ok(ControlFlow::Break(()))
                        }
                    }
                },
            )
            .map_err(E::from)?;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// All keys in ascending order.
    pub fn keys<S: KvStore + ?Sized>(&self, store: &S) -> Result<Vec<K>> {
        let mut keys = Vec::new();
        self.walk(store, Order::Ascending, |key, _| -> Result<ControlFlow<()>> {
            keys.push(key);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(keys)
    }

    /// All entries in ascending key order.
    pub fn entries<S: KvStore + ?Sized>(&self, store: &S) -> Result<Vec<(K, V)>> {
        let mut entries = Vec::new();
        self.walk(store, Order::Ascending, |key, value| -> Result<ControlFlow<()>> {
            entries.push((key, value));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(entries)
    }
}

/// Single value stored under one key byte.
#[derive(Debug)]
pub struct Item<V> {
    key: u8,
    name: &'static str,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Item<V> {
    pub const fn new(key: u8, name: &'static str) -> Self {
        Self {
            key,
            name,
            _marker: PhantomData,
        }
    }
}

impl<V: Serialize + DeserializeOwned> Item<V> {
    pub fn get<S: KvStore + ?Sized>(&self, store: &S) -> Result<Option<V>> {
        match store.get(&[self.key])? {
            Some(bytes) => Ok(Some(decode_value(self.name, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set<S: KvStore + ?Sized>(&self, store: &mut S, value: &V) -> Result<()> {
        let bytes = encode_value(self.name, value)?;
        store.set(&[self.key], &bytes)
    }

    pub fn remove<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.delete(&[self.key])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemStore;

    const PRICES: Map<i64, u64> = Map::new(0x10, "prices");
    const LABELS: Map<String, String> = Map::new(0x11, "labels");
    const SINGLETON: Item<u32> = Item::new(0x12, "singleton");

    #[test]
    fn test_map_roundtrip() {
        let mut store = MemStore::new();
        PRICES.set(&mut store, &300, &30).expect("set");
        assert_eq!(PRICES.get(&store, &300).expect("get"), Some(30));
        assert_eq!(PRICES.get(&store, &301).expect("get"), None);
        assert!(PRICES.has(&store, &300).expect("has"));

        PRICES.remove(&mut store, &300).expect("remove");
        assert_eq!(PRICES.get(&store, &300).expect("get"), None);
    }

    #[test]
    fn test_collections_do_not_overlap() {
        let mut store = MemStore::new();
        PRICES.set(&mut store, &1, &1).expect("set");
        LABELS.set(&mut store, &"a".to_string(), &"x".to_string()).expect("set");
        SINGLETON.set(&mut store, &9).expect("set");

        assert_eq!(PRICES.keys(&store).expect("keys"), vec![1]);
        assert_eq!(LABELS.keys(&store).expect("keys"), vec!["a".to_string()]);
        assert_eq!(SINGLETON.get(&store).expect("get"), Some(9));
    }

    #[test]
    fn test_walk_descending_with_negative_keys() {
        let mut store = MemStore::new();
        for ts in [-10, 5, 0, 200, 100] {
            PRICES.set(&mut store, &ts, &(ts.unsigned_abs())).expect("set");
        }

        let mut seen = Vec::new();
        PRICES
            .walk(&store, Order::Descending, |ts, _| -> Result<ControlFlow<()>> {
                seen.push(ts);
                Ok(ControlFlow::Continue(()))
            })
            .expect("walk");
        assert_eq!(seen, vec![200, 100, 5, 0, -10]);
    }

    #[derive(Debug)]
    enum CallerError {
        Store(StoreError),
        Rejected(i64),
    }

    impl From<StoreError> for CallerError {
        fn from(e: StoreError) -> Self {
            CallerError::Store(e)
        }
    }

    #[test]
    fn test_walk_propagates_caller_error() {
        let mut store = MemStore::new();
        for ts in [1, 2, 3] {
            PRICES.set(&mut store, &ts, &0).expect("set");
        }

        let mut visited = 0;
        let result = PRICES.walk(&store, Order::Ascending, |ts, _| {
            visited += 1;
            if ts == 2 {
                Err(CallerError::Rejected(ts))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        });

        assert!(matches!(result, Err(CallerError::Rejected(2))));
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_walk_surfaces_corrupt_value() {
        let mut store = MemStore::new();
        store.set(&[0x10, 0x80, 0, 0, 0, 0, 0, 0, 1], &[0xff]).expect("raw set");

        let result = PRICES.entries(&store);
        assert!(matches!(
            result,
            Err(StoreError::Codec {
                collection: "prices",
                ..
            })
        ));
    }

    #[test]
    fn test_item_remove() {
        let mut store = MemStore::new();
        SINGLETON.set(&mut store, &1).expect("set");
        SINGLETON.remove(&mut store).expect("remove");
        assert_eq!(SINGLETON.get(&store).expect("get"), None);
    }
}
