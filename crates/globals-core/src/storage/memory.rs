//! # In-Memory Engine
//!
//! Volatile engine: encoded keys in a `BTreeMap`, so map order is collation
//! order and subtree queries are range scans.

use super::{check_coordinate, check_value, sibling_from_key, sibling_seek, undefined};
use crate::engine::Engine;
use crate::keys::{self, decode_key, encode_key, is_descendant_key, name_prefix};
use crate::lock::LockTable;
use crate::{DataStatus, DeleteMode, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;

/// An engine holding every global in process memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    data: RwLock<BTreeMap<Vec<u8>, String>>,
    locks: LockTable,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock table backing `lock_incr`/`lock_decr`.
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Number of value-bearing nodes across all globals.
    pub fn node_count(&self) -> usize {
        self.data.read().len()
    }

    /// Names of all globals holding at least one value, in order.
    pub fn global_names(&self) -> Result<Vec<String>> {
        let data = self.data.read();
        let mut names: Vec<String> = Vec::new();
        for key in data.keys() {
            let (name, _) = decode_key(key)?;
            if names.last() != Some(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

fn after(key: &[u8]) -> (Bound<&[u8]>, Bound<&[u8]>) {
    (Bound::Excluded(key), Bound::Unbounded)
}

impl Engine for MemoryEngine {
    fn get(&self, name: &str, path: &[String]) -> Result<String> {
        check_coordinate(name, path)?;
        self.data
            .read()
            .get(&encode_key(name, path))
            .cloned()
            .ok_or_else(|| undefined(name, path))
    }

    fn set(&self, name: &str, path: &[String], value: &str) -> Result<()> {
        check_coordinate(name, path)?;
        check_value(value)?;
        self.data
            .write()
            .insert(encode_key(name, path), value.to_string());
        Ok(())
    }

    fn delete(&self, name: &str, path: &[String], mode: DeleteMode) -> Result<()> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);
        let mut data = self.data.write();
        data.remove(&key);

        if mode == DeleteMode::Subtree {
            let doomed: Vec<Vec<u8>> = data
                .range::<[u8], _>(after(&key))
                .map(|(k, _)| k)
                .take_while(|k| is_descendant_key(&key, k))
                .cloned()
                .collect();
            for k in doomed {
                data.remove(&k);
            }
        }
        Ok(())
    }

    fn data(&self, name: &str, path: &[String]) -> Result<DataStatus> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);
        let data = self.data.read();
        let has_value = data.contains_key(&key);
        let has_children = data
            .range::<[u8], _>(after(&key))
            .next()
            .is_some_and(|(k, _)| is_descendant_key(&key, k));
        Ok(DataStatus::from_flags(has_value, has_children))
    }

    fn node_next(&self, name: &str, path: &[String]) -> Result<Option<Vec<String>>> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);
        let prefix = name_prefix(name);
        let data = self.data.read();

        match data.range::<[u8], _>(after(&key)).next() {
            Some((next, _)) if next.starts_with(&prefix) => {
                let (_, next_path) = keys::decode_key(next)?;
                Ok(Some(next_path))
            }
            _ => Ok(None),
        }
    }

    fn subscript_next(&self, name: &str, path: &[String]) -> Result<Option<String>> {
        check_coordinate(name, path)?;
        let (start, parent) = sibling_seek(name, path)?;
        let Some(start) = start else {
            return Ok(None);
        };
        let data = self.data.read();

        match data
            .range::<[u8], _>((Bound::Included(start.as_slice()), Bound::Unbounded))
            .next()
        {
            Some((found, _)) => sibling_from_key(found, &parent, path.len()),
            None => Ok(None),
        }
    }

    fn lock_incr(&self, timeout: Duration, name: &str, path: &[String]) -> Result<()> {
        check_coordinate(name, path)?;
        self.locks.lock_incr(timeout, name, path)
    }

    fn lock_decr(&self, name: &str, path: &[String]) -> Result<()> {
        check_coordinate(name, path)?;
        self.locks.lock_decr(name, path)
    }
}
