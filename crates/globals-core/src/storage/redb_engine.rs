//! # redb-backed Engine
//!
//! A disk-backed engine using the redb embedded database, providing:
//! - ACID transactions (one per primitive call)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! All globals share one table keyed by the order-preserving encoding from
//! `keys`, so redb's native byte order is collation order.
//!
//! Locks are held in an in-process `LockTable`: they coordinate threads
//! sharing this `RedbEngine`, not separate processes opening the same file.

use super::{check_coordinate, check_value, sibling_from_key, sibling_seek, undefined};
use crate::engine::Engine;
use crate::keys::{decode_key, encode_key, is_descendant_key, name_prefix};
use crate::lock::LockTable;
use crate::{DataStatus, DeleteMode, GlobalsError, Result};
use redb::{
    Database, ReadOnlyTable, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use std::ops::Bound;
use std::path::Path;
use std::time::Duration;

/// Table for nodes: encoded (name, path) -> value
const NODES: TableDefinition<&[u8], &str> = TableDefinition::new("nodes");

fn io_error(e: impl std::fmt::Display) -> GlobalsError {
    GlobalsError::IoError(e.to_string())
}

/// A persistent engine stored in a single redb file.
pub struct RedbEngine {
    db: Database,
    locks: LockTable,
}

impl std::fmt::Debug for RedbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbEngine")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl RedbEngine {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Initialize the table if it doesn't exist
        let write_txn = db.begin_write().map_err(io_error)?;
        {
            let _ = write_txn.open_table(NODES).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)?;

        Ok(Self {
            db,
            locks: LockTable::new(),
        })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<()> {
        self.db.compact().map_err(io_error)?;
        Ok(())
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Number of value-bearing nodes across all globals.
    pub fn node_count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(NODES).map_err(io_error)?;
        let len = table.len().map_err(io_error)?;
        Ok(len as usize)
    }

    /// Names of all globals holding at least one value, in order.
    pub fn global_names(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(NODES).map_err(io_error)?;

        let mut names: Vec<String> = Vec::new();
        for entry in table.iter().map_err(io_error)? {
            let (key, _) = entry.map_err(io_error)?;
            let (name, _) = decode_key(key.value())?;
            if names.last() != Some(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// First stored key at or after `lower`, in one read transaction.
    fn first_key(&self, lower: Bound<&[u8]>) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(NODES).map_err(io_error)?;
        first_key_in(&table, lower)
    }
}

/// First key of `table` at or after `lower`.
fn first_key_in(
    table: &ReadOnlyTable<&'static [u8], &'static str>,
    lower: Bound<&[u8]>,
) -> Result<Option<Vec<u8>>> {
    let mut range = table
        .range::<&[u8]>((lower, Bound::Unbounded))
        .map_err(io_error)?;
    match range.next() {
        Some(entry) => {
            let (found, _) = entry.map_err(io_error)?;
            Ok(Some(found.value().to_vec()))
        }
        None => Ok(None),
    }
}

impl Engine for RedbEngine {
    fn get(&self, name: &str, path: &[String]) -> Result<String> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(NODES).map_err(io_error)?;
        table
            .get(key.as_slice())
            .map_err(io_error)?
            .map(|v| v.value().to_string())
            .ok_or_else(|| undefined(name, path))
    }

    fn set(&self, name: &str, path: &[String], value: &str) -> Result<()> {
        check_coordinate(name, path)?;
        check_value(value)?;
        let key = encode_key(name, path);

        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(NODES).map_err(io_error)?;
            table.insert(key.as_slice(), value).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)?;
        Ok(())
    }

    fn delete(&self, name: &str, path: &[String], mode: DeleteMode) -> Result<()> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);

        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(NODES).map_err(io_error)?;
            table.remove(key.as_slice()).map_err(io_error)?;

            if mode == DeleteMode::Subtree {
                let mut doomed = Vec::new();
                for entry in table
                    .range::<&[u8]>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
                    .map_err(io_error)?
                {
                    let (k, _) = entry.map_err(io_error)?;
                    if !is_descendant_key(&key, k.value()) {
                        break;
                    }
                    doomed.push(k.value().to_vec());
                }
                for k in doomed {
                    table.remove(k.as_slice()).map_err(io_error)?;
                }
            }
        }
        write_txn.commit().map_err(io_error)?;
        Ok(())
    }

    fn data(&self, name: &str, path: &[String]) -> Result<DataStatus> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);

        // One snapshot for both flags.
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(NODES).map_err(io_error)?;
        let has_value = table.get(key.as_slice()).map_err(io_error)?.is_some();
        let has_children = first_key_in(&table, Bound::Excluded(key.as_slice()))?
            .is_some_and(|next| is_descendant_key(&key, &next));
        Ok(DataStatus::from_flags(has_value, has_children))
    }

    fn node_next(&self, name: &str, path: &[String]) -> Result<Option<Vec<String>>> {
        check_coordinate(name, path)?;
        let key = encode_key(name, path);
        match self.first_key(Bound::Excluded(key.as_slice()))? {
            Some(next) if next.starts_with(&name_prefix(name)) => {
                let (_, next_path) = decode_key(&next)?;
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
        match self.first_key(Bound::Included(start.as_slice()))? {
            Some(found) => sibling_from_key(&found, &parent, path.len()),
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
