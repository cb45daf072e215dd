//! # Store
//!
//! Backend selection for callers that choose the engine at runtime (the CLI,
//! configuration files). A `Store` is itself an `Engine` and forwards every
//! primitive to the selected backend.

use crate::engine::Engine;
use crate::lock::LockTable;
use crate::storage::{MemoryEngine, RedbEngine};
use crate::{DataStatus, DeleteMode, GlobalsError, Result};
use std::path::Path;
use std::time::Duration;

/// Storage backend for a Store.
#[derive(Debug)]
pub enum Store {
    /// In-memory engine (fast, volatile).
    InMemory(MemoryEngine),
    /// Disk-backed engine using redb (ACID, persistent).
    Persistent(RedbEngine),
}

impl Default for Store {
    fn default() -> Self {
        Self::InMemory(MemoryEngine::new())
    }
}

impl Store {
    /// Open a store by backend name: `"memory"` or `"redb"`.
    ///
    /// The path is ignored for the in-memory backend.
    pub fn open(backend: &str, path: impl AsRef<Path>) -> Result<Self> {
        match backend {
            "memory" => Ok(Self::InMemory(MemoryEngine::new())),
            "redb" => Ok(Self::Persistent(RedbEngine::open(path)?)),
            other => Err(GlobalsError::TypeKind(format!(
                "unknown backend {:?} (expected \"memory\" or \"redb\")",
                other
            ))),
        }
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Persistent(_) => "redb",
        }
    }

    pub fn node_count(&self) -> Result<usize> {
        match self {
            Self::InMemory(m) => Ok(m.node_count()),
            Self::Persistent(r) => r.node_count(),
        }
    }

    pub fn global_names(&self) -> Result<Vec<String>> {
        match self {
            Self::InMemory(m) => m.global_names(),
            Self::Persistent(r) => r.global_names(),
        }
    }

    pub fn locks(&self) -> &LockTable {
        match self {
            Self::InMemory(m) => m.locks(),
            Self::Persistent(r) => r.locks(),
        }
    }

    fn engine(&self) -> &dyn Engine {
        match self {
            Self::InMemory(m) => m,
            Self::Persistent(r) => r,
        }
    }
}

impl Engine for Store {
    fn get(&self, name: &str, path: &[String]) -> Result<String> {
        self.engine().get(name, path)
    }

    fn set(&self, name: &str, path: &[String], value: &str) -> Result<()> {
        self.engine().set(name, path, value)
    }

    fn delete(&self, name: &str, path: &[String], mode: DeleteMode) -> Result<()> {
        self.engine().delete(name, path, mode)
    }

    fn data(&self, name: &str, path: &[String]) -> Result<DataStatus> {
        self.engine().data(name, path)
    }

    fn node_next(&self, name: &str, path: &[String]) -> Result<Option<Vec<String>>> {
        self.engine().node_next(name, path)
    }

    fn subscript_next(&self, name: &str, path: &[String]) -> Result<Option<String>> {
        self.engine().subscript_next(name, path)
    }

    fn lock_incr(&self, timeout: Duration, name: &str, path: &[String]) -> Result<()> {
        self.engine().lock_incr(timeout, name, path)
    }

    fn lock_decr(&self, name: &str, path: &[String]) -> Result<()> {
        self.engine().lock_decr(name, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;
    use tempfile::tempdir;

    #[test]
    fn open_by_name() {
        let temp = tempdir().expect("temp dir");
        let db = temp.path().join("store.redb");

        let memory = Store::open("memory", &db).expect("memory");
        assert!(!memory.is_persistent());
        assert_eq!(memory.backend_name(), "memory");

        let redb = Store::open("redb", &db).expect("redb");
        assert!(redb.is_persistent());

        assert!(matches!(
            Store::open("sqlite", &db),
            Err(GlobalsError::TypeKind(_))
        ));
    }

    #[test]
    fn nodes_work_through_store() {
        let store = Store::default();
        let node = Node::new(&store, "^s", ["1"]).expect("node");
        node.write("x").expect("write");
        assert_eq!(store.node_count().expect("count"), 1);
        assert_eq!(store.global_names().expect("names"), vec!["^s".to_string()]);

        let _guard = node.lock(Duration::ZERO).expect("lock");
        assert_eq!(store.locks().held_count("^s", node.path()), 1);
    }
}
