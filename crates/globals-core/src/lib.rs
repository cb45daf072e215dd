//! # globals-core
//!
//! Node addressing over a hierarchical, sparse global namespace as found in
//! MUMPS-family storage engines.
//!
//! A global is a persistent tree named like `^patient`. Every position in it
//! is a `Node`: the global name plus an ordered list of string subscripts.
//! Nodes can be read, written, deleted (value only, or the whole subtree with
//! `kill`), asked whether they hold a value or children, iterated over in the
//! engine's collation order, and locked with a reentrant, timeout-bound,
//! scoped lock.
//!
//! ## Layers
//!
//! - `node`: the `Node` coordinate, its iterator and lock guard
//! - `keys`: name/path validation, `Subscript`, order-preserving key encoding
//! - `engine`: the eight primitives a `Node` calls
//! - `storage`: `MemoryEngine` and the redb-backed `RedbEngine`
//! - `store`: runtime backend selection
//! - `formats`: ZWRITE text and binary snapshots
//!
//! ## Example
//!
//! ```
//! use globals_core::{MemoryEngine, Node};
//!
//! let engine = MemoryEngine::new();
//! let patient = Node::new(&engine, "^patient", ["123"]).expect("valid name");
//! patient.set("name", "Jane Doe").expect("set");
//! patient.set("dob", "1980-02-01").expect("set");
//!
//! assert_eq!(patient.get("name").expect("get"), "Jane Doe");
//! assert_eq!(patient.len().expect("len"), 2);
//! ```
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - NO logging dependency: the app layer configures tracing
//! - The `Node` only talks to the `Engine` trait

// =============================================================================
// MODULES
// =============================================================================

pub mod collation;
pub mod engine;
pub mod formats;
pub mod keys;
pub mod lock;
pub mod node;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{DataStatus, DeleteMode, GlobalsError, Result};

// =============================================================================
// RE-EXPORTS: Addressing
// =============================================================================

pub use engine::Engine;
pub use keys::Subscript;
pub use lock::LockTable;
pub use node::{Children, LockGuard, Node, Subscripts};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use storage::{MemoryEngine, RedbEngine};
pub use store::Store;

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{Snapshot, SnapshotHeader, export_node, import_into};
