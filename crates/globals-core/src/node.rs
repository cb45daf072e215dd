//! # Node
//!
//! A `Node` is a coordinate in the global namespace: a global name plus an
//! ordered subscript path. It owns no data. Every question about the
//! coordinate (its value, whether it has children) is asked of the engine at
//! call time, never cached.
//!
//! ## Access Styles
//!
//! - Direct: `read`, `write`, `delete_value`, `kill` act on the Node's own
//!   coordinate. A missing value surfaces as the engine's `UndefinedKey`.
//! - Indexed: `get`, `set`, `delete` take a `Subscript` relative to the Node.
//!   A missing value surfaces as `KeyMissing`, and `delete` never removes
//!   descendants.
//!
//! ## Iteration
//!
//! `iter` walks the engine's flat `node_next` successor and stops as soon as
//! a candidate leaves this Node's subtree. Each call starts over from the
//! Node's own path, so independent iterations can be interleaved freely.
//!
//! `subscripts` walks one level down instead: the immediate child subscripts
//! in collation order, whether or not those children hold a value, via the
//! engine's `subscript_next`.

use crate::engine::Engine;
use crate::formats::zwr;
use crate::keys::{self, Subscript};
use crate::{DataStatus, DeleteMode, GlobalsError, Result};
use std::marker::PhantomData;
use std::time::Duration;

// =============================================================================
// NODE
// =============================================================================

/// A coordinate `(name, path)` bound to the engine that stores it.
///
/// `E` is anything implementing `Engine`, typically `&MemoryEngine`,
/// `&Store` or an `Arc` of an engine.
#[derive(Clone)]
pub struct Node<E> {
    engine: E,
    name: String,
    path: Vec<String>,
}

impl<E> std::fmt::Debug for Node<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Renders the coordinate only (`^patient("123","name")`). The engine is
/// not consulted; use `to_display_string` for `coordinate=value`.
impl<E> std::fmt::Display for Node<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&zwr::format_reference(&self.name, &self.path))
    }
}

impl<E: Engine> Node<E> {
    /// Create a Node for `name` with the given subscript path.
    ///
    /// Validation only; no engine call is made.
    ///
    /// # Errors
    ///
    /// Returns `GlobalsError::TypeKind` if the name is not a valid global
    /// name or the path exceeds the subscript limits.
    pub fn new<I, S>(engine: E, name: impl Into<String>, path: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        keys::validate_name(&name)?;
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        keys::validate_path(&path)?;
        Ok(Self { engine, name, path })
    }

    /// Create a Node for the top of a global.
    pub fn root(engine: E, name: impl Into<String>) -> Result<Self> {
        Self::new(engine, name, Vec::<String>::new())
    }

    /// Create a Node from an untyped JSON path (`null` or an array of strings).
    pub fn from_json(engine: E, name: impl Into<String>, path: &serde_json::Value) -> Result<Self> {
        let path = keys::subscripts_from_json(path)?;
        Self::new(engine, name, path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Number of subscripts.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    // =========================================================================
    // DIRECT ACCESS
    // =========================================================================

    /// Read the value at this coordinate.
    ///
    /// # Errors
    ///
    /// `UndefinedKey` from the engine is returned as is.
    pub fn read(&self) -> Result<String> {
        self.engine.get(&self.name, &self.path)
    }

    /// Store a value at this coordinate.
    pub fn write(&self, value: &str) -> Result<()> {
        self.engine.set(&self.name, &self.path, value)
    }

    /// Remove this coordinate's value. Children are kept.
    pub fn delete_value(&self) -> Result<()> {
        self.engine.delete(&self.name, &self.path, DeleteMode::ValueOnly)
    }

    /// Remove this coordinate's value and its entire subtree.
    pub fn kill(&self) -> Result<()> {
        self.engine.delete(&self.name, &self.path, DeleteMode::Subtree)
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    pub fn data_status(&self) -> Result<DataStatus> {
        self.engine.data(&self.name, &self.path)
    }

    pub fn has_value(&self) -> Result<bool> {
        Ok(self.data_status()?.has_value())
    }

    pub fn has_children(&self) -> Result<bool> {
        Ok(self.data_status()?.has_children())
    }

    // =========================================================================
    // INDEXED ACCESS
    // =========================================================================

    /// Read the value at `self.path + subscript`.
    ///
    /// # Errors
    ///
    /// `KeyMissing` if nothing is stored there; `TypeKind` if the resulting
    /// path is malformed (checked before the engine is called).
    pub fn get(&self, subscript: impl Into<Subscript>) -> Result<String> {
        let path = keys::normalize(&self.path, subscript.into())?;
        self.engine.get(&self.name, &path).map_err(|err| match err {
            GlobalsError::UndefinedKey { name, path } => GlobalsError::KeyMissing { name, path },
            other => other,
        })
    }

    /// Store a value at `self.path + subscript`.
    pub fn set(&self, subscript: impl Into<Subscript>, value: &str) -> Result<()> {
        let path = keys::normalize(&self.path, subscript.into())?;
        self.engine.set(&self.name, &path, value)
    }

    /// Remove the value at `self.path + subscript`, keeping its descendants.
    pub fn delete(&self, subscript: impl Into<Subscript>) -> Result<()> {
        let path = keys::normalize(&self.path, subscript.into())?;
        self.engine.delete(&self.name, &path, DeleteMode::ValueOnly)
    }

    /// Values stored at the Node's descendants, in collation order.
    ///
    /// Each item is the descendant's path relative to this Node.
    pub fn iter(&self) -> Children<'_, E> {
        Children {
            node: self,
            cursor: Some(self.path.clone()),
        }
    }

    /// Immediate child subscripts in collation order, with or without values.
    pub fn subscripts(&self) -> Subscripts<'_, E> {
        Subscripts {
            node: self,
            state: SubscriptsState::Start,
        }
    }

    /// Count the items `iter` yields. Drains a full iteration.
    pub fn len(&self) -> Result<usize> {
        self.iter().try_fold(0usize, |count, item| item.map(|_| count + 1))
    }

    /// True if `iter` would yield nothing. One engine call.
    pub fn is_empty(&self) -> Result<bool> {
        self.iter().next().transpose().map(|first| first.is_none())
    }

    // =========================================================================
    // LOCKING
    // =========================================================================

    /// Lock this coordinate until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// `LockTimeout` if the lock was not obtained in time. No guard exists
    /// in that case, so nothing is released.
    pub fn lock(&self, timeout: Duration) -> Result<LockGuard<'_, E>> {
        self.engine.lock_incr(timeout, &self.name, &self.path)?;
        Ok(LockGuard {
            node: self,
            released: false,
            _owner_thread: PhantomData,
        })
    }

    /// Run `f` while holding the lock on this coordinate.
    ///
    /// The lock is released however `f` exits, including by panic.
    pub fn with_lock<T>(&self, timeout: Duration, f: impl FnOnce() -> T) -> Result<T> {
        let guard = self.lock(timeout)?;
        let out = f();
        guard.release()?;
        Ok(out)
    }

    // =========================================================================
    // TEXT
    // =========================================================================

    /// `name="value"` or `name("s1","s2")="value"`.
    ///
    /// # Errors
    ///
    /// Reads the value, so an undefined coordinate fails with `UndefinedKey`.
    pub fn to_display_string(&self) -> Result<String> {
        let value = self.read()?;
        Ok(zwr::format_line(&self.name, &self.path, &value))
    }
}

impl<E: Engine + Clone> Node<E> {
    /// The Node at `self.path + subscript`.
    pub fn child(&self, subscript: impl Into<Subscript>) -> Result<Self> {
        let path = keys::normalize(&self.path, subscript.into())?;
        Ok(Self {
            engine: self.engine.clone(),
            name: self.name.clone(),
            path,
        })
    }

    /// The Node one level up, or `None` at the top of the global.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.path.split_last()?;
        Some(Self {
            engine: self.engine.clone(),
            name: self.name.clone(),
            path: parent.to_vec(),
        })
    }
}

impl<'n, E: Engine> IntoIterator for &'n Node<E> {
    type Item = Result<Vec<String>>;
    type IntoIter = Children<'n, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// ITERATION
// =============================================================================

/// Pull-based iterator over a Node's value-bearing descendants.
///
/// Holds the last full path returned by the engine and asks for its
/// successor on each pull. Fused after the end or the first error.
pub struct Children<'n, E> {
    node: &'n Node<E>,
    cursor: Option<Vec<String>>,
}

impl<E: Engine> Iterator for Children<'_, E> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        let base = &self.node.path;

        let candidate = match self.node.engine.node_next(&self.node.name, &cursor) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return None,
            Err(err) => return Some(Err(err)),
        };

        // The successor is global-wide; stop once it leaves this subtree.
        if candidate.len() <= base.len() || !candidate.starts_with(base) {
            return None;
        }

        let suffix = candidate[base.len()..].to_vec();
        self.cursor = Some(candidate);
        Some(Ok(suffix))
    }
}

impl<E: Engine> std::iter::FusedIterator for Children<'_, E> {}

enum SubscriptsState {
    Start,
    After(Vec<String>),
    Done,
}

/// Pull-based iterator over a Node's immediate child subscripts.
///
/// The first child comes from `node_next` (the first value-bearing
/// descendant lies under the first child); each later one from
/// `subscript_next` on the previous child. Fused after the end or the first
/// error.
pub struct Subscripts<'n, E> {
    node: &'n Node<E>,
    state: SubscriptsState,
}

impl<E: Engine> Iterator for Subscripts<'_, E> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node;
        let found = match std::mem::replace(&mut self.state, SubscriptsState::Done) {
            SubscriptsState::Done => return None,
            SubscriptsState::Start => node
                .engine
                .node_next(&node.name, &node.path)
                .map(|next| {
                    next.filter(|p| p.len() > node.path.len() && p.starts_with(&node.path))
                        .and_then(|p| p.into_iter().nth(node.path.len()))
                }),
            SubscriptsState::After(previous) => node.engine.subscript_next(&node.name, &previous),
        };

        match found {
            Ok(Some(subscript)) => {
                let mut child = node.path.clone();
                child.push(subscript.clone());
                self.state = SubscriptsState::After(child);
                Some(Ok(subscript))
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<E: Engine> std::iter::FusedIterator for Subscripts<'_, E> {}

// =============================================================================
// LOCK GUARD
// =============================================================================

/// Holds one nesting level of a Node's lock; releases it on drop.
///
/// Locks are owned by the acquiring thread, so the guard cannot be sent to
/// another thread:
///
/// ```compile_fail
/// use globals_core::{MemoryEngine, Node};
/// use std::time::Duration;
///
/// let engine = MemoryEngine::new();
/// let node = Node::root(&engine, "^p").expect("node");
/// let guard = node.lock(Duration::ZERO).expect("lock");
/// std::thread::scope(|s| {
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'n, E: Engine> {
    node: &'n Node<E>,
    released: bool,
    _owner_thread: PhantomData<*const ()>,
}

impl<E: Engine> LockGuard<'_, E> {
    /// Release now and report a failed release instead of only logging it.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.node.engine.lock_decr(&self.node.name, &self.node.path)
    }
}

impl<E: Engine> Drop for LockGuard<'_, E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.node.engine.lock_decr(&self.node.name, &self.node.path) {
            // Drop cannot propagate; the core carries no logging dependency.
            eprintln!(
                "{}",
                serde_json::json!({
                    "level": "warn",
                    "target": "globals_core::node",
                    "message": "lock release failed",
                    "node": self.node.to_string(),
                    "error": e.to_string(),
                })
            );
        }
    }
}

impl<E: Engine> std::fmt::Debug for LockGuard<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("node", self.node)
            .field("released", &self.released)
            .finish()
    }
}
