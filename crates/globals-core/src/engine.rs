//! # Engine Primitives
//!
//! The narrow interface between a `Node` and the storage engine.
//!
//! The engine owns persistence, durability and lock bookkeeping. Nodes only
//! call these eight primitives and translate their results; they never reach
//! around the trait.
//!
//! All primitives take `&self`: engines are shared by every Node that
//! addresses them and handle their own interior synchronization.

use crate::{DataStatus, DeleteMode, Result};
use std::sync::Arc;
use std::time::Duration;

/// The primitive engine API.
pub trait Engine {
    /// Scalar get. Fails with `UndefinedKey` if no value is stored.
    fn get(&self, name: &str, path: &[String]) -> Result<String>;

    /// Scalar set. Ancestors come into existence implicitly.
    fn set(&self, name: &str, path: &[String], value: &str) -> Result<()>;

    /// Delete the value only, or the value and its whole subtree.
    fn delete(&self, name: &str, path: &[String], mode: DeleteMode) -> Result<()>;

    /// Value/children presence at a coordinate.
    fn data(&self, name: &str, path: &[String]) -> Result<DataStatus>;

    /// The next value-bearing node after `path` in collation order, across
    /// the whole global. `None` once the global is exhausted.
    fn node_next(&self, name: &str, path: &[String]) -> Result<Option<Vec<String>>>;

    /// The next subscript at the level of `path`'s last subscript: the first
    /// sibling after it, with a value or children, in collation order.
    /// `None` after the last sibling. Fails with `TypeKind` for an empty path.
    fn subscript_next(&self, name: &str, path: &[String]) -> Result<Option<String>>;

    /// Acquire one nesting level of the lock on a coordinate.
    /// Fails with `LockTimeout` if it cannot be obtained within `timeout`.
    fn lock_incr(&self, timeout: Duration, name: &str, path: &[String]) -> Result<()>;

    /// Release one nesting level of the lock on a coordinate.
    fn lock_decr(&self, name: &str, path: &[String]) -> Result<()>;
}

macro_rules! forward_engine {
    ($($ptr:ty),*) => {$(
        impl<E: Engine + ?Sized> Engine for $ptr {
            fn get(&self, name: &str, path: &[String]) -> Result<String> {
                (**self).get(name, path)
            }

            fn set(&self, name: &str, path: &[String], value: &str) -> Result<()> {
                (**self).set(name, path, value)
            }

            fn delete(&self, name: &str, path: &[String], mode: DeleteMode) -> Result<()> {
                (**self).delete(name, path, mode)
            }

            fn data(&self, name: &str, path: &[String]) -> Result<DataStatus> {
                (**self).data(name, path)
            }

            fn node_next(&self, name: &str, path: &[String]) -> Result<Option<Vec<String>>> {
                (**self).node_next(name, path)
            }

            fn subscript_next(&self, name: &str, path: &[String]) -> Result<Option<String>> {
                (**self).subscript_next(name, path)
            }

            fn lock_incr(&self, timeout: Duration, name: &str, path: &[String]) -> Result<()> {
                (**self).lock_incr(timeout, name, path)
            }

            fn lock_decr(&self, name: &str, path: &[String]) -> Result<()> {
                (**self).lock_decr(name, path)
            }
        }
    )*};
}

forward_engine!(&E, Box<E>, Arc<E>);
