//! # Lock Table
//!
//! In-process implementation of the lock-increment/lock-decrement primitives
//! used by the bundled engines.
//!
//! Locks follow M semantics:
//! - A lock names a coordinate `(name, path)` and implicitly covers its
//!   subtree. Locks conflict when one coordinate is an ancestor of, or equal
//!   to, the other and the owners differ.
//! - Ownership is per thread. The owning thread may re-acquire the same
//!   coordinate; each acquisition increments a nesting count and the lock is
//!   free again only when the count returns to zero.
//! - Waiters block on a condition variable until a release makes the lock
//!   available or the timeout elapses.

use crate::formats::zwr;
use crate::{GlobalsError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

type LockId = (String, Vec<String>);

#[derive(Debug, Clone, Copy)]
struct Held {
    owner: ThreadId,
    count: u32,
}

/// Reentrant, hierarchical, timeout-bound locks keyed by coordinate.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<BTreeMap<LockId, Held>>,
    released: Condvar,
}

impl LockTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire one level of the lock on `(name, path)` for the current thread.
    ///
    /// Blocks until no other thread holds an overlapping lock, or fails with
    /// `LockTimeout` once `timeout` has elapsed. A zero timeout tries once.
    pub fn lock_incr(&self, timeout: Duration, name: &str, path: &[String]) -> Result<()> {
        let me = thread::current().id();
        let deadline = Instant::now().checked_add(timeout);
        let mut held = self.held.lock();

        loop {
            if !conflicts(&held, me, name, path) {
                held.entry((name.to_string(), path.to_vec()))
                    .and_modify(|h| h.count = h.count.saturating_add(1))
                    .or_insert(Held {
                        owner: me,
                        count: 1,
                    });
                return Ok(());
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Err(GlobalsError::LockTimeout {
                            name: name.to_string(),
                            path: path.to_vec(),
                            timeout,
                        });
                    }
                    let _ = self.released.wait_until(&mut held, deadline);
                }
                None => self.released.wait(&mut held),
            }
        }
    }

    /// Release one level of the current thread's lock on `(name, path)`.
    ///
    /// Releasing a coordinate nobody holds is a no-op. Releasing one held by
    /// another thread fails with `GlobalsError::Engine` and changes nothing.
    pub fn lock_decr(&self, name: &str, path: &[String]) -> Result<()> {
        let me = thread::current().id();
        let id = (name.to_string(), path.to_vec());
        let mut held = self.held.lock();

        let Some(entry) = held.get_mut(&id) else {
            return Ok(());
        };
        if entry.owner != me {
            return Err(GlobalsError::Engine(format!(
                "lock on {} is held by another thread",
                zwr::format_reference(name, path)
            )));
        }

        entry.count -= 1;
        if entry.count == 0 {
            held.remove(&id);
            self.released.notify_all();
        }
        Ok(())
    }

    /// Current nesting count on exactly `(name, path)`, whoever holds it.
    pub fn held_count(&self, name: &str, path: &[String]) -> u32 {
        self.held
            .lock()
            .get(&(name.to_string(), path.to_vec()))
            .map(|h| h.count)
            .unwrap_or(0)
    }
}

fn conflicts(held: &BTreeMap<LockId, Held>, me: ThreadId, name: &str, path: &[String]) -> bool {
    held.iter().any(|((held_name, held_path), h)| {
        h.owner != me
            && held_name == name
            && (held_path.starts_with(path) || path.starts_with(held_path))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn path(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn reentrant_same_thread() {
        let table = LockTable::new();
        let p = path(&["1"]);
        table.lock_incr(Duration::ZERO, "^a", &p).expect("first");
        table.lock_incr(Duration::ZERO, "^a", &p).expect("second");
        assert_eq!(table.held_count("^a", &p), 2);

        table.lock_decr("^a", &p).expect("decr");
        assert_eq!(table.held_count("^a", &p), 1);
        table.lock_decr("^a", &p).expect("decr");
        assert_eq!(table.held_count("^a", &p), 0);
    }

    #[test]
    fn other_thread_times_out() {
        let table = Arc::new(LockTable::new());
        table.lock_incr(Duration::ZERO, "^a", &path(&["1"])).expect("lock");

        let contender = Arc::clone(&table);
        let result = thread::spawn(move || {
            contender.lock_incr(Duration::from_millis(20), "^a", &path(&["1", "2"]))
        })
        .join()
        .expect("join");

        assert!(matches!(result, Err(GlobalsError::LockTimeout { .. })));
    }

    #[test]
    fn disjoint_subtrees_do_not_conflict() {
        let table = Arc::new(LockTable::new());
        table.lock_incr(Duration::ZERO, "^a", &path(&["1"])).expect("lock");

        let contender = Arc::clone(&table);
        let result = thread::spawn(move || {
            contender.lock_incr(Duration::ZERO, "^a", &path(&["2"]))?;
            contender.lock_incr(Duration::ZERO, "^b", &path(&["1"]))
        })
        .join()
        .expect("join");

        assert!(result.is_ok());
    }

    #[test]
    fn release_wakes_waiter() {
        let table = Arc::new(LockTable::new());
        table.lock_incr(Duration::ZERO, "^a", &[]).expect("lock");

        let waiter = Arc::clone(&table);
        let handle = thread::spawn(move || {
            waiter.lock_incr(Duration::from_secs(10), "^a", &path(&["x"]))
        });

        thread::sleep(Duration::from_millis(20));
        table.lock_decr("^a", &[]).expect("decr");

        assert!(handle.join().expect("join").is_ok());
    }

    #[test]
    fn decr_from_other_thread_fails() {
        let table = Arc::new(LockTable::new());
        table.lock_incr(Duration::ZERO, "^p", &path(&["1"])).expect("lock");

        let intruder = Arc::clone(&table);
        let result = thread::spawn(move || intruder.lock_decr("^p", &path(&["1"])))
            .join()
            .expect("join");

        assert!(matches!(result, Err(GlobalsError::Engine(_))));
        assert_eq!(table.held_count("^p", &path(&["1"])), 1);
        table.lock_decr("^p", &path(&["1"])).expect("owner release");
        assert_eq!(table.held_count("^p", &path(&["1"])), 0);
    }

    #[test]
    fn decr_without_lock_is_noop() {
        let table = LockTable::new();
        assert!(table.lock_decr("^a", &[]).is_ok());
        assert_eq!(table.held_count("^a", &[]), 0);
    }
}
