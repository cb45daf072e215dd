//! # Bundled Engines
//!
//! Two implementations of the `Engine` primitives over the same
//! order-preserving key encoding (`keys::encode_key`):
//! - `MemoryEngine`: a `BTreeMap` behind a read-write lock (fast, volatile)
//! - `RedbEngine`: a redb database (ACID, persistent)
//!
//! Only value-bearing nodes are stored. A node "has children" when some key
//! in its encoded prefix range exists. `node_next` is the first stored key
//! after the current one within the same global; `subscript_next` seeks past
//! the current node's whole subtree and reads the sibling from the key found
//! there.

pub mod memory;
pub mod redb_engine;

pub use memory::MemoryEngine;
pub use redb_engine::RedbEngine;

use crate::primitives::MAX_STRING_LENGTH;
use crate::{GlobalsError, Result, keys};

/// Validate a coordinate arriving at an engine primitive.
pub(crate) fn check_coordinate(name: &str, path: &[String]) -> Result<()> {
    keys::validate_name(name)?;
    keys::validate_path(path)
}

/// Validate a value before it is stored.
pub(crate) fn check_value(value: &str) -> Result<()> {
    if value.len() > MAX_STRING_LENGTH {
        return Err(GlobalsError::Engine(format!(
            "value of {} bytes exceeds maximum string length {}",
            value.len(),
            MAX_STRING_LENGTH
        )));
    }
    Ok(())
}

pub(crate) fn undefined(name: &str, path: &[String]) -> GlobalsError {
    GlobalsError::UndefinedKey {
        name: name.to_string(),
        path: path.to_vec(),
    }
}

/// Where `subscript_next` seeks, and the key prefix its result must share.
///
/// The seek position is `None` when nothing can follow the subtree.
pub(crate) fn sibling_seek(name: &str, path: &[String]) -> Result<(Option<Vec<u8>>, Vec<u8>)> {
    let Some((_, parent)) = path.split_last() else {
        return Err(GlobalsError::TypeKind(
            "subscript_next needs at least one subscript".to_string(),
        ));
    };
    let start = keys::prefix_successor(&keys::encode_key(name, path));
    Ok((start, keys::encode_key(name, parent)))
}

/// The subscript at `depth` of the first key found at the seek position, if
/// that key still lies below the parent.
pub(crate) fn sibling_from_key(
    found: &[u8],
    parent_prefix: &[u8],
    depth: usize,
) -> Result<Option<String>> {
    if !keys::is_descendant_key(parent_prefix, found) {
        return Ok(None);
    }
    let (_, found_path) = keys::decode_key(found)?;
    Ok(found_path.into_iter().nth(depth - 1))
}
