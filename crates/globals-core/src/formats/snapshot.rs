//! # Subtree Snapshots
//!
//! Binary export/import of a Node's subtree.
//!
//! Format: Header (5 bytes) + postcard-serialized `Snapshot`.
//! - 4 bytes: Magic ("GLOB")
//! - 1 byte: Version
//!
//! Entry paths are stored relative to the exported Node, so a snapshot can
//! be imported under any other coordinate. The header and payload size are
//! validated before the payload is deserialized.
//!
//! File I/O lives in the app layer; these are pure transformations over an
//! engine.

use crate::engine::Engine;
use crate::node::Node;
use crate::{GlobalsError, Result, keys, primitives};
use serde::{Deserialize, Serialize};

/// Maximum allowed payload size (500 MB).
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 500 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding all snapshot data.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(GlobalsError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(GlobalsError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(GlobalsError::DeserializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// One stored value, addressed relative to the snapshot's base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub path: Vec<String>,
    pub value: String,
}

/// The values of one subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Global the subtree was taken from.
    pub name: String,
    /// Path of the exported Node.
    pub base: Vec<String>,
    /// Values in collation order; an empty path is the base itself.
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Capture every value at or below `node`.
    pub fn capture<E: Engine>(node: &Node<E>) -> Result<Self> {
        let mut entries = Vec::new();
        if node.has_value()? {
            entries.push(SnapshotEntry {
                path: Vec::new(),
                value: node.read()?,
            });
        }
        for suffix in node.iter() {
            let suffix = suffix?;
            let full = keys::normalize(node.path(), suffix.clone().into())?;
            let value = node.engine().get(node.name(), &full)?;
            entries.push(SnapshotEntry {
                path: suffix,
                value,
            });
        }
        Ok(Self {
            name: node.name().to_string(),
            base: node.path().to_vec(),
            entries,
        })
    }

    /// Write every entry below `target`. Returns the number of values written.
    pub fn restore<E: Engine>(&self, target: &Node<E>) -> Result<usize> {
        for entry in &self.entries {
            target.set(entry.path.clone(), &entry.value)?;
        }
        Ok(self.entries.len())
    }
}

/// Serialize a Node's subtree (header + payload).
pub fn export_node<E: Engine>(node: &Node<E>) -> Result<Vec<u8>> {
    let snapshot = Snapshot::capture(node)?;
    snapshot_to_bytes(&snapshot)
}

/// Deserialize a snapshot and write it below `target`.
pub fn import_into<E: Engine>(target: &Node<E>, bytes: &[u8]) -> Result<usize> {
    snapshot_from_bytes(bytes)?.restore(target)
}

pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| GlobalsError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Validate header and size, then deserialize.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot> {
    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(GlobalsError::DeserializationError(format!(
            "Payload size {} exceeds maximum {}",
            payload.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    postcard::from_bytes(payload).map_err(|e| GlobalsError::DeserializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryEngine;

    #[test]
    fn header_roundtrip() {
        let header = SnapshotHeader::new();
        let parsed = SnapshotHeader::from_bytes(&header.to_bytes()).expect("header");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn rejects_bad_magic_and_short_input() {
        assert!(snapshot_from_bytes(b"GL").is_err());
        assert!(snapshot_from_bytes(b"NOPE\x01").is_err());
        assert!(snapshot_from_bytes(b"GLOB\x09").is_err());
    }

    #[test]
    fn export_import_under_other_node() {
        let engine = MemoryEngine::new();
        let source = Node::new(&engine, "^patient", ["123"]).expect("node");
        source.write("record").expect("write");
        source.set("name", "Jane Doe").expect("set");
        source.set(["addr", "city"], "Oslo").expect("set");

        let bytes = export_node(&source).expect("export");
        let snapshot = snapshot_from_bytes(&bytes).expect("decode");
        assert_eq!(snapshot.name, "^patient");
        assert_eq!(snapshot.base, vec!["123".to_string()]);
        assert_eq!(snapshot.entries.len(), 3);

        let target = Node::new(&engine, "^archive", ["2024", "123"]).expect("node");
        assert_eq!(import_into(&target, &bytes).expect("import"), 3);
        assert_eq!(target.read().expect("read"), "record");
        assert_eq!(target.get("name").expect("get"), "Jane Doe");
        assert_eq!(target.get(["addr", "city"]).expect("get"), "Oslo");
    }
}
