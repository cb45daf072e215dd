//! # Formats
//!
//! Text and binary representations of global data.
//! File I/O operations are in the app layer.

pub mod snapshot;
pub mod zwr;

pub use snapshot::{
    Snapshot, SnapshotEntry, SnapshotHeader, export_node, import_into, snapshot_from_bytes,
    snapshot_to_bytes,
};
pub use zwr::{format_line, format_reference, load, parse_line, parse_reference, zwrite};
