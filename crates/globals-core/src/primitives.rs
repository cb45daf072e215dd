//! # Limits and Format Constants
//!
//! Fixed limits of the global namespace and constants for the on-disk
//! snapshot format. These are compiled in and immutable at runtime.

/// Maximum length of a global name, not counting the leading `^`.
pub const MAX_NAME_LENGTH: usize = 31;

/// Maximum number of subscripts in a path.
///
/// Applies to the full path of a node, including subscripts added by
/// indexed access.
pub const MAX_SUBSCRIPTS: usize = 31;

/// Maximum length of a single subscript or value, in bytes (1 MiB).
pub const MAX_STRING_LENGTH: usize = 1024 * 1024;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the snapshot header.
///
/// - File Header = Magic Bytes ("GLOB") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"GLOB";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;
