//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the globals core:
//! - Node status as reported by the engine (`DataStatus`)
//! - Delete depth (`DeleteMode`)
//! - Error types (`GlobalsError`)
//!
//! Subscripts are plain `String`s and values are plain `String`s. The
//! addressing types built on top of them live in `node`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// NODE STATUS
// =============================================================================

/// Presence of a value and/or children at a coordinate.
///
/// The discriminants are the engine's classic `$DATA` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataStatus {
    /// No value, no children.
    Undefined,
    /// A value and no children.
    ValueOnly,
    /// Children but no value.
    ChildrenOnly,
    /// Both a value and children.
    ValueAndChildren,
}

impl DataStatus {
    /// Build a status from the two presence flags.
    #[must_use]
    pub const fn from_flags(has_value: bool, has_children: bool) -> Self {
        match (has_value, has_children) {
            (false, false) => Self::Undefined,
            (true, false) => Self::ValueOnly,
            (false, true) => Self::ChildrenOnly,
            (true, true) => Self::ValueAndChildren,
        }
    }

    /// Decode a raw `$DATA` code (0, 1, 10 or 11).
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Undefined),
            1 => Some(Self::ValueOnly),
            10 => Some(Self::ChildrenOnly),
            11 => Some(Self::ValueAndChildren),
            _ => None,
        }
    }

    /// The raw `$DATA` code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::ValueOnly => 1,
            Self::ChildrenOnly => 10,
            Self::ValueAndChildren => 11,
        }
    }

    #[must_use]
    pub const fn has_value(self) -> bool {
        matches!(self, Self::ValueOnly | Self::ValueAndChildren)
    }

    #[must_use]
    pub const fn has_children(self) -> bool {
        matches!(self, Self::ChildrenOnly | Self::ValueAndChildren)
    }
}

impl std::fmt::Display for DataStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// =============================================================================
// DELETE DEPTH
// =============================================================================

/// How much a delete removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Remove only the value at the coordinate; descendants survive.
    ValueOnly,
    /// Remove the value and the entire descendant subtree.
    Subtree,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the globals core.
///
/// All fallible operations return `Result<T, GlobalsError>`.
/// `KeyMissing` and `UndefinedKey` are deliberately distinct: indexed access
/// (`Node::get`) reports a mapping-style miss, direct access (`Node::read`)
/// relays the engine condition untouched.
#[derive(Debug, Error)]
pub enum GlobalsError {
    /// Malformed caller input (name, path or subscript).
    #[error("Type error: {0}")]
    TypeKind(String),

    /// Indexed access found no value.
    #[error("Key missing: {name}{path:?}")]
    KeyMissing { name: String, path: Vec<String> },

    /// The engine has no value at the coordinate.
    #[error("Undefined global: {name}{path:?}")]
    UndefinedKey { name: String, path: Vec<String> },

    /// The lock was not obtained within the timeout.
    #[error("Lock timeout after {timeout:?}: {name}{path:?}")]
    LockTimeout {
        name: String,
        path: Vec<String>,
        timeout: Duration,
    },

    /// Any other engine-originated failure.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Storage backend I/O failure.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization failure.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization failure.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Malformed ZWRITE text.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GlobalsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_codes_roundtrip() {
        for status in [
            DataStatus::Undefined,
            DataStatus::ValueOnly,
            DataStatus::ChildrenOnly,
            DataStatus::ValueAndChildren,
        ] {
            assert_eq!(DataStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DataStatus::from_code(2), None);
    }

    #[test]
    fn flags_match_predicates() {
        let both = DataStatus::from_flags(true, true);
        assert!(both.has_value() && both.has_children());

        let value = DataStatus::from_flags(true, false);
        assert!(value.has_value());
        assert!(!value.has_children());

        let children = DataStatus::from_flags(false, true);
        assert!(!children.has_value());
        assert!(children.has_children());

        assert_eq!(DataStatus::from_flags(false, false), DataStatus::Undefined);
    }

    #[test]
    fn key_missing_is_not_undefined() {
        let miss = GlobalsError::KeyMissing {
            name: "^a".into(),
            path: vec!["1".into()],
        };
        assert!(!matches!(miss, GlobalsError::UndefinedKey { .. }));
        assert!(miss.to_string().contains("^a"));
    }
}
