//! # Key Paths
//!
//! Everything needed to turn a caller's coordinate into something an engine
//! can use:
//! - validation of global names and subscript paths (`TypeKind` errors)
//! - the `Subscript` argument of indexed access and its normalization
//! - an order-preserving byte encoding of `(name, path)`
//!
//! ## Key Encoding
//!
//! `encode_key` produces bytes whose lexicographic order is the collation
//! order of nodes. The name comes first, terminated by `0x00`, then each
//! subscript as a self-delimiting element:
//!
//! ```text
//! negative number  0x10  (127 - exp)  !digit ...  0xFF
//! zero             0x20
//! positive number  0x30  (128 + exp)  digit ...   0x00
//! string           0x40  bytes (0x00 -> 0x00 0xFF) 0x00 0x00
//! ```
//!
//! No element encoding is a prefix of another, so the key of a node is a
//! byte prefix of exactly its descendants' keys, and a node sorts directly
//! before its subtree.

use crate::collation::CanonicalNumber;
use crate::primitives::{MAX_NAME_LENGTH, MAX_STRING_LENGTH, MAX_SUBSCRIPTS};
use crate::{GlobalsError, Result};

const TAG_NEGATIVE: u8 = 0x10;
const TAG_ZERO: u8 = 0x20;
const TAG_POSITIVE: u8 = 0x30;
const TAG_STRING: u8 = 0x40;

const NAME_TERMINATOR: u8 = 0x00;
const ESCAPE: u8 = 0x00;
const ESCAPED_NUL: u8 = 0xFF;

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a global name.
///
/// Accepts an optional leading `^`, then `%` or an ASCII letter, then ASCII
/// alphanumerics, at most `MAX_NAME_LENGTH` characters after the caret.
pub fn validate_name(name: &str) -> Result<()> {
    let body = name.strip_prefix('^').unwrap_or(name);
    let mut chars = body.chars();

    let Some(first) = chars.next() else {
        return Err(GlobalsError::TypeKind(
            "global name must not be empty".to_string(),
        ));
    };
    if first != '%' && !first.is_ascii_alphabetic() {
        return Err(GlobalsError::TypeKind(format!(
            "global name {:?} must start with a letter or '%'",
            name
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric()) {
        return Err(GlobalsError::TypeKind(format!(
            "global name {:?} may only contain ASCII letters and digits",
            name
        )));
    }
    if body.len() > MAX_NAME_LENGTH {
        return Err(GlobalsError::TypeKind(format!(
            "global name {:?} exceeds {} characters",
            name, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Validate a full subscript path.
pub fn validate_path(path: &[String]) -> Result<()> {
    if path.len() > MAX_SUBSCRIPTS {
        return Err(GlobalsError::TypeKind(format!(
            "path has {} subscripts, maximum is {}",
            path.len(),
            MAX_SUBSCRIPTS
        )));
    }
    if let Some(long) = path.iter().find(|s| s.len() > MAX_STRING_LENGTH) {
        return Err(GlobalsError::TypeKind(format!(
            "subscript of {} bytes exceeds {} bytes",
            long.len(),
            MAX_STRING_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// SUBSCRIPT ARGUMENT
// =============================================================================

/// The key of an indexed access: one subscript or a multi-level path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscript {
    Single(String),
    Path(Vec<String>),
}

impl Subscript {
    /// The subscripts this key descends through.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::Path(p) => p,
        }
    }
}

impl From<&str> for Subscript {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for Subscript {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<&String> for Subscript {
    fn from(s: &String) -> Self {
        Self::Single(s.clone())
    }
}

impl From<Vec<String>> for Subscript {
    fn from(p: Vec<String>) -> Self {
        Self::Path(p)
    }
}

impl From<&[String]> for Subscript {
    fn from(p: &[String]) -> Self {
        Self::Path(p.to_vec())
    }
}

impl From<&[&str]> for Subscript {
    fn from(p: &[&str]) -> Self {
        Self::Path(p.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Subscript {
    fn from(p: [&str; N]) -> Self {
        Self::Path(p.iter().map(|s| (*s).to_string()).collect())
    }
}

impl TryFrom<&serde_json::Value> for Subscript {
    type Error = GlobalsError;

    /// A JSON string is one subscript, a JSON array of strings is a path.
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Self::Single(s.clone())),
            serde_json::Value::Array(_) => subscripts_from_json(value).map(Self::Path),
            other => Err(GlobalsError::TypeKind(format!(
                "subscript must be a string or an array of strings, got {}",
                json_kind(other)
            ))),
        }
    }
}

/// Read a subscript path from untyped input.
///
/// `null` is the empty path; otherwise the value must be an array whose
/// elements are all strings.
pub fn subscripts_from_json(value: &serde_json::Value) -> Result<Vec<String>> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s.clone()),
                other => Err(GlobalsError::TypeKind(format!(
                    "path elements must be strings, got {}",
                    json_kind(other)
                ))),
            })
            .collect(),
        other => Err(GlobalsError::TypeKind(format!(
            "path must be an array of strings, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Build the child path `base + subscript`, validating the result.
pub fn normalize(base: &[String], subscript: Subscript) -> Result<Vec<String>> {
    let mut path = base.to_vec();
    path.extend(subscript.into_vec());
    validate_path(&path)?;
    Ok(path)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode a node coordinate into an order-preserving key.
pub fn encode_key(name: &str, path: &[String]) -> Vec<u8> {
    let mut key = name_prefix(name);
    for subscript in path {
        encode_subscript(subscript, &mut key);
    }
    key
}

/// Key prefix shared by every node of a global.
pub fn name_prefix(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 1);
    key.extend_from_slice(name.as_bytes());
    key.push(NAME_TERMINATOR);
    key
}

fn encode_subscript(subscript: &str, out: &mut Vec<u8>) {
    match CanonicalNumber::parse(subscript) {
        Some(n) if n.is_zero() => out.push(TAG_ZERO),
        Some(n) if n.negative => {
            out.push(TAG_NEGATIVE);
            out.push((127 - n.exponent) as u8);
            out.extend(n.digits.iter().map(|d| 0xFF - d));
            out.push(0xFF);
        }
        Some(n) => {
            out.push(TAG_POSITIVE);
            out.push((128 + n.exponent) as u8);
            out.extend_from_slice(&n.digits);
            out.push(0x00);
        }
        None => {
            out.push(TAG_STRING);
            for &b in subscript.as_bytes() {
                out.push(b);
                if b == ESCAPE {
                    out.push(ESCAPED_NUL);
                }
            }
            out.push(ESCAPE);
            out.push(ESCAPE);
        }
    }
}

/// Decode a key produced by `encode_key`.
pub fn decode_key(key: &[u8]) -> Result<(String, Vec<String>)> {
    let corrupt = |what: &str| GlobalsError::DeserializationError(format!("corrupt key: {}", what));

    let name_end = key
        .iter()
        .position(|&b| b == NAME_TERMINATOR)
        .ok_or_else(|| corrupt("missing name terminator"))?;
    let name = std::str::from_utf8(&key[..name_end])
        .map_err(|_| corrupt("name is not UTF-8"))?
        .to_string();

    let mut path = Vec::new();
    let mut pos = name_end + 1;
    while pos < key.len() {
        let tag = key[pos];
        pos += 1;
        let subscript = match tag {
            TAG_ZERO => "0".to_string(),
            TAG_POSITIVE | TAG_NEGATIVE => {
                let negative = tag == TAG_NEGATIVE;
                let exp_byte = *key.get(pos).ok_or_else(|| corrupt("missing exponent"))?;
                pos += 1;
                let terminator = if negative { 0xFF } else { 0x00 };
                let len = key[pos..]
                    .iter()
                    .position(|&b| b == terminator)
                    .ok_or_else(|| corrupt("unterminated number"))?;
                let digits = key[pos..pos + len]
                    .iter()
                    .map(|&d| if negative { 0xFF - d } else { d })
                    .collect();
                pos += len + 1;
                let exponent = if negative {
                    127 - exp_byte as i32
                } else {
                    exp_byte as i32 - 128
                };
                CanonicalNumber {
                    negative,
                    exponent,
                    digits,
                }
                .to_canonical_string()
            }
            TAG_STRING => {
                let mut bytes = Vec::new();
                loop {
                    let b = *key.get(pos).ok_or_else(|| corrupt("unterminated string"))?;
                    pos += 1;
                    if b != ESCAPE {
                        bytes.push(b);
                        continue;
                    }
                    let next = *key.get(pos).ok_or_else(|| corrupt("dangling escape"))?;
                    pos += 1;
                    match next {
                        ESCAPE => break,
                        ESCAPED_NUL => bytes.push(0x00),
                        _ => return Err(corrupt("invalid escape")),
                    }
                }
                String::from_utf8(bytes).map_err(|_| corrupt("subscript is not UTF-8"))?
            }
            _ => return Err(corrupt("unknown subscript tag")),
        };
        path.push(subscript);
    }

    Ok((name, path))
}

/// True if `candidate` lies strictly inside the subtree rooted at `prefix`.
///
/// Both arguments are encoded keys.
pub fn is_descendant_key(prefix: &[u8], candidate: &[u8]) -> bool {
    candidate.len() > prefix.len() && candidate.starts_with(prefix)
}

/// The smallest key greater than every key starting with `prefix`, or `None`
/// if no such key exists (the prefix is all `0xFF`).
///
/// Seeking to it skips the whole subtree rooted at `prefix`.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut successor = prefix.to_vec();
    while let Some(last) = successor.pop() {
        if last < 0xFF {
            successor.push(last + 1);
            return Some(successor);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn valid_names() {
        for name in ["^patient", "patient", "^%sys", "^A1", "x"] {
            assert!(validate_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "^", "^1abc", "^a-b", "^a b", "^^a", "^aé"] {
            assert!(
                matches!(validate_name(name), Err(GlobalsError::TypeKind(_))),
                "{name:?}"
            );
        }
        let long = format!("^{}", "a".repeat(MAX_NAME_LENGTH + 1));
        assert!(validate_name(&long).is_err());
    }

    #[test]
    fn path_depth_limit() {
        let deep = vec!["x".to_string(); MAX_SUBSCRIPTS + 1];
        assert!(matches!(
            validate_path(&deep),
            Err(GlobalsError::TypeKind(_))
        ));
        assert!(validate_path(&deep[..MAX_SUBSCRIPTS]).is_ok());
    }

    #[test]
    fn normalize_appends() {
        let base = path(&["123"]);
        assert_eq!(
            normalize(&base, Subscript::from("name")).expect("normalize"),
            path(&["123", "name"])
        );
        assert_eq!(
            normalize(&base, Subscript::from(["a", "b"])).expect("normalize"),
            path(&["123", "a", "b"])
        );
    }

    #[test]
    fn json_subscripts() {
        let single = serde_json::json!("a");
        assert_eq!(
            Subscript::try_from(&single).expect("string"),
            Subscript::Single("a".into())
        );

        let multi = serde_json::json!(["a", "b"]);
        assert_eq!(
            Subscript::try_from(&multi).expect("array"),
            Subscript::Path(path(&["a", "b"]))
        );

        for bad in [
            serde_json::json!(1),
            serde_json::json!({"a": 1}),
            serde_json::json!(["a", 2]),
            serde_json::json!(null),
        ] {
            assert!(matches!(
                Subscript::try_from(&bad),
                Err(GlobalsError::TypeKind(_))
            ));
        }

        assert!(
            subscripts_from_json(&serde_json::json!(null))
                .expect("null")
                .is_empty()
        );
        assert!(subscripts_from_json(&serde_json::json!("a")).is_err());
    }

    #[test]
    fn key_roundtrip() {
        let cases = [
            path(&[]),
            path(&["123", "name"]),
            path(&["-1.5", "0", ".01", "100", ""]),
            path(&["a\0b", "\0", "01"]),
        ];
        for p in cases {
            let key = encode_key("^g", &p);
            assert_eq!(decode_key(&key).expect("decode"), ("^g".to_string(), p));
        }
    }

    #[test]
    fn key_order_follows_collation() {
        let ordered = [
            path(&[]),
            path(&["-10"]),
            path(&["-1"]),
            path(&["0"]),
            path(&["2"]),
            path(&["2", "x"]),
            path(&["10"]),
            path(&[""]),
            path(&["a"]),
            path(&["a\0"]),
            path(&["ab"]),
        ];
        let keys: Vec<Vec<u8>> = ordered.iter().map(|p| encode_key("^g", p)).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn descendant_prefix() {
        let parent = encode_key("^g", &path(&["1"]));
        let child = encode_key("^g", &path(&["1", "a"]));
        let sibling = encode_key("^g", &path(&["10"]));
        assert!(is_descendant_key(&parent, &child));
        assert!(!is_descendant_key(&parent, &parent));
        assert!(!is_descendant_key(&parent, &sibling));
    }

    #[test]
    fn successor_skips_subtree() {
        let one = encode_key("^g", &path(&["1"]));
        let next = prefix_successor(&one).expect("successor");
        for inside in [path(&["1"]), path(&["1", "a"]), path(&["1", "", "-5"])] {
            assert!(encode_key("^g", &inside) < next);
        }
        for after in [path(&["1.5"]), path(&["2"]), path(&["10"]), path(&["a"])] {
            assert!(encode_key("^g", &after) >= next);
        }

        let negative = encode_key("^g", &path(&["-3"]));
        let next = prefix_successor(&negative).expect("successor");
        assert!(encode_key("^g", &path(&["-3", "x"])) < next);
        assert!(encode_key("^g", &path(&["-2"])) >= next);

        assert_eq!(prefix_successor(&[0x01, 0xFF, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_successor(&[0xFF]), None);
    }

    #[test]
    fn names_do_not_overlap() {
        let a = encode_key("^a", &path(&["x"]));
        let ab = name_prefix("^ab");
        assert!(!a.starts_with(&ab));
        assert!(!is_descendant_key(&name_prefix("^a"), &ab));
    }
}
