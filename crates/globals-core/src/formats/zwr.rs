//! # ZWRITE Text Format
//!
//! One node per line, the way M's `ZWRITE` prints globals:
//!
//! ```text
//! ^patient("123","dob")="1980-02-01"
//! ^patient("123","name")="Jane Doe"
//! ```
//!
//! Rendering always quotes subscripts and values, doubling embedded `"`.
//! Parsing additionally accepts unquoted canonical numbers, so references
//! typed by hand such as `^patient(123,"name")` work too.

use crate::collation::is_canonical_number;
use crate::engine::Engine;
use crate::keys;
use crate::node::Node;
use crate::{GlobalsError, Result};
use std::iter::Peekable;
use std::str::Chars;

// =============================================================================
// RENDERING
// =============================================================================

/// Quote a string, doubling embedded quotes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// `name` or `name("s1","s2")`.
pub fn format_reference(name: &str, path: &[String]) -> String {
    if path.is_empty() {
        return name.to_string();
    }
    let subs: Vec<String> = path.iter().map(|s| quote(s)).collect();
    format!("{}({})", name, subs.join(","))
}

/// `reference="value"`.
pub fn format_line(name: &str, path: &[String], value: &str) -> String {
    format!("{}={}", format_reference(name, path), quote(value))
}

/// Every value in the Node's subtree, the Node itself first, as ZWRITE lines.
pub fn zwrite<E: Engine>(node: &Node<E>) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    if node.has_value()? {
        lines.push(node.to_display_string()?);
    }
    for suffix in node.iter() {
        let mut path = node.path().to_vec();
        path.extend(suffix?);
        let value = node.engine().get(node.name(), &path)?;
        lines.push(format_line(node.name(), &path, &value));
    }
    Ok(lines)
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse `name` or `name(sub,...)`.
pub fn parse_reference(text: &str) -> Result<(String, Vec<String>)> {
    let mut chars = text.trim().chars().peekable();
    let reference = parse_reference_from(&mut chars)?;
    if let Some(c) = chars.next() {
        return Err(parse_error(format!("unexpected {:?} after reference", c)));
    }
    Ok(reference)
}

/// Parse `reference=value`.
pub fn parse_line(text: &str) -> Result<(String, Vec<String>, String)> {
    let mut chars = text.trim().chars().peekable();
    let (name, path) = parse_reference_from(&mut chars)?;
    if chars.next() != Some('=') {
        return Err(parse_error(format!("expected '=' in {:?}", text)));
    }
    let value = parse_atom(&mut chars, &[])?;
    if let Some(c) = chars.next() {
        return Err(parse_error(format!("unexpected {:?} after value", c)));
    }
    Ok((name, path, value))
}

/// Set every line of ZWRITE text into the engine. Blank lines are skipped.
///
/// Returns the number of nodes written.
pub fn load<E: Engine>(engine: &E, text: &str) -> Result<usize> {
    let mut written = 0;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let (name, path, value) = parse_line(line)?;
        keys::validate_path(&path)?;
        engine.set(&name, &path, &value)?;
        written += 1;
    }
    Ok(written)
}

fn parse_reference_from(chars: &mut Peekable<Chars<'_>>) -> Result<(String, Vec<String>)> {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c == '(' || c == '=' {
            break;
        }
        name.push(c);
        chars.next();
    }
    keys::validate_name(&name)?;

    let mut path = Vec::new();
    if chars.peek() == Some(&'(') {
        chars.next();
        loop {
            path.push(parse_atom(chars, &[',', ')'])?);
            match chars.next() {
                Some(',') => continue,
                Some(')') => break,
                Some(c) => return Err(parse_error(format!("unexpected {:?} in subscripts", c))),
                None => return Err(parse_error("unterminated subscript list")),
            }
        }
    }
    Ok((name, path))
}

/// A quoted string or an unquoted canonical number, ending before any of
/// `stops` (or at end of input).
fn parse_atom(chars: &mut Peekable<Chars<'_>>, stops: &[char]) -> Result<String> {
    if chars.peek() == Some(&'"') {
        chars.next();
        let mut out = String::new();
        loop {
            match chars.next() {
                Some('"') if chars.peek() == Some(&'"') => {
                    chars.next();
                    out.push('"');
                }
                Some('"') => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(parse_error("unterminated string")),
            }
        }
    }

    let mut token = String::new();
    while let Some(&c) = chars.peek() {
        if stops.contains(&c) {
            break;
        }
        token.push(c);
        chars.next();
    }
    if !is_canonical_number(&token) {
        return Err(parse_error(format!(
            "{:?} is neither a quoted string nor a canonical number",
            token
        )));
    }
    Ok(token)
}

fn parse_error(message: impl Into<String>) -> GlobalsError {
    GlobalsError::ParseError(message.into())
}
