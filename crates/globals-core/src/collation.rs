//! # Subscript Collation
//!
//! The engine orders subscripts the M way: canonical numbers first, in
//! numeric order, then every other string in byte order.
//!
//! A canonical number is the form the engine itself would print for a
//! numeric value: no `+`, no leading zeros in the integer part, no trailing
//! zeros in the fraction, no trailing `.`, and `-0` is not canonical. So
//! `"12"`, `"-3.5"`, `".25"` and `"0"` are numbers while `"012"`, `"1.0"`,
//! `"0.5"` and `"1e3"` collate as strings.
//!
//! Comparison never goes through floating point. A number is kept as its
//! significant digits plus a decimal exponent.

use std::cmp::Ordering;

/// Maximum significant digits for a subscript to be treated as a number.
pub const MAX_NUMERIC_DIGITS: usize = 18;

/// Largest magnitude of the decimal exponent of a numeric subscript.
pub const MAX_NUMERIC_EXPONENT: i32 = 100;

/// A canonical number, decomposed for ordering.
///
/// The value is `0.d1 d2 d3 ... × 10^exponent`, with `digits` holding the
/// significant digits as ASCII (no leading or trailing zeros). Zero has no
/// digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalNumber {
    pub negative: bool,
    pub exponent: i32,
    pub digits: Vec<u8>,
}

impl CanonicalNumber {
    /// Parse a subscript as a canonical number.
    ///
    /// Returns `None` for any string the engine would collate as a string.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "0" {
            return Some(Self::zero());
        }

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if body.is_empty() {
            return None;
        }

        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (body, None),
        };

        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if int_part.starts_with('0') {
            return None;
        }
        if let Some(frac) = frac_part {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if frac.ends_with('0') {
                return None;
            }
        }

        let frac = frac_part.unwrap_or("");
        let (digits, exponent) = if int_part.is_empty() {
            let leading = frac.bytes().take_while(|&b| b == b'0').count();
            (frac.as_bytes()[leading..].to_vec(), -(leading as i32))
        } else {
            let mut digits = int_part.as_bytes().to_vec();
            digits.extend_from_slice(frac.as_bytes());
            (digits, int_part.len() as i32)
        };

        // Integers like "100" carry trailing zeros in the integer part.
        let significant = digits.len() - digits.iter().rev().take_while(|&&b| b == b'0').count();
        let digits = digits[..significant].to_vec();

        if digits.is_empty() || digits.len() > MAX_NUMERIC_DIGITS {
            return None;
        }
        if exponent.abs() > MAX_NUMERIC_EXPONENT {
            return None;
        }

        Some(Self {
            negative,
            exponent,
            digits,
        })
    }

    #[must_use]
    pub fn zero() -> Self {
        Self {
            negative: false,
            exponent: 0,
            digits: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Render back to canonical text.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }

        let digits = String::from_utf8_lossy(&self.digits);
        let len = self.digits.len() as i32;
        let mut out = String::new();
        if self.negative {
            out.push('-');
        }

        if self.exponent <= 0 {
            out.push('.');
            for _ in 0..-self.exponent {
                out.push('0');
            }
            out.push_str(&digits);
        } else if self.exponent >= len {
            out.push_str(&digits);
            for _ in 0..(self.exponent - len) {
                out.push('0');
            }
        } else {
            let split = self.exponent as usize;
            out.push_str(&digits[..split]);
            out.push('.');
            out.push_str(&digits[split..]);
        }
        out
    }

    fn magnitude_cmp(&self, other: &Self) -> Ordering {
        self.exponent
            .cmp(&other.exponent)
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl Ord for CanonicalNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => {
                return if other.negative {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            (false, true) => {
                return if self.negative {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            (false, false) => {}
        }

        match (self.negative, other.negative) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.magnitude_cmp(other),
            (true, true) => other.magnitude_cmp(self),
        }
    }
}

impl PartialOrd for CanonicalNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// True if the subscript collates as a number.
pub fn is_canonical_number(s: &str) -> bool {
    CanonicalNumber::parse(s).is_some()
}

/// Compare two subscripts in collation order.
pub fn compare_subscripts(a: &str, b: &str) -> Ordering {
    match (CanonicalNumber::parse(a), CanonicalNumber::parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.as_bytes().cmp(b.as_bytes()),
    }
}

/// Compare two subscript paths in collation order.
///
/// A path sorts before every path it is a proper prefix of.
pub fn compare_paths(a: &[String], b: &[String]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare_subscripts(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
