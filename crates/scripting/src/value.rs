//! Script values
//!
//! Values only exist for the duration of one evaluation; variables store
//! their own representation (see `variables`).

use serde::Serialize;
use std::fmt;

/// Type of a resolved operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueType {
    Text,
    Number,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Text => f.write_str("text"),
            ValueType::Number => f.write_str("number"),
        }
    }
}

/// A resolved operand
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f32),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Text(_) => ValueType::Text,
            Value::Number(_) => ValueType::Number,
        }
    }

    /// Text form; numbers are formatted without a trailing `.0`
    pub fn into_text(self) -> String {
        match self {
            Value::Text(s) => s,
            Value::Number(n) => format_number(n),
        }
    }

    /// Numeric form; text is parsed like a C `atof`
    pub fn as_number(&self) -> f32 {
        match self {
            Value::Text(s) => parse_number(s),
            Value::Number(n) => *n,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

/// Parse the longest numeric prefix of `text`, or 0 if there is none
pub fn parse_number(text: &str) -> f32 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || (end == digits_start + 1 && bytes[digits_start] == b'.') {
        return 0.0;
    }

    // Exponent only counts when digits follow
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }

    text[..end].parse().unwrap_or(0.0)
}

/// Format a number the way scripts expect to read it back
pub fn format_number(n: f32) -> String {
    if n.fract() == 0.0 && n.abs() < 1e9 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
