//! Loosely-typed field values as they come out of the source rows.
//!
//! The ERP exposes columns whose types we do not control, so values are
//! carried as a small scalar enum and compared through their canonical
//! textual form. Field sets are kept in a `BTreeMap` so that iteration
//! order is always the byte order of the column names, never incidental
//! insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An ordered set of named field values, keyed by column name.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single scalar value read from a source or destination row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Canonical textual form used for change comparison and hashing.
    ///
    /// `Null` renders as the empty string, matching the comparison rule
    /// that a missing field and an empty field are equal. Integers use
    /// plain decimal; reals use Rust's shortest round-trip `Display`
    /// formatting, which is deterministic across platforms.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Real(v) => v.to_string(),
            FieldValue::Text(v) => v.clone(),
        }
    }

    /// Textual form preserving null-ness, for JSON encodings where the
    /// distinction between "absent" and "empty" matters.
    pub fn as_opt_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            other => Some(other.as_text()),
        }
    }

    /// Whether the value is null or an empty / whitespace-only string.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(v) => v.trim().is_empty(),
            _ => false,
        }
    }

    /// Integer interpretation, if the value carries one.
    ///
    /// Text values are trimmed and parsed; anything else yields `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Real(v) => Some(*v as i64),
            FieldValue::Text(v) => v.trim().parse::<i64>().ok(),
            FieldValue::Null => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(v) => FieldValue::Int(v),
            None => FieldValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_forms() {
        assert_eq!(FieldValue::Null.as_text(), "");
        assert_eq!(FieldValue::Int(42).as_text(), "42");
        assert_eq!(FieldValue::Real(19.9).as_text(), "19.9");
        assert_eq!(FieldValue::Text("abc".into()).as_text(), "abc");
    }

    #[test]
    fn blank_detection() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::Text("   ".into()).is_blank());
        assert!(!FieldValue::Int(0).is_blank());
        assert!(!FieldValue::Text("x".into()).is_blank());
    }

    #[test]
    fn int_parsing_from_text() {
        assert_eq!(FieldValue::Text(" 17 ".into()).as_int(), Some(17));
        assert_eq!(FieldValue::Text("abc".into()).as_int(), None);
        assert_eq!(FieldValue::Null.as_int(), None);
    }
}
