//! Canonical content hash over a row's tracked field set.
//!
//! The hash is the single cheap check the engine uses to skip unnecessary
//! writes, so its serialization must never flap across platforms or map
//! iteration orders. The canonical form is fixed here: field names keep
//! their original case and are sorted bytewise (the `BTreeMap` order),
//! values render through [`FieldValue::as_opt_text`] (NULL stays `null`,
//! numbers use their shortest round-trip form) and the result is JSON
//! hashed with SHA-256.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::types::{FieldMap, FieldValue};

/// Hex-encoded SHA-256 over the canonical serialization of `fields`.
pub fn row_hash(fields: &FieldMap) -> String {
    let canonical: BTreeMap<&str, Option<String>> = fields
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_opt_text()))
        .collect();
    let json = serde_json::to_string(&canonical).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when a stored hash predates the hash column (legacy row).
pub fn is_legacy_hash(stored: &FieldValue) -> bool {
    stored.as_text().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn hash_is_deterministic_regardless_of_insertion_order() {
        let mut a = FieldMap::new();
        a.insert("name".into(), "Lamp".into());
        a.insert("stock".into(), FieldValue::Int(3));

        let mut b = FieldMap::new();
        b.insert("stock".into(), FieldValue::Int(3));
        b.insert("name".into(), "Lamp".into());

        assert_eq!(row_hash(&a), row_hash(&b));
    }

    #[test]
    fn hash_distinguishes_null_from_empty() {
        let with_null = row(&[("note", FieldValue::Null)]);
        let with_empty = row(&[("note", "".into())]);
        assert_ne!(row_hash(&with_null), row_hash(&with_empty));
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let before = row(&[("stock", FieldValue::Int(3))]);
        let after = row(&[("stock", FieldValue::Int(4))]);
        assert_ne!(row_hash(&before), row_hash(&after));
    }
}
