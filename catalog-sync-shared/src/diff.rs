//! Change tracking: field-level diffing and its canonical encoding.
//!
//! Values are compared through their textual form so that incidental type
//! differences between the source driver and the embedded store (e.g.
//! `42` vs `"42"`) never produce a false change. The encoding is key-sorted
//! and therefore deterministic: two logically identical diffs always encode
//! to the same string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::FieldMap;

/// Before/after pair for one changed field.
///
/// `None` means the value was absent or NULL on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Field name to before/after mapping. Empty means no tracked field differs.
pub type ChangeDiff = BTreeMap<String, FieldChange>;

/// Compare the tracked fields of an existing and an incoming record.
///
/// A missing `existing` record diffs every non-blank incoming field against
/// nothing. Comparison is string-normalized; NULL and the empty string are
/// considered equal.
pub fn build_diff(
    existing: Option<&FieldMap>,
    incoming: &FieldMap,
    tracked_fields: &[String],
) -> ChangeDiff {
    let mut diff = ChangeDiff::new();
    for field in tracked_fields {
        let old = existing.and_then(|row| row.get(field));
        let new = incoming.get(field);

        let old_text = old.map(|v| v.as_text()).unwrap_or_default();
        let new_text = new.map(|v| v.as_text()).unwrap_or_default();
        if old_text != new_text {
            diff.insert(
                field.clone(),
                FieldChange {
                    old: old.and_then(|v| v.as_opt_text()),
                    new: new.and_then(|v| v.as_opt_text()),
                },
            );
        }
    }
    diff
}

/// Deterministic, key-sorted JSON encoding of a diff.
pub fn encode_diff(diff: &ChangeDiff) -> String {
    serde_json::to_string(diff).unwrap_or_else(|_| "{}".to_string())
}
