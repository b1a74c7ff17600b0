//! Embedded SQLite destination: dialect guard, schema reconciler and the
//! state / target / history repositories.

pub mod guard;
pub mod history;
pub mod schema;
pub mod state;
pub mod target;

pub use guard::{GuardedSqlite, GuardedTransaction};
pub use history::SqliteHistoryRepository;
pub use schema::{DesiredColumn, SchemaReconciler};
pub use state::SqliteStateRepository;
pub use target::SqliteTargetRepository;

use catalog_sync_shared::{FieldMap, FieldValue};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::errors::RepositoryError;

/// Quote an identifier for SQLite, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Decode a SQLite row into a loosely-typed field map.
pub(crate) fn decode_row(row: &SqliteRow) -> Result<FieldMap, RepositoryError> {
    let mut fields = FieldMap::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            FieldValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => FieldValue::Int(row.try_get(index)?),
                "REAL" => FieldValue::Real(row.try_get(index)?),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get(index)?;
                    FieldValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => FieldValue::Text(row.try_get(index)?),
            }
        };
        fields.insert(column.name().to_string(), value);
    }
    Ok(fields)
}

/// Bind a field value onto a query.
pub(crate) fn bind_value<'q>(
    query: guard::SqliteQuery<'q>,
    value: &'q FieldValue,
) -> guard::SqliteQuery<'q> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Int(v) => query.bind(*v),
        FieldValue::Real(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.as_str()),
    }
}

/// Merge change-reason tags into an accumulated, deduplicated, comma-joined set.
pub fn merge_reasons(existing: &str, reasons: &[&str]) -> String {
    let mut merged: Vec<String> = Vec::new();
    for tag in existing.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !merged.iter().any(|m| m == tag) {
            merged.push(tag.to_string());
        }
    }
    for tag in reasons {
        if !merged.iter().any(|m| m == tag) {
            merged.push(tag.to_string());
        }
    }
    merged.join(",")
}
