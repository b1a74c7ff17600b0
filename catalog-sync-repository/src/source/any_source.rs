//! Driver-agnostic source connector over `sqlx::AnyPool`.
//!
//! The ERP backend is picked at runtime from the connection URL. The
//! extraction query is plain keyset pagination and sticks to portable
//! syntax; table and column names come from trusted mapping configuration
//! and are embedded as-is.

use async_trait::async_trait;
use catalog_sync_shared::{EntityMapping, FieldMap, FieldValue};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row, TypeInfo, ValueRef};

use crate::errors::SourceError;
use crate::interfaces::CatalogSource;

/// Default source pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Source connector backed by any sqlx-supported database.
pub struct AnySource {
    pool: AnyPool,
}

impl AnySource {
    /// Connect to the ERP database behind `url`.
    pub async fn connect(url: &str) -> Result<Self, SourceError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an already-connected pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogSource for AnySource {
    async fn fetch_page(
        &self,
        mapping: &EntityMapping,
        after_key: &str,
        limit: i64,
    ) -> Result<Vec<FieldMap>, SourceError> {
        let mut select = mapping.select.clone();
        if !select
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&mapping.key_column))
        {
            select.insert(0, mapping.key_column.clone());
        }

        let mut sql = format!("SELECT {} FROM {}", select.join(", "), mapping.source_table);
        let mut clauses = Vec::new();
        if let Some(filter) = &mapping.filter {
            clauses.push(format!("({filter})"));
        }
        if !after_key.is_empty() {
            clauses.push(format!("{} > ?", mapping.key_column));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {} ASC LIMIT ?", mapping.key_column));

        let mut params = Vec::new();
        let mut query = sqlx::query(&sql);
        if !after_key.is_empty() {
            query = query.bind(after_key);
            params.push(after_key.to_string());
        }
        query = query.bind(limit);
        params.push(limit.to_string());

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| SourceError::query(err.to_string(), &sql, &params))?;

        rows.iter().map(decode_any_row).collect()
    }
}

/// Decode a driver-agnostic row into a loosely-typed field map.
fn decode_any_row(row: &AnyRow) -> Result<FieldMap, SourceError> {
    let mut fields = FieldMap::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row
            .try_get_raw(index)
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        let value = if raw.is_null() {
            FieldValue::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            if type_name.contains("INT") {
                FieldValue::Int(row.try_get::<i64, _>(index).map_err(decode_err)?)
            } else if type_name.contains("BOOL") {
                FieldValue::Int(row.try_get::<bool, _>(index).map_err(decode_err)? as i64)
            } else if ["REAL", "FLOAT", "DOUBLE", "DECIMAL", "NUMERIC"]
                .iter()
                .any(|t| type_name.contains(t))
            {
                FieldValue::Real(row.try_get::<f64, _>(index).map_err(decode_err)?)
            } else if type_name.contains("BLOB") || type_name.contains("BINARY") {
                let bytes: Vec<u8> = row.try_get(index).map_err(decode_err)?;
                FieldValue::Text(String::from_utf8_lossy(&bytes).into_owned())
            } else {
                FieldValue::Text(row.try_get::<String, _>(index).map_err(decode_err)?)
            }
        };
        fields.insert(column.name().to_string(), value);
    }
    Ok(fields)
}

fn decode_err(err: sqlx::Error) -> SourceError {
    SourceError::Decode(err.to_string())
}
