//! Source-side connector errors.

use thiserror::Error;

/// Maximum length of the SQL text attached to a query error.
const SQL_CONTEXT_LIMIT: usize = 200;

/// Errors raised by the ERP source connector.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Extraction query failed; carries the truncated SQL and parameters
    /// so the caller can surface them.
    #[error("Source query failed: {message}, sql={sql}, params={params:?}")]
    Query {
        message: String,
        sql: String,
        params: Vec<String>,
    },

    #[error("Source row decode error: {0}")]
    Decode(String),
}

impl SourceError {
    /// Build a query error with truncated SQL context.
    pub fn query(message: impl Into<String>, sql: &str, params: &[String]) -> Self {
        let mut sql = sql.split_whitespace().collect::<Vec<_>>().join(" ");
        if sql.len() > SQL_CONTEXT_LIMIT {
            sql.truncate(SQL_CONTEXT_LIMIT);
            sql.push_str("...");
        }
        Self::Query {
            message: message.into(),
            sql,
            params: params.to_vec(),
        }
    }
}
