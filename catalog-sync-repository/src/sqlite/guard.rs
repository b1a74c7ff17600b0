//! Dialect guard around the embedded SQLite destination.
//!
//! The storefront grew out of an integration whose extraction queries were
//! written in T-SQL. Every statement submitted to the embedded handle is
//! inspected before execution; anything carrying a T-SQL-only syntax
//! signature fails immediately with a diagnostic instead of producing a
//! confusing SQLite syntax error (or, worse, silently doing the wrong
//! thing). Passing queries proceed to the real execution path unchanged.

use std::panic::Location;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::database::Database;
use sqlx::sqlite::{SqliteArguments, SqliteQueryResult, SqliteRow};
use sqlx::{Execute, Sqlite, SqlitePool, Transaction};

use crate::errors::{DialectGuardError, RepositoryError};

/// A bound SQLite query as the guard methods accept it.
pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Maximum length of the query copy attached to a guard error.
const QUERY_CONTEXT_LIMIT: usize = 200;

/// Syntax signatures that only occur in T-SQL.
static TSQL_SIGNATURES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bSELECT\s+TOP\b",
        r"(?i)\bFROM\s+dbo\.",
        r"(?i)\bFROM\s+\[dbo\]\.",
        r"@@\w+",
        r"(?i)\bWITH\s*\(\s*NOLOCK\s*\)",
        r"(?i)\bISNULL\s*\(",
        r"(?i)\bGETDATE\s*\(",
        r"(?i)\bCONVERT\s*\(",
        r"(?i)\bCAST\s*\([^)]*\bAS\s+N?VARCHAR\b",
        r"(?i)\bOFFSET\s+\d+\s+ROWS\s+FETCH\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static dialect pattern"))
    .collect()
});

/// Bracketed identifiers alone are ambiguous; they only count as T-SQL in
/// combination with one of these keywords.
static BRACKET_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]").expect("static dialect pattern"));

static TSQL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(TOP|NOLOCK|ISNULL|GETDATE|CONVERT|OFFSET|FETCH)\b")
        .expect("static dialect pattern")
});

/// True when the statement carries a T-SQL-only signature.
pub fn matches_foreign_dialect(sql: &str) -> bool {
    let sql = sql.trim();
    if sql.is_empty() {
        return false;
    }
    if TSQL_SIGNATURES.iter().any(|p| p.is_match(sql)) {
        return true;
    }
    BRACKET_IDENTIFIER.is_match(sql) && TSQL_KEYWORD.is_match(sql)
}

/// Whitespace-normalize and truncate a query for diagnostics.
fn normalize_query(sql: &str) -> String {
    let mut normalized = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.len() > QUERY_CONTEXT_LIMIT {
        normalized.truncate(QUERY_CONTEXT_LIMIT);
        normalized.push_str("...");
    }
    normalized
}

/// Guard context shared between the pool wrapper and its transactions.
#[derive(Debug, Clone)]
struct GuardContext {
    component: String,
    sqlite_path: Option<String>,
}

impl GuardContext {
    fn check(
        &self,
        sql: &str,
        callsite: &'static Location<'static>,
    ) -> Result<(), DialectGuardError> {
        if !matches_foreign_dialect(sql) {
            return Ok(());
        }
        Err(DialectGuardError {
            component: self.component.clone(),
            driver: <Sqlite as Database>::NAME.to_string(),
            sqlite_path: self.sqlite_path.clone(),
            callsite: Some(format!("{}:{}", callsite.file(), callsite.line())),
            query: normalize_query(sql),
        })
    }
}

/// Dialect-guarded handle to the embedded SQLite destination.
///
/// This wrapper is the only way sync components touch the destination;
/// the raw pool is deliberately not exposed.
#[derive(Debug, Clone)]
pub struct GuardedSqlite {
    pool: SqlitePool,
    ctx: GuardContext,
}

impl GuardedSqlite {
    /// Wrap a destination pool for the given calling component.
    pub fn new(pool: SqlitePool, component: impl Into<String>) -> Self {
        Self {
            pool,
            ctx: GuardContext {
                component: component.into(),
                sqlite_path: None,
            },
        }
    }

    /// Attach the on-disk database path for diagnostics.
    pub fn with_path(mut self, sqlite_path: impl Into<String>) -> Self {
        self.ctx.sqlite_path = Some(sqlite_path.into());
        self
    }

    /// Execute a bound statement.
    #[track_caller]
    pub fn execute<'q>(
        &'q self,
        query: SqliteQuery<'q>,
    ) -> BoxFuture<'q, Result<SqliteQueryResult, RepositoryError>> {
        let callsite = Location::caller();
        Box::pin(async move {
            self.ctx.check(query.sql(), callsite)?;
            Ok(query.execute(&self.pool).await?)
        })
    }

    /// Fetch all rows of a bound statement.
    #[track_caller]
    pub fn fetch_all<'q>(
        &'q self,
        query: SqliteQuery<'q>,
    ) -> BoxFuture<'q, Result<Vec<SqliteRow>, RepositoryError>> {
        let callsite = Location::caller();
        Box::pin(async move {
            self.ctx.check(query.sql(), callsite)?;
            Ok(query.fetch_all(&self.pool).await?)
        })
    }

    /// Fetch at most one row of a bound statement.
    #[track_caller]
    pub fn fetch_optional<'q>(
        &'q self,
        query: SqliteQuery<'q>,
    ) -> BoxFuture<'q, Result<Option<SqliteRow>, RepositoryError>> {
        let callsite = Location::caller();
        Box::pin(async move {
            self.ctx.check(query.sql(), callsite)?;
            Ok(query.fetch_optional(&self.pool).await?)
        })
    }

    /// Begin a guarded transaction. All statements inside go through the
    /// same dialect check.
    pub async fn begin(&self) -> Result<GuardedTransaction, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(GuardedTransaction {
            tx,
            ctx: self.ctx.clone(),
        })
    }
}

/// A guarded, all-or-nothing write unit against the destination.
///
/// Dropping without [`commit`](Self::commit) rolls back.
pub struct GuardedTransaction {
    tx: Transaction<'static, Sqlite>,
    ctx: GuardContext,
}

impl GuardedTransaction {
    /// Execute a bound statement inside the transaction.
    #[track_caller]
    pub fn execute<'q>(
        &'q mut self,
        query: SqliteQuery<'q>,
    ) -> BoxFuture<'q, Result<SqliteQueryResult, RepositoryError>> {
        let callsite = Location::caller();
        Box::pin(async move {
            self.ctx.check(query.sql(), callsite)?;
            Ok(query.execute(&mut *self.tx).await?)
        })
    }

    /// Fetch at most one row inside the transaction.
    #[track_caller]
    pub fn fetch_optional<'q>(
        &'q mut self,
        query: SqliteQuery<'q>,
    ) -> BoxFuture<'q, Result<Option<SqliteRow>, RepositoryError>> {
        let callsite = Location::caller();
        Box::pin(async move {
            self.ctx.check(query.sql(), callsite)?;
            Ok(query.fetch_optional(&mut *self.tx).await?)
        })
    }

    /// Commit the transaction.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        Ok(self.tx.commit().await?)
    }

    /// Roll the transaction back explicitly.
    pub async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(self.tx.rollback().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsql_signatures_are_detected() {
        for sql in [
            "SELECT TOP 10 * FROM items",
            "select top 10 * from items",
            "SELECT * FROM dbo.Items",
            "SELECT * FROM [dbo].[Items]",
            "SELECT @@VERSION",
            "SELECT * FROM items WITH (NOLOCK)",
            "SELECT ISNULL(name, '') FROM items",
            "SELECT GETDATE()",
            "SELECT CONVERT(varchar, price) FROM items",
            "SELECT CAST(price AS NVARCHAR) FROM items",
            "SELECT * FROM items ORDER BY id OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY",
            "SELECT TOP 5 [name] FROM [items]",
        ] {
            assert!(matches_foreign_dialect(sql), "should trip: {sql}");
        }
    }

    #[test]
    fn sqlite_statements_pass() {
        for sql in [
            "",
            "SELECT * FROM items WHERE item_id > ? ORDER BY item_id LIMIT 10",
            "INSERT INTO items (\"name\") VALUES (?)",
            "PRAGMA table_info(\"items\")",
            "CREATE TABLE IF NOT EXISTS sync_state (type TEXT PRIMARY KEY)",
            // Bracketed identifiers alone do not count without a T-SQL keyword.
            "SELECT [weird column] FROM notes",
        ] {
            assert!(!matches_foreign_dialect(sql), "should pass: {sql}");
        }
    }

    #[test]
    fn query_context_is_normalized_and_truncated() {
        let long = format!("SELECT   TOP\n10 {} FROM dbo.Items", "x,".repeat(200));
        let normalized = normalize_query(&long);
        assert!(normalized.len() <= QUERY_CONTEXT_LIMIT + 3);
        assert!(normalized.ends_with("..."));
        assert!(normalized.starts_with("SELECT TOP 10"));
    }
}
