//! Error raised by the dialect guard.

use thiserror::Error;

/// A query written for the legacy T-SQL integration was submitted to the
/// embedded SQLite handle.
///
/// The guard is a fail-fast trip wire: nothing is rewritten or sanitized,
/// the call simply fails with enough context to find the offender.
#[derive(Debug, Clone, Error)]
#[error("{}", self.message())]
pub struct DialectGuardError {
    /// Labeled component that submitted the query.
    pub component: String,
    /// Actual driver name of the handle, e.g. "SQLite".
    pub driver: String,
    /// Path of the embedded database file, when known.
    pub sqlite_path: Option<String>,
    /// Best-effort call site, first frame outside the guard itself.
    pub callsite: Option<String>,
    /// Whitespace-normalized, truncated copy of the offending query.
    pub query: String,
}

impl DialectGuardError {
    fn message(&self) -> String {
        let mut msg = format!(
            "T-SQL on SQLite is not allowed. component={}, driver={}",
            self.component, self.driver
        );
        if let Some(path) = &self.sqlite_path {
            msg.push_str(&format!(", sqlite_path={path}"));
        }
        if let Some(callsite) = &self.callsite {
            msg.push_str(&format!(", callsite={callsite}"));
        }
        msg.push_str(&format!(", query={}", self.query));
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_component_and_driver() {
        let err = DialectGuardError {
            component: "engine".into(),
            driver: "SQLite".into(),
            sqlite_path: Some("/tmp/catalog.db".into()),
            callsite: Some("engine/mod.rs:42".into()),
            query: "SELECT TOP 5 * FROM items".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("component=engine"));
        assert!(msg.contains("driver=SQLite"));
        assert!(msg.contains("sqlite_path=/tmp/catalog.db"));
        assert!(msg.contains("callsite=engine/mod.rs:42"));
        assert!(msg.contains("SELECT TOP 5"));
    }
}
