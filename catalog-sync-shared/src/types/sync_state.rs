//! Durable sync progress state and the per-batch report.

use serde::{Deserialize, Serialize};

/// Durable cursor state, one row per entity type.
///
/// Created on the first batch with an empty resume token, mutated after
/// every batch, never deleted. All cross-call engine state lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// Last business key successfully processed; empty means "from the start".
    pub last_key: String,
    pub total_fetched: i64,
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub errors_count: i64,
    /// Number of non-empty batches processed since the last reset.
    pub batches: i64,
    pub started_at: Option<String>,
    pub updated_at: Option<String>,
    pub done: bool,
}

impl SyncState {
    /// Fresh state with all counters at zero.
    pub fn empty() -> Self {
        Self {
            last_key: String::new(),
            total_fetched: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            errors_count: 0,
            batches: 0,
            started_at: None,
            updated_at: None,
            done: false,
        }
    }
}

/// Flat result of one engine invocation, consumed by callers and CLIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub done: bool,
    pub batch_size: i64,
    pub batch_fetched: i64,
    pub total_fetched: i64,
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub errors_count: i64,
    pub batches: i64,
    pub last_key: String,
}

/// Aggregate result of a multi-batch run, including the hierarchy pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub entity: String,
    pub done: bool,
    pub total_fetched: i64,
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub errors_count: i64,
    pub batches: i64,
    pub last_key: String,
    /// Nodes whose derived path fields were rewritten; zero for flat entities.
    pub paths_updated: i64,
    /// True when the wall-clock budget ran out before `done`.
    pub budget_exhausted: bool,
}
