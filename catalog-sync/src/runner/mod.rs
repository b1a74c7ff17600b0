//! Multi-batch sync driver.
//!
//! Drives the engine batch by batch for one entity, bounded by an
//! optional wall-clock budget, then runs the hierarchy pass for
//! tree-shaped entities. A run that exhausts its budget leaves the
//! durable state positioned so the next run can resume with the stored
//! token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use catalog_sync_shared::RunReport;

use crate::engine::SyncEngine;
use crate::errors::SyncError;
use crate::hierarchy::HierarchyPass;
use crate::mappings::MappingProvider;

/// Per-run options.
#[derive(Clone)]
pub struct RunOptions {
    pub batch_size: i64,
    /// Wall-clock budget for the batch loop; `None` runs to completion.
    pub budget: Option<Duration>,
    /// Start from the stored resume token instead of a full rebuild.
    pub resume: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { batch_size: 200, budget: None, resume: false }
    }
}

/// Drives full syncs over the registered entity mappings.
pub struct SyncRunner {
    engine: SyncEngine,
    hierarchy: HierarchyPass,
    mappings: Arc<dyn MappingProvider>,
}

impl SyncRunner {
    pub fn new(engine: SyncEngine, mappings: Arc<dyn MappingProvider>) -> Self {
        let hierarchy = HierarchyPass::new(engine.targets().clone());
        Self { engine, hierarchy, mappings }
    }

    /// Run every registered entity in provider order.
    pub async fn run_all(&self, options: &RunOptions) -> Result<Vec<RunReport>, SyncError> {
        let mut reports = Vec::new();
        for entity in self.mappings.entities() {
            reports.push(self.run_entity(&entity, options).await?);
        }
        Ok(reports)
    }

    /// Run one entity to completion or until the budget runs out.
    pub async fn run_entity(
        &self,
        entity: &str,
        options: &RunOptions,
    ) -> Result<RunReport, SyncError> {
        let mapping = self.mappings.mapping(entity)?;
        let started = Instant::now();

        let mut after_key = if options.resume {
            self.engine.states().load(entity).await?.last_key
        } else {
            String::new()
        };

        let mut budget_exhausted = false;
        let report = loop {
            let report = self
                .engine
                .process_batch(&mapping, &after_key, options.batch_size)
                .await?;
            if report.done {
                break report;
            }
            if let Some(budget) = options.budget {
                if started.elapsed() >= budget {
                    budget_exhausted = true;
                    break report;
                }
            }
            after_key = report.last_key;
        };

        let paths_updated = if mapping.tree.is_some() && report.done {
            self.hierarchy.rebuild(&mapping).await?
        } else {
            0
        };

        let run = RunReport {
            entity: entity.to_string(),
            done: report.done,
            total_fetched: report.total_fetched,
            inserted: report.inserted,
            updated: report.updated,
            unchanged: report.unchanged,
            errors_count: report.errors_count,
            batches: report.batches,
            last_key: report.last_key,
            paths_updated,
            budget_exhausted,
        };
        info!(
            entity = %run.entity,
            done = run.done,
            total_fetched = run.total_fetched,
            inserted = run.inserted,
            updated = run.updated,
            unchanged = run.unchanged,
            errors_count = run.errors_count,
            batches = run.batches,
            paths_updated = run.paths_updated,
            budget_exhausted = run.budget_exhausted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished sync run"
        );
        Ok(run)
    }

    /// Rebuild hierarchy paths without syncing, e.g. after a manual edit.
    pub async fn rebuild_paths(&self, entity: &str) -> Result<i64, SyncError> {
        let mapping = self.mappings.mapping(entity)?;
        self.hierarchy.rebuild(&mapping).await
    }
}
