use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::backend::StatusBackend;
use crate::report::{RowId, RowStatus, format_elapsed};
use crate::store::StatusStore;

/// Drives pending rows through the remote status-update call
///
/// With one worker (the default) rows are handled strictly in row order and
/// each call completes before the next row is marked `Processing`, so at most
/// one row is ever `Processing`. More workers trade that guarantee for
/// throughput: rows are still started in row order, with up to `workers`
/// calls in flight, and results land as they arrive.
pub struct StatusProcessor {
    backend: Arc<dyn StatusBackend>,
    target: RowStatus,
    workers: usize,
}

/// Outcome counts of one processing run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Rows whose status-update call returned a row
    pub succeeded: usize,
    /// Rows marked `Error` after a failed call
    pub failed: usize,
    /// Rows that vanished before their turn (the store was reseeded)
    pub skipped: usize,
}

enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

impl RunReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn visited(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl StatusProcessor {
    pub fn new(backend: Arc<dyn StatusBackend>) -> Self {
        StatusProcessor {
            backend,
            target: RowStatus::Completed,
            workers: 1,
        }
    }

    /// Allow up to `workers` concurrent calls; zero is treated as one
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every row that is `Pending` right now
    ///
    /// Rows that show up later (a reseed of the store) are left alone, and
    /// writes for rows that disappeared are dropped.
    pub async fn process_pending(&self, store: &StatusStore) -> RunReport {
        let (generation, ids) = store.pending_ids();
        self.drive(store, generation, ids).await
    }

    async fn drive(&self, store: &StatusStore, generation: u64, ids: Vec<RowId>) -> RunReport {
        let mut report = RunReport::default();
        let queued = ids.len();

        if self.workers == 1 {
            for id in ids {
                report.record(self.process_row(store, generation, id).await);
            }
        } else {
            let outcomes: Vec<Outcome> = stream::iter(ids)
                .map(|id| self.process_row(store, generation, id))
                .buffer_unordered(self.workers)
                .collect()
                .await;
            for outcome in outcomes {
                report.record(outcome);
            }
        }

        log::info!(
            "Processing run over {} rows finished: {} succeeded, {} failed, {} skipped",
            queued,
            report.succeeded,
            report.failed,
            report.skipped
        );
        report
    }

    async fn process_row(&self, store: &StatusStore, generation: u64, id: RowId) -> Outcome {
        let started = Instant::now();
        if !store.update_in(generation, id, |row| row.status = RowStatus::Processing) {
            log::debug!("Row {} is gone, skipping", id);
            return Outcome::Skipped;
        }
        log::debug!("Row {} -> Processing", id);

        match self.backend.update_status(id, self.target).await {
            Ok(mut row) => {
                if row.id != id {
                    log::warn!("Backend answered row {} for row {}", row.id, id);
                    row.id = id;
                }
                if row.time.is_empty() {
                    row.time = format_elapsed(started.elapsed());
                }
                log::debug!("Row {} -> {}", id, row.status);
                store.update_in(generation, id, |current| *current = row);
                Outcome::Succeeded
            }
            Err(e) => {
                log::warn!("Status update for row {} failed: {}", id, e);
                let elapsed = format_elapsed(started.elapsed());
                store.update_in(generation, id, |current| {
                    current.status = RowStatus::Error;
                    current.time = elapsed;
                });
                Outcome::Failed
            }
        }
    }
}

/// One processing run bound to one load of a store
///
/// A run can start once. Later calls to [`start`](ProcessingRun::start),
/// say from a page being rendered again, do nothing; a new upload creates a
/// new run.
pub struct ProcessingRun {
    generation: u64,
    started: AtomicBool,
}

impl ProcessingRun {
    pub fn new(generation: u64) -> Self {
        ProcessingRun {
            generation,
            started: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Run the processor over the store's pending rows
    ///
    /// # Returns
    /// * `None` if this run had already been started
    /// * `Some(report)` otherwise; the report is empty when the store has
    ///   since been reseeded
    pub async fn start(&self, processor: &StatusProcessor, store: &StatusStore) -> Option<RunReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let (generation, ids) = store.pending_ids();
        if generation != self.generation {
            log::debug!(
                "Run for generation {} is stale (store at {})",
                self.generation,
                generation
            );
            return Some(RunReport::default());
        }
        Some(processor.drive(store, generation, ids).await)
    }
}
