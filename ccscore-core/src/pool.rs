// SPDX-License-Identifier: AGPL-3.0-or-later
// CCScore - Controversy and Clustering Scores over Edit Graphs
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed pool of scoring threads fed from one bounded queue.
//!
//! Shutdown is by sentinel: [`WorkerPool::finish`] pushes one [`Job::Stop`]
//! per worker, so each thread sees exactly one and no unit is lost.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::error::{Result, ScoreError};
use crate::queue::BoundedQueue;
use crate::work::WorkUnit;
use crate::worker::{Job, ScoringContext, ScoringWorker, WorkerReport};

/// Totals of a finished run
#[derive(Debug)]
pub struct PoolSummary<W> {
    pub submitted: u64,
    pub processed: u64,
    pub skipped: u64,
    pub elapsed: Duration,
    pub reports: Vec<WorkerReport<W>>,
}

pub struct WorkerPool<W> {
    queue: Arc<BoundedQueue<Job>>,
    abort: Arc<AtomicBool>,
    handles: Vec<JoinHandle<WorkerReport<W>>>,
    submitted: u64,
    started: Instant,
}

impl<W: Write + Send + 'static> WorkerPool<W> {
    /// Spawn `config.num_workers` threads. `sinks(i)` opens the score and
    /// diagnostics streams of worker `i`.
    pub fn start<F>(
        context: Arc<ScoringContext>,
        config: &ScoringConfig,
        mut sinks: F,
    ) -> Result<Self>
    where
        F: FnMut(usize) -> Result<(W, W)>,
    {
        config.validate()?;
        let mut pool = Self {
            queue: Arc::new(BoundedQueue::new(config.queue_capacity)),
            abort: Arc::new(AtomicBool::new(false)),
            handles: Vec::with_capacity(config.num_workers),
            submitted: 0,
            started: Instant::now(),
        };

        for id in 0..config.num_workers {
            if let Err(e) = pool.spawn_worker(id, &context, &mut sinks) {
                // Release whatever already started before reporting.
                pool.abort();
                let _ = pool.finish();
                return Err(e);
            }
        }

        info!(
            workers = config.num_workers,
            queue_capacity = config.queue_capacity,
            similarity = %config.similarity,
            max_graph_nodes = config.max_graph_nodes,
            "Worker pool started"
        );
        Ok(pool)
    }

    fn spawn_worker<F>(
        &mut self,
        id: usize,
        context: &Arc<ScoringContext>,
        sinks: &mut F,
    ) -> Result<()>
    where
        F: FnMut(usize) -> Result<(W, W)>,
    {
        let (scores, diagnostics) = sinks(id)?;
        let worker = ScoringWorker::new(
            id,
            Arc::clone(context),
            Arc::clone(&self.queue),
            Arc::clone(&self.abort),
            scores,
            diagnostics,
        );
        let handle = thread::Builder::new()
            .name(format!("ccscore-worker-{}", id))
            .spawn(move || worker.run())?;
        self.handles.push(handle);
        Ok(())
    }

    pub fn num_workers(&self) -> usize {
        self.handles.len()
    }

    /// Enqueue one unit, blocking while the queue is full.
    pub fn submit(&mut self, unit: WorkUnit) {
        self.queue.push(Job::Unit(unit));
        self.submitted += 1;
    }

    /// True once any worker has failed.
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Make every worker drop the rest of its units unscored.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    /// Send the stop sentinels, join every worker and return the totals, or
    /// the first error any worker hit.
    pub fn finish(mut self) -> Result<PoolSummary<W>> {
        let handles = std::mem::take(&mut self.handles);
        for _ in 0..handles.len() {
            self.queue.push(Job::Stop);
        }

        let mut reports = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(mut report) => {
                    if let Some(e) = report.error.take() {
                        first_error.get_or_insert(e);
                    }
                    reports.push(report);
                }
                Err(_) => {
                    warn!(worker = id, "Worker thread panicked");
                    first_error.get_or_insert(ScoreError::WorkerPanicked(id));
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let summary = PoolSummary {
            submitted: self.submitted,
            processed: reports.iter().map(|r| r.processed).sum(),
            skipped: reports.iter().map(WorkerReport::skipped).sum(),
            elapsed: self.started.elapsed(),
            reports,
        };
        info!(
            submitted = summary.submitted,
            processed = summary.processed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Worker pool finished"
        );
        Ok(summary)
    }
}
