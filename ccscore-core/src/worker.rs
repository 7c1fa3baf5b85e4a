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

//! Scoring worker: pops jobs, resolves each unit to a feature vector, scores
//! its page graph and appends one row to each of its two output streams.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::ScoringConfig;
use crate::error::{Result, ScoreError};
use crate::format::SparseVector;
use crate::graph::GraphCoefficientEngine;
use crate::mapped::{ControversyVector, MappedFeatureStore};
use crate::merge::{GroupFeatureMerger, MergedVector};
use crate::output::{diagnostics_line, score_line};
use crate::queue::BoundedQueue;
use crate::work::WorkUnit;

/// Queue entry. One `Stop` is pushed per worker after the last unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Unit(WorkUnit),
    Stop,
}

/// Immutable data shared by every worker of a run.
#[derive(Debug)]
pub struct ScoringContext {
    users: MappedFeatureStore,
    pages: MappedFeatureStore,
    controversy: ControversyVector,
    engine: GraphCoefficientEngine,
    max_line_bytes: Option<usize>,
}

impl ScoringContext {
    pub fn new(
        users: MappedFeatureStore,
        pages: MappedFeatureStore,
        controversy: ControversyVector,
        config: &ScoringConfig,
    ) -> Self {
        Self {
            users,
            pages,
            controversy,
            engine: GraphCoefficientEngine::new(config.max_graph_nodes, config.similarity),
            max_line_bytes: config.max_line_bytes,
        }
    }

    pub fn users(&self) -> &MappedFeatureStore {
        &self.users
    }

    pub fn pages(&self) -> &MappedFeatureStore {
        &self.pages
    }

    pub fn controversy(&self) -> &ControversyVector {
        &self.controversy
    }

    pub fn engine(&self) -> &GraphCoefficientEngine {
        &self.engine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Processing,
    Stopped,
}

/// Why a unit produced no output rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyVector,
    OverCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    Scored,
    Skipped(SkipReason),
}

/// What a worker hands back when it stops.
#[derive(Debug)]
pub struct WorkerReport<W> {
    pub worker_id: usize,
    pub state: WorkerState,
    pub processed: u64,
    pub skipped_empty: u64,
    pub skipped_over_cap: u64,
    /// Units popped after the run was aborted
    pub drained: u64,
    pub error: Option<ScoreError>,
    pub scores: W,
    pub diagnostics: W,
}

impl<W> WorkerReport<W> {
    pub fn skipped(&self) -> u64 {
        self.skipped_empty + self.skipped_over_cap
    }
}

pub struct ScoringWorker<W: Write> {
    id: usize,
    context: Arc<ScoringContext>,
    queue: Arc<BoundedQueue<Job>>,
    abort: Arc<AtomicBool>,
    merger: GroupFeatureMerger,
    state: WorkerState,
    scores: W,
    diagnostics: W,
    processed: u64,
    skipped_empty: u64,
    skipped_over_cap: u64,
    drained: u64,
    error: Option<ScoreError>,
}

impl<W: Write> ScoringWorker<W> {
    pub fn new(
        id: usize,
        context: Arc<ScoringContext>,
        queue: Arc<BoundedQueue<Job>>,
        abort: Arc<AtomicBool>,
        scores: W,
        diagnostics: W,
    ) -> Self {
        Self {
            id,
            context,
            queue,
            abort,
            merger: GroupFeatureMerger::new(),
            state: WorkerState::Idle,
            scores,
            diagnostics,
            processed: 0,
            skipped_empty: 0,
            skipped_over_cap: 0,
            drained: 0,
            error: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Consume jobs until a `Stop` arrives.
    ///
    /// After the first error (here or in another worker) units are popped
    /// and dropped unscored, so producers never block on a full queue.
    pub fn run(mut self) -> WorkerReport<W> {
        loop {
            self.state = WorkerState::Idle;
            let unit = match self.queue.pop_front() {
                Job::Stop => break,
                Job::Unit(unit) => unit,
            };
            if self.abort.load(Ordering::Acquire) {
                self.drained += 1;
                continue;
            }

            self.state = WorkerState::Processing;
            match self.process(&unit) {
                Ok(ScoreOutcome::Scored) => self.processed += 1,
                Ok(ScoreOutcome::Skipped(reason)) => {
                    debug!(worker = self.id, unit = %unit, ?reason, "Skipped unit");
                    match reason {
                        SkipReason::EmptyVector => self.skipped_empty += 1,
                        SkipReason::OverCap => self.skipped_over_cap += 1,
                    }
                }
                Err(e) => {
                    error!(
                        worker = self.id,
                        unit = %unit,
                        error = %e,
                        "Scoring failed, aborting run"
                    );
                    self.abort.store(true, Ordering::Release);
                    self.error = Some(e);
                }
            }
        }

        if let Err(e) = self.flush() {
            self.abort.store(true, Ordering::Release);
            self.error.get_or_insert(e);
        }
        self.state = WorkerState::Stopped;
        info!(
            worker = self.id,
            processed = self.processed,
            skipped = self.skipped_empty + self.skipped_over_cap,
            drained = self.drained,
            "Worker stopped"
        );

        WorkerReport {
            worker_id: self.id,
            state: self.state,
            processed: self.processed,
            skipped_empty: self.skipped_empty,
            skipped_over_cap: self.skipped_over_cap,
            drained: self.drained,
            error: self.error,
            scores: self.scores,
            diagnostics: self.diagnostics,
        }
    }

    /// Score one unit and append its rows.
    pub fn process(&mut self, unit: &WorkUnit) -> Result<ScoreOutcome> {
        let context = Arc::clone(&self.context);
        let merged: MergedVector;
        let entity: SparseVector<'_> = match unit.user_ids() {
            [user] => context.users.vector(*user)?,
            users => {
                let vectors = users
                    .iter()
                    .map(|&id| context.users.vector(id))
                    .collect::<Result<Vec<_>>>()?;
                merged = self.merger.merge(&vectors)?;
                merged.as_sparse()
            }
        };

        if entity.is_empty() {
            return Ok(ScoreOutcome::Skipped(SkipReason::EmptyVector));
        }
        let scores = match context
            .engine
            .score(entity, &context.pages, &context.controversy)?
        {
            Some(scores) => scores,
            None => return Ok(ScoreOutcome::Skipped(SkipReason::OverCap)),
        };

        let label = unit.to_string();
        let row = score_line(&label, &scores, context.max_line_bytes)?;
        let stats = diagnostics_line(&label, &scores, context.max_line_bytes)?;
        self.scores.write_all(row.as_bytes())?;
        self.diagnostics.write_all(stats.as_bytes())?;
        Ok(ScoreOutcome::Scored)
    }

    fn flush(&mut self) -> Result<()> {
        self.scores.flush()?;
        self.diagnostics.flush()?;
        Ok(())
    }
}
