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

//! CCScore Core
//!
//! Batch scoring of users and user groups by the controversy and weighted
//! clustering of the pages they edit.
//!
//! # Core Components
//!
//! - **Mapped stores**: zero-copy, bounds-checked views over the binary
//!   user, page and controversy files
//! - **Similarity**: cosine and Jensen-Shannon similarity by merge-join
//! - **Group merge**: k-way union of several users' page vectors
//! - **Graph engine**: dense page graph and exact weighted triangle
//!   enumeration
//! - **Worker pool**: scoring threads fed from a bounded blocking queue
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ccscore_core::{
//!     ControversyVector, MappedFeatureStore, OutputFiles, ScoringConfig, ScoringContext,
//!     StoreOptions, WorkUnit, WorkerPool,
//! };
//!
//! let options = StoreOptions::default();
//! let config = ScoringConfig::default().with_workers(4);
//! let context = Arc::new(ScoringContext::new(
//!     MappedFeatureStore::open("users_mmap", &options)?,
//!     MappedFeatureStore::open("pages_mmap", &options)?,
//!     ControversyVector::open("controversy_mmap")?,
//!     &config,
//! ));
//!
//! let files = OutputFiles::new(".");
//! let mut pool = WorkerPool::start(context, &config, |i| files.create(i))?;
//! pool.submit(WorkUnit::single(42));
//! let summary = pool.finish()?;
//! println!("scored {} units", summary.processed);
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod graph;
pub mod ingest;
pub mod mapped;
pub mod merge;
pub mod output;
pub mod pool;
pub mod queue;
pub mod similarity;
pub mod work;
pub mod worker;
pub mod writer;

pub use config::{ScoringConfig, SimilarityMetric, StoreOptions};
pub use error::{InvariantViolation, Result, ScoreError};
pub use format::{FeaturePair, ItemRecord, SparseVector, StoreHeader};
pub use graph::{DenseGraph, GraphCoefficientEngine, GraphScores, NodeInfo, NodeScore};
pub use ingest::{read_flat_tuples, read_item_tuples};
pub use mapped::{ControversyVector, MappedFeatureStore};
pub use merge::{merge_features, GroupFeatureMerger, MergedVector};
pub use output::{format_sci, OutputFiles};
pub use pool::{PoolSummary, WorkerPool};
pub use queue::BoundedQueue;
pub use similarity::{cosine_similarity, jensen_shannon_similarity};
pub use work::{read_work_units, WorkUnit};
pub use worker::{
    Job, ScoreOutcome, ScoringContext, ScoringWorker, SkipReason, WorkerReport, WorkerState,
};
pub use writer::{write_flat_store, write_item_store, ScalarKind, StoreWriter};

/// Crate version
pub const CCSCORE_VERSION: &str = env!("CARGO_PKG_VERSION");
