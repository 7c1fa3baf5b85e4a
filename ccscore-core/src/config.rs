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

//! Run configuration for stores and the scoring pipeline.

use std::fmt;
use std::str::FromStr;

use crate::error::ScoreError;

/// Groups whose merged vector is longer than this are skipped.
pub const DEFAULT_MAX_GRAPH_NODES: usize = 50_000;

/// Work units buffered between the producer and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Options for opening a mapped store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Walk every feature vector once at open time, checking bounds and
    /// strict id ordering. Accessors still bounds-check when disabled.
    pub verify_on_open: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            verify_on_open: true,
        }
    }
}

/// Pairwise page similarity used for edge weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    /// Inner product over the product of stored norms
    #[default]
    Cosine,
    /// One minus the (sign-preserved) Jensen-Shannon term
    JensenShannon,
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Cosine => write!(f, "cosine"),
            SimilarityMetric::JensenShannon => write!(f, "jsd"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(SimilarityMetric::Cosine),
            "jsd" | "jensen-shannon" | "js" => Ok(SimilarityMetric::JensenShannon),
            other => Err(ScoreError::Usage(format!(
                "unknown similarity '{}', expected cosine or jsd",
                other
            ))),
        }
    }
}

/// Configuration for a scoring run
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Skip units whose feature vector has more entries than this
    pub max_graph_nodes: usize,
    /// Edge weight function
    pub similarity: SimilarityMetric,
    /// Capacity of the work queue
    pub queue_capacity: usize,
    /// Number of worker threads
    pub num_workers: usize,
    /// Optional upper bound on the byte length of one output line
    pub max_line_bytes: Option<usize>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_graph_nodes: DEFAULT_MAX_GRAPH_NODES,
            similarity: SimilarityMetric::Cosine,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            num_workers: num_cpus::get().max(1),
            max_line_bytes: None,
        }
    }
}

impl ScoringConfig {
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_max_graph_nodes(mut self, max_graph_nodes: usize) -> Self {
        self.max_graph_nodes = max_graph_nodes;
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityMetric) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_max_line_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ScoreError> {
        if self.num_workers == 0 {
            return Err(ScoreError::Usage("at least one worker is required".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ScoreError::Usage("queue capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScoringConfig::default();
        assert_eq!(config.max_graph_nodes, 50_000);
        assert_eq!(config.similarity, SimilarityMetric::Cosine);
        assert_eq!(config.queue_capacity, 100);
        assert!(config.num_workers >= 1);
        assert!(config.max_line_bytes.is_none());
        assert!(config.validate().is_ok());
        assert!(StoreOptions::default().verify_on_open);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = ScoringConfig::default().with_workers(0);
        assert!(matches!(config.validate(), Err(ScoreError::Usage(_))));
        let config = ScoringConfig::default().with_queue_capacity(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_similarity() {
        assert_eq!("cosine".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Cosine);
        assert_eq!("JSD".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::JensenShannon);
        assert!("euclid".parse::<SimilarityMetric>().is_err());
        assert_eq!(SimilarityMetric::JensenShannon.to_string(), "jsd");
    }
}
