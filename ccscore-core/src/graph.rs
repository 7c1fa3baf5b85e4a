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

//! Local page graph of one entity and its weighted clustering coefficient.
//!
//! Nodes are the entity's pages, edges are page similarities. Every
//! unordered triple is enumerated exactly, so scoring is `O(n^3)` in the
//! number of pages; the node cap keeps `n` bounded.

use tracing::trace;

use crate::config::SimilarityMetric;
use crate::error::Result;
use crate::format::SparseVector;
use crate::mapped::{ControversyVector, MappedFeatureStore};
use crate::similarity::div_ignore_zero;

/// Per-node attributes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeInfo {
    pub controversy: f64,
    /// Page value over the entity's scalar
    pub edit_weight: f64,
    /// Page id, for reporting only
    pub real_id: i64,
}

/// Symmetric weighted graph with a zero diagonal.
#[derive(Debug, Clone)]
pub struct DenseGraph {
    num_nodes: usize,
    edges: Vec<f64>,
    nodes: Vec<NodeInfo>,
}

impl DenseGraph {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            edges: vec![0.0; num_nodes * num_nodes],
            nodes: vec![NodeInfo::default(); num_nodes],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn set_node(&mut self, index: usize, node: NodeInfo) {
        self.nodes[index] = node;
    }

    pub fn node(&self, index: usize) -> &NodeInfo {
        &self.nodes[index]
    }

    /// Set the weight of edge `{first, second}` in both directions.
    pub fn set_edge(&mut self, first: usize, second: usize, weight: f64) {
        debug_assert_ne!(first, second, "self loops are not stored");
        self.edges[self.num_nodes * first + second] = weight;
        self.edges[self.num_nodes * second + first] = weight;
    }

    #[inline]
    pub fn edge(&self, first: usize, second: usize) -> f64 {
        self.edges[self.num_nodes * first + second]
    }

    /// Weighted clustering coefficient of every node and the three
    /// aggregate scores.
    pub fn coefficients(&self) -> GraphScores {
        let n = self.num_nodes;
        let mut numerators = vec![0.0; n];
        let mut denominators = vec![0.0; n];
        let factor = |a: &NodeInfo, b: &NodeInfo| {
            a.edit_weight * b.edit_weight * a.controversy * b.controversy
        };

        for i in 0..n {
            for j in (i + 1)..n {
                let ij = self.edge(i, j);
                for k in (j + 1)..n {
                    let ik = self.edge(i, k);
                    let jk = self.edge(j, k);
                    let triangle = ij * jk * ik;
                    let (ni, nj, nk) = (&self.nodes[i], &self.nodes[j], &self.nodes[k]);

                    let f = factor(nj, nk);
                    numerators[i] += triangle * f;
                    denominators[i] += ij * ik * f;

                    let f = factor(ni, nk);
                    numerators[j] += triangle * f;
                    denominators[j] += ij * jk * f;

                    let f = factor(ni, nj);
                    numerators[k] += triangle * f;
                    denominators[k] += jk * ik * f;
                }
            }
        }

        let mut scores = GraphScores {
            cc: 0.0,
            avg_controversy: 0.0,
            avg_clustering: 0.0,
            nodes: Vec::with_capacity(n),
        };
        for (i, node) in self.nodes.iter().enumerate() {
            let coefficient = if denominators[i] == 0.0 {
                0.0
            } else {
                numerators[i] / denominators[i]
            };
            scores.cc += node.edit_weight * node.controversy * coefficient;
            scores.avg_controversy += node.edit_weight * node.controversy;
            scores.avg_clustering += node.edit_weight * coefficient;
            scores.nodes.push(NodeScore {
                real_id: node.real_id,
                controversy: node.controversy,
                coefficient,
                edit_weight: node.edit_weight,
            });
        }
        scores
    }
}

/// Per-node result, kept for the diagnostics stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeScore {
    pub real_id: i64,
    pub controversy: f64,
    pub coefficient: f64,
    pub edit_weight: f64,
}

/// Scores of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct GraphScores {
    /// Sum of edit * controversy * coefficient
    pub cc: f64,
    /// Sum of edit * controversy
    pub avg_controversy: f64,
    /// Sum of edit * coefficient
    pub avg_clustering: f64,
    pub nodes: Vec<NodeScore>,
}

/// Builds and scores the local graph of an entity's feature vector.
#[derive(Debug, Clone, Copy)]
pub struct GraphCoefficientEngine {
    max_nodes: usize,
    metric: SimilarityMetric,
}

impl GraphCoefficientEngine {
    pub fn new(max_nodes: usize, metric: SimilarityMetric) -> Self {
        Self { max_nodes, metric }
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// True when a vector of `len` pages is over the node cap.
    pub fn exceeds_cap(&self, len: usize) -> bool {
        len > self.max_nodes
    }

    /// Build the page graph for `entity`.
    ///
    /// Returns `None` when the vector exceeds the node cap.
    pub fn build(
        &self,
        entity: SparseVector<'_>,
        pages: &MappedFeatureStore,
        controversy: &ControversyVector,
    ) -> Result<Option<DenseGraph>> {
        let features = entity.features().unwrap_or(&[]);
        if self.exceeds_cap(features.len()) {
            return Ok(None);
        }

        let mut graph = DenseGraph::new(features.len());
        let mut page_vectors = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            graph.set_node(
                i,
                NodeInfo {
                    controversy: controversy.controversy(feature.id)?,
                    edit_weight: div_ignore_zero(feature.value, entity.scalar(), "edit weight")?,
                    real_id: feature.id,
                },
            );
            page_vectors.push(pages.vector(feature.id)?);
        }
        for i in 0..page_vectors.len() {
            for j in (i + 1)..page_vectors.len() {
                let weight = self.metric.similarity(page_vectors[i], page_vectors[j])?;
                graph.set_edge(i, j, weight);
            }
        }
        trace!(nodes = graph.num_nodes(), "Built page graph");
        Ok(Some(graph))
    }

    /// Build and score in one step; `None` when over the cap.
    pub fn score(
        &self,
        entity: SparseVector<'_>,
        pages: &MappedFeatureStore,
        controversy: &ControversyVector,
    ) -> Result<Option<GraphScores>> {
        Ok(self
            .build(entity, pages, controversy)?
            .map(|graph| graph.coefficients()))
    }
}
