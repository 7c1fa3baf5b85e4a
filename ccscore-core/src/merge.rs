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

//! K-way union of several users' feature vectors.
//!
//! One cursor per user; each step takes the smallest id under any cursor,
//! sums the values of every user positioned on it and advances only those
//! cursors. Groups are small, so the minimum is found by a linear scan.

use crate::error::{InvariantViolation, Result};
use crate::format::{FeaturePair, SparseVector};

/// Owned, merged vector of a user group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedVector {
    pub features: Vec<FeaturePair>,
    /// Plain sum of all merged values
    pub sum: f64,
}

impl MergedVector {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// View with the value sum as scalar.
    pub fn as_sparse(&self) -> SparseVector<'_> {
        SparseVector::new(&self.features, self.sum)
    }
}

/// Reusable merge state; one per worker.
#[derive(Debug, Default)]
pub struct GroupFeatureMerger {
    positions: Vec<usize>,
    contributions: Vec<f64>,
}

impl GroupFeatureMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of `vectors`, summing values at shared ids.
    ///
    /// Absent vectors contribute nothing. The result does not depend on the
    /// order of `vectors`.
    pub fn merge(&mut self, vectors: &[SparseVector<'_>]) -> Result<MergedVector> {
        let sources: Vec<&[FeaturePair]> = vectors
            .iter()
            .map(|v| v.features().unwrap_or(&[]))
            .collect();
        self.positions.clear();
        self.positions.resize(sources.len(), 0);

        let mut merged = MergedVector {
            features: Vec::with_capacity(sources.iter().map(|s| s.len()).max().unwrap_or(0)),
            sum: 0.0,
        };

        loop {
            let next_id = sources
                .iter()
                .zip(&self.positions)
                .filter_map(|(source, &pos)| source.get(pos).map(|f| f.id))
                .min();
            let Some(id) = next_id else {
                break;
            };

            self.contributions.clear();
            for (index, source) in sources.iter().enumerate() {
                let pos = self.positions[index];
                if let Some(feature) = source.get(pos).filter(|f| f.id == id) {
                    self.contributions.push(feature.value);
                    if let Some(following) = source.get(pos + 1) {
                        if following.id <= id {
                            return Err(InvariantViolation::UnsortedFeatures {
                                owner: format!("group member {}", index),
                                position: pos + 1,
                                previous: id,
                                current: following.id,
                            }
                            .into());
                        }
                    }
                    self.positions[index] = pos + 1;
                }
            }
            // Fixed summation order keeps results bit-identical under any
            // permutation of the group.
            if self.contributions.len() > 2 {
                self.contributions.sort_by(f64::total_cmp);
            }
            let value: f64 = self.contributions.iter().sum();
            merged.sum += value;
            merged.features.push(FeaturePair::new(id, value));
        }
        Ok(merged)
    }
}

/// One-shot merge with a fresh [`GroupFeatureMerger`].
pub fn merge_features(vectors: &[SparseVector<'_>]) -> Result<MergedVector> {
    GroupFeatureMerger::new().merge(vectors)
}
