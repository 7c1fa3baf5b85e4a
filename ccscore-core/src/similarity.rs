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

//! Pairwise similarity over sorted sparse vectors.
//!
//! Both functions walk the two vectors with a single merge-join, so they
//! run in `O(len(a) + len(b))` and never allocate.

use std::cmp::Ordering;

use crate::config::SimilarityMetric;
use crate::error::{InvariantViolation, Result};
use crate::format::{FeaturePair, SparseVector};

/// `numerator / denominator`, or 0 when the denominator is exactly 0.
///
/// A zero denominator is only legal with a zero numerator.
#[inline]
pub fn div_ignore_zero(numerator: f64, denominator: f64, context: &'static str) -> Result<f64> {
    if denominator == 0.0 {
        if numerator != 0.0 {
            return Err(InvariantViolation::NonZeroOverZero { numerator, context }.into());
        }
        Ok(0.0)
    } else {
        Ok(numerator / denominator)
    }
}

/// Cosine similarity using the precomputed norms as the denominator.
///
/// Returns 0 when either vector is absent.
pub fn cosine_similarity(a: SparseVector<'_>, b: SparseVector<'_>) -> Result<f64> {
    let (Some(first), Some(second)) = (a.features(), b.features()) else {
        return Ok(0.0);
    };
    let mut i = 0;
    let mut j = 0;
    let mut inner_product = 0.0;
    while i < first.len() && j < second.len() {
        match first[i].id.cmp(&second[j].id) {
            Ordering::Equal => {
                inner_product += first[i].value * second[j].value;
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    div_ignore_zero(inner_product, a.scalar() * b.scalar(), "cosine similarity")
}

#[inline]
fn plogp(p: f64) -> f64 {
    if p > 0.0 {
        p * p.log2()
    } else {
        0.0
    }
}

/// Similarity derived from the Jensen-Shannon divergence.
///
/// Each vector is normalised by the sum of its values. The accumulated
/// terms are `p * log2(p)` without negation and the result is
/// `1 - ((e1 + e2) / 2 - em)`; existing score files depend on this scale.
///
/// Returns 0 when either vector is absent.
pub fn jensen_shannon_similarity(a: SparseVector<'_>, b: SparseVector<'_>) -> Result<f64> {
    let (Some(first), Some(second)) = (a.features(), b.features()) else {
        return Ok(0.0);
    };
    let first_sum: f64 = first.iter().map(|f| f.value).sum();
    let second_sum: f64 = second.iter().map(|f| f.value).sum();

    let mut first_entropy = 0.0;
    let mut second_entropy = 0.0;
    let mut combined_entropy = 0.0;

    let mut i = 0;
    let mut j = 0;
    while i < first.len() || j < second.len() {
        let order = match (first.get(i), second.get(j)) {
            (Some(x), Some(y)) => x.id.cmp(&y.id),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };
        let (p, q) = match order {
            Ordering::Equal => {
                let pair = (first[i].value, second[j].value);
                i += 1;
                j += 1;
                pair
            }
            Ordering::Less => {
                i += 1;
                (first[i - 1].value, 0.0)
            }
            Ordering::Greater => {
                j += 1;
                (0.0, second[j - 1].value)
            }
        };
        let p = div_ignore_zero(p, first_sum, "jensen-shannon normalisation")?;
        let q = div_ignore_zero(q, second_sum, "jensen-shannon normalisation")?;
        first_entropy += plogp(p);
        second_entropy += plogp(q);
        if p > 0.0 || q > 0.0 {
            combined_entropy += plogp((p + q) / 2.0);
        }
    }
    Ok(1.0 - ((first_entropy + second_entropy) / 2.0 - combined_entropy))
}

impl SimilarityMetric {
    /// Edge weight between two pages.
    pub fn similarity(&self, a: SparseVector<'_>, b: SparseVector<'_>) -> Result<f64> {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::JensenShannon => jensen_shannon_similarity(a, b),
        }
    }
}

/// L2 norm of a feature slice.
pub fn l2_norm(features: &[FeaturePair]) -> f64 {
    features.iter().map(|f| f.value * f.value).sum::<f64>().sqrt()
}
