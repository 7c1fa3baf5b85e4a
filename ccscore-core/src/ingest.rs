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

//! Text tuple readers feeding the store writer.
//!
//! Item tuples are `left_id feature_id value` lines grouped by `left_id`;
//! flat tuples are `id value` lines.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::str::FromStr;

use crate::error::{InvariantViolation, Result, ScoreError};
use crate::format::FeaturePair;

fn field<T: FromStr>(token: Option<&str>, line_no: usize, name: &str) -> Result<T> {
    let token = token.ok_or_else(|| {
        ScoreError::InvalidInput(format!("line {}: missing {}", line_no, name))
    })?;
    token.parse().map_err(|_| {
        ScoreError::InvalidInput(format!("line {}: bad {} '{}'", line_no, name, token))
    })
}

/// Read `left_id feature_id value` tuples into per-item vectors.
///
/// Left ids must be non-decreasing and feature ids strictly increasing
/// within one left id.
pub fn read_item_tuples<R: BufRead>(reader: R) -> Result<Vec<(i64, Vec<FeaturePair>)>> {
    let mut items: Vec<(i64, Vec<FeaturePair>)> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let left: i64 = field(Some(first), line_no, "item id")?;
        let feature: i64 = field(tokens.next(), line_no, "feature id")?;
        let value: f64 = field(tokens.next(), line_no, "value")?;

        if let Some((current, features)) = items.last_mut() {
            if *current > left {
                return Err(InvariantViolation::MalformedRecord(format!(
                    "line {}: item {} follows item {}",
                    line_no, left, current
                ))
                .into());
            }
            if *current == left {
                if let Some(previous) = features.last() {
                    if previous.id >= feature {
                        return Err(InvariantViolation::UnsortedFeatures {
                            owner: format!("item {} (line {})", left, line_no),
                            position: features.len(),
                            previous: previous.id,
                            current: feature,
                        }
                        .into());
                    }
                }
                features.push(FeaturePair::new(feature, value));
                continue;
            }
        }
        items.push((left, vec![FeaturePair::new(feature, value)]));
    }
    Ok(items)
}

/// Read `id value` tuples. A repeated id keeps its last value.
pub fn read_flat_tuples<R: BufRead>(reader: R) -> Result<Vec<FeaturePair>> {
    let mut entries = BTreeMap::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let id: i64 = field(Some(first), line_no, "id")?;
        let value: f64 = field(tokens.next(), line_no, "value")?;
        entries.insert(id, value);
    }
    Ok(entries
        .into_iter()
        .map(|(id, value)| FeaturePair::new(id, value))
        .collect())
}
