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

//! Error types for CCScore

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Could not access {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data invariant violated: {0}")]
    DataInvariant(#[from] InvariantViolation),

    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
}

impl ScoreError {
    /// Wrap an I/O failure on a required file.
    pub fn resource(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScoreError::Resource {
            path: path.into(),
            source,
        }
    }

    /// True for violations that mean the input data cannot be trusted.
    pub fn is_data_invariant(&self) -> bool {
        matches!(self, ScoreError::DataInvariant(_))
    }
}

/// A broken precondition on mapped data or on a score computation.
///
/// Scores are treated as authoritative, so none of these are ever
/// downgraded to a zero result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("Malformed header: {0}")]
    BadHeader(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error(
        "Out of bounds: [{offset}..{end}] in region of size {region_size}",
        end = range_end(.offset, .length)
    )]
    OutOfBounds {
        offset: u64,
        length: u64,
        region_size: u64,
    },

    #[error("Invalid offset: {offset} (max: {max})")]
    InvalidOffset { offset: i64, max: u64 },

    #[error("Alignment violation at {offset}: required {required_alignment} byte alignment")]
    Misaligned {
        offset: u64,
        required_alignment: usize,
    },

    #[error("Unsorted feature ids in {owner} at position {position}: {previous} then {current}")]
    UnsortedFeatures {
        owner: String,
        position: usize,
        previous: i64,
        current: i64,
    },

    #[error("Unknown {kind} id {id} (store holds {count})")]
    UnknownItem { kind: &'static str, id: i64, count: usize },

    #[error("Item record at index {index} carries id {found}")]
    ItemIdMismatch { index: usize, found: i64 },

    #[error("Controversy entry for page {page} carries id {found} with non-zero value {value}")]
    ControversyMismatch { page: i64, found: i64, value: f64 },

    #[error("Non-zero numerator {numerator} over zero denominator in {context}")]
    NonZeroOverZero {
        numerator: f64,
        context: &'static str,
    },

    #[error("Output line of {length} bytes exceeds limit of {limit}")]
    LineTooLong { length: usize, limit: usize },
}

fn range_end(offset: &u64, length: &u64) -> u64 {
    offset.saturating_add(*length)
}

pub type Result<T> = std::result::Result<T, ScoreError>;
