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

//! Builds mapped store files in the layout described in [`crate::format`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::{InvariantViolation, Result, ScoreError};
use crate::format::{
    check_sorted, write_pair, write_record, FeaturePair, ItemRecord, StoreHeader,
    FEATURE_PAIR_SIZE, HEADER_SIZE, ITEM_RECORD_SIZE,
};
use crate::similarity::l2_norm;

/// How an item's scalar is derived from its values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Plain sum of values (user stores)
    Sum,
    /// Euclidean norm of values (page stores)
    L2Norm,
}

impl ScalarKind {
    pub fn compute(&self, features: &[FeaturePair]) -> f64 {
        match self {
            ScalarKind::Sum => features.iter().map(|f| f.value).sum(),
            ScalarKind::L2Norm => l2_norm(features),
        }
    }
}

/// Largest item id a store is built for unless configured otherwise.
pub const DEFAULT_MAX_ITEM_ID: i64 = 100_000_000;

/// Builds store files, rejecting ids above a configured limit.
///
/// Stores are dense by id, so the largest id decides the file size; the
/// limit turns a stray id in the input into an error instead of a huge
/// allocation.
#[derive(Debug, Clone, Copy)]
pub struct StoreWriter {
    max_item_id: i64,
}

impl Default for StoreWriter {
    fn default() -> Self {
        Self {
            max_item_id: DEFAULT_MAX_ITEM_ID,
        }
    }
}

/// End offset of `count` records of `record_size` bytes starting at
/// `offset`, as long as it fits a signed 64-bit file offset.
fn region_end(offset: u64, count: u64, record_size: usize) -> Result<u64> {
    count
        .checked_mul(record_size as u64)
        .and_then(|length| offset.checked_add(length))
        .filter(|end| *end <= i64::MAX as u64)
        .ok_or_else(|| {
            InvariantViolation::OutOfBounds {
                offset,
                length: count.saturating_mul(record_size as u64),
                region_size: i64::MAX as u64,
            }
            .into()
        })
}

impl StoreWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_item_id(mut self, max_item_id: i64) -> Self {
        self.max_item_id = max_item_id;
        self
    }

    pub fn max_item_id(&self) -> i64 {
        self.max_item_id
    }

    fn check_id(&self, id: i64) -> Result<()> {
        if id < 0 {
            return Err(InvariantViolation::MalformedRecord(format!("negative id {}", id)).into());
        }
        if id > self.max_item_id {
            return Err(InvariantViolation::MalformedRecord(format!(
                "id {} exceeds the limit of {}",
                id, self.max_item_id
            ))
            .into());
        }
        Ok(())
    }

    /// Sort items by id and reject out-of-range or repeated ids and
    /// unsorted vectors.
    fn ordered_items<'a>(
        &self,
        items: &'a [(i64, Vec<FeaturePair>)],
    ) -> Result<Vec<&'a (i64, Vec<FeaturePair>)>> {
        let mut ordered: Vec<_> = items.iter().collect();
        ordered.sort_by_key(|(id, _)| *id);
        for pair in ordered.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(InvariantViolation::MalformedRecord(format!(
                    "item {} appears more than once",
                    pair[0].0
                ))
                .into());
            }
        }
        for (id, features) in &ordered {
            self.check_id(*id)?;
            check_sorted(|| format!("item {}", id), features)?;
        }
        Ok(ordered)
    }

    /// Write an item-table store to `out`, returning its size in bytes.
    ///
    /// Records are dense by id; ids missing from `items` become zero records
    /// without features, and so do items with an empty vector.
    pub fn write_item_store_to<W: Write>(
        &self,
        out: &mut W,
        items: &[(i64, Vec<FeaturePair>)],
        kind: ScalarKind,
    ) -> Result<u64> {
        let ordered = self.ordered_items(items)?;
        let item_count = ordered.last().map_or(0, |(id, _)| *id as u64 + 1);
        let table_end = region_end(HEADER_SIZE as u64, item_count, ITEM_RECORD_SIZE)?;
        let total = ordered.iter().try_fold(table_end, |end, (_, features)| {
            region_end(end, features.len() as u64, FEATURE_PAIR_SIZE)
        })?;

        StoreHeader::new(item_count as usize).write_to(out)?;

        // Every offset below is bounded by `total`.
        let mut next_features = table_end as i64;
        let mut pending = ordered.iter().peekable();
        for index in 0..item_count as i64 {
            let record = match pending.next_if(|(id, _)| *id == index) {
                Some((id, features)) if !features.is_empty() => {
                    let record = ItemRecord {
                        id: *id,
                        scalar: kind.compute(features),
                        feature_count: features.len() as i64,
                        features_offset: next_features,
                    };
                    next_features += (features.len() * FEATURE_PAIR_SIZE) as i64;
                    record
                }
                Some((id, _)) => ItemRecord {
                    id: *id,
                    scalar: 0.0,
                    feature_count: 0,
                    features_offset: 0,
                },
                None => ItemRecord {
                    id: 0,
                    scalar: 0.0,
                    feature_count: 0,
                    features_offset: 0,
                },
            };
            write_record(out, &record)?;
        }
        for (_, features) in &ordered {
            for pair in features {
                write_pair(out, pair)?;
            }
        }
        Ok(total)
    }

    /// Write a flat store (dense `{id, value}` array indexed by id) to
    /// `out`, returning its size in bytes. A repeated id keeps its last
    /// entry.
    pub fn write_flat_store_to<W: Write>(
        &self,
        out: &mut W,
        entries: &[FeaturePair],
    ) -> Result<u64> {
        for entry in entries {
            self.check_id(entry.id)?;
        }
        let len = entries.iter().map(|e| e.id as u64 + 1).max().unwrap_or(0);
        let total = region_end(HEADER_SIZE as u64, len, FEATURE_PAIR_SIZE)?;

        let mut sorted: Vec<&FeaturePair> = entries.iter().collect();
        sorted.sort_by_key(|e| e.id);
        let mut pending = sorted.into_iter().peekable();

        StoreHeader::new(len as usize).write_to(out)?;
        for id in 0..len as i64 {
            let mut slot = FeaturePair::new(0, 0.0);
            while let Some(entry) = pending.next_if(|e| e.id == id) {
                slot = *entry;
            }
            write_pair(out, &slot)?;
        }
        Ok(total)
    }

    /// Write an item-table store file, returning its size in bytes.
    pub fn write_item_store(
        &self,
        path: impl AsRef<Path>,
        items: &[(i64, Vec<FeaturePair>)],
        kind: ScalarKind,
    ) -> Result<u64> {
        let path = path.as_ref();
        let mut out = create(path)?;
        let bytes = self.write_item_store_to(&mut out, items, kind)?;
        finish(path, out)?;
        info!(path = %path.display(), items = items.len(), bytes, "Wrote item store");
        Ok(bytes)
    }

    /// Write a flat store file, returning its size in bytes.
    pub fn write_flat_store(&self, path: impl AsRef<Path>, entries: &[FeaturePair]) -> Result<u64> {
        let path = path.as_ref();
        let mut out = create(path)?;
        let bytes = self.write_flat_store_to(&mut out, entries)?;
        finish(path, out)?;
        info!(path = %path.display(), entries = entries.len(), bytes, "Wrote flat store");
        Ok(bytes)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ScoreError::resource(path, e))
}

fn finish(path: &Path, mut out: BufWriter<File>) -> Result<()> {
    out.flush().map_err(|e| ScoreError::resource(path, e))
}

/// [`StoreWriter::write_item_store_to`] with the default id limit.
pub fn write_item_store_to<W: Write>(
    out: &mut W,
    items: &[(i64, Vec<FeaturePair>)],
    kind: ScalarKind,
) -> Result<u64> {
    StoreWriter::default().write_item_store_to(out, items, kind)
}

/// [`StoreWriter::write_flat_store_to`] with the default id limit.
pub fn write_flat_store_to<W: Write>(out: &mut W, entries: &[FeaturePair]) -> Result<u64> {
    StoreWriter::default().write_flat_store_to(out, entries)
}

/// Encode an item-table store into memory.
pub fn encode_item_store(items: &[(i64, Vec<FeaturePair>)], kind: ScalarKind) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_item_store_to(&mut buf, items, kind)?;
    Ok(buf)
}

/// Encode a flat store into memory.
pub fn encode_flat_store(entries: &[FeaturePair]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_flat_store_to(&mut buf, entries)?;
    Ok(buf)
}

/// Write an item-table store file with the default id limit.
pub fn write_item_store(
    path: impl AsRef<Path>,
    items: &[(i64, Vec<FeaturePair>)],
    kind: ScalarKind,
) -> Result<u64> {
    StoreWriter::default().write_item_store(path, items, kind)
}

/// Write a flat store file with the default id limit.
pub fn write_flat_store(path: impl AsRef<Path>, entries: &[FeaturePair]) -> Result<u64> {
    StoreWriter::default().write_flat_store(path, entries)
}
