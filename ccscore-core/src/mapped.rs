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

//! Zero-copy, bounds-checked views over the mapped stores.
//!
//! Every accessor validates offsets and counts against the length of the
//! mapped region before handing out a reference. A bad offset becomes an
//! [`InvariantViolation`] instead of a wild read.
//!
//! The stores are opened once and shared read-only by every worker, so no
//! accessor takes a lock.

use std::fs::File;
use std::mem::{align_of, size_of};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, info};

use crate::config::StoreOptions;
use crate::error::{InvariantViolation, Result, ScoreError};
use crate::format::{
    check_sorted, validate_alignment, validate_offset_length, FeaturePair, ItemRecord,
    SparseVector, StoreHeader,
};

/// Fixed-layout records that may be viewed directly inside a region.
///
/// # Safety
/// Implementors must be `#[repr(C)]`, contain no padding, and accept every
/// bit pattern.
unsafe trait Plain: Copy {}

unsafe impl Plain for ItemRecord {}
unsafe impl Plain for FeaturePair {}

/// Backing bytes of a store
#[derive(Debug)]
enum Region {
    /// Memory-mapped file (read-only)
    Mapped(Mmap),
    /// Owned copy kept in 8-byte words so record views stay aligned
    Owned { words: Vec<u64>, len: usize },
}

impl Region {
    fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word[..chunk.len()].copy_from_slice(chunk);
                u64::from_ne_bytes(word)
            })
            .collect();
        Region::Owned {
            words,
            len: bytes.len(),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Region::Mapped(mmap) => &mmap[..],
            // SAFETY: `len <= words.len() * 8` and u8 has no alignment needs.
            Region::Owned { words, len } => unsafe {
                std::slice::from_raw_parts(words.as_ptr().cast::<u8>(), *len)
            },
        }
    }
}

/// A header-prefixed region with typed, validated slicing.
#[derive(Debug)]
struct MappedRegion {
    region: Region,
    header: StoreHeader,
    path: Option<PathBuf>,
}

impl MappedRegion {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ScoreError::resource(path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| ScoreError::resource(path, e))?
            .len();
        let region = if file_len == 0 {
            Region::from_bytes(&[])
        } else {
            // SAFETY: stores are written once and never modified while mapped.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ScoreError::resource(path, e))?;
            Region::Mapped(mmap)
        };
        let mut mapped = Self::with_region(region)?;
        mapped.path = Some(path.to_path_buf());
        Ok(mapped)
    }

    fn with_region(region: Region) -> Result<Self> {
        let header = StoreHeader::read(region.as_bytes())?;
        Ok(Self {
            region,
            header,
            path: None,
        })
    }

    fn len(&self) -> usize {
        self.region.as_bytes().len()
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<memory>".to_string(),
        }
    }

    /// View `count` records of `T` starting at byte `offset`.
    fn slice<T: Plain>(&self, offset: i64, count: i64) -> Result<&[T]> {
        let region_size = self.len() as u64;
        if offset < 0 {
            return Err(InvariantViolation::InvalidOffset {
                offset,
                max: region_size,
            }
            .into());
        }
        if count < 0 {
            return Err(InvariantViolation::MalformedRecord(format!(
                "negative record count {} at offset {}",
                count, offset
            ))
            .into());
        }
        let (offset, count) = (offset as u64, count as u64);
        let length = count
            .checked_mul(size_of::<T>() as u64)
            .ok_or(InvariantViolation::OutOfBounds {
                offset,
                length: u64::MAX,
                region_size,
            })?;
        validate_offset_length(offset, length, region_size)?;
        validate_alignment(offset, align_of::<T>())?;

        let bytes = &self.region.as_bytes()[offset as usize..];
        // SAFETY: range and alignment checked above (region bases are at
        // least 8-byte aligned) and `T: Plain` accepts any bit pattern.
        Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<T>(), count as usize) })
    }
}

/// Read-only view over an item-table store (users or pages).
#[derive(Debug)]
pub struct MappedFeatureStore {
    inner: MappedRegion,
    item_count: usize,
}

impl MappedFeatureStore {
    /// Map a store file and validate its header and item table.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::with_region(MappedRegion::open(path)?, options)?;
        info!(
            path = %path.display(),
            items = store.item_count,
            bytes = store.inner.len(),
            "Opened feature store"
        );
        Ok(store)
    }

    /// Build a store over an in-memory copy of `bytes`.
    pub fn from_bytes(bytes: &[u8], options: &StoreOptions) -> Result<Self> {
        Self::with_region(MappedRegion::with_region(Region::from_bytes(bytes))?, options)
    }

    fn with_region(inner: MappedRegion, options: &StoreOptions) -> Result<Self> {
        let item_count = inner.header.item_count as usize;
        let store = Self { inner, item_count };
        // Validates the whole table once so item() only re-checks the index.
        store.records()?;
        if options.verify_on_open {
            store.verify()?;
        }
        Ok(store)
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    fn records(&self) -> Result<&[ItemRecord]> {
        self.inner
            .slice(self.inner.header.data_offset, self.inner.header.item_count)
    }

    /// Record of item `id`.
    ///
    /// The record's own id must equal its position unless the slot is an
    /// unused gap with no features.
    pub fn item(&self, id: i64) -> Result<&ItemRecord> {
        if id < 0 || id as usize >= self.item_count {
            return Err(InvariantViolation::UnknownItem {
                kind: "item",
                id,
                count: self.item_count,
            }
            .into());
        }
        let record = &self.records()?[id as usize];
        if record.id != id && record.has_features() {
            return Err(InvariantViolation::ItemIdMismatch {
                index: id as usize,
                found: record.id,
            }
            .into());
        }
        Ok(record)
    }

    /// Feature array of `record`, or `None` when it has none.
    pub fn features(&self, record: &ItemRecord) -> Result<Option<&[FeaturePair]>> {
        if !record.has_features() {
            return Ok(None);
        }
        self.inner
            .slice(record.features_offset, record.feature_count)
            .map(Some)
    }

    /// Sparse vector and scalar of item `id`.
    pub fn vector(&self, id: i64) -> Result<SparseVector<'_>> {
        let record = self.item(id)?;
        Ok(match self.features(record)? {
            Some(features) => SparseVector::new(features, record.scalar),
            None => SparseVector::absent(record.scalar),
        })
    }

    /// Walk every feature array once, checking bounds and strict ordering.
    pub fn verify(&self) -> Result<()> {
        let records = self.records()?;
        let mut total_features = 0usize;
        for (index, record) in records.iter().enumerate() {
            if record.has_features() && record.id != index as i64 {
                return Err(InvariantViolation::ItemIdMismatch {
                    index,
                    found: record.id,
                }
                .into());
            }
            if let Some(features) = self.features(record)? {
                check_sorted(|| format!("item {} of {}", index, self.inner.describe()), features)?;
                total_features += features.len();
            }
        }
        debug!(
            store = %self.inner.describe(),
            items = records.len(),
            features = total_features,
            "Verified feature store"
        );
        Ok(())
    }
}

/// Dense per-page controversy values (flat store variant).
#[derive(Debug)]
pub struct ControversyVector {
    inner: MappedRegion,
    len: usize,
}

impl ControversyVector {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let vector = Self::with_region(MappedRegion::open(path)?)?;
        info!(
            path = %path.display(),
            pages = vector.len,
            "Opened controversy store"
        );
        Ok(vector)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::with_region(MappedRegion::with_region(Region::from_bytes(bytes))?)
    }

    fn with_region(inner: MappedRegion) -> Result<Self> {
        let len = inner.header.item_count as usize;
        let vector = Self { inner, len };
        vector.entries()?;
        Ok(vector)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All entries, indexed by page id.
    pub fn entries(&self) -> Result<&[FeaturePair]> {
        self.inner
            .slice(self.inner.header.data_offset, self.inner.header.item_count)
    }

    /// Controversy of `page`.
    ///
    /// The stored entry must either carry the page's id or be an unset
    /// zero slot.
    pub fn controversy(&self, page: i64) -> Result<f64> {
        if page < 0 || page as usize >= self.len {
            return Err(InvariantViolation::UnknownItem {
                kind: "controversy page",
                id: page,
                count: self.len,
            }
            .into());
        }
        let entry = self.entries()?[page as usize];
        if entry.id != page && entry.value != 0.0 {
            return Err(InvariantViolation::ControversyMismatch {
                page,
                found: entry.id,
                value: entry.value,
            }
            .into());
        }
        Ok(entry.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{write_pair, write_record, HEADER_SIZE, ITEM_RECORD_SIZE};
    use crate::writer::{encode_flat_store, encode_item_store, ScalarKind};

    fn strict() -> StoreOptions {
        StoreOptions::default()
    }

    fn lenient() -> StoreOptions {
        StoreOptions {
            verify_on_open: false,
        }
    }

    fn sample_store() -> Vec<u8> {
        encode_item_store(
            &[
                (0, vec![FeaturePair::new(1, 2.0), FeaturePair::new(5, 1.0)]),
                (2, vec![FeaturePair::new(3, 4.0)]),
            ],
            ScalarKind::Sum,
        )
        .unwrap()
    }

    #[test]
    fn test_item_lookup_and_features() {
        let store = MappedFeatureStore::from_bytes(&sample_store(), &strict()).unwrap();
        assert_eq!(store.item_count(), 3);

        let first = store.item(0).unwrap();
        assert_eq!(first.scalar, 3.0);
        let features = store.features(first).unwrap().unwrap();
        assert_eq!(features, &[FeaturePair::new(1, 2.0), FeaturePair::new(5, 1.0)]);

        // id 1 is a gap: present in the table but without features
        let gap = store.item(1).unwrap();
        assert!(store.features(gap).unwrap().is_none());
        assert!(store.vector(1).unwrap().features().is_none());
    }

    #[test]
    fn test_unknown_item_is_violation() {
        let store = MappedFeatureStore::from_bytes(&sample_store(), &strict()).unwrap();
        for id in [-1, 3, 100] {
            assert!(matches!(
                store.item(id),
                Err(ScoreError::DataInvariant(InvariantViolation::UnknownItem { .. }))
            ));
        }
    }

    fn hand_built(record: ItemRecord, pairs: &[FeaturePair]) -> Vec<u8> {
        let mut buf = Vec::new();
        StoreHeader::new(1).write_to(&mut buf).unwrap();
        write_record(&mut buf, &record).unwrap();
        for pair in pairs {
            write_pair(&mut buf, pair).unwrap();
        }
        buf
    }

    #[test]
    fn test_feature_offset_past_end_is_violation() {
        let bytes = hand_built(
            ItemRecord {
                id: 0,
                scalar: 1.0,
                feature_count: 4,
                features_offset: (HEADER_SIZE + ITEM_RECORD_SIZE) as i64,
            },
            &[FeaturePair::new(1, 1.0)],
        );
        assert!(MappedFeatureStore::from_bytes(&bytes, &strict()).is_err());

        let store = MappedFeatureStore::from_bytes(&bytes, &lenient()).unwrap();
        let record = store.item(0).unwrap();
        assert!(matches!(
            store.features(record),
            Err(ScoreError::DataInvariant(InvariantViolation::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_negative_and_misaligned_offsets() {
        let negative = hand_built(
            ItemRecord {
                id: 0,
                scalar: 1.0,
                feature_count: 1,
                features_offset: -16,
            },
            &[],
        );
        let store = MappedFeatureStore::from_bytes(&negative, &lenient()).unwrap();
        assert!(matches!(
            store.vector(0),
            Err(ScoreError::DataInvariant(InvariantViolation::InvalidOffset { .. }))
        ));

        let misaligned = hand_built(
            ItemRecord {
                id: 0,
                scalar: 1.0,
                feature_count: 1,
                features_offset: (HEADER_SIZE + ITEM_RECORD_SIZE) as i64 + 4,
            },
            &[FeaturePair::new(1, 1.0), FeaturePair::new(2, 1.0)],
        );
        let store = MappedFeatureStore::from_bytes(&misaligned, &lenient()).unwrap();
        assert!(matches!(
            store.vector(0),
            Err(ScoreError::DataInvariant(InvariantViolation::Misaligned { .. }))
        ));
    }

    #[test]
    fn test_verify_rejects_unsorted_vector() {
        let bytes = hand_built(
            ItemRecord {
                id: 0,
                scalar: 2.0,
                feature_count: 2,
                features_offset: (HEADER_SIZE + ITEM_RECORD_SIZE) as i64,
            },
            &[FeaturePair::new(7, 1.0), FeaturePair::new(3, 1.0)],
        );
        assert!(matches!(
            MappedFeatureStore::from_bytes(&bytes, &strict()),
            Err(ScoreError::DataInvariant(InvariantViolation::UnsortedFeatures { .. }))
        ));
        assert!(MappedFeatureStore::from_bytes(&bytes, &lenient()).is_ok());
    }

    #[test]
    fn test_truncated_item_table() {
        let mut bytes = Vec::new();
        StoreHeader::new(4).write_to(&mut bytes).unwrap();
        assert!(matches!(
            MappedFeatureStore::from_bytes(&bytes, &strict()),
            Err(ScoreError::DataInvariant(InvariantViolation::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_record_id_mismatch() {
        let bytes = hand_built(
            ItemRecord {
                id: 5,
                scalar: 1.0,
                feature_count: 1,
                features_offset: (HEADER_SIZE + ITEM_RECORD_SIZE) as i64,
            },
            &[FeaturePair::new(1, 1.0)],
        );
        let store = MappedFeatureStore::from_bytes(&bytes, &lenient()).unwrap();
        assert!(matches!(
            store.item(0),
            Err(ScoreError::DataInvariant(
                InvariantViolation::ItemIdMismatch { index: 0, found: 5 }
            ))
        ));
    }

    #[test]
    fn test_controversy_lookup() {
        let bytes =
            encode_flat_store(&[FeaturePair::new(0, 0.25), FeaturePair::new(3, 0.75)]).unwrap();
        let controversy = ControversyVector::from_bytes(&bytes).unwrap();
        assert_eq!(controversy.len(), 4);
        assert_eq!(controversy.controversy(0).unwrap(), 0.25);
        assert_eq!(controversy.controversy(3).unwrap(), 0.75);
        // unset slots are zero
        assert_eq!(controversy.controversy(1).unwrap(), 0.0);
        assert!(controversy.controversy(4).is_err());
    }

    #[test]
    fn test_controversy_id_mismatch() {
        let mut bytes = Vec::new();
        StoreHeader::new(2).write_to(&mut bytes).unwrap();
        write_pair(&mut bytes, &FeaturePair::new(0, 0.5)).unwrap();
        write_pair(&mut bytes, &FeaturePair::new(9, 0.5)).unwrap();
        let controversy = ControversyVector::from_bytes(&bytes).unwrap();
        assert!(matches!(
            controversy.controversy(1),
            Err(ScoreError::DataInvariant(
                InvariantViolation::ControversyMismatch { page: 1, found: 9, .. }
            ))
        ));
    }

    #[test]
    fn test_open_missing_file_is_resource_error() {
        let err = MappedFeatureStore::open("/definitely/not/here", &strict()).err().unwrap();
        assert!(matches!(err, ScoreError::Resource { .. }));
    }

    #[test]
    fn test_open_mapped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users_mmap");
        std::fs::write(&path, sample_store()).unwrap();
        let store = MappedFeatureStore::open(&path, &strict()).unwrap();
        assert_eq!(store.vector(2).unwrap().len(), 1);
    }

    #[test]
    fn test_stores_are_debug() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users_mmap");
        std::fs::write(&path, sample_store()).unwrap();
        let mapped = MappedFeatureStore::open(&path, &strict()).unwrap();
        let owned = MappedFeatureStore::from_bytes(&sample_store(), &strict()).unwrap();
        assert!(format!("{:?}", mapped).contains("MappedFeatureStore"));
        assert!(format!("{:?}", owned).contains("item_count"));

        let bytes = encode_flat_store(&[FeaturePair::new(1, 0.5)]).unwrap();
        let controversy = ControversyVector::from_bytes(&bytes).unwrap();
        assert!(format!("{:?}", controversy).contains("ControversyVector"));
    }
}
