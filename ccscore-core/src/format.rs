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

//! On-disk layout of the mapped feature stores.
//!
//! ```text
//! offset 0   : StoreHeader { data_offset: i64, item_count: i64 }
//!
//! item-table variant (user / page stores)
//! data_offset: ItemRecord { id, scalar, feature_count, features_offset } x item_count
//! anywhere   : FeaturePair { feature_id, value } x feature_count   (absolute offset)
//!
//! flat variant (controversy store)
//! data_offset: FeaturePair { feature_id, value } x item_count      (indexed by position)
//! ```
//!
//! All integers are `i64` and all floats `f64` in native byte order. The
//! files are single-host artifacts and are not meant to be portable.

use std::io::Write;

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};

use crate::error::{InvariantViolation, Result};

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Size of one item record in bytes
pub const ITEM_RECORD_SIZE: usize = std::mem::size_of::<ItemRecord>();

/// Size of one feature pair in bytes
pub const FEATURE_PAIR_SIZE: usize = std::mem::size_of::<FeaturePair>();

/// Alignment every record and feature array must satisfy
pub const REQUIRED_ALIGNMENT: usize = 8;

/// One `(feature_id, value)` entry of a sparse vector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePair {
    pub id: i64,
    pub value: f64,
}

impl FeaturePair {
    pub const fn new(id: i64, value: f64) -> Self {
        Self { id, value }
    }
}

/// One row of the item table.
///
/// `features_offset == 0` means the item has no feature vector at all,
/// which is distinct from an empty one.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRecord {
    pub id: i64,
    /// Sum of values (users) or L2 norm (pages)
    pub scalar: f64,
    pub feature_count: i64,
    pub features_offset: i64,
}

impl ItemRecord {
    pub fn has_features(&self) -> bool {
        self.features_offset != 0
    }
}

/// File header shared by both store variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub data_offset: i64,
    pub item_count: i64,
}

impl StoreHeader {
    pub fn new(item_count: usize) -> Self {
        Self {
            data_offset: HEADER_SIZE as i64,
            item_count: item_count as i64,
        }
    }

    /// Decode the header from the start of a region.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        validate_offset_length(0, HEADER_SIZE as u64, bytes.len() as u64)?;
        let header = Self {
            data_offset: NativeEndian::read_i64(&bytes[0..8]),
            item_count: NativeEndian::read_i64(&bytes[8..16]),
        };
        if header.data_offset < HEADER_SIZE as i64 {
            return Err(InvariantViolation::BadHeader(format!(
                "data_offset {} overlaps the header",
                header.data_offset
            ))
            .into());
        }
        if header.item_count < 0 {
            return Err(InvariantViolation::BadHeader(format!(
                "negative item_count {}",
                header.item_count
            ))
            .into());
        }
        validate_alignment(header.data_offset as u64, REQUIRED_ALIGNMENT)?;
        Ok(header)
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_i64::<NativeEndian>(self.data_offset)?;
        out.write_i64::<NativeEndian>(self.item_count)
    }
}

pub(crate) fn write_record<W: Write>(out: &mut W, record: &ItemRecord) -> std::io::Result<()> {
    out.write_i64::<NativeEndian>(record.id)?;
    out.write_f64::<NativeEndian>(record.scalar)?;
    out.write_i64::<NativeEndian>(record.feature_count)?;
    out.write_i64::<NativeEndian>(record.features_offset)
}

pub(crate) fn write_pair<W: Write>(out: &mut W, pair: &FeaturePair) -> std::io::Result<()> {
    out.write_i64::<NativeEndian>(pair.id)?;
    out.write_f64::<NativeEndian>(pair.value)
}

/// Validates that an offset and length are within bounds
#[inline]
pub fn validate_offset_length(offset: u64, length: u64, max: u64) -> Result<()> {
    let end = offset.checked_add(length);
    match end {
        Some(end) if end <= max => Ok(()),
        _ => Err(InvariantViolation::OutOfBounds {
            offset,
            length,
            region_size: max,
        }
        .into()),
    }
}

/// Validates alignment of an offset
#[inline]
pub fn validate_alignment(offset: u64, alignment: usize) -> Result<()> {
    if !offset.is_multiple_of(alignment as u64) {
        return Err(InvariantViolation::Misaligned {
            offset,
            required_alignment: alignment,
        }
        .into());
    }
    Ok(())
}

/// Checks that feature ids are strictly increasing.
pub fn check_sorted(owner: impl FnOnce() -> String, features: &[FeaturePair]) -> Result<()> {
    if let Some(position) = features.windows(2).position(|w| w[0].id >= w[1].id) {
        return Err(InvariantViolation::UnsortedFeatures {
            owner: owner(),
            position: position + 1,
            previous: features[position].id,
            current: features[position + 1].id,
        }
        .into());
    }
    Ok(())
}

/// Borrowed view of one entity's sparse vector and its scalar.
#[derive(Debug, Clone, Copy)]
pub struct SparseVector<'a> {
    features: Option<&'a [FeaturePair]>,
    scalar: f64,
}

impl<'a> SparseVector<'a> {
    pub fn new(features: &'a [FeaturePair], scalar: f64) -> Self {
        Self {
            features: Some(features),
            scalar,
        }
    }

    /// A vector whose item has no feature array.
    pub fn absent(scalar: f64) -> Self {
        Self {
            features: None,
            scalar,
        }
    }

    pub fn features(&self) -> Option<&'a [FeaturePair]> {
        self.features
    }

    pub fn scalar(&self) -> f64 {
        self.scalar
    }

    pub fn len(&self) -> usize {
        self.features.map_or(0, <[FeaturePair]>::len)
    }

    /// True when absent or when present with no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
