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

//! End-to-end scoring runs over real store files.
//!
//! Each test writes user, page and controversy stores into a temporary
//! directory, maps them back, runs a worker pool and checks the rows the
//! workers wrote to their output files.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ccscore_core::{
    cosine_similarity, write_flat_store, write_item_store, ControversyVector, FeaturePair,
    InvariantViolation, MappedFeatureStore, OutputFiles, ScalarKind, ScoreError, ScoringConfig,
    ScoringContext, SimilarityMetric, StoreOptions, WorkUnit, WorkerPool, WorkerState,
};
use tempfile::tempdir;

fn pairs(ids: &[i64], value: f64) -> Vec<FeaturePair> {
    ids.iter().map(|&id| FeaturePair::new(id, value)).collect()
}

/// Users 0..=2 and pages 1..=4 of a small edit graph.
///
/// - user 0 edits pages 1 and 2
/// - user 1 edits pages 1 and 2
/// - user 2 edits pages 1, 3 and 4, which share all their words
fn write_fixture(dir: &Path) {
    write_item_store(
        dir.join("users_mmap"),
        &[
            (0, pairs(&[1, 2], 1.0)),
            (1, pairs(&[1, 2], 1.0)),
            (2, pairs(&[1, 3, 4], 1.0)),
        ],
        ScalarKind::Sum,
    )
    .unwrap();
    write_item_store(
        dir.join("pages_mmap"),
        &[
            (1, pairs(&[10, 11], 1.0)),
            (2, pairs(&[11, 12], 1.0)),
            (3, pairs(&[10, 11], 1.0)),
            (4, pairs(&[10, 11], 1.0)),
        ],
        ScalarKind::L2Norm,
    )
    .unwrap();
    write_flat_store(dir.join("controversy_mmap"), &pairs(&[1, 2, 3, 4], 1.0)).unwrap();
}

fn open_context(dir: &Path, config: &ScoringConfig) -> Arc<ScoringContext> {
    let options = StoreOptions::default();
    Arc::new(ScoringContext::new(
        MappedFeatureStore::open(dir.join("users_mmap"), &options).unwrap(),
        MappedFeatureStore::open(dir.join("pages_mmap"), &options).unwrap(),
        ControversyVector::open(dir.join("controversy_mmap")).unwrap(),
        config,
    ))
}

fn run(dir: &Path, config: &ScoringConfig, units: Vec<WorkUnit>) -> ccscore_core::Result<u64> {
    let files = OutputFiles::new(dir);
    let mut pool = WorkerPool::start(open_context(dir, config), config, |i| files.create(i))?;
    for unit in units {
        pool.submit(unit);
    }
    let summary = pool.finish()?;
    for report in &summary.reports {
        assert_eq!(report.state, WorkerState::Stopped);
    }
    Ok(summary.processed)
}

/// All rows of every worker's `prefix_<i>` file, sorted.
fn collect_rows(dir: &Path, prefix: &str, workers: usize) -> Vec<String> {
    let mut rows: Vec<String> = (0..workers)
        .flat_map(|i| {
            fs::read_to_string(dir.join(format!("{}_{}", prefix, i)))
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect();
    rows.sort();
    rows
}

#[test]
fn test_two_page_user_has_no_clustering() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let config = ScoringConfig::default().with_workers(1);

    assert_eq!(run(dir.path(), &config, vec![WorkUnit::single(0)]).unwrap(), 1);

    assert_eq!(
        collect_rows(dir.path(), "scores_out", 1),
        vec!["0 0.000000e+00 1.000000e+00 0.000000e+00"]
    );
    assert_eq!(
        collect_rows(dir.path(), "raw_page_stats_out", 1),
        vec![concat!(
            "0 2",
            " 1:1.000000e+00/0.000000e+00/5.000000e-01",
            " 2:1.000000e+00/0.000000e+00/5.000000e-01"
        )]
    );
}

#[test]
fn test_fully_similar_triangle_scores_one() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());

    for metric in [SimilarityMetric::Cosine, SimilarityMetric::JensenShannon] {
        let config = ScoringConfig::default()
            .with_workers(1)
            .with_similarity(metric);
        run(dir.path(), &config, vec![WorkUnit::single(2)]).unwrap();
        assert_eq!(
            collect_rows(dir.path(), "scores_out", 1),
            vec!["2 1.000000e+00 1.000000e+00 1.000000e+00"],
            "metric {}",
            metric
        );
    }
}

#[test]
fn test_group_rows_across_workers() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let config = ScoringConfig::default().with_workers(3).with_queue_capacity(2);

    let units = vec![
        WorkUnit::single(0),
        WorkUnit::new(vec![0, 1]).unwrap(),
        WorkUnit::new(vec![1, 0]).unwrap(),
        WorkUnit::single(2),
    ];
    assert_eq!(run(dir.path(), &config, units).unwrap(), 4);

    let rows = collect_rows(dir.path(), "scores_out", 3);
    assert_eq!(
        rows,
        vec![
            "0 0.000000e+00 1.000000e+00 0.000000e+00",
            "0 1 0.000000e+00 1.000000e+00 0.000000e+00",
            "1 0 0.000000e+00 1.000000e+00 0.000000e+00",
            "2 1.000000e+00 1.000000e+00 1.000000e+00",
        ]
    );
}

#[test]
fn test_over_cap_group_writes_nothing() {
    let dir = tempdir().unwrap();
    let first: Vec<i64> = (0..25_001).map(|i| 2 * i).collect();
    let second: Vec<i64> = (0..25_000).map(|i| 2 * i + 1).collect();
    write_item_store(
        dir.path().join("users_mmap"),
        &[(0, pairs(&first, 1.0)), (1, pairs(&second, 1.0))],
        ScalarKind::Sum,
    )
    .unwrap();
    write_item_store(dir.path().join("pages_mmap"), &[(0, pairs(&[1], 1.0))], ScalarKind::L2Norm)
        .unwrap();
    write_flat_store(dir.path().join("controversy_mmap"), &pairs(&[0], 1.0)).unwrap();

    // 50001 merged pages against the default cap of 50000.
    let config = ScoringConfig::default().with_workers(2);
    let processed = run(dir.path(), &config, vec![WorkUnit::new(vec![0, 1]).unwrap()]).unwrap();

    assert_eq!(processed, 0);
    assert!(collect_rows(dir.path(), "scores_out", 2).is_empty());
    assert!(collect_rows(dir.path(), "raw_page_stats_out", 2).is_empty());
}

#[test]
fn test_absent_page_has_zero_similarity() {
    let dir = tempdir().unwrap();
    write_item_store(
        dir.path().join("pages_mmap"),
        &[(1, pairs(&[10], 1.0)), (2, vec![]), (4, pairs(&[10], 2.0))],
        ScalarKind::L2Norm,
    )
    .unwrap();
    let pages = MappedFeatureStore::open(dir.path().join("pages_mmap"), &StoreOptions::default())
        .unwrap();

    let present = pages.vector(1).unwrap();
    for absent in [2, 3] {
        let absent = pages.vector(absent).unwrap();
        assert!(absent.features().is_none());
        assert_eq!(cosine_similarity(present, absent).unwrap(), 0.0);
        assert_eq!(cosine_similarity(absent, present).unwrap(), 0.0);
    }
    assert!((cosine_similarity(present, pages.vector(4).unwrap()).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_controversy_mismatch_fails_run() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    // Flat store whose slot 2 holds page 7 with a non-zero value.
    let mut bytes = Vec::new();
    for word in [16i64, 3] {
        bytes.extend_from_slice(&word.to_ne_bytes());
    }
    for (id, value) in [(0i64, 0.0f64), (1, 1.0), (7, 1.0)] {
        bytes.extend_from_slice(&id.to_ne_bytes());
        bytes.extend_from_slice(&value.to_ne_bytes());
    }
    fs::write(dir.path().join("controversy_mmap"), bytes).unwrap();

    let config = ScoringConfig::default().with_workers(2).with_queue_capacity(1);
    let units = (0..8).map(|i| WorkUnit::single(i % 2)).collect();
    let err = run(dir.path(), &config, units).unwrap_err();
    assert!(matches!(
        err,
        ScoreError::DataInvariant(InvariantViolation::ControversyMismatch { page: 2, found: 7, .. })
    ));
}

#[test]
fn test_unsorted_store_rejected_on_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users_mmap");
    // One item whose two features are out of order.
    let mut bytes = Vec::new();
    for word in [16i64, 1, 0] {
        bytes.extend_from_slice(&word.to_ne_bytes());
    }
    bytes.extend_from_slice(&2.0f64.to_ne_bytes());
    for word in [2i64, 48] {
        bytes.extend_from_slice(&word.to_ne_bytes());
    }
    for id in [5i64, 3] {
        bytes.extend_from_slice(&id.to_ne_bytes());
        bytes.extend_from_slice(&1.0f64.to_ne_bytes());
    }
    fs::write(&path, &bytes).unwrap();

    let err = MappedFeatureStore::open(&path, &StoreOptions::default()).err().unwrap();
    assert!(matches!(
        err,
        ScoreError::DataInvariant(InvariantViolation::UnsortedFeatures {
            previous: 5,
            current: 3,
            ..
        })
    ));

    // Without verification the store opens and lookups still see the raw data.
    let store = MappedFeatureStore::open(&path, &StoreOptions { verify_on_open: false }).unwrap();
    assert_eq!(store.vector(0).unwrap().len(), 2);
}

#[test]
fn test_missing_store_is_resource_error() {
    let dir = tempdir().unwrap();
    let err = MappedFeatureStore::open(dir.path().join("nope"), &StoreOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, ScoreError::Resource { .. }));
}
