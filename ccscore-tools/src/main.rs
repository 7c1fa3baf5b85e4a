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

//! CCScore CLI
//!
//! Builds the mapped stores from tuple files and scores work units with a
//! pool of worker threads.
//!
//! ## Usage
//!
//! ```bash
//! # Build users_mmap, pages_mmap and controversy_mmap from tuple files
//! ccscore build --users user_pages.txt --pages page_words.txt \
//!     --controversy controversy.txt --output-dir data/
//!
//! # Score every line of a work-unit list on 8 threads
//! ccscore score --users data/users_mmap --pages data/pages_mmap \
//!     --controversy data/controversy_mmap --work-units groups.txt --threads 8
//!
//! # Similarity of two pages
//! ccscore similarity --pages data/pages_mmap 12 34
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ccscore_core::config::{DEFAULT_MAX_GRAPH_NODES, DEFAULT_QUEUE_CAPACITY};
use ccscore_core::writer::DEFAULT_MAX_ITEM_ID;
use ccscore_core::{
    read_flat_tuples, read_item_tuples, read_work_units, ControversyVector, MappedFeatureStore,
    OutputFiles, ScalarKind, ScoringConfig, ScoringContext, SimilarityMetric, StoreOptions,
    StoreWriter, WorkerPool,
};

/// CCScore - controversy and clustering scores over edit graphs
#[derive(Parser)]
#[command(name = "ccscore")]
#[command(about = "Controversy and clustering scores for users and user groups")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every work unit and write per-worker result files
    Score {
        /// User store (item table, scalar = sum)
        #[arg(long)]
        users: PathBuf,

        /// Page store (item table, scalar = L2 norm)
        #[arg(long)]
        pages: PathBuf,

        /// Controversy store (flat)
        #[arg(long)]
        controversy: PathBuf,

        /// Newline-delimited work units, one or more user ids per line
        #[arg(short = 'w', long)]
        work_units: PathBuf,

        /// Number of worker threads (0 = auto)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,

        /// Directory for scores_out_<i> and raw_page_stats_out_<i>
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Skip units with more pages than this
        #[arg(long, default_value_t = DEFAULT_MAX_GRAPH_NODES)]
        max_graph_nodes: usize,

        /// Work queue capacity
        #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        queue_capacity: usize,

        /// Page similarity: cosine, jsd
        #[arg(long, default_value = "cosine")]
        similarity: SimilarityMetric,

        /// Fail when an output line would exceed this many bytes
        #[arg(long)]
        max_line_bytes: Option<usize>,
    },

    /// Build mapped stores from tuple files
    Build {
        /// `user page edits` tuples, sorted by user then page
        #[arg(long)]
        users: Option<PathBuf>,

        /// `page word count` tuples, sorted by page then word
        #[arg(long)]
        pages: Option<PathBuf>,

        /// `page controversy` pairs
        #[arg(long)]
        controversy: Option<PathBuf>,

        /// Directory for users_mmap, pages_mmap and controversy_mmap
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Reject user, page or word ids above this
        #[arg(long, default_value_t = DEFAULT_MAX_ITEM_ID)]
        max_id: i64,
    },

    /// Print the similarity of two pages
    Similarity {
        /// Page store
        #[arg(long)]
        pages: PathBuf,

        first: i64,

        second: i64,

        /// Page similarity: cosine, jsd
        #[arg(long, default_value = "cosine")]
        similarity: SimilarityMetric,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            let _ = e.print();
            return code;
        }
    };

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Score {
            users,
            pages,
            controversy,
            work_units,
            threads,
            output_dir,
            max_graph_nodes,
            queue_capacity,
            similarity,
            max_line_bytes,
        } => {
            let mut config = ScoringConfig::default()
                .with_max_graph_nodes(max_graph_nodes)
                .with_queue_capacity(queue_capacity)
                .with_similarity(similarity)
                .with_max_line_bytes(max_line_bytes);
            if threads > 0 {
                config = config.with_workers(threads);
            }
            score(&users, &pages, &controversy, &work_units, &output_dir, &config)
        }
        Commands::Build {
            users,
            pages,
            controversy,
            output_dir,
            max_id,
        } => {
            let writer = StoreWriter::new().with_max_item_id(max_id);
            build(users, pages, controversy, &output_dir, &writer)
        }
        Commands::Similarity {
            pages,
            first,
            second,
            similarity,
        } => probe_similarity(&pages, first, second, similarity),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn score(
    users: &Path,
    pages: &Path,
    controversy: &Path,
    work_units: &Path,
    output_dir: &Path,
    config: &ScoringConfig,
) -> Result<()> {
    let start = Instant::now();
    let options = StoreOptions::default();

    let context = Arc::new(ScoringContext::new(
        MappedFeatureStore::open(users, &options).context("Failed to open user store")?,
        MappedFeatureStore::open(pages, &options).context("Failed to open page store")?,
        ControversyVector::open(controversy).context("Failed to open controversy store")?,
        config,
    ));
    let units = File::open(work_units)
        .with_context(|| format!("Failed to open work units: {}", work_units.display()))?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let files = OutputFiles::new(output_dir);
    let mut pool = WorkerPool::start(context, config, |i| files.create(i))
        .context("Failed to start workers")?;

    let mut read_error = None;
    for unit in read_work_units(BufReader::new(units)) {
        if pool.is_aborted() {
            warn!("A worker failed, no further units are submitted");
            break;
        }
        match unit {
            Ok(unit) => pool.submit(unit),
            Err(e) => {
                pool.abort();
                read_error = Some(e);
                break;
            }
        }
    }

    let summary = pool.finish().context("Scoring failed")?;
    if let Some(e) = read_error {
        return Err(e).context("Failed to read work units");
    }

    let elapsed = start.elapsed();
    info!(
        submitted = summary.submitted,
        processed = summary.processed,
        skipped = summary.skipped,
        elapsed_secs = elapsed.as_secs_f64(),
        "Scoring complete"
    );
    eprintln!();
    eprintln!("✓ Scored {} of {} units", summary.processed, summary.submitted);
    eprintln!("  Skipped:  {}", summary.skipped);
    eprintln!("  Workers:  {}", summary.reports.len());
    eprintln!("  Output:   {}", output_dir.display());
    eprintln!("  Time:     {:.2}s", elapsed.as_secs_f64());
    Ok(())
}

fn build(
    users: Option<PathBuf>,
    pages: Option<PathBuf>,
    controversy: Option<PathBuf>,
    output_dir: &Path,
    writer: &StoreWriter,
) -> Result<()> {
    let start = Instant::now();
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let stores = [
        (users, "users_mmap", Some(ScalarKind::Sum)),
        (pages, "pages_mmap", Some(ScalarKind::L2Norm)),
        (controversy, "controversy_mmap", None),
    ];
    let mut built = 0;
    for (input, name, kind) in stores {
        let Some(input) = input else {
            continue;
        };
        let reader = BufReader::new(
            File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?,
        );
        let output = output_dir.join(name);
        let bytes = match kind {
            Some(kind) => {
                let items = read_item_tuples(reader)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                writer.write_item_store(&output, &items, kind)?
            }
            None => {
                let entries = read_flat_tuples(reader)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                writer.write_flat_store(&output, &entries)?
            }
        };
        eprintln!("  {} → {} ({} bytes)", input.display(), output.display(), bytes);
        built += 1;
    }

    if built == 0 {
        warn!("Nothing to build: pass --users, --pages or --controversy");
    }
    eprintln!("✓ Built {} store(s) in {:.2}s", built, start.elapsed().as_secs_f64());
    Ok(())
}

fn probe_similarity(pages: &Path, first: i64, second: i64, metric: SimilarityMetric) -> Result<()> {
    let store = MappedFeatureStore::open(pages, &StoreOptions::default())
        .context("Failed to open page store")?;
    let a = store.vector(first).with_context(|| format!("Bad page {}", first))?;
    let b = store.vector(second).with_context(|| format!("Bad page {}", second))?;
    let similarity = metric.similarity(a, b)?;
    println!("{:.4}", similarity);
    Ok(())
}
