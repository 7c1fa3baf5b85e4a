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

//! Text rendering of score rows and per-worker output files.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{InvariantViolation, Result, ScoreError};
use crate::graph::GraphScores;

/// Primary output file name for worker `index`
pub fn scores_file_name(index: usize) -> String {
    format!("scores_out_{}", index)
}

/// Diagnostics output file name for worker `index`
pub fn diagnostics_file_name(index: usize) -> String {
    format!("raw_page_stats_out_{}", index)
}

/// Scientific notation with six fractional digits and a signed, at least
/// two-digit exponent (`1.000000e+00`), matching what existing score files
/// contain.
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let rendered = format!("{:.6e}", value);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => rendered,
    }
}

fn check_limit(line: String, limit: Option<usize>) -> Result<String> {
    match limit {
        Some(limit) if line.len() > limit => Err(InvariantViolation::LineTooLong {
            length: line.len(),
            limit,
        }
        .into()),
        _ => Ok(line),
    }
}

/// `<ids> <cc> <avg_controversy> <avg_clustering>\n`
pub fn score_line(label: &str, scores: &GraphScores, limit: Option<usize>) -> Result<String> {
    let line = format!(
        "{} {} {} {}\n",
        label,
        format_sci(scores.cc),
        format_sci(scores.avg_controversy),
        format_sci(scores.avg_clustering)
    );
    check_limit(line, limit)
}

/// `<ids> <node_count> <id:controversy/coefficient/edit>...\n`
pub fn diagnostics_line(label: &str, scores: &GraphScores, limit: Option<usize>) -> Result<String> {
    let mut line = format!("{} {}", label, scores.nodes.len());
    for node in &scores.nodes {
        line.push_str(&format!(
            " {}:{}/{}/{}",
            node.real_id,
            format_sci(node.controversy),
            format_sci(node.coefficient),
            format_sci(node.edit_weight)
        ));
    }
    line.push('\n');
    check_limit(line, limit)
}

/// Creates each worker's pair of output files inside one directory.
#[derive(Debug, Clone)]
pub struct OutputFiles {
    dir: PathBuf,
}

impl OutputFiles {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn scores_path(&self, index: usize) -> PathBuf {
        self.dir.join(scores_file_name(index))
    }

    pub fn diagnostics_path(&self, index: usize) -> PathBuf {
        self.dir.join(diagnostics_file_name(index))
    }

    /// Create (truncating) the two files of worker `index`.
    pub fn create(&self, index: usize) -> Result<(BufWriter<File>, BufWriter<File>)> {
        let open = |path: PathBuf| {
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|e| ScoreError::resource(path, e))
        };
        Ok((open(self.scores_path(index))?, open(self.diagnostics_path(index))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeScore;

    #[test]
    fn test_format_sci_matches_printf() {
        assert_eq!(format_sci(0.0), "0.000000e+00");
        assert_eq!(format_sci(1.0), "1.000000e+00");
        assert_eq!(format_sci(0.5), "5.000000e-01");
        assert_eq!(format_sci(-1234.5), "-1.234500e+03");
        assert_eq!(format_sci(1.0e-120), "1.000000e-120");
        assert_eq!(format_sci(f64::NAN), "nan");
        assert_eq!(format_sci(f64::NEG_INFINITY), "-inf");
    }

    fn scores() -> GraphScores {
        GraphScores {
            cc: 0.0,
            avg_controversy: 1.0,
            avg_clustering: 0.0,
            nodes: vec![
                NodeScore {
                    real_id: 1,
                    controversy: 1.0,
                    coefficient: 0.0,
                    edit_weight: 0.5,
                },
                NodeScore {
                    real_id: 2,
                    controversy: 1.0,
                    coefficient: 0.0,
                    edit_weight: 0.5,
                },
            ],
        }
    }

    #[test]
    fn test_score_line() {
        assert_eq!(
            score_line("3 4", &scores(), None).unwrap(),
            "3 4 0.000000e+00 1.000000e+00 0.000000e+00\n"
        );
    }

    #[test]
    fn test_diagnostics_line() {
        let expected = concat!(
            "7 2",
            " 1:1.000000e+00/0.000000e+00/5.000000e-01",
            " 2:1.000000e+00/0.000000e+00/5.000000e-01\n"
        );
        assert_eq!(diagnostics_line("7", &scores(), None).unwrap(), expected);
    }

    #[test]
    fn test_line_limit() {
        let err = score_line("7", &scores(), Some(10)).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::DataInvariant(InvariantViolation::LineTooLong { limit: 10, .. })
        ));
        assert!(score_line("7", &scores(), Some(1000)).is_ok());
    }

    #[test]
    fn test_output_file_names() {
        let files = OutputFiles::new("/tmp/out");
        assert_eq!(files.scores_path(3), PathBuf::from("/tmp/out/scores_out_3"));
        assert_eq!(
            files.diagnostics_path(0),
            PathBuf::from("/tmp/out/raw_page_stats_out_0")
        );
    }
}
