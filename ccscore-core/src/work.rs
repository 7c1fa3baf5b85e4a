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

//! Work units: one user or a group of users to score together.

use std::fmt;
use std::io::BufRead;

use crate::error::{Result, ScoreError};

/// Ordered, non-empty list of user ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    user_ids: Vec<i64>,
}

impl WorkUnit {
    /// Returns `None` for an empty id list.
    pub fn new(user_ids: Vec<i64>) -> Option<Self> {
        if user_ids.is_empty() {
            None
        } else {
            Some(Self { user_ids })
        }
    }

    pub fn single(user_id: i64) -> Self {
        Self {
            user_ids: vec![user_id],
        }
    }

    pub fn user_ids(&self) -> &[i64] {
        &self.user_ids
    }

    pub fn len(&self) -> usize {
        self.user_ids.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.user_ids.len() == 1
    }

    /// Parse one line of whitespace-separated user ids.
    ///
    /// Blank lines give `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let user_ids = line
            .split_whitespace()
            .map(|token| match token.parse::<i64>() {
                Ok(id) if id >= 0 => Ok(id),
                _ => Err(ScoreError::InvalidInput(format!("bad user id '{}'", token))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(user_ids))
    }
}

/// Space-separated ids, as written at the start of every output line.
impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.user_ids.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

/// Iterate the units of a newline-delimited list, skipping blank lines.
pub fn read_work_units<R: BufRead>(reader: R) -> impl Iterator<Item = Result<WorkUnit>> {
    reader.lines().enumerate().filter_map(|(index, line)| {
        let parsed = line
            .map_err(ScoreError::from)
            .and_then(|line| WorkUnit::parse_line(&line))
            .map_err(|e| match e {
                ScoreError::InvalidInput(msg) => {
                    ScoreError::InvalidInput(format!("work unit line {}: {}", index + 1, msg))
                }
                other => other,
            });
        parsed.transpose()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_group() {
        assert_eq!(WorkUnit::parse_line("42\n").unwrap(), Some(WorkUnit::single(42)));
        let group = WorkUnit::parse_line("  3 1\t7 ").unwrap().unwrap();
        assert_eq!(group.user_ids(), &[3, 1, 7]);
        assert!(!group.is_single());
        assert_eq!(group.to_string(), "3 1 7");
    }

    #[test]
    fn test_blank_line_is_none() {
        assert_eq!(WorkUnit::parse_line("   \n").unwrap(), None);
        assert!(WorkUnit::new(vec![]).is_none());
    }

    #[test]
    fn test_bad_tokens_rejected() {
        assert!(matches!(WorkUnit::parse_line("1 two"), Err(ScoreError::InvalidInput(_))));
        assert!(WorkUnit::parse_line("-4").is_err());
    }

    #[test]
    fn test_read_work_units_reports_line() {
        let units: Vec<_> = read_work_units("1\n\n2 3\n".as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(units, vec![WorkUnit::single(1), WorkUnit::new(vec![2, 3]).unwrap()]);

        let err = read_work_units("1\nx\n".as_bytes())
            .find_map(|r| r.err())
            .unwrap();
        assert!(err.to_string().contains("line 2"));
    }
}
