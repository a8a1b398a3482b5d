// Copyright 2025 Sushanth (https://github.com/sushanthpy)
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

//! Diff Engine - Line-Level Version Comparison
//!
//! Compares two version blobs for side-by-side display:
//!
//! 1. [`normalize`] both texts so re-serialization noise (indentation,
//!    trailing commas, blank lines, CRLF) does not show up as a change
//! 2. [`compute_diff`] runs a line-based LCS diff and groups the result into
//!    maximal [`DiffHunk`]s
//! 3. [`map_to_decorations`] turns hunks into 1-indexed line ranges per pane
//!
//! Everything here is pure; results are plain values the presentation layer
//! paints without mutating any editor state.

use scriptvault_core::{DiffAlgorithm, DiffConfig};
use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffTag};
use tracing::debug;

/// Classification of a run of lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HunkKind {
    /// Present on both sides
    Unchanged,
    /// Only in the left ("before") text
    Removed,
    /// Only in the right ("after") text
    Added,
}

/// A maximal run of lines with the same classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub kind: HunkKind,
    pub line_count: usize,
}

impl DiffHunk {
    pub fn new(kind: HunkKind, line_count: usize) -> Self {
        Self { kind, line_count }
    }
}

/// Pane of the comparison view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Highlighted line range, 1-indexed and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationRange {
    pub side: Side,
    pub start_line: usize,
    pub end_line: usize,
}

impl DecorationRange {
    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

/// Decorations for both panes, each sorted by start line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorations {
    pub left: Vec<DecorationRange>,
    pub right: Vec<DecorationRange>,
}

impl Decorations {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Line totals of a comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub lines_unchanged: usize,
    pub lines_removed: usize,
    pub lines_added: usize,
}

impl DiffStats {
    pub fn from_hunks(hunks: &[DiffHunk]) -> Self {
        hunks.iter().fold(Self::default(), |mut stats, hunk| {
            match hunk.kind {
                HunkKind::Unchanged => stats.lines_unchanged += hunk.line_count,
                HunkKind::Removed => stats.lines_removed += hunk.line_count,
                HunkKind::Added => stats.lines_added += hunk.line_count,
            }
            stats
        })
    }

    /// Net lines changed
    pub fn net_change(&self) -> i64 {
        self.lines_added as i64 - self.lines_removed as i64
    }

    /// Lines on the left side (`unchanged + removed`)
    pub fn left_lines(&self) -> usize {
        self.lines_unchanged + self.lines_removed
    }

    /// Lines on the right side (`unchanged + added`)
    pub fn right_lines(&self) -> usize {
        self.lines_unchanged + self.lines_added
    }

    /// `2 * unchanged / (left + right)`, 1.0 when both sides are empty
    pub fn similarity(&self) -> f64 {
        let total = self.left_lines() + self.right_lines();
        if total == 0 {
            return 1.0;
        }
        (2 * self.lines_unchanged) as f64 / total as f64
    }
}

/// Result of comparing two versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Normalized "before" text
    pub before: String,
    /// Normalized "after" text
    pub after: String,
    pub hunks: Vec<DiffHunk>,
    pub decorations: Decorations,
    pub stats: DiffStats,
}

impl Comparison {
    /// No removed or added lines
    pub fn is_identical(&self) -> bool {
        self.hunks.iter().all(|h| h.kind == HunkKind::Unchanged)
    }

    pub fn similarity(&self) -> f64 {
        self.stats.similarity()
    }

    /// Format the normalized texts as a unified-style listing
    pub fn to_unified(&self, old_label: &str, new_label: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("--- {}\n", old_label));
        output.push_str(&format!("+++ {}\n", new_label));

        let mut old_lines = split_lines(&self.before).into_iter();
        let mut new_lines = split_lines(&self.after).into_iter();

        for hunk in &self.hunks {
            for _ in 0..hunk.line_count {
                let (prefix, line) = match hunk.kind {
                    HunkKind::Unchanged => {
                        new_lines.next();
                        (' ', old_lines.next())
                    }
                    HunkKind::Removed => ('-', old_lines.next()),
                    HunkKind::Added => ('+', new_lines.next()),
                };
                output.push(prefix);
                output.push_str(line.unwrap_or_default());
                output.push('\n');
            }
        }

        output
    }
}

/// Diff engine
///
/// Stateless apart from its configuration; cheap to clone and safe to share
/// between any number of concurrent comparisons.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    /// Create a new diff engine with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: DiffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Canonicalize text before diffing.
    ///
    /// Line endings become `\n`; each line is trimmed and loses one trailing
    /// comma (when configured); lines left empty are dropped; the result is
    /// trimmed.
    ///
    /// Whitespace in front of a stripped comma is trimmed too, so `"x ,"`
    /// and `"x,"` both normalize to `"x"`.
    pub fn normalize(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");

        let lines: Vec<&str> = unified
            .split('\n')
            .map(|line| {
                let line = line.trim();
                if self.config.strip_trailing_commas {
                    // Re-trim: "x ," must compare equal to "x,".
                    line.strip_suffix(',').map(str::trim_end).unwrap_or(line)
                } else {
                    line
                }
            })
            .filter(|line| !line.is_empty())
            .collect();

        lines.join("\n").trim().to_string()
    }

    /// Diff two normalized texts into maximal hunks.
    pub fn compute_diff(&self, norm_a: &str, norm_b: &str) -> Vec<DiffHunk> {
        let old = split_lines(norm_a);
        let new = split_lines(norm_b);

        let algorithm = self.algorithm_for(old.len(), new.len());
        let ops = similar::capture_diff_slices(algorithm, &old, &new);

        let mut hunks = Vec::new();
        for op in &ops {
            let old_len = op.old_range().len();
            let new_len = op.new_range().len();
            match op.tag() {
                DiffTag::Equal => push_hunk(&mut hunks, HunkKind::Unchanged, old_len),
                DiffTag::Delete => push_hunk(&mut hunks, HunkKind::Removed, old_len),
                DiffTag::Insert => push_hunk(&mut hunks, HunkKind::Added, new_len),
                DiffTag::Replace => {
                    push_hunk(&mut hunks, HunkKind::Removed, old_len);
                    push_hunk(&mut hunks, HunkKind::Added, new_len);
                }
            }
        }

        hunks
    }

    /// `Lcs` keeps an `old x new` table; past the configured limit it is
    /// swapped for `Myers`, which yields an edit script of the same length.
    fn algorithm_for(&self, old_lines: usize, new_lines: usize) -> Algorithm {
        let configured = algorithm(self.config.algorithm);
        if configured == Algorithm::Lcs
            && old_lines.saturating_mul(new_lines) > self.config.lcs_cell_limit
        {
            debug!(old_lines, new_lines, "Input too large for Lcs, diffing with Myers");
            return Algorithm::Myers;
        }
        configured
    }

    /// Normalize both sides, diff them and decorate the result.
    pub fn compare(&self, before: &str, after: &str) -> Comparison {
        let before = self.normalize(before);
        let after = self.normalize(after);

        let hunks = self.compute_diff(&before, &after);
        let decorations = map_to_decorations(&hunks);
        let stats = DiffStats::from_hunks(&hunks);

        Comparison {
            before,
            after,
            hunks,
            decorations,
            stats,
        }
    }
}

/// [`DiffEngine::normalize`] with the default configuration
pub fn normalize(text: &str) -> String {
    DiffEngine::new().normalize(text)
}

/// [`DiffEngine::compute_diff`] with the default configuration
pub fn compute_diff(norm_a: &str, norm_b: &str) -> Vec<DiffHunk> {
    DiffEngine::new().compute_diff(norm_a, norm_b)
}

/// Map hunks to per-pane line ranges.
///
/// Each pane has its own counter starting at line 1. Unchanged hunks advance
/// both; removed hunks decorate and advance the left pane only, added hunks
/// the right pane only.
pub fn map_to_decorations(hunks: &[DiffHunk]) -> Decorations {
    let mut decorations = Decorations::default();
    let mut left_line = 1;
    let mut right_line = 1;

    for hunk in hunks.iter().filter(|h| h.line_count > 0) {
        match hunk.kind {
            HunkKind::Unchanged => {
                left_line += hunk.line_count;
                right_line += hunk.line_count;
            }
            HunkKind::Removed => {
                decorations.left.push(DecorationRange {
                    side: Side::Left,
                    start_line: left_line,
                    end_line: left_line + hunk.line_count - 1,
                });
                left_line += hunk.line_count;
            }
            HunkKind::Added => {
                decorations.right.push(DecorationRange {
                    side: Side::Right,
                    start_line: right_line,
                    end_line: right_line + hunk.line_count - 1,
                });
                right_line += hunk.line_count;
            }
        }
    }

    decorations
}

/// Lines of a normalized text. The empty text has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

fn algorithm(algorithm: DiffAlgorithm) -> Algorithm {
    match algorithm {
        DiffAlgorithm::Lcs => Algorithm::Lcs,
        DiffAlgorithm::Myers => Algorithm::Myers,
        DiffAlgorithm::Patience => Algorithm::Patience,
    }
}

fn push_hunk(hunks: &mut Vec<DiffHunk>, kind: HunkKind, line_count: usize) {
    if line_count == 0 {
        return;
    }
    match hunks.last_mut() {
        Some(last) if last.kind == kind => last.line_count += line_count,
        _ => hunks.push(DiffHunk::new(kind, line_count)),
    }
}
