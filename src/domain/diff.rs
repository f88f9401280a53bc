//! Line-level diff between two bodies
//!
//! Exact longest-common-subsequence alignment over lines (never characters),
//! O(n·m) time and space. That is fine for the bodies this store holds — a
//! few thousand lines at most — and buys a minimal, stable diff: ties are
//! broken toward the leftmost alignment, and removals are emitted before
//! additions at each divergence. Pure function, no filesystem access.

use serde::Serialize;

/// Classification of one output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffTag {
    Equal,
    Added,
    Removed,
}

/// One line of diff output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

impl DiffLine {
    fn new(tag: DiffTag, text: &str) -> Self {
        Self { tag, text: text.to_string() }
    }
}

/// Diffs two bodies line by line.
pub fn diff(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let n = old_lines.len();
    let m = new_lines.len();

    // lcs[i][j] = length of the LCS of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old_lines[i] == new_lines[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old_lines[i] == new_lines[j] {
            out.push(DiffLine::new(DiffTag::Equal, old_lines[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            // >= keeps the alignment leftmost: prefer consuming old lines
            out.push(DiffLine::new(DiffTag::Removed, old_lines[i]));
            i += 1;
        } else {
            out.push(DiffLine::new(DiffTag::Added, new_lines[j]));
            j += 1;
        }
    }
    while i < n {
        out.push(DiffLine::new(DiffTag::Removed, old_lines[i]));
        i += 1;
    }
    while j < m {
        out.push(DiffLine::new(DiffTag::Added, new_lines[j]));
        j += 1;
    }

    out
}
