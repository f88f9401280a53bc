//! Change-detection fingerprints
//!
//! Polling clients need a cheap way to notice that *something* changed
//! without re-fetching every resource. A [`Fingerprint`] maps each relative
//! path to a short hash of (name, mtime, size); comparing two fingerprints
//! yields the added/removed/changed path sets, from which a client re-fetches
//! only the affected resource kinds.
//!
//! Fingerprints are never persisted. The directory tree is the sole source of
//! truth and any external process may touch it between polls, so every call
//! recomputes from a fresh walk.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

/// Ephemeral map from relative path to content-identity hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(BTreeMap<String, String>);

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one file. The hash covers the name, mtime (nanoseconds), and
    /// size, so moves, edits, and truncations all register.
    pub fn record(&mut self, rel_path: String, meta: &Metadata) {
        let mtime_ns = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = blake3::Hasher::new();
        hasher.update(rel_path.as_bytes());
        hasher.update(&mtime_ns.to_le_bytes());
        hasher.update(&meta.len().to_le_bytes());
        let hash = hasher.finalize().to_hex();

        // 16 hex chars is plenty for change detection
        self.0.insert(rel_path, hash[..16].to_string());
    }

    /// Folds another fingerprint in (e.g. the comment tree into the board's).
    pub fn merge(&mut self, other: Fingerprint) {
        self.0.extend(other.0);
    }

    /// Computes the path sets that differ between `self` (older) and `newer`.
    pub fn compare(&self, newer: &Fingerprint) -> FingerprintDelta {
        let mut delta = FingerprintDelta::default();

        for (path, hash) in &newer.0 {
            match self.0.get(path) {
                None => delta.added.push(path.clone()),
                Some(old_hash) if old_hash != hash => delta.changed.push(path.clone()),
                Some(_) => {}
            }
        }
        for path in self.0.keys() {
            if !newer.0.contains_key(path) {
                delta.removed.push(path.clone());
            }
        }

        delta
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Path sets produced by comparing two fingerprints. Paths are sorted
/// (BTreeMap iteration order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FingerprintDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl FingerprintDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn record(fp: &mut Fingerprint, dir: &TempDir, name: &str) {
        let meta = fs::metadata(dir.path().join(name)).unwrap();
        fp.record(name.to_string(), &meta);
    }

    #[test]
    fn identical_trees_compare_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "one").unwrap();

        let mut fp1 = Fingerprint::new();
        record(&mut fp1, &dir, "a.md");
        let mut fp2 = Fingerprint::new();
        record(&mut fp2, &dir, "a.md");

        assert_eq!(fp1, fp2);
        assert!(fp1.compare(&fp2).is_empty());
    }

    #[test]
    fn detects_added_and_removed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "one").unwrap();
        fs::write(dir.path().join("b.md"), "two").unwrap();

        let mut old = Fingerprint::new();
        record(&mut old, &dir, "a.md");

        let mut new = Fingerprint::new();
        record(&mut new, &dir, "b.md");

        let delta = old.compare(&new);
        assert_eq!(delta.added, vec!["b.md"]);
        assert_eq!(delta.removed, vec!["a.md"]);
        assert!(delta.changed.is_empty());
    }

    #[test]
    fn detects_content_change_via_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "one").unwrap();
        let mut old = Fingerprint::new();
        record(&mut old, &dir, "a.md");

        fs::write(dir.path().join("a.md"), "one more byte here").unwrap();
        let mut new = Fingerprint::new();
        record(&mut new, &dir, "a.md");

        let delta = old.compare(&new);
        assert_eq!(delta.changed, vec!["a.md"]);
        assert!(delta.added.is_empty() && delta.removed.is_empty());
    }

    #[test]
    fn merge_folds_paths_in() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "one").unwrap();
        fs::write(dir.path().join("b.md"), "two").unwrap();

        let mut board = Fingerprint::new();
        record(&mut board, &dir, "a.md");
        let mut comments = Fingerprint::new();
        record(&mut comments, &dir, "b.md");

        board.merge(comments);
        assert_eq!(board.len(), 2);
        assert_eq!(board.paths().collect::<Vec<_>>(), vec!["a.md", "b.md"]);
    }

    #[test]
    fn serializes_as_plain_map() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "one").unwrap();
        let mut fp = Fingerprint::new();
        record(&mut fp, &dir, "a.md");

        let json = serde_json::to_value(&fp).unwrap();
        assert!(json.as_object().unwrap().contains_key("a.md"));
    }
}
