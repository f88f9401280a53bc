//! Workspace facade
//!
//! A workspace is one project directory holding the task board, its comment
//! threads, and the revisioned prompt and document trees:
//!
//! ```text
//! <root>/
//!   tasks/
//!     config.yaml
//!     backlog/  todo/  in-progress/  review/  done/
//!     comments/{task_id}/
//!   prompts/{id:03}-{slug}/current.md + revisions/
//!   documents/{id:03}-{slug}/current.md + revisions/
//! ```
//!
//! `init` scaffolds that layout, `open` refuses a directory that was never
//! initialized, and `poll`/`activity` give change-feed views across all
//! stores at once.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;

use crate::domain::ResourceKind;

use super::board::BoardStore;
use super::comments::CommentStore;
use super::config::BoardConfig;
use super::error::{Result, StoreError};
use super::feed::Fingerprint;
use super::file::markdown_names;
use super::revisioned::RevisionedStore;

/// One poll sample: fingerprints per resource kind. Comments fold into the
/// board fingerprint since clients render them with their tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollState {
    pub board: Fingerprint,
    pub prompts: Fingerprint,
    pub documents: Fingerprint,
}

impl PollState {
    pub fn is_unchanged_from(&self, earlier: &PollState) -> bool {
        self == earlier
    }
}

/// One row of the recent-activity feed, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// `task`, `comment`, `prompt`, or `document`.
    pub kind: &'static str,
    /// Path relative to the workspace root.
    pub path: String,
    pub modified: NaiveDateTime,
}

/// An opened project workspace.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    pub board: BoardStore,
    pub comments: CommentStore,
    pub prompts: RevisionedStore,
    pub documents: RevisionedStore,
}

impl Workspace {
    /// Scaffolds the workspace layout and opens it. Idempotent: existing
    /// files (the board config in particular) are never overwritten.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let tasks = root.join("tasks");
        fs::create_dir_all(&tasks).map_err(|e| StoreError::io("create_dir", &tasks, e))?;

        let config_path = tasks.join("config.yaml");
        if !config_path.exists() {
            BoardConfig::default().save(&config_path)?;
        }

        Self::open(root)
    }

    /// Opens an existing workspace. A directory without a `tasks/` tree was
    /// never initialized and is rejected.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let tasks = root.join("tasks");
        if !tasks.is_dir() {
            return Err(StoreError::not_found("workspace", root.display()));
        }

        let board = BoardStore::open(&tasks)?;
        let comments = CommentStore::open(&tasks)?;
        let prompts = RevisionedStore::open(&root, ResourceKind::Prompt)?;
        let documents = RevisionedStore::open(&root, ResourceKind::Document)?;

        Ok(Self {
            root,
            board,
            comments,
            prompts,
            documents,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Samples the current change-detection state across all stores.
    /// Comparing two samples tells a polling client which kinds to re-fetch.
    pub fn poll(&self) -> Result<PollState> {
        let mut board = self.board.fingerprint()?;
        board.merge(self.comments.fingerprint()?);

        Ok(PollState {
            board,
            prompts: self.prompts.fingerprint()?,
            documents: self.documents.fingerprint()?,
        })
    }

    pub fn task_count(&self) -> Result<usize> {
        self.board.task_count()
    }

    /// Resolves a kind name, as a transport layer would receive it, to the
    /// matching revisioned store. Tasks live on the board, not here.
    pub fn resource_store(&self, kind: &str) -> Result<&RevisionedStore> {
        match kind.parse() {
            Ok(ResourceKind::Prompt) => Ok(&self.prompts),
            Ok(ResourceKind::Document) => Ok(&self.documents),
            Ok(ResourceKind::Task) | Err(_) => Err(StoreError::InvalidKind(kind.to_string())),
        }
    }

    /// Deletes a task together with its comment thread.
    pub fn delete_task(&self, id: u32, column: &str) -> Result<()> {
        self.board.delete(id, column)?;
        self.comments.delete_thread(id)
    }

    /// The `limit` most recently modified files across every store, newest
    /// first. Built from a fresh walk on each call, like the fingerprints.
    pub fn activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let mut entries = Vec::new();

        for col in self.board.config().column_names() {
            let dir = self.board.root().join(col);
            for name in markdown_names(&dir)? {
                push_entry(
                    &mut entries,
                    "task",
                    &dir.join(&name),
                    format!("tasks/{}/{}", col, name),
                );
            }
        }

        for (task_id, thread) in comment_threads(self.comments.root())? {
            for name in markdown_names(&thread)? {
                push_entry(
                    &mut entries,
                    "comment",
                    &thread.join(&name),
                    format!("tasks/comments/{}/{}", task_id, name),
                );
            }
        }

        for (store, kind) in [(&self.prompts, "prompt"), (&self.documents, "document")] {
            for path in store.fingerprint()?.paths() {
                let full = store.root().join(path);
                push_entry(
                    &mut entries,
                    kind,
                    &full,
                    format!("{}/{}", store.kind().dir_name(), path),
                );
            }
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.path.cmp(&b.path)));
        entries.truncate(limit);
        Ok(entries)
    }
}

fn push_entry(entries: &mut Vec<ActivityEntry>, kind: &'static str, full: &Path, rel: String) {
    if let Some(modified) = modified_at(full) {
        entries.push(ActivityEntry {
            kind,
            path: rel,
            modified,
        });
    }
}

/// Local mtime of a file; `None` when it vanished mid-walk.
fn modified_at(path: &Path) -> Option<NaiveDateTime> {
    let meta = fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// Thread subdirectories of the comment tree as (task id name, path).
fn comment_threads(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io("read_dir", root, e)),
    };

    let mut threads: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            Some((name, e.path()))
        })
        .collect();
    threads.sort();
    Ok(threads)
}
