//! # Storage Layer
//!
//! Filesystem persistence for a project workspace, all of it plain files.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | Markdown + restricted header | `tasks/{column}/{id:03}-{slug}.md` |
//! | Comments | Markdown + restricted header | `tasks/comments/{task_id}/{ts}-{author}.md` |
//! | Board config | YAML | `tasks/config.yaml` |
//! | Prompts / documents | Markdown + restricted header | `{kind}/{id:03}-{slug}/current.md` |
//! | Revision snapshots | Markdown + restricted header | `{kind}/{id:03}-{slug}/revisions/{rev:03}.md` |
//!
//! ## Concurrency Safety
//!
//! - Mutations hold a per-store mutex plus an advisory allocation lock
//!   (`fs2`) during id allocation
//! - All writes are atomic (temp file + rename); a task move is one rename
//! - Reads take no lock and treat files that vanish mid-walk as deleted
//!
//! ## Workspace Structure
//!
//! ```text
//! <root>/
//! ├── tasks/
//! │   ├── config.yaml           # Columns and board settings
//! │   ├── backlog/ ... done/    # One directory per column
//! │   └── comments/{task_id}/   # One thread per task
//! ├── prompts/{id:03}-{slug}/   # current.md + revisions/
//! └── documents/{id:03}-{slug}/ # current.md + revisions/
//! ```
//!
//! ## Key Types
//!
//! - [`Workspace`] - Entry point: open/init a project, poll, activity feed
//! - [`BoardStore`] - Tasks as files in column directories
//! - [`RevisionedStore`] - Prompts/documents with snapshot history
//! - [`CommentStore`] - Per-task comment threads
//! - [`StoreError`] - The failure taxonomy every store shares

mod board;
mod comments;
mod config;
mod error;
mod feed;
mod file;
mod ids;
mod revisioned;
mod workspace;

pub use board::{BoardStore, NewTask, TaskList, TaskPatch};
pub use comments::{CommentList, CommentStore, NewComment};
pub use config::{BoardConfig, BoardSettings, ColumnSpec};
pub use error::{Result, SkippedFile, StoreError};
pub use feed::{Fingerprint, FingerprintDelta};
pub use ids::{leading_id, next_id, AllocationLock};
pub use revisioned::{NewResource, ResourceList, ResourcePatch, RevisionList, RevisionedStore};
pub use workspace::{ActivityEntry, PollState, Workspace};
