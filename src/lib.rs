//! mdboard-store - A plain-file project store for human and tool editing
//!
//! One workspace directory holds a markdown kanban board, per-task comment
//! threads, and revisioned prompts and documents. Every record is a markdown
//! file with a small restricted header, so the whole store can be read,
//! edited, grepped, and version-controlled without this crate in the loop.
//! Transport layers (HTTP, CLI, editors) sit on top of [`Workspace`].

pub mod domain;
pub mod storage;

pub use domain::{Comment, Header, Reference, Resource, ResourceKind, Task, Value};
pub use storage::{BoardStore, CommentStore, RevisionedStore, StoreError, Workspace};
