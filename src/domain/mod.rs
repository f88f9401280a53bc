//! Domain models and pure algorithms
//!
//! Everything here is I/O-free: the header codec, the resource/task/comment
//! views, reference syntax, slugs, and the line diff. The storage layer owns
//! the filesystem.

mod comment;
mod diff;
mod header;
mod reference;
mod resource;
mod slug;
mod task;

pub use comment::Comment;
pub use diff::{diff, DiffLine, DiffTag};
pub use header::{Header, ParseError, Value};
pub use reference::{Reference, ResourceKind};
pub use resource::{Resource, ResourceMeta, Revision, RevisionInfo};
pub use slug::slugify;
pub use task::{Progress, Task};
