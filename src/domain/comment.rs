//! Comment domain model
//!
//! Comments are timestamped notes nested under a parent task id. They have no
//! revisions and no state transitions; ordering is chronological, derived
//! from the timestamp prefix of the filename.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::header::{Header, Value};
use super::slug::slugify;

/// Minute precision matches the original on-disk format; the filename keeps
/// second precision for ordering.
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";
const FILENAME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// A single comment in a task's thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub filename: String,
    pub author: String,
    pub created: NaiveDateTime,
    pub body: String,
}

impl Comment {
    /// Derives the filename for a comment created at `at` by `author`.
    pub fn filename_for(at: NaiveDateTime, author: &str) -> String {
        format!("{}-{}.md", at.format(FILENAME_FORMAT), slugify(author))
    }

    pub fn from_parts(header: &Header, body: String, filename: &str) -> Result<Self, String> {
        let author = header
            .get("author")
            .and_then(Value::as_text)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "anonymous".to_string());

        let created = header
            .get("created")
            .and_then(|v| v.as_text())
            .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), CREATED_FORMAT).ok())
            .ok_or("missing or invalid `created` timestamp")?;

        Ok(Comment {
            filename: filename.to_string(),
            author,
            created,
            body,
        })
    }

    pub fn to_header(&self) -> Header {
        let mut header = Header::new();
        header.set("author", Value::Str(self.author.clone()));
        header.set(
            "created",
            Value::Str(self.created.format(CREATED_FORMAT).to_string()),
        );
        header
    }
}
