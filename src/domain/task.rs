//! Task domain model
//!
//! A task is one markdown file living in exactly one column directory of the
//! board; the directory it sits in *is* its state, there is no status field.
//! This type is a read-side view assembled from a parsed header plus the
//! column and filename it was found under. Updates are applied to the
//! [`Header`] itself (preserving key order and unknown keys) rather than by
//! re-serializing this struct.

use chrono::NaiveDate;
use serde::Serialize;

use super::header::{Header, Value};
use super::reference::Reference;

/// Read-only checkbox tally derived from `- [ ]` / `- [x]` body lines.
///
/// Purely a display derivation: the store never parses checkboxes into
/// structured fields and never rewrites them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub checked: usize,
    pub total: usize,
}

impl Progress {
    /// Scans a body for checkbox lines.
    pub fn scan(body: &str) -> Self {
        let mut progress = Progress::default();
        for line in body.lines() {
            let line = line.trim_start();
            if line.starts_with("- [ ]") {
                progress.total += 1;
            } else if line.starts_with("- [x]") || line.starts_with("- [X]") {
                progress.total += 1;
                progress.checked += 1;
            }
        }
        progress
    }

    /// Completion ratio in `[0, 1]`, or `None` when there are no checkboxes.
    pub fn ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.checked as f64 / self.total as f64)
        }
    }
}

/// A task as read from a column directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub created: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Reference>,
    pub body: String,
    /// Column directory the file was found in.
    pub column: String,
    pub filename: String,
    pub progress: Progress,
}

impl Task {
    /// Builds a task view from a parsed header.
    ///
    /// Errors are human-readable reasons (missing/invalid fields); the
    /// storage layer wraps them with the file path.
    pub fn from_parts(
        header: &Header,
        body: String,
        column: &str,
        filename: &str,
    ) -> Result<Self, String> {
        let id = header
            .get("id")
            .and_then(Value::as_int)
            .ok_or("missing or non-integer `id`")?;
        let id = u32::try_from(id).map_err(|_| "`id` must be a positive integer".to_string())?;
        if id == 0 {
            return Err("`id` must be a positive integer".to_string());
        }

        let title = header
            .get("title")
            .and_then(Value::as_text)
            .ok_or("missing `title`")?;

        let created = header
            .get("created")
            .and_then(Value::as_date)
            .ok_or("missing or invalid `created` date")?;

        let progress = Progress::scan(&body);

        Ok(Task {
            id,
            title,
            assignee: opt_text(header, "assignee"),
            tags: string_list(header, "tags"),
            created,
            due: opt_date(header, "due")?,
            branch: opt_text(header, "branch"),
            completed: opt_date(header, "completed")?,
            related: reference_list(header, "related")?,
            body,
            column: column.to_string(),
            filename: filename.to_string(),
            progress,
        })
    }
}

/// Optional scalar field; empty strings count as absent.
pub(crate) fn opt_text(header: &Header, key: &str) -> Option<String> {
    header
        .get(key)
        .and_then(Value::as_text)
        .filter(|s| !s.trim().is_empty())
}

/// Optional date field; present-but-unparseable is an error, absent is fine.
pub(crate) fn opt_date(header: &Header, key: &str) -> Result<Option<NaiveDate>, String> {
    match header.get(key) {
        None => Ok(None),
        Some(v) => match v {
            Value::Str(s) if s.trim().is_empty() => Ok(None),
            _ => v
                .as_date()
                .map(Some)
                .ok_or_else(|| format!("invalid `{}` date", key)),
        },
    }
}

/// String-list field, tolerating a single bare scalar as a one-item list.
pub(crate) fn string_list(header: &Header, key: &str) -> Vec<String> {
    match header.get(key) {
        Some(Value::List(items)) => items.clone(),
        Some(Value::Str(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Reference-list field. A plain string list here means some item failed
/// reference detection, which is an error worth surfacing.
pub(crate) fn reference_list(header: &Header, key: &str) -> Result<Vec<Reference>, String> {
    match header.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Refs(refs)) => Ok(refs.clone()),
        Some(Value::List(items)) if items.is_empty() => Ok(Vec::new()),
        Some(_) => Err(format!(
            "invalid `{}`: expected a list of kind:id references",
            key
        )),
    }
}
