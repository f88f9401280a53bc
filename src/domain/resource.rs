//! Revisioned resource model (prompts and documents)
//!
//! A revisioned resource is a directory holding a mutable `current.md` plus an
//! append-only run of numbered snapshots under `revisions/`. The header keeps
//! a `revision` counter; the snapshot semantics themselves live in the
//! storage layer.

use chrono::NaiveDate;
use serde::Serialize;

use super::header::{Header, Value};
use super::reference::Reference;
use super::task::{opt_date, reference_list, string_list};

/// Header fields of a revisioned resource's `current.md`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceMeta {
    pub id: u32,
    pub title: String,
    pub created: NaiveDate,
    pub updated: NaiveDate,
    pub revision: u32,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Reference>,
}

impl ResourceMeta {
    pub fn from_header(header: &Header) -> Result<Self, String> {
        let id = header
            .get("id")
            .and_then(Value::as_int)
            .ok_or("missing or non-integer `id`")?;
        let id = u32::try_from(id).map_err(|_| "`id` must be a positive integer".to_string())?;

        let title = header
            .get("title")
            .and_then(Value::as_text)
            .ok_or("missing `title`")?;

        let created = header
            .get("created")
            .and_then(Value::as_date)
            .ok_or("missing or invalid `created` date")?;

        let updated = opt_date(header, "updated")?.unwrap_or(created);

        let revision = header
            .get("revision")
            .and_then(Value::as_int)
            .unwrap_or(1)
            .max(1) as u32;

        Ok(ResourceMeta {
            id,
            title,
            created,
            updated,
            revision,
            tags: string_list(header, "tags"),
            related: reference_list(header, "related")?,
        })
    }

    /// Builds a fresh header in the canonical key order.
    pub fn to_header(&self) -> Header {
        let mut header = Header::new();
        header.set("id", Value::Int(self.id as i64));
        header.set("title", Value::Str(self.title.clone()));
        header.set("created", Value::Date(self.created));
        header.set("updated", Value::Date(self.updated));
        header.set("revision", Value::Int(self.revision as i64));
        header.set("tags", Value::List(self.tags.clone()));
        if !self.related.is_empty() {
            header.set("related", Value::Refs(self.related.clone()));
        }
        header
    }
}

/// A resource's current content plus where it lives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub dir_name: String,
    pub meta: ResourceMeta,
    pub body: String,
}

/// One immutable snapshot in a resource's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    pub revision: u32,
    /// Date the snapshotted content became current.
    pub created: NaiveDate,
    pub body: String,
}

impl Revision {
    pub fn from_parts(header: &Header, body: String) -> Result<Self, String> {
        let revision = header
            .get("revision")
            .and_then(Value::as_int)
            .ok_or("missing `revision`")?;
        let revision =
            u32::try_from(revision).map_err(|_| "`revision` must be positive".to_string())?;

        let created = header
            .get("created")
            .and_then(Value::as_date)
            .ok_or("missing or invalid `created` date")?;

        Ok(Revision { revision, created, body })
    }

    pub fn to_header(&self) -> Header {
        let mut header = Header::new();
        header.set("revision", Value::Int(self.revision as i64));
        header.set("created", Value::Date(self.created));
        header
    }
}

/// Snapshot listing entry: metadata without the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionInfo {
    pub revision: u32,
    pub created: NaiveDate,
}
