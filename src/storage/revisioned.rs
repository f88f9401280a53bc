//! Revisioned resource store (prompts and documents)
//!
//! Each resource is a directory `{id:03}-{slug}/` holding a mutable
//! `current.md` and an append-only `revisions/` run of numbered snapshots.
//! Snapshot N captures the content that was current immediately before the
//! Nth edit, with creation counting as the first edit, so the `revision`
//! counter in `current.md` always equals the number of snapshots on disk.
//!
//! Every update snapshots first and only then replaces `current.md`, so a
//! crash between the two steps leaves at worst a duplicate snapshot, never a
//! lost body.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::domain::{
    diff, slugify, DiffLine, Reference, Resource, ResourceKind, ResourceMeta, Revision,
    RevisionInfo, Value,
};

use super::error::{Result, SkippedFile, StoreError};
use super::feed::Fingerprint;
use super::file::{read_parsed, write_atomic};
use super::ids::{leading_id, next_id, AllocationLock};

/// Fields for a new resource.
#[derive(Debug, Clone, Default)]
pub struct NewResource {
    pub title: String,
    pub tags: Vec<String>,
    pub related: Vec<Reference>,
    pub body: String,
}

impl NewResource {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Patch for an existing resource. Applying any patch counts as an edit:
/// the previous content is snapshotted and the revision counter advances.
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related: Option<Vec<Reference>>,
    pub body: Option<String>,
}

/// Listing result with partial-failure reporting.
#[derive(Debug)]
pub struct ResourceList {
    pub resources: Vec<Resource>,
    pub skipped: Vec<SkippedFile>,
}

/// Snapshot listing with the same partial-failure reporting: one corrupt
/// snapshot never hides the rest of the history.
#[derive(Debug)]
pub struct RevisionList {
    pub revisions: Vec<RevisionInfo>,
    pub skipped: Vec<SkippedFile>,
}

/// Store for one resource kind's directory tree.
#[derive(Debug)]
pub struct RevisionedStore {
    root: PathBuf,
    kind: ResourceKind,
    write_lock: Mutex<()>,
}

impl RevisionedStore {
    /// Opens (and creates if needed) the kind's directory under `data_root`.
    pub fn open(data_root: &Path, kind: ResourceKind) -> Result<Self> {
        let root = data_root.join(kind.dir_name());
        fs::create_dir_all(&root).map_err(|e| StoreError::io("create_dir", &root, e))?;
        Ok(Self {
            root,
            kind,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Sorted resource directory names.
    fn dir_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("read_dir", &self.root, e)),
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| leading_id(name).is_some())
            .collect();
        names.sort();
        Ok(names)
    }

    fn locate(&self, id: u32) -> Result<String> {
        self.dir_names()?
            .into_iter()
            .find(|name| leading_id(name) == Some(id))
            .ok_or_else(|| StoreError::not_found(self.kind.as_str(), id))
    }

    fn snapshot_path(&self, dir_name: &str, revision: u32) -> PathBuf {
        self.root
            .join(dir_name)
            .join("revisions")
            .join(format!("{:03}.md", revision))
    }

    /// Creates the resource at revision 1, with snapshot 001 identical to
    /// the initial content.
    pub fn create(&self, new: NewResource) -> Result<Resource> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let _alloc = AllocationLock::acquire(&self.root)?;

        let id = next_id(&[&self.root])?;
        if let Some(name) = self
            .dir_names()?
            .into_iter()
            .find(|name| leading_id(name) == Some(id))
        {
            return Err(StoreError::Conflict {
                id,
                path: self.root.join(name),
            });
        }

        let dir_name = format!("{:03}-{}", id, slugify(&new.title));
        let dir = self.root.join(&dir_name);
        if dir.exists() {
            return Err(StoreError::Conflict { id, path: dir });
        }

        let revisions_dir = dir.join("revisions");
        fs::create_dir_all(&revisions_dir)
            .map_err(|e| StoreError::io("create_dir", &revisions_dir, e))?;

        let today = Local::now().date_naive();
        let meta = ResourceMeta {
            id,
            title: new.title,
            created: today,
            updated: today,
            revision: 1,
            tags: new.tags,
            related: new.related,
        };

        write_atomic(&dir.join("current.md"), &meta.to_header().encode(&new.body))?;

        let snapshot = Revision {
            revision: 1,
            created: today,
            body: new.body.clone(),
        };
        write_atomic(
            &self.snapshot_path(&dir_name, 1),
            &snapshot.to_header().encode(&snapshot.body),
        )?;

        Ok(Resource {
            dir_name,
            meta,
            body: new.body,
        })
    }

    /// Reads a resource's current content.
    pub fn get(&self, id: u32) -> Result<Resource> {
        let dir_name = self.locate(id)?;
        self.read_resource(&dir_name)
            .map_err(|e| self.gone_to_not_found(e, id))
    }

    /// Lists all resources, most recently updated first. Corrupt entries are
    /// skipped and reported.
    pub fn list(&self) -> Result<ResourceList> {
        let mut list = ResourceList {
            resources: Vec::new(),
            skipped: Vec::new(),
        };

        for dir_name in self.dir_names()? {
            match self.read_resource(&dir_name) {
                Ok(resource) => list.resources.push(resource),
                Err(e) if e.is_gone() => {}
                Err(error) => list.skipped.push(SkippedFile {
                    path: self.root.join(&dir_name).join("current.md"),
                    error,
                }),
            }
        }

        list.resources
            .sort_by(|a, b| b.meta.updated.cmp(&a.meta.updated).then(a.meta.id.cmp(&b.meta.id)));
        Ok(list)
    }

    /// Applies a patch as one edit: snapshots the outgoing content under the
    /// next revision number, then replaces `current.md` atomically. Unknown
    /// header keys survive because the patch edits the parsed header in
    /// place.
    pub fn update(&self, id: u32, patch: ResourcePatch) -> Result<Resource> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let dir_name = self.locate(id)?;
        let path = self.root.join(&dir_name).join("current.md");
        let (mut header, old_body) =
            read_parsed(&path).map_err(|e| self.gone_to_not_found(e, id))?;
        let old_meta =
            ResourceMeta::from_header(&header).map_err(|reason| StoreError::parse(&path, reason))?;

        let snapshot = Revision {
            revision: old_meta.revision + 1,
            created: old_meta.updated,
            body: old_body.clone(),
        };
        let snapshot_path = self.snapshot_path(&dir_name, snapshot.revision);
        if let Some(parent) = snapshot_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create_dir", parent, e))?;
        }
        write_atomic(&snapshot_path, &snapshot.to_header().encode(&snapshot.body))?;

        if let Some(title) = &patch.title {
            header.set("title", Value::Str(title.clone()));
        }
        if let Some(tags) = &patch.tags {
            header.set("tags", Value::List(tags.clone()));
        }
        if let Some(related) = &patch.related {
            header.set("related", Value::Refs(related.clone()));
        }
        header.set("updated", Value::Date(Local::now().date_naive()));
        header.set("revision", Value::Int((old_meta.revision + 1) as i64));

        let body = patch.body.unwrap_or(old_body);
        write_atomic(&path, &header.encode(&body))?;

        let meta =
            ResourceMeta::from_header(&header).map_err(|reason| StoreError::parse(&path, reason))?;
        Ok(Resource { dir_name, meta, body })
    }

    /// Lists the snapshot metadata in revision order. Corrupt snapshots are
    /// skipped and reported; snapshots that vanish mid-listing are skipped
    /// silently.
    pub fn list_revisions(&self, id: u32) -> Result<RevisionList> {
        let dir_name = self.locate(id)?;
        let dir = self.root.join(&dir_name).join("revisions");

        let mut list = RevisionList {
            revisions: Vec::new(),
            skipped: Vec::new(),
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(list),
            Err(e) => return Err(StoreError::io("read_dir", &dir, e)),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !super::file::is_markdown(&path) {
                continue;
            }
            let parsed = read_parsed(&path).and_then(|(header, body)| {
                Revision::from_parts(&header, body)
                    .map_err(|reason| StoreError::parse(&path, reason))
            });
            match parsed {
                Ok(rev) => list.revisions.push(RevisionInfo {
                    revision: rev.revision,
                    created: rev.created,
                }),
                Err(e) if e.is_gone() => {}
                Err(error) => list.skipped.push(SkippedFile { path, error }),
            }
        }

        list.revisions.sort_by_key(|info| info.revision);
        Ok(list)
    }

    /// Reads one snapshot.
    pub fn get_revision(&self, id: u32, revision: u32) -> Result<Revision> {
        let dir_name = self.locate(id)?;
        let path = self.snapshot_path(&dir_name, revision);
        let (header, body) = read_parsed(&path).map_err(|e| {
            if e.is_gone() {
                StoreError::not_found("revision", revision)
            } else {
                e
            }
        })?;
        Revision::from_parts(&header, body).map_err(|reason| StoreError::parse(&path, reason))
    }

    /// Line diff from one snapshot to another, or to the current content
    /// when `to` is `None`.
    pub fn diff_revisions(&self, id: u32, from: u32, to: Option<u32>) -> Result<Vec<DiffLine>> {
        let old = self.get_revision(id, from)?.body;
        let new = match to {
            Some(revision) => self.get_revision(id, revision)?.body,
            None => self.get(id)?.body,
        };
        Ok(diff(&old, &new))
    }

    /// Removes the resource directory and its whole history. The id is never
    /// reissued afterwards.
    pub fn delete(&self, id: u32) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir_name = self.locate(id)?;
        let dir = self.root.join(&dir_name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(self.kind.as_str(), id))
            }
            Err(e) => Err(StoreError::io("remove", &dir, e)),
        }
    }

    /// Fingerprint over every `current.md`, keyed `{dir_name}/current.md`.
    /// Snapshots are immutable and excluded; any edit also touches
    /// `current.md`.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let mut fp = Fingerprint::new();
        for dir_name in self.dir_names()? {
            let path = self.root.join(&dir_name).join("current.md");
            if let Ok(meta) = fs::metadata(&path) {
                fp.record(format!("{}/current.md", dir_name), &meta);
            }
        }
        Ok(fp)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.dir_names()?.len())
    }

    fn read_resource(&self, dir_name: &str) -> Result<Resource> {
        let path = self.root.join(dir_name).join("current.md");
        let (header, body) = read_parsed(&path)?;
        let meta =
            ResourceMeta::from_header(&header).map_err(|reason| StoreError::parse(&path, reason))?;
        Ok(Resource {
            dir_name: dir_name.to_string(),
            meta,
            body,
        })
    }

    fn gone_to_not_found(&self, e: StoreError, id: u32) -> StoreError {
        if e.is_gone() {
            StoreError::not_found(self.kind.as_str(), id)
        } else {
            e
        }
    }
}
