//! Task board store
//!
//! Tasks are markdown files under `tasks/{column}/{id:03}-{slug}.md`; the
//! column directory a file sits in is its entire state. Moving a task is one
//! atomic rename and never touches content, so external actors (editors,
//! version-control merges, a plain `mv`) can do the same thing the store does.
//!
//! Mutations are serialized by an in-process mutex plus the cross-process
//! allocation lock; reads take no lock and instead tolerate files vanishing
//! between a directory listing and the read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};

use crate::domain::{slugify, Header, Reference, Task, Value};

use super::config::BoardConfig;
use super::error::{Result, SkippedFile, StoreError};
use super::feed::Fingerprint;
use super::file::{markdown_names, read_parsed, write_atomic};
use super::ids::{leading_id, next_id, AllocationLock};

/// Fields for a new task. The body is generated from `description` with the
/// standard section skeleton.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    /// Target column; the configured default when `None`.
    pub column: Option<String>,
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub due: Option<NaiveDate>,
    pub branch: Option<String>,
    pub related: Vec<Reference>,
    pub description: String,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Header/body patch for an existing task. `None` fields are left untouched;
/// unknown header keys written by hand survive because the patch is applied
/// to the parsed header in place.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub assignee: Option<String>,
    pub tags: Option<Vec<String>>,
    pub due: Option<NaiveDate>,
    pub branch: Option<String>,
    pub completed: Option<NaiveDate>,
    pub related: Option<Vec<Reference>>,
    /// Replaces the whole body.
    pub body: Option<String>,
    /// Appends to the body (after `body` replacement, if both are set).
    pub append: Option<String>,
}

/// Listing result with partial-failure reporting: one corrupt file never
/// fails the whole board.
#[derive(Debug)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedFile>,
}

/// The column-directory task store.
#[derive(Debug)]
pub struct BoardStore {
    root: PathBuf,
    config: BoardConfig,
    write_lock: Mutex<()>,
}

impl BoardStore {
    /// Opens the board at the given `tasks/` directory, loading (or
    /// defaulting) its config and creating the column directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = BoardConfig::load(&root.join("config.yaml"))?;

        let store = Self {
            root,
            config,
            write_lock: Mutex::new(()),
        };

        for name in store.config.column_names() {
            let dir = store.root.join(name);
            fs::create_dir_all(&dir).map_err(|e| StoreError::io("create_dir", &dir, e))?;
        }

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    fn column_dir(&self, column: &str) -> Result<PathBuf> {
        if !self.config.has_column(column) {
            return Err(StoreError::InvalidColumn(column.to_string()));
        }
        Ok(self.root.join(column))
    }

    fn column_dirs(&self) -> Vec<PathBuf> {
        self.config
            .column_names()
            .map(|c| self.root.join(c))
            .collect()
    }

    /// Finds the filename carrying `id` in one column directory.
    fn find_in_column(&self, dir: &Path, id: u32) -> Result<Option<String>> {
        Ok(markdown_names(dir)?
            .into_iter()
            .find(|name| leading_id(name) == Some(id)))
    }

    /// Finds `id` anywhere on the board.
    fn find_any(&self, id: u32) -> Result<Option<(String, String)>> {
        for column in self.config.column_names() {
            if let Some(name) = self.find_in_column(&self.root.join(column), id)? {
                return Ok(Some((column.to_string(), name)));
            }
        }
        Ok(None)
    }

    /// Creates a task in the requested (or default) column, allocating the
    /// next id across all columns under the advisory allocation lock.
    pub fn create(&self, new: NewTask) -> Result<Task> {
        let column = match &new.column {
            Some(col) => self.column_dir(col).map(|_| col.clone())?,
            None => self.config.default_column().to_string(),
        };
        let column_dir = self.root.join(&column);
        fs::create_dir_all(&column_dir)
            .map_err(|e| StoreError::io("create_dir", &column_dir, e))?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let _alloc = AllocationLock::acquire(&self.root)?;

        let id = next_id(&self.column_dirs())?;
        if let Some((col, name)) = self.find_any(id)? {
            // Should be unreachable under the lock; an external writer racing
            // us is surfaced, never renumbered around.
            return Err(StoreError::Conflict {
                id,
                path: self.root.join(col).join(name),
            });
        }

        let filename = format!("{:03}-{}.md", id, slugify(&new.title));
        let path = column_dir.join(&filename);
        if path.exists() {
            return Err(StoreError::Conflict { id, path });
        }

        let today = Local::now().date_naive();
        let mut header = Header::new();
        header.set("id", Value::Int(id as i64));
        header.set("title", Value::Str(new.title.clone()));
        header.set(
            "assignee",
            Value::Str(new.assignee.clone().unwrap_or_default()),
        );
        header.set("tags", Value::List(new.tags.clone()));
        header.set("created", Value::Date(today));
        if let Some(due) = new.due {
            header.set("due", Value::Date(due));
        }
        if let Some(branch) = &new.branch {
            header.set("branch", Value::Str(branch.clone()));
        }
        if !new.related.is_empty() {
            header.set("related", Value::Refs(new.related.clone()));
        }

        let body = format!(
            "\n## Description\n{}\n\n## Acceptance Criteria\n\n\n## Notes\n",
            new.description
        );

        write_atomic(&path, &header.encode(&body))?;

        Task::from_parts(&header, body, &column, &filename)
            .map_err(|reason| StoreError::parse(&path, reason))
    }

    /// Reads one task from a known column.
    pub fn get(&self, id: u32, column: &str) -> Result<Task> {
        let dir = self.column_dir(column)?;
        let filename = self
            .find_in_column(&dir, id)?
            .ok_or_else(|| StoreError::not_found("task", id))?;
        self.read_task(&dir.join(&filename), column, &filename)
            .map_err(not_found_if_gone("task", id))
    }

    /// Searches every column for `id`.
    pub fn find(&self, id: u32) -> Result<Task> {
        let (column, filename) = self
            .find_any(id)?
            .ok_or_else(|| StoreError::not_found("task", id))?;
        self.read_task(&self.root.join(&column).join(&filename), &column, &filename)
            .map_err(not_found_if_gone("task", id))
    }

    /// Merges header fields and/or edits the body, re-encoding in place.
    /// Unknown keys and key order are preserved.
    pub fn update(&self, id: u32, column: &str, patch: TaskPatch) -> Result<Task> {
        let dir = self.column_dir(column)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let filename = self
            .find_in_column(&dir, id)?
            .ok_or_else(|| StoreError::not_found("task", id))?;
        let path = dir.join(&filename);

        let (mut header, mut body) =
            read_parsed(&path).map_err(not_found_if_gone("task", id))?;

        if let Some(title) = &patch.title {
            header.set("title", Value::Str(title.clone()));
        }
        if let Some(assignee) = &patch.assignee {
            header.set("assignee", Value::Str(assignee.clone()));
        }
        if let Some(tags) = &patch.tags {
            header.set("tags", Value::List(tags.clone()));
        }
        if let Some(due) = patch.due {
            header.set("due", Value::Date(due));
        }
        if let Some(branch) = &patch.branch {
            header.set("branch", Value::Str(branch.clone()));
        }
        if let Some(completed) = patch.completed {
            header.set("completed", Value::Date(completed));
        }
        if let Some(related) = &patch.related {
            header.set("related", Value::Refs(related.clone()));
        }

        if let Some(new_body) = &patch.body {
            body = new_body.clone();
        }
        if let Some(append) = &patch.append {
            if !body.is_empty() && !body.ends_with('\n') {
                body.push('\n');
            }
            body.push_str(append);
        }

        write_atomic(&path, &header.encode(&body))?;

        Task::from_parts(&header, body, column, &filename)
            .map_err(|reason| StoreError::parse(&path, reason))
    }

    /// Relocates a task between columns with a single atomic rename. Content
    /// is never rewritten; after a crash the file is in exactly one of the
    /// two columns.
    pub fn move_task(&self, id: u32, from: &str, to: &str) -> Result<()> {
        let from_dir = self.column_dir(from)?;
        let to_dir = self.column_dir(to)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let filename = self
            .find_in_column(&from_dir, id)?
            .ok_or_else(|| StoreError::not_found("task", id))?;

        fs::create_dir_all(&to_dir).map_err(|e| StoreError::io("create_dir", &to_dir, e))?;

        let src = from_dir.join(&filename);
        let dst = to_dir.join(&filename);
        match fs::rename(&src, &dst) {
            Ok(()) => Ok(()),
            // Vanished between locate and rename: an external move won
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found("task", id))
            }
            Err(e) => Err(StoreError::io("rename", &src, e)),
        }
    }

    /// Deletes the task file. The id is never reused afterwards.
    pub fn delete(&self, id: u32, column: &str) -> Result<()> {
        let dir = self.column_dir(column)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let filename = self
            .find_in_column(&dir, id)?
            .ok_or_else(|| StoreError::not_found("task", id))?;

        let path = dir.join(&filename);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found("task", id))
            }
            Err(e) => Err(StoreError::io("remove", &path, e)),
        }
    }

    /// Lists one column or the whole board in column order. Corrupt files
    /// are skipped and reported; files that vanish mid-listing are skipped
    /// silently.
    pub fn list(&self, column: Option<&str>) -> Result<TaskList> {
        let columns: Vec<String> = match column {
            Some(col) => {
                self.column_dir(col)?;
                vec![col.to_string()]
            }
            None => self.config.column_names().map(String::from).collect(),
        };

        let mut list = TaskList {
            tasks: Vec::new(),
            skipped: Vec::new(),
        };

        for col in &columns {
            let dir = self.root.join(col);
            for name in markdown_names(&dir)? {
                let path = dir.join(&name);
                match self.read_task(&path, col, &name) {
                    Ok(task) => list.tasks.push(task),
                    Err(e) if e.is_gone() => {}
                    Err(error) => list.skipped.push(SkippedFile { path, error }),
                }
            }
        }

        Ok(list)
    }

    pub fn task_count(&self) -> Result<usize> {
        let mut total = 0;
        for dir in self.column_dirs() {
            total += markdown_names(&dir)?.len();
        }
        Ok(total)
    }

    /// Fingerprint over every task file, keyed `{column}/{filename}`.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let mut fp = Fingerprint::new();
        for col in self.config.column_names() {
            let dir = self.root.join(col);
            for name in markdown_names(&dir)? {
                if let Ok(meta) = fs::metadata(dir.join(&name)) {
                    fp.record(format!("{}/{}", col, name), &meta);
                }
            }
        }
        Ok(fp)
    }

    fn read_task(&self, path: &Path, column: &str, filename: &str) -> Result<Task> {
        let (header, body) = read_parsed(path)?;
        Task::from_parts(&header, body, column, filename)
            .map_err(|reason| StoreError::parse(path, reason))
    }
}

/// Maps "file disappeared underneath us" io errors to NotFound so callers
/// see external deletion the same as a missing id.
fn not_found_if_gone(what: &'static str, id: u32) -> impl Fn(StoreError) -> StoreError {
    move |e| match e {
        StoreError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound => {
            StoreError::not_found(what, id)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn board(dir: &TempDir) -> BoardStore {
        BoardStore::open(dir.path().join("tasks")).unwrap()
    }

    #[test]
    fn open_creates_column_directories() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        for col in store.config().column_names() {
            assert!(dir.path().join("tasks").join(col).is_dir());
        }
    }

    #[test]
    fn create_starts_at_one_in_default_column() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);

        let task = store.create(NewTask::new("Fix bug")).unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.column, "backlog");
        assert_eq!(task.filename, "001-fix-bug.md");
        assert!(dir.path().join("tasks/backlog/001-fix-bug.md").exists());
        assert!(task.body.contains("## Description"));
    }

    #[test]
    fn create_into_unknown_column_fails() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let mut new = NewTask::new("X");
        new.column = Some("nope".to_string());
        assert!(matches!(
            store.create(new).unwrap_err(),
            StoreError::InvalidColumn(_)
        ));
    }

    #[test]
    fn ids_are_monotonic_across_deletes() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);

        let t1 = store.create(NewTask::new("one")).unwrap();
        let t2 = store.create(NewTask::new("two")).unwrap();
        store.delete(t2.id, "backlog").unwrap();
        let t3 = store.create(NewTask::new("three")).unwrap();

        assert_eq!((t1.id, t2.id, t3.id), (1, 2, 3));

        // delete the highest id too: the next one still moves forward only
        // while any higher-numbered file remains elsewhere
        store.move_task(t3.id, "backlog", "done").unwrap();
        store.delete(t1.id, "backlog").unwrap();
        let t4 = store.create(NewTask::new("four")).unwrap();
        assert_eq!(t4.id, 4);
    }

    #[test]
    fn move_relocates_without_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let task = store.create(NewTask::new("Fix bug")).unwrap();

        let before = fs::read_to_string(dir.path().join("tasks/backlog/001-fix-bug.md")).unwrap();
        store.move_task(task.id, "backlog", "in-progress").unwrap();

        assert!(store.list(Some("backlog")).unwrap().tasks.is_empty());
        let in_progress = store.list(Some("in-progress")).unwrap();
        assert_eq!(in_progress.tasks[0].id, 1);
        assert_eq!(in_progress.tasks[0].column, "in-progress");

        let after =
            fs::read_to_string(dir.path().join("tasks/in-progress/001-fix-bug.md")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn move_to_unknown_column_fails() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let task = store.create(NewTask::new("X")).unwrap();
        assert!(matches!(
            store.move_task(task.id, "backlog", "archive").unwrap_err(),
            StoreError::InvalidColumn(_)
        ));
        // still in backlog
        assert_eq!(store.list(Some("backlog")).unwrap().tasks.len(), 1);
    }

    #[test]
    fn move_missing_task_fails_not_found() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        assert!(matches!(
            store.move_task(42, "backlog", "done").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn update_merges_fields_and_appends() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let task = store.create(NewTask::new("X")).unwrap();

        let patch = TaskPatch {
            assignee: Some("mika".to_string()),
            tags: Some(vec!["urgent".to_string()]),
            append: Some("progress note\n".to_string()),
            ..TaskPatch::default()
        };
        let updated = store.update(task.id, "backlog", patch).unwrap();

        assert_eq!(updated.assignee.as_deref(), Some("mika"));
        assert_eq!(updated.tags, vec!["urgent"]);
        assert!(updated.body.ends_with("progress note\n"));
        assert_eq!(updated.title, "X");
    }

    #[test]
    fn update_preserves_unknown_keys_and_order() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let path = dir.path().join("tasks/todo/004-manual.md");
        fs::write(
            &path,
            "---\nid: 4\ntitle: Manual\nx-custom: keep me\ncreated: 2026-01-01\n---\nbody\n",
        )
        .unwrap();

        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            ..TaskPatch::default()
        };
        store.update(4, "todo", patch).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let title_pos = text.find("title: Renamed").unwrap();
        let custom_pos = text.find("x-custom: keep me").unwrap();
        let created_pos = text.find("created:").unwrap();
        assert!(title_pos < custom_pos && custom_pos < created_pos);
    }

    #[test]
    fn get_and_find_locate_tasks() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let task = store.create(NewTask::new("X")).unwrap();
        store.move_task(task.id, "backlog", "review").unwrap();

        assert_eq!(store.get(task.id, "review").unwrap().id, task.id);
        assert_eq!(store.find(task.id).unwrap().column, "review");
        assert!(matches!(
            store.get(task.id, "backlog").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let task = store.create(NewTask::new("X")).unwrap();
        store.delete(task.id, "backlog").unwrap();
        assert!(matches!(
            store.delete(task.id, "backlog").unwrap_err(),
            StoreError::NotFound { .. }
        ));
        assert_eq!(store.task_count().unwrap(), 0);
    }

    #[test]
    fn list_skips_and_reports_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        store.create(NewTask::new("good")).unwrap();
        fs::write(
            dir.path().join("tasks/backlog/999-bad.md"),
            "no header at all\n",
        )
        .unwrap();

        let list = store.list(None).unwrap();
        assert_eq!(list.tasks.len(), 1);
        assert_eq!(list.skipped.len(), 1);
        assert!(matches!(list.skipped[0].error, StoreError::Parse { .. }));
    }

    #[test]
    fn list_unknown_column_fails() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        assert!(matches!(
            store.list(Some("nope")).unwrap_err(),
            StoreError::InvalidColumn(_)
        ));
    }

    #[test]
    fn external_files_participate_in_allocation() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        // hand-created task, as an editor or merge might produce
        fs::write(
            dir.path().join("tasks/done/041-imported.md"),
            "---\nid: 41\ntitle: Imported\ncreated: 2025-12-01\n---\n",
        )
        .unwrap();

        let task = store.create(NewTask::new("next")).unwrap();
        assert_eq!(task.id, 42);
    }

    #[test]
    fn fingerprint_changes_on_move() {
        let dir = TempDir::new().unwrap();
        let store = board(&dir);
        let task = store.create(NewTask::new("X")).unwrap();

        let before = store.fingerprint().unwrap();
        store.move_task(task.id, "backlog", "done").unwrap();
        let after = store.fingerprint().unwrap();

        let delta = before.compare(&after);
        assert_eq!(delta.removed, vec!["backlog/001-x.md"]);
        assert_eq!(delta.added, vec!["done/001-x.md"]);
    }
}
