//! Comment store
//!
//! Threads live under `tasks/comments/{task_id}/`, one file per comment named
//! `{timestamp}-{author-slug}.md`. The timestamp prefix makes lexicographic
//! filename order chronological order, so listing needs no header parsing to
//! sort. Threads are not tied to a live task: comments on a deleted task
//! remain until the thread itself is removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::domain::Comment;

use super::error::{Result, SkippedFile, StoreError};
use super::feed::Fingerprint;
use super::file::{markdown_names, read_parsed, write_atomic};

/// Fields for a new comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    /// Recorded as `anonymous` when empty.
    pub author: Option<String>,
    pub body: String,
}

/// One thread's comments in chronological order, plus any skipped files.
#[derive(Debug)]
pub struct CommentList {
    pub comments: Vec<Comment>,
    pub skipped: Vec<SkippedFile>,
}

/// Store for all comment threads on a board.
#[derive(Debug)]
pub struct CommentStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl CommentStore {
    /// Opens the comment tree under the board's `tasks/` directory.
    pub fn open(tasks_root: &Path) -> Result<Self> {
        let root = tasks_root.join("comments");
        fs::create_dir_all(&root).map_err(|e| StoreError::io("create_dir", &root, e))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn thread_dir(&self, task_id: u32) -> PathBuf {
        self.root.join(task_id.to_string())
    }

    /// Lists a task's thread, oldest first. A task with no thread directory
    /// has an empty thread.
    pub fn list(&self, task_id: u32) -> Result<CommentList> {
        let dir = self.thread_dir(task_id);
        let mut list = CommentList {
            comments: Vec::new(),
            skipped: Vec::new(),
        };

        for name in markdown_names(&dir)? {
            let path = dir.join(&name);
            match read_parsed(&path) {
                Ok((header, body)) => match Comment::from_parts(&header, body, &name) {
                    Ok(comment) => list.comments.push(comment),
                    Err(reason) => list.skipped.push(SkippedFile {
                        error: StoreError::parse(&path, reason),
                        path,
                    }),
                },
                Err(e) if e.is_gone() => {}
                Err(error) => list.skipped.push(SkippedFile { path, error }),
            }
        }

        Ok(list)
    }

    /// Appends a comment to a task's thread, timestamped now.
    pub fn add(&self, task_id: u32, new: NewComment) -> Result<Comment> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let dir = self.thread_dir(task_id);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create_dir", &dir, e))?;

        let author = new
            .author
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "anonymous".to_string());
        let now = Local::now().naive_local();

        let comment = Comment {
            filename: Comment::filename_for(now, &author),
            author,
            created: now,
            body: new.body,
        };

        write_atomic(
            &dir.join(&comment.filename),
            &comment.to_header().encode(&comment.body),
        )?;

        Ok(comment)
    }

    /// Deletes one comment by filename.
    pub fn delete(&self, task_id: u32, filename: &str) -> Result<()> {
        // reject anything that could escape the thread directory
        if filename.contains('/') || filename.contains('\\') || !filename.ends_with(".md") {
            return Err(StoreError::not_found("comment", filename));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.thread_dir(task_id).join(filename);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found("comment", filename))
            }
            Err(e) => Err(StoreError::io("remove", &path, e)),
        }
    }

    /// Removes a whole thread, e.g. after its task is deleted.
    pub fn delete_thread(&self, task_id: u32) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.thread_dir(task_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("remove", &dir, e)),
        }
    }

    /// Fingerprint over every comment file, keyed
    /// `comments/{task_id}/{filename}`.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let mut fp = Fingerprint::new();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(fp),
            Err(e) => return Err(StoreError::io("read_dir", &self.root, e)),
        };

        for entry in entries.flatten() {
            let thread = entry.path();
            if !thread.is_dir() {
                continue;
            }
            let Ok(task_id) = entry.file_name().into_string() else {
                continue;
            };
            for name in markdown_names(&thread)? {
                if let Ok(meta) = fs::metadata(thread.join(&name)) {
                    fp.record(format!("comments/{}/{}", task_id, name), &meta);
                }
            }
        }

        Ok(fp)
    }
}
