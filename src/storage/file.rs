//! Shared file helpers for the stores
//!
//! All writes are all-or-nothing: content goes to a sibling temp file first
//! and lands via a single atomic rename, so a concurrent reader sees either
//! the old file or the new one, never a torn write.

use std::fs;
use std::io;
use std::path::Path;

use crate::domain::Header;

use super::error::{Result, StoreError};

/// Reads and parses a header+body file.
///
/// A file that vanished between listing and read surfaces as `NotFound` via
/// the io error kind, which callers treat as "gone", not corruption.
pub(crate) fn read_parsed(path: &Path) -> Result<(Header, String)> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io("read", path, e))?;
    Header::parse(&text).map_err(|e| StoreError::parse(path, e.to_string()))
}

/// Writes via temp file + atomic rename. The `.tmp` sibling is invisible to
/// the `.md` directory listings.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content).map_err(|e| StoreError::io("write", &temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| StoreError::io("rename", path, e))?;

    Ok(())
}

/// True for `*.md` entries.
pub(crate) fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "md")
}

/// Sorted names of the `.md` files in a directory; a missing directory is an
/// empty listing.
pub(crate) fn markdown_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io("read_dir", dir, e)),
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| is_markdown(&e.path()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}
