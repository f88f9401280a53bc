//! Identifier allocation across a directory federation
//!
//! Ids are not stored anywhere; the next id is `max + 1` over every leading
//! numeric segment found in the federation's directories (task files across
//! all columns, or resource directories under one kind). Deleting an entry
//! therefore never frees its id — back-references keep pointing at a number
//! that will not be reissued.
//!
//! Allocation from independent processes is racy by nature, so the scan and
//! the create that follows happen under an advisory file lock
//! (`.allocator.lock` at the federation root). A collision that still slips
//! through (an external editor writing a file mid-allocation) is surfaced as
//! `Conflict` by the caller, never silently renumbered.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

use super::error::{Result, StoreError};

/// Extracts the leading numeric segment of a `{id}-{slug}` file or directory
/// name. `017-fix-login.md` and `017-fix-login` both yield 17.
pub fn leading_id(name: &str) -> Option<u32> {
    let digits: &str = name.split('-').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Scans every directory in the federation and returns `max(id) + 1`.
///
/// Directories that are missing are treated as empty — columns can be created
/// lazily, and external actors may remove them at any time.
pub fn next_id<P: AsRef<Path>>(federation: &[P]) -> Result<u32> {
    let mut max_id = 0;

    for dir in federation {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StoreError::io("read_dir", dir, e)),
        };

        for entry in entries.flatten() {
            if let Some(id) = entry.file_name().to_str().and_then(leading_id) {
                max_id = max_id.max(id);
            }
        }
    }

    Ok(max_id + 1)
}

/// Advisory cross-process lock held over allocate-then-create.
///
/// Backed by `flock` on a sidecar file; released when dropped. In-process
/// serialization is handled separately by each store's write mutex.
pub struct AllocationLock {
    _file: File,
}

impl AllocationLock {
    pub fn acquire(federation_root: &Path) -> Result<Self> {
        fs::create_dir_all(federation_root)
            .map_err(|e| StoreError::io("create_dir", federation_root, e))?;

        let lock_path = federation_root.join(".allocator.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::io("open", &lock_path, e))?;

        file.lock_exclusive()
            .map_err(|e| StoreError::io("lock", &lock_path, e))?;

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn leading_id_parses_files_and_dirs() {
        assert_eq!(leading_id("001-fix-login.md"), Some(1));
        assert_eq!(leading_id("017-fix-login"), Some(17));
        assert_eq!(leading_id("1000-big.md"), Some(1000));
        assert_eq!(leading_id("notes.md"), None);
        assert_eq!(leading_id("-dash-first"), None);
        assert_eq!(leading_id("12x-almost.md"), None);
    }

    #[test]
    fn empty_federation_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let cols = [dir.path().join("backlog"), dir.path().join("done")];
        assert_eq!(next_id(&cols).unwrap(), 1);
    }

    #[test]
    fn scans_across_all_directories() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("backlog");
        let b = dir.path().join("done");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("002-x.md"), "").unwrap();
        fs::write(b.join("009-y.md"), "").unwrap();
        fs::write(b.join("junk.txt"), "").unwrap();

        assert_eq!(next_id(&[a, b]).unwrap(), 10);
    }

    #[test]
    fn deleted_entries_do_not_free_ids() {
        let dir = TempDir::new().unwrap();
        let col = dir.path().join("backlog");
        fs::create_dir_all(&col).unwrap();
        fs::write(col.join("005-keep.md"), "").unwrap();
        fs::write(col.join("003-gone.md"), "").unwrap();
        fs::remove_file(col.join("003-gone.md")).unwrap();

        // max survives as long as any higher id remains
        assert_eq!(next_id(&[&col]).unwrap(), 6);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(next_id(&[dir.path().join("nope")]).unwrap(), 1);
    }

    #[test]
    fn lock_can_be_acquired_and_reacquired() {
        let dir = TempDir::new().unwrap();
        {
            let _lock = AllocationLock::acquire(dir.path()).unwrap();
        }
        let _again = AllocationLock::acquire(dir.path()).unwrap();
        assert!(dir.path().join(".allocator.lock").exists());
    }
}
