//! File-backed journal.
//!
//! Layout of a store directory:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK          # Advisory lock for single-process access
//! └─ journal.log   # Framed journal records
//! ```

use super::Journal;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
/// Name of the journal file inside a store directory.
pub const JOURNAL_FILE: &str = "journal.log";

/// A journal stored in a locked directory.
///
/// Only one `FileJournal` may be open per directory; a second open fails
/// with [`StoreError::Locked`].
#[derive(Debug)]
pub struct FileJournal {
    dir: PathBuf,
    file: RwLock<File>,
    size: u64,
    _lock: File,
}

impl FileJournal {
    /// Opens or creates the journal in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock
    /// - I/O errors occur
    pub fn open(dir: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !dir.exists() {
            if create_if_missing {
                fs::create_dir_all(dir)?;
            } else {
                return Err(StoreError::Missing(dir.display().to_string()));
            }
        }

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|_| StoreError::Locked)?;

        let file = Self::open_log(&dir.join(JOURNAL_FILE))?;
        let size = file.metadata()?.len();
        debug!(path = %dir.display(), size, "journal opened");

        Ok(Self {
            dir: dir.to_path_buf(),
            file: RwLock::new(file),
            size,
            _lock: lock,
        })
    }

    fn open_log(path: &Path) -> StoreResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the journal file.
    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }
}

impl Journal for FileJournal {
    fn read_all(&self) -> StoreResult<Vec<u8>> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StoreResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut file = self.file.write();
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        self.size += data.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> StoreResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        let file = self.file.write();
        file.set_len(len)?;
        file.sync_all()?;
        self.size = len;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StoreResult<()> {
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        let path = self.journal_path();
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        *self.file.write() = Self::open_log(&path)?;
        self.size = data.len() as u64;
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut journal = FileJournal::open(dir.path(), true).unwrap();
            journal.append(b"persistent").unwrap();
            journal.sync().unwrap();
        }
        let journal = FileJournal::open(dir.path(), false).unwrap();
        assert_eq!(journal.read_all().unwrap(), b"persistent");
        assert_eq!(journal.size().unwrap(), 10);
    }

    #[test]
    fn second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let _first = FileJournal::open(dir.path(), true).unwrap();
        assert!(matches!(
            FileJournal::open(dir.path(), true),
            Err(StoreError::Locked)
        ));
    }

    #[test]
    fn missing_directory_without_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent");
        assert!(matches!(
            FileJournal::open(&path, false),
            Err(StoreError::Missing(_))
        ));
    }

    #[test]
    fn replace_swaps_content() {
        let dir = TempDir::new().unwrap();
        let mut journal = FileJournal::open(dir.path(), true).unwrap();
        journal.append(b"old old old").unwrap();
        journal.replace(b"new").unwrap();
        journal.append(b"!").unwrap();
        assert_eq!(journal.read_all().unwrap(), b"new!");
    }

    #[test]
    fn truncate_drops_tail() {
        let dir = TempDir::new().unwrap();
        let mut journal = FileJournal::open(dir.path(), true).unwrap();
        journal.append(b"keep-drop").unwrap();
        journal.truncate(4).unwrap();
        assert_eq!(journal.read_all().unwrap(), b"keep");
    }
}
