//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_SUFFIX: &str = ".lock";
const TEMP_SUFFIX: &str = ".tmp";

/// A file-based storage backend.
///
/// The whole document lives in one file. An exclusive lock on the sidecar
/// `<path>.lock` file is held for as long as the backend is alive, so two
/// stores can never write the same file at once.
///
/// # Durability
///
/// - `write_all()` writes `<path>.tmp`, syncs it, renames it over the data
///   file and syncs the directory, so the previous contents survive any
///   failure before the rename
/// - `sync()` calls `File::sync_all()` on the data file
///
/// # Example
///
/// ```no_run
/// use jsonstore_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("store.json")).unwrap();
/// backend.write_all(b"{}").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock_file: File,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// Existing contents are preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is locked.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let backend = Self::locked(path)?;
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(backend)
    }

    /// Creates a file backend, discarding any existing contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or is locked.
    pub fn create(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let backend = Self::locked(path)?;
        File::create(path)?;
        Ok(backend)
    }

    /// Opens a file backend that must already exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    pub fn open_existing(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn locked(path: &Path) -> StorageResult<Self> {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(sibling(path, LOCK_SUFFIX))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock_file,
        })
    }

    fn write_temp(temp_path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Syncs the parent directory so the rename itself is durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp_path = sibling(&self.path, TEMP_SUFFIX);
        if let Err(err) = Self::write_temp(&temp_path, data) {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }

        fs::rename(&temp_path, &self.path)?;
        self.sync_directory()
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn sync(&mut self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}

/// Returns `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
