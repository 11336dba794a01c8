use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;

use crate::error::Error;

/// An exclusive advisory lock bound to a lock-file path.
///
/// The lock is process-scoped: callers inside one process must serialize
/// externally if they share a lock file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileLock {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Block until this process holds the lock. The returned guard releases
    /// it when dropped, on every exit path.
    pub fn acquire(&self) -> Result<FileLockGuard, Error> {
        debug!("acquiring lock on {:?}", self.path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        debug!("lock acquired on {:?}", self.path);
        Ok(FileLockGuard {
            file,
            path: self.path.clone(),
        })
    }
}

/// Holds the lock for as long as it lives.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            debug!("failed to unlock {:?}: {}", self.path, err);
        }
        debug!("lock released on {:?}", self.path);
    }
}
