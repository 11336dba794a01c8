use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::Error;
use crate::filesystems::{FileSystem, WriteHandle};
use crate::url::Url;
use crate::util::{self, Decompress};

/// Local-filesystem backend, bound to the empty scheme, `file`, and `osfs`.
pub struct OsFileSystem {
    url: Url,
    path: PathBuf,
}

impl OsFileSystem {
    pub fn new(url: Url) -> Self {
        let path = util::extract_path(url.raw());
        OsFileSystem { url, path }
    }

    fn require_exists(&self) -> Result<(), Error> {
        if self.path.exists() {
            Ok(())
        } else {
            Err(Error::NotFound(self.url.raw().to_string()))
        }
    }
}

fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let entry_target = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &entry_target)?;
        } else {
            fs::copy(entry.path(), &entry_target)?;
        }
    }
    Ok(())
}

fn copy_file_or_directory(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        copy_dir_recursive(source, target)
    } else {
        let target = if target.is_dir() {
            match source.file_name() {
                Some(name) => target.join(name),
                None => target.to_path_buf(),
            }
        } else {
            target.to_path_buf()
        };
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::copy(source, &target)?;
        Ok(())
    }
}

impl FileSystem for OsFileSystem {
    fn url(&self) -> &Url {
        &self.url
    }

    fn exists(&self) -> Result<bool, Error> {
        Ok(self.path.exists())
    }

    fn download(&self, path: &Path) -> Result<(), Error> {
        self.require_exists()?;
        copy_file_or_directory(&self.path, path)?;
        Ok(())
    }

    fn upload(&self, path: &Path) -> Result<(), Error> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let mut target = self.path.clone();
        if self.url.raw().ends_with('/') {
            if let Some(name) = path.file_name() {
                target = target.join(name);
            }
        }
        copy_file_or_directory(path, &target)?;
        Ok(())
    }

    fn delete(&self) -> Result<(), Error> {
        self.require_exists()?;
        util::remove_file_or_directory(&self.path)?;
        Ok(())
    }

    /// Modification time in nanoseconds since the epoch.
    fn get_version(&self) -> Result<Option<String>, Error> {
        let metadata = fs::metadata(&self.path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::NotFound(self.url.raw().to_string())
            } else {
                Error::Io(err)
            }
        })?;
        let modified = metadata.modified()?;
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        Ok(Some(nanos.to_string()))
    }

    fn open_file(&self, decompress: Decompress) -> Result<Box<dyn Read + Send>, Error> {
        util::open_with_decompress(&self.path, decompress)
    }

    fn create_file(&self) -> Result<WriteHandle, Error> {
        Ok(WriteHandle::local(util::create_with_compress(&self.path)?))
    }
}
