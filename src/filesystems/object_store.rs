use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use opendal::{ErrorKind, Metadata, Operator};
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};

use crate::error::Error;
use crate::url::Url;
use crate::util;

/// Shared core for opendal-backed object storage backends (S3, GCS).
///
/// The coordinator is blocking, so each store drives the async `Operator`
/// through its own single-thread runtime, the way `reqwest::blocking`
/// bridges internally.
pub(crate) struct ObjectStore {
    url: Url,
    key: String,
    operator: Operator,
    runtime: Runtime,
}

impl ObjectStore {
    pub(crate) fn new(url: Url, operator: Operator) -> Result<Self, Error> {
        let key = url.path().trim_start_matches('/').to_string();
        let runtime = RuntimeBuilder::new_current_thread().enable_all().build()?;
        Ok(ObjectStore {
            url,
            key,
            operator,
            runtime,
        })
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    fn not_found(&self) -> Error {
        Error::NotFound(self.url.raw().to_string())
    }

    fn dir_prefix(&self) -> String {
        if self.key.ends_with('/') {
            self.key.clone()
        } else {
            format!("{}/", self.key)
        }
    }

    /// Metadata of the exact object at the key, or `None` if there is none.
    fn stat_object(&self) -> Result<Option<Metadata>, Error> {
        let result = self
            .runtime
            .block_on(async { self.operator.stat(&self.key).await });
        match result {
            Ok(metadata) => Ok(Some(metadata)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// All object keys under the key treated as a prefix.
    fn list_keys(&self) -> Result<Vec<String>, Error> {
        let prefix = self.dir_prefix();
        let result = self.runtime.block_on(async {
            self.operator.list_with(&prefix).recursive(true).await
        });
        match result {
            Ok(entries) => Ok(entries
                .into_iter()
                .map(|entry| entry.path().to_string())
                .filter(|path| !path.ends_with('/'))
                .collect()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn read_object_to(&self, key: &str, target: &Path) -> Result<(), Error> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let buffer = self
            .runtime
            .block_on(async { self.operator.read(key).await })?;
        fs::write(target, buffer.to_bytes())?;
        Ok(())
    }

    fn write_object_from(&self, key: &str, source: &Path) -> Result<(), Error> {
        let content = fs::read(source)?;
        debug!("uploading {} bytes to {}", content.len(), key);
        self.runtime
            .block_on(async { self.operator.write(key, content).await })?;
        Ok(())
    }

    fn version_token(metadata: &Metadata) -> Option<String> {
        metadata
            .etag()
            .map(String::from)
            .or_else(|| metadata.last_modified().map(|time| time.to_string()))
    }

    pub(crate) fn exists(&self) -> Result<bool, Error> {
        if self.stat_object()?.is_some() {
            return Ok(true);
        }
        Ok(!self.list_keys()?.is_empty())
    }

    pub(crate) fn download(&self, path: &Path) -> Result<(), Error> {
        if self.stat_object()?.is_some() {
            // A single object; an existing directory target receives it by
            // basename.
            let target: PathBuf = if path.is_dir() {
                match util::url_basename(&self.url) {
                    Some(name) => path.join(name),
                    None => return Err(Error::InvalidUrl(self.url.raw().to_string())),
                }
            } else {
                path.to_path_buf()
            };
            info!("downloading {} to {:?}", self.url, target);
            return self.read_object_to(&self.key, &target);
        }

        let keys = self.list_keys()?;
        if keys.is_empty() {
            return Err(self.not_found());
        }
        let prefix = self.dir_prefix();
        info!("downloading {} objects from {}", keys.len(), self.url);
        for key in keys {
            let relative = key.strip_prefix(&prefix).unwrap_or(&key);
            self.read_object_to(&key, &path.join(relative))?;
        }
        Ok(())
    }

    pub(crate) fn upload(&self, path: &Path) -> Result<(), Error> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let mut key = self.key.clone();
        if self.url.path().ends_with('/') {
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                key = format!("{}{}", self.dir_prefix(), name);
            }
        }
        if path.is_dir() {
            for file in collect_files(path)? {
                let relative = file
                    .strip_prefix(path)
                    .map_err(|_| Error::InvalidUrl(self.url.raw().to_string()))?;
                let object_key = format!(
                    "{}/{}",
                    key.trim_end_matches('/'),
                    relative.to_string_lossy()
                );
                self.write_object_from(&object_key, &file)?;
            }
            Ok(())
        } else {
            self.write_object_from(&key, path)
        }
    }

    pub(crate) fn delete(&self) -> Result<(), Error> {
        if self.stat_object()?.is_some() {
            self.runtime
                .block_on(async { self.operator.delete(&self.key).await })?;
            return Ok(());
        }
        let keys = self.list_keys()?;
        if keys.is_empty() {
            return Err(self.not_found());
        }
        let prefix = self.dir_prefix();
        self.runtime
            .block_on(async { self.operator.remove_all(&prefix).await })?;
        Ok(())
    }

    /// Sorted concatenation of per-object version tokens.
    pub(crate) fn get_version(&self) -> Result<Option<String>, Error> {
        if let Some(metadata) = self.stat_object()? {
            return Ok(Self::version_token(&metadata));
        }
        let mut keys = self.list_keys()?;
        if keys.is_empty() {
            return Ok(None);
        }
        keys.sort();
        let mut tokens = Vec::with_capacity(keys.len());
        for key in keys {
            let metadata = self
                .runtime
                .block_on(async { self.operator.stat(&key).await })?;
            if let Some(token) = Self::version_token(&metadata) {
                tokens.push(token);
            }
        }
        if tokens.is_empty() {
            Ok(None)
        } else {
            Ok(Some(tokens.join(";")))
        }
    }
}

fn collect_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            files.extend(collect_files(&entry.path())?);
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
