//! `minato` is a single, simple interface for accessing both local and remote
//! files, backed by a content-addressed local cache. Remote resources are
//! downloaded once and reused; per-entry expiry and upstream-version tracking
//! decide when a payload is fetched again, and archives are extracted
//! transparently.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), minato::Error> {
//! let path = minato::cached_path("https://example.com/model.tar.gz")?;
//! assert!(path.is_file());
//! # Ok(())
//! # }
//! ```
//!
//! Files inside an archive can be addressed directly with the bang-member
//! syntax:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), minato::Error> {
//! let member = minato::cached_path("https://example.com/archive.zip!archive/foo.txt")?;
//! # Ok(())
//! # }
//! ```
//!
//! For local files the original path is returned unchanged. When you need
//! more control over the cache root or the resolution (extraction, expiry,
//! forced downloads), build a [`Minato`] from a [`Config`] and use
//! [`Minato::cached_path_with_options`].

use std::io::Read;
use std::path::{Path, PathBuf};

pub mod cache;
pub mod config;
mod error;
pub mod filelock;
pub mod filesystems;
mod minato;
#[cfg(feature = "progress-bar")]
pub(crate) mod progress;
pub mod url;
pub mod util;

pub use crate::cache::{Cache, CacheEntry, CacheStatus};
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::filesystems::{FileSystem, WriteHandle};
pub use crate::minato::{Minato, Options};
pub use crate::util::Decompress;

/// Resolve a URL (or local path) to a local filesystem path with the default
/// configuration, downloading only if needed.
pub fn cached_path(url_or_filename: &str) -> Result<PathBuf, Error> {
    Minato::new(&Config::load()?)?.cached_path(url_or_filename)
}

/// Like [`cached_path`], with explicit resolution options.
pub fn cached_path_with_options(
    url_or_filename: &str,
    options: &Options,
) -> Result<PathBuf, Error> {
    Minato::new(&Config::load()?)?.cached_path_with_options(url_or_filename, options)
}

/// Open a resource for reading through the cache.
pub fn open(url_or_filename: &str) -> Result<Box<dyn Read + Send>, Error> {
    Minato::new(&Config::load()?)?.open(url_or_filename)
}

/// Open a resource for writing, bypassing the cache. Remote targets are
/// uploaded when the handle is [finished](WriteHandle::finish).
pub fn create(url_or_filename: &str) -> Result<WriteHandle, Error> {
    Minato::new(&Config::load()?)?.create(url_or_filename)
}

/// Copy a resource to a local path, bypassing the cache.
pub fn download<P: AsRef<Path>>(url: &str, path: P) -> Result<(), Error> {
    Minato::download(url, path.as_ref())
}

/// Upload a local file or directory, bypassing the cache.
pub fn upload<P: AsRef<Path>>(path: P, url: &str) -> Result<(), Error> {
    Minato::upload(path.as_ref(), url)
}

/// Remove a remote resource, bypassing the cache.
pub fn delete(url: &str) -> Result<(), Error> {
    Minato::delete(url)
}

/// True iff something is addressable at the URL.
pub fn exists(url: &str) -> Result<bool, Error> {
    Minato::exists(url)
}

/// True iff the upstream version of a cached URL differs from the one
/// recorded at its last successful download.
pub fn available_update(url: &str) -> Result<bool, Error> {
    Minato::new(&Config::load()?)?.available_update(url)
}
