//! Pluggable per-scheme filesystem dispatch.
//!
//! Backends are registered in an explicit scheme registry; resolution goes by
//! the URL's scheme. The empty scheme, `file`, and `osfs` all bind to the
//! local filesystem.

mod gcs;
mod hf;
mod http;
mod object_store;
mod osfs;
mod s3;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, warn};
use once_cell::sync::Lazy;
use tempfile::{NamedTempFile, TempDir};

use crate::error::Error;
use crate::url::Url;
use crate::util::{self, CompressedWriter, Decompress};

pub use self::gcs::GcsFileSystem;
pub use self::hf::HfFileSystem;
pub use self::http::HttpFileSystem;
pub use self::osfs::OsFileSystem;
pub use self::s3::S3FileSystem;

/// A per-scheme adapter bound to one resource URL.
pub trait FileSystem: Send {
    /// The URL this adapter serves.
    fn url(&self) -> &Url;

    /// True iff at least one object is addressable at the URL, prefix or
    /// exact depending on the scheme.
    fn exists(&self) -> Result<bool, Error>;

    /// Copy the remote object(s) into `path`. If `path` is a directory and
    /// the URL names a single object, the file lands inside it; a prefix URL
    /// reproduces its tree under `path`.
    fn download(&self, path: &Path) -> Result<(), Error>;

    /// Upload a local file, or recursively a local directory. When the URL's
    /// path ends with `/` the local basename is appended.
    fn upload(&self, path: &Path) -> Result<(), Error>;

    /// Remove the object or prefix.
    fn delete(&self) -> Result<(), Error>;

    /// A deterministic token reflecting upstream content; equality implies no
    /// observable change.
    fn get_version(&self) -> Result<Option<String>, Error>;

    /// Open the resource for reading. Non-local schemes stage through a
    /// temporary file that is removed when the reader is dropped.
    fn open_file(&self, decompress: Decompress) -> Result<Box<dyn Read + Send>, Error> {
        let temp = TempDir::new()?;
        let target = temp.path().join("resource");
        self.download(&target)?;
        if target.is_dir() {
            return Err(Error::Unsupported {
                scheme: self.url().scheme().to_string(),
                operation: "opening a directory for reading",
            });
        }
        let reader = util::open_with_decompress(&target, decompress)?;
        Ok(Box::new(TempReader {
            reader,
            _temp: temp,
        }))
    }

    /// Open the resource for writing. Remote schemes stage through a local
    /// temp file that is uploaded when the handle is finished.
    fn create_file(&self) -> Result<WriteHandle, Error> {
        WriteHandle::remote(self.url().raw())
    }
}

/// Keeps the staged download alive for as long as it is being read.
struct TempReader {
    reader: Box<dyn Read + Send>,
    _temp: TempDir,
}

impl Read for TempReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

type Factory = fn(Url) -> Result<Box<dyn FileSystem>, Error>;

static REGISTRY: Lazy<BTreeMap<&'static str, Factory>> = Lazy::new(|| {
    let mut registry: BTreeMap<&'static str, Factory> = BTreeMap::new();
    for scheme in &["", "file", "osfs"] {
        registry.insert(*scheme, |url| Ok(Box::new(OsFileSystem::new(url))));
    }
    for scheme in &["http", "https"] {
        registry.insert(*scheme, |url| Ok(Box::new(HttpFileSystem::new(url)?)));
    }
    registry.insert("s3", |url| Ok(Box::new(S3FileSystem::new(url)?)));
    for scheme in &["gs", "gcs"] {
        registry.insert(*scheme, |url| Ok(Box::new(GcsFileSystem::new(url)?)));
    }
    registry.insert("hf", |url| Ok(Box::new(HfFileSystem::new(url)?)));
    registry
});

/// Resolve the backend for a URL by its scheme.
pub fn by_url(url_or_filename: &str) -> Result<Box<dyn FileSystem>, Error> {
    let url = Url::parse(url_or_filename)?;
    match REGISTRY.get(url.scheme()) {
        Some(factory) => {
            debug!("inferred {:?} filesystem for {}", url.scheme(), url);
            factory(url)
        }
        None => Err(Error::UnknownScheme {
            scheme: url.scheme().to_string(),
            available: REGISTRY
                .keys()
                .filter(|scheme| !scheme.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

pub fn exists(url_or_filename: &str) -> Result<bool, Error> {
    by_url(url_or_filename)?.exists()
}

pub fn download(url_or_filename: &str, path: &Path) -> Result<(), Error> {
    by_url(url_or_filename)?.download(path)
}

pub fn upload(path: &Path, url_or_filename: &str) -> Result<(), Error> {
    by_url(url_or_filename)?.upload(path)
}

pub fn delete(url_or_filename: &str) -> Result<(), Error> {
    by_url(url_or_filename)?.delete()
}

pub fn get_version(url_or_filename: &str) -> Result<Option<String>, Error> {
    by_url(url_or_filename)?.get_version()
}

pub fn open_file(
    url_or_filename: &str,
    decompress: Decompress,
) -> Result<Box<dyn Read + Send>, Error> {
    by_url(url_or_filename)?.open_file(decompress)
}

pub fn create_file(url_or_filename: &str) -> Result<WriteHandle, Error> {
    by_url(url_or_filename)?.create_file()
}

enum WriteTarget {
    Local(CompressedWriter),
    Remote {
        url: String,
        temp: NamedTempFile,
        writer: Option<BufWriter<File>>,
    },
}

/// A writable handle returned by [`FileSystem::create_file`].
///
/// Local targets write straight to disk (with compression chosen by
/// extension); remote targets stage into a temp file that is uploaded on
/// [`finish`](WriteHandle::finish). Dropping an unfinished handle finalizes
/// it on a best-effort basis, logging failures.
pub struct WriteHandle {
    target: Option<WriteTarget>,
}

impl WriteHandle {
    pub(crate) fn local(writer: CompressedWriter) -> Self {
        WriteHandle {
            target: Some(WriteTarget::Local(writer)),
        }
    }

    pub(crate) fn remote(url: &str) -> Result<Self, Error> {
        let temp = NamedTempFile::new()?;
        let writer = BufWriter::new(temp.reopen()?);
        Ok(WriteHandle {
            target: Some(WriteTarget::Remote {
                url: url.to_string(),
                temp,
                writer: Some(writer),
            }),
        })
    }

    /// Flush everything and, for remote targets, upload the staged bytes.
    pub fn finish(mut self) -> Result<(), Error> {
        self.finish_inner()
    }

    fn finish_inner(&mut self) -> Result<(), Error> {
        match self.target.take() {
            None => Ok(()),
            Some(WriteTarget::Local(mut writer)) => {
                writer.finish()?;
                Ok(())
            }
            Some(WriteTarget::Remote { url, temp, writer }) => {
                if let Some(mut writer) = writer {
                    writer.flush()?;
                }
                by_url(&url)?.upload(temp.path())?;
                Ok(())
            }
        }
    }
}

impl Write for WriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.target.as_mut() {
            Some(WriteTarget::Local(writer)) => writer.write(buf),
            Some(WriteTarget::Remote {
                writer: Some(writer),
                ..
            }) => writer.write(buf),
            _ => Err(io::Error::new(io::ErrorKind::Other, "write after finish")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.target.as_mut() {
            Some(WriteTarget::Local(writer)) => writer.flush(),
            Some(WriteTarget::Remote {
                writer: Some(writer),
                ..
            }) => writer.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for WriteHandle {
    fn drop(&mut self) {
        if self.target.is_some() {
            if let Err(err) = self.finish_inner() {
                warn!("failed to finalize write handle: {}", err);
            }
        }
    }
}
