use std::cmp;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rand::distributions::{Distribution, Uniform};
use reqwest::blocking::{Client, Response};
use tempfile::NamedTempFile;

use crate::error::Error;
use crate::filesystems::{FileSystem, WriteHandle};
use crate::url::Url;
use crate::util;

const ETAG: &str = "ETag";
const MAX_RETRIES: u32 = 5;
const MAX_BACKOFF_MILLIS: u32 = 5_000;

/// HTTP/HTTPS backend. Reads only: `upload` and `delete` are unsupported.
pub struct HttpFileSystem {
    url: Url,
    client: Client,
}

impl HttpFileSystem {
    pub fn new(url: Url) -> Result<Self, Error> {
        let client = Client::builder().build()?;
        Ok(HttpFileSystem { url, client })
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            scheme: self.url.scheme().to_string(),
            operation,
        }
    }

    fn retry_delay(retries: u32) -> Duration {
        let jitter = Uniform::from(0..1000).sample(&mut rand::thread_rng());
        let millis = cmp::min(2u32.pow(retries - 1) * 1000 + jitter, MAX_BACKOFF_MILLIS);
        Duration::from_millis(u64::from(millis))
    }

    /// Retry transient failures (502/503/504, timeouts) with exponential
    /// backoff, up to `MAX_RETRIES` additional attempts.
    fn with_retries<T>(&self, mut operation: impl FnMut() -> Result<T, Error>) -> Result<T, Error> {
        let mut retries: u32 = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if retries >= MAX_RETRIES || !err.is_retriable() {
                        return Err(err);
                    }
                    retries += 1;
                    let delay = Self::retry_delay(retries);
                    warn!(
                        "request to {} failed: {}; retrying in {:?}",
                        self.url, err, delay
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    fn head(&self) -> Result<Response, Error> {
        debug!("HEAD {}", self.url);
        let response = self.client.head(self.url.raw()).send()?;
        Ok(response)
    }

    fn get(&self) -> Result<Response, Error> {
        debug!("GET {}", self.url);
        let response = self.client.get(self.url.raw()).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(self.url.raw().to_string()));
        }
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }
        Ok(response)
    }

    fn copy_response(
        &self,
        response: &mut Response,
        writer: &mut impl Write,
    ) -> Result<u64, Error> {
        #[cfg(feature = "progress-bar")]
        {
            if let Some(style) = crate::progress::ProgressBar::from_env() {
                let mut wrapped =
                    style.wrap_write(self.url.raw(), response.content_length(), writer);
                let written = io::copy(response, &mut wrapped)?;
                wrapped.finish();
                return Ok(written);
            }
        }
        Ok(io::copy(response, writer)?)
    }
}

impl FileSystem for HttpFileSystem {
    fn url(&self) -> &Url {
        &self.url
    }

    fn exists(&self) -> Result<bool, Error> {
        let response = self.head()?;
        Ok(response.status().is_success())
    }

    fn download(&self, path: &Path) -> Result<(), Error> {
        let target: PathBuf = if path.is_dir() {
            match util::url_basename(&self.url) {
                Some(name) => path.join(name),
                None => return Err(Error::InvalidUrl(self.url.raw().to_string())),
            }
        } else {
            path.to_path_buf()
        };
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }

        // Stream into a sibling temp file so an interrupted transfer never
        // leaves a corrupt payload at the final path.
        let mut tempfile = NamedTempFile::new_in(parent)?;
        let mut response = self.with_retries(|| self.get())?;
        info!("starting download of {}", self.url);
        {
            let mut writer = BufWriter::new(&mut tempfile);
            let written = self.copy_response(&mut response, &mut writer)?;
            writer.flush()?;
            debug!("downloaded {} bytes from {}", written, self.url);
        }
        tempfile.persist(&target).map_err(|err| Error::Io(err.error))?;
        Ok(())
    }

    fn upload(&self, _path: &Path) -> Result<(), Error> {
        Err(self.unsupported("upload"))
    }

    fn delete(&self) -> Result<(), Error> {
        Err(self.unsupported("delete"))
    }

    /// The `ETag` header, preserved byte-for-byte (weak `W/` prefixes
    /// included), or `None` when the server does not expose one.
    fn get_version(&self) -> Result<Option<String>, Error> {
        let response = self.with_retries(|| {
            let response = self.head()?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::NotFound(self.url.raw().to_string()));
            }
            if !status.is_success() {
                return Err(Error::HttpStatus(status.as_u16()));
            }
            Ok(response)
        })?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        Ok(etag)
    }

    fn create_file(&self) -> Result<WriteHandle, Error> {
        Err(self.unsupported("writing"))
    }
}
