use std::io;

/// Any error that can occur while resolving, caching, or accessing a resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A cache lookup yielded nothing.
    #[error("cache not found for {0}")]
    CacheNotFound(String),

    /// An entry with the same uid is already persisted.
    #[error("cache already exists for uid {0}")]
    CacheAlreadyExists(String),

    /// A post-condition on the entry's status was violated.
    #[error("invalid cache status: {0}")]
    InvalidCacheStatus(String),

    /// The URL does not address anything on the backend.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The backend cannot perform the requested operation.
    #[error("{scheme} filesystem does not support {operation}")]
    Unsupported {
        scheme: String,
        operation: &'static str,
    },

    /// No backend is registered for the URL's scheme.
    #[error("unknown scheme {scheme:?} (expected one of: {available})")]
    UnknownScheme { scheme: String, available: String },

    /// The resource string could not be parsed as a URL.
    #[error("unable to parse resource URL: {0}")]
    InvalidUrl(String),

    /// A bad HTTP status code was received from a remote resource.
    #[error("HTTP response had status code {0}")]
    HttpStatus(u16),

    /// Any other HTTP-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Object storage (S3/GCS) failure.
    #[error("storage error: {0}")]
    Storage(#[from] opendal::Error),

    /// Corrupt or unreadable entry metadata.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Failure while extracting an archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// Everything else below the core.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Transient HTTP failures that are worth another attempt.
    pub(crate) fn is_retriable(&self) -> bool {
        match self {
            Error::HttpStatus(status) => matches!(status, 502 | 503 | 504),
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}
