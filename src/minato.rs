use std::io::Read;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::cache::{Cache, CacheEntry, CacheStatus};
use crate::config::Config;
use crate::error::Error;
use crate::filelock::FileLockGuard;
use crate::filesystems::{self, FileSystem, WriteHandle};
use crate::util::{self, Decompress};

/// Options for a single `cached_path` resolution.
#[derive(Debug, Clone)]
pub struct Options {
    /// Treat the payload as an archive and resolve to its extracted form.
    pub extract: bool,
    /// Override the entry's upstream-version checking.
    pub auto_update: Option<bool>,
    /// Override the entry's expiry in days; negative means never.
    pub expire_days: Option<i64>,
    /// Re-download even if a fresh payload is cached.
    pub force_download: bool,
    /// Re-extract even if the payload is unchanged.
    pub force_extract: bool,
    /// Retry a resolution whose previous attempt did not complete.
    pub retry: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            extract: false,
            auto_update: None,
            expire_days: None,
            force_download: false,
            force_extract: false,
            retry: true,
        }
    }
}

impl Options {
    pub fn extract(mut self) -> Self {
        self.extract = true;
        self
    }

    pub fn auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = Some(auto_update);
        self
    }

    pub fn expire_days(mut self, expire_days: i64) -> Self {
        self.expire_days = Some(expire_days);
        self
    }

    pub fn force_download(mut self) -> Self {
        self.force_download = true;
        self
    }

    pub fn force_extract(mut self) -> Self {
        self.force_extract = true;
        self
    }

    pub fn no_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

/// The cache coordinator: one idempotent resolution operation combining the
/// store, per-entry locks, scheme dispatch, the status machine, expiry,
/// version checks, and extraction.
pub struct Minato {
    cache: Cache,
}

impl Minato {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(Minato {
            cache: Cache::from_config(config)?,
        })
    }

    pub fn with_cache(cache: Cache) -> Self {
        Minato { cache }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Resolve a URL (or local path) to a local filesystem path, downloading
    /// only if needed.
    pub fn cached_path(&self, url_or_filename: &str) -> Result<PathBuf, Error> {
        self.cached_path_with_options(url_or_filename, &Options::default())
    }

    pub fn cached_path_with_options(
        &self,
        url_or_filename: &str,
        options: &Options,
    ) -> Result<PathBuf, Error> {
        // `<archive-url>!<member-path>`: resolve the archive with extraction
        // and address the member inside it. The separator is the LAST `!`.
        if let Some(index) = url_or_filename.rfind('!') {
            let archive_url = &url_or_filename[..index];
            let member = &url_or_filename[index + 1..];
            debug!("resolving archive member {:?} of {}", member, archive_url);
            let mut archive_options = options.clone();
            archive_options.extract = true;
            let root = self.cached_path_with_options(archive_url, &archive_options)?;
            if !root.is_dir() {
                return Err(Error::InvalidCacheStatus(format!(
                    "expected an extracted directory at {}",
                    root.display()
                )));
            }
            let member_path = root.join(util::extract_path(member));
            if !member_path.exists() {
                return Err(Error::NotFound(url_or_filename.to_string()));
            }
            return Ok(member_path);
        }

        if util::is_local(url_or_filename) {
            let filename = util::extract_path(url_or_filename);
            // Local archives with extraction requested flow through the
            // cache so the extraction output has a managed home.
            if !(options.extract && util::is_archive_file(&filename)) {
                if !filename.exists() {
                    return Err(Error::NotFound(url_or_filename.to_string()));
                }
                return Ok(filename);
            }
        }

        let url = url_or_filename;
        // Unknown schemes fail here, before any entry is created.
        let filesystem = filesystems::by_url(url)?;

        let (mut entry, _guard) = self.acquire_entry(url)?;

        if options.expire_days.is_some() || options.auto_update.is_some() {
            if let Some(expire_days) = options.expire_days {
                entry.expire_days = expire_days;
            }
            if let Some(auto_update) = options.auto_update {
                entry.auto_update = auto_update;
            }
            self.cache.update(&mut entry)?;
        }

        if let Err(err) = self.resolve(&mut entry, filesystem.as_ref(), options) {
            if err.is_not_found() {
                // The URL addresses nothing, so the entry should not exist.
                warn!("deleting cache entry for missing resource {}", url);
                if let Err(delete_err) = self.cache.delete(&entry) {
                    warn!("failed to delete entry {}: {}", entry.uid, delete_err);
                }
            } else {
                entry.status = CacheStatus::Failed;
                if let Err(save_err) = self.cache.save(&entry) {
                    warn!(
                        "failed to record FAILED status for {}: {}",
                        entry.uid, save_err
                    );
                }
            }
            return Err(err);
        }

        if options.extract {
            if let Some(extraction_path) = &entry.extraction_path {
                if entry.status != CacheStatus::Completed || !extraction_path.exists() {
                    return Err(Error::InvalidCacheStatus(format!(
                        "extraction of {} is {}",
                        entry.url, entry.status
                    )));
                }
                return Ok(extraction_path.clone());
            }
        }
        if entry.status != CacheStatus::Completed || !entry.local_path.exists() {
            return Err(Error::InvalidCacheStatus(format!(
                "cache of {} is {}",
                entry.url, entry.status
            )));
        }
        Ok(entry.local_path.clone())
    }

    /// Find or create the entry for `url` and take its lock. The returned
    /// entry is re-read from disk under the lock.
    fn acquire_entry(&self, url: &str) -> Result<(CacheEntry, FileLockGuard), Error> {
        loop {
            let entry = match self.cache.by_url(url) {
                Ok(entry) => entry,
                Err(Error::CacheNotFound(_)) => self.cache.new_entry(url),
                Err(err) => return Err(err),
            };
            let guard = self.cache.lock(&entry)?;
            if self.cache.exists(&entry) {
                return Ok((self.cache.by_uid(&entry.uid)?, guard));
            }
            // We minted a fresh uid; register it unless another caller has
            // registered this URL in the meantime.
            if self.cache.contains(url) {
                drop(guard);
                continue;
            }
            self.cache.add(&entry)?;
            return Ok((entry, guard));
        }
    }

    /// The download/extract decisions, executed while holding the entry's
    /// lock. Status transitions are persisted before the action they label.
    fn resolve(
        &self,
        entry: &mut CacheEntry,
        filesystem: &dyn FileSystem,
        options: &Options,
    ) -> Result<(), Error> {
        let mut force_download = options.force_download;
        if entry.auto_update && entry.version.is_some() {
            let current = filesystem.get_version()?;
            if current != entry.version {
                info!("new upstream version available for {}", entry.url);
                force_download = true;
            }
        }
        if options.retry && entry.status != CacheStatus::Completed {
            force_download = true;
        }

        let downloaded = if !entry.local_path.exists()
            || self.cache.is_expired(entry)
            || force_download
        {
            util::remove_file_or_directory(&entry.local_path)?;
            entry.status = CacheStatus::Downloading;
            self.cache.update(entry)?;
            info!("downloading {} to {:?}", entry.url, entry.local_path);
            filesystem.download(&entry.local_path)?;
            entry.version = filesystem.get_version()?;
            true
        } else {
            debug!("cached payload for {} is up to date", entry.url);
            false
        };

        let extract_needed = (options.extract && entry.extraction_path.is_none())
            || (downloaded && entry.extraction_path.is_some())
            || options.force_extract;
        let extracted = if extract_needed && util::is_archive_file(&entry.local_path) {
            let extraction_path = entry.derived_extraction_path();
            util::remove_file_or_directory(&extraction_path)?;
            entry.extraction_path = Some(extraction_path.clone());
            entry.status = CacheStatus::Extracting;
            self.cache.update(entry)?;
            info!("extracting {:?} to {:?}", entry.local_path, extraction_path);
            util::extract_archive_file(&entry.local_path, &extraction_path)?;
            true
        } else {
            false
        };

        if downloaded || extracted {
            entry.status = CacheStatus::Completed;
            self.cache.update(entry)?;
        }
        Ok(())
    }

    /// Open a resource for reading through the cache, optionally
    /// decompressing. Writing access goes through [`create`](Minato::create)
    /// and never touches the cache.
    pub fn open(&self, url_or_filename: &str) -> Result<Box<dyn Read + Send>, Error> {
        self.open_with_options(url_or_filename, &Options::default(), Decompress::None, true)
    }

    pub fn open_with_options(
        &self,
        url_or_filename: &str,
        options: &Options,
        decompress: Decompress,
        use_cache: bool,
    ) -> Result<Box<dyn Read + Send>, Error> {
        if use_cache {
            let path = self.cached_path_with_options(url_or_filename, options)?;
            util::open_with_decompress(&path, decompress)
        } else {
            filesystems::open_file(url_or_filename, decompress)
        }
    }

    /// Open a resource for writing, bypassing the cache.
    pub fn create(&self, url_or_filename: &str) -> Result<WriteHandle, Error> {
        filesystems::create_file(url_or_filename)
    }

    /// True iff the backend reports a version different from the one
    /// recorded at the last successful download. Local inputs never report
    /// an update.
    pub fn available_update(&self, url_or_filename: &str) -> Result<bool, Error> {
        if util::is_local(url_or_filename) {
            return Ok(false);
        }
        let entry = self.cache.by_url(url_or_filename)?;
        let filesystem = filesystems::by_url(url_or_filename)?;
        Ok(filesystem.get_version()? != entry.version)
    }

    /// Delete a cached entry and its files, under the entry's lock.
    pub fn remove(&self, entry: &CacheEntry) -> Result<(), Error> {
        let _guard = self.cache.lock(entry)?;
        self.cache.delete(entry)
    }

    /// Copy a resource to a local path, bypassing the cache.
    pub fn download(url: &str, path: &std::path::Path) -> Result<(), Error> {
        filesystems::download(url, path)
    }

    /// Upload a local file or directory, bypassing the cache.
    pub fn upload(path: &std::path::Path, url: &str) -> Result<(), Error> {
        filesystems::upload(path, url)
    }

    /// Remove a remote resource, bypassing the cache.
    pub fn delete(url: &str) -> Result<(), Error> {
        filesystems::delete(url)
    }

    /// True iff something is addressable at the URL, bypassing the cache.
    pub fn exists(url: &str) -> Result<bool, Error> {
        filesystems::exists(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    fn new_minato(root: &Path) -> Minato {
        Minato::with_cache(Cache::new(root.to_path_buf(), -1, true).unwrap())
    }

    fn write_zip(path: &Path, name: &str, content: &[u8]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::FileOptions::default();
            zip.start_file(name, options).unwrap();
            zip.write_all(content).unwrap();
            zip.finish().unwrap();
        }
        let bytes = cursor.into_inner();
        fs::write(path, &bytes).unwrap();
        bytes
    }

    #[test]
    fn test_fresh_http_fetch_is_idempotent() {
        let server = MockServer::start();
        let head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/hello.txt");
            then.status(200).header("ETag", "\"v1\"");
        });
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/hello.txt");
            then.status(200)
                .header("ETag", "\"v1\"")
                .body("Hello, world!\n");
        });

        let root = tempdir().unwrap();
        let minato = new_minato(root.path());
        let url = server.url("/hello.txt");

        let path = minato.cached_path(&url).unwrap();
        assert!(path.starts_with(root.path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Hello, world!\n");

        let entry = minato.cache().by_url(&url).unwrap();
        assert_eq!(entry.status, CacheStatus::Completed);
        assert_eq!(entry.local_path, path);
        assert!(entry.version.is_some());
        assert!(!entry.version.as_deref().unwrap_or("").is_empty());

        // A second resolution returns the same path without re-downloading.
        let same_path = minato.cached_path(&url).unwrap();
        assert_eq!(same_path, path);
        assert_eq!(get_mock.hits(), 1);
        // One HEAD after the download, one for the second call's version
        // check.
        assert_eq!(head_mock.hits(), 2);
    }

    #[test]
    fn test_auto_update_follows_upstream_version() {
        let server = MockServer::start();
        let mut head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/data.txt");
            then.status(200).header("ETag", "\"v1\"");
        });
        let mut get_mock = server.mock(|when, then| {
            when.method(GET).path("/data.txt");
            then.status(200).header("ETag", "\"v1\"").body("hello");
        });

        let root = tempdir().unwrap();
        let minato = new_minato(root.path());
        let url = server.url("/data.txt");

        let path = minato.cached_path(&url).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        // Upstream changes.
        head_mock.delete();
        get_mock.delete();
        server.mock(|when, then| {
            when.method(HEAD).path("/data.txt");
            then.status(200).header("ETag", "\"v2\"");
        });
        let get_mock_2 = server.mock(|when, then| {
            when.method(GET).path("/data.txt");
            then.status(200).header("ETag", "\"v2\"").body("world");
        });

        let path = minato
            .cached_path_with_options(&url, &Options::default().auto_update(true))
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "world");
        assert_eq!(get_mock_2.hits(), 1);

        let entry = minato.cache().by_url(&url).unwrap();
        assert_eq!(entry.version.as_deref(), Some("\"v2\""));
    }

    #[test]
    fn test_auto_update_off_keeps_stale_payload() {
        let server = MockServer::start();
        let mut get_mock = server.mock(|when, then| {
            when.method(GET).path("/data.txt");
            then.status(200).header("ETag", "\"v1\"").body("hello");
        });
        let mut head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/data.txt");
            then.status(200).header("ETag", "\"v1\"");
        });

        let root = tempdir().unwrap();
        // Store default: no automatic version checks.
        let minato = Minato::with_cache(Cache::new(root.path().to_path_buf(), -1, false).unwrap());
        let url = server.url("/data.txt");

        let path = minato.cached_path(&url).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        get_mock.delete();
        head_mock.delete();
        server.mock(|when, then| {
            when.method(GET).path("/data.txt");
            then.status(200).header("ETag", "\"v2\"").body("world");
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/data.txt");
            then.status(200).header("ETag", "\"v2\"");
        });

        let path = minato.cached_path(&url).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_failed_download_recovers_with_retry() {
        let server = MockServer::start();
        let mut get_mock = server.mock(|when, then| {
            when.method(GET).path("/flaky.txt");
            then.status(500);
        });

        let root = tempdir().unwrap();
        let minato = new_minato(root.path());
        let url = server.url("/flaky.txt");

        let result = minato.cached_path(&url);
        assert!(matches!(result, Err(Error::HttpStatus(500))));

        let entry = minato.cache().by_url(&url).unwrap();
        assert_eq!(entry.status, CacheStatus::Failed);
        assert!(!entry.local_path.exists());

        // The server recovers; a retried resolution completes.
        get_mock.delete();
        server.mock(|when, then| {
            when.method(GET).path("/flaky.txt");
            then.status(200).header("ETag", "\"ok\"").body("recovered");
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/flaky.txt");
            then.status(200).header("ETag", "\"ok\"");
        });

        let path = minato.cached_path(&url).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "recovered");
        let entry = minato.cache().by_url(&url).unwrap();
        assert_eq!(entry.status, CacheStatus::Completed);
    }

    #[test]
    fn test_failed_entry_without_retry_is_an_error() {
        let root = tempdir().unwrap();
        let cache = Cache::new(root.path().to_path_buf(), -1, false).unwrap();

        // A payload that landed on disk while its resolution failed, as
        // after a crash between download and completion.
        let mut entry = cache.new_entry("https://example.com/broken.txt");
        entry.status = CacheStatus::Failed;
        cache.add(&entry).unwrap();
        fs::write(&entry.local_path, b"half-baked").unwrap();

        let minato = Minato::with_cache(cache);
        let result = minato.cached_path_with_options(
            "https://example.com/broken.txt",
            &Options::default().no_retry(),
        );
        assert!(matches!(result, Err(Error::InvalidCacheStatus(_))));
    }

    #[test]
    fn test_not_found_deletes_entry() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone.txt");
            then.status(404);
        });

        let root = tempdir().unwrap();
        let minato = new_minato(root.path());
        let url = server.url("/gone.txt");

        let result = minato.cached_path(&url);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(matches!(
            minato.cache().by_url(&url),
            Err(Error::CacheNotFound(_))
        ));
    }

    #[test]
    fn test_expire_days_zero_always_redownloads() {
        let server = MockServer::start();
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/expiring.txt");
            then.status(200).body("payload");
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/expiring.txt");
            then.status(200);
        });

        let root = tempdir().unwrap();
        let minato = Minato::with_cache(Cache::new(root.path().to_path_buf(), -1, false).unwrap());
        let url = server.url("/expiring.txt");
        let options = Options::default().expire_days(0);

        minato.cached_path_with_options(&url, &options).unwrap();
        minato.cached_path_with_options(&url, &options).unwrap();
        assert_eq!(get_mock.hits(), 2);
    }

    #[test]
    fn test_expire_days_negative_never_expires() {
        let server = MockServer::start();
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/eternal.txt");
            then.status(200).body("payload");
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/eternal.txt");
            then.status(200);
        });

        let root = tempdir().unwrap();
        let minato = Minato::with_cache(Cache::new(root.path().to_path_buf(), -1, false).unwrap());
        let url = server.url("/eternal.txt");

        minato.cached_path(&url).unwrap();

        // Simulate a long-passed update time.
        let mut entry = minato.cache().by_url(&url).unwrap();
        entry.updated_at = chrono::Utc::now() - chrono::Duration::days(10_000);
        minato.cache().save(&entry).unwrap();

        minato.cached_path(&url).unwrap();
        assert_eq!(get_mock.hits(), 1);
    }

    #[test]
    fn test_local_path_is_returned_as_is() {
        let root = tempdir().unwrap();
        let minato = new_minato(root.path());

        let dir = tempdir().unwrap();
        let file = dir.path().join("local.txt");
        fs::write(&file, b"local").unwrap();

        let path = minato.cached_path(file.to_str().unwrap()).unwrap();
        assert_eq!(path, file);

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            minato.cached_path(missing.to_str().unwrap()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_local_archive_extraction_and_bang_member() {
        let root = tempdir().unwrap();
        let minato = new_minato(root.path());

        let dir = tempdir().unwrap();
        let archive = dir.path().join("archive.zip");
        write_zip(&archive, "archive/foo.txt", b"this file is foo.txt\n");

        // Extraction resolves to the extracted directory inside the cache.
        let extracted = minato
            .cached_path_with_options(archive.to_str().unwrap(), &Options::default().extract())
            .unwrap();
        assert!(extracted.is_dir());
        assert!(extracted.to_string_lossy().ends_with("-extracted"));
        assert!(extracted.starts_with(root.path()));

        // Bang-member syntax addresses a file inside the archive.
        let member = minato
            .cached_path(&format!("{}!archive/foo.txt", archive.display()))
            .unwrap();
        assert_eq!(
            fs::read_to_string(&member).unwrap(),
            "this file is foo.txt\n"
        );

        let missing = minato.cached_path(&format!("{}!archive/nope.txt", archive.display()));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_bang_member_over_http() {
        let server = MockServer::start();
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();

        let zip_bytes = write_zip(
            &scratch.path().join("archive.zip"),
            "archive/foo.txt",
            b"this file is foo.txt\n",
        );
        server.mock(|when, then| {
            when.method(GET).path("/archive.zip");
            then.status(200).body(zip_bytes.clone());
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/archive.zip");
            then.status(200);
        });

        let minato = new_minato(root.path());
        let url = format!("{}!archive/foo.txt", server.url("/archive.zip"));
        let member = minato.cached_path(&url).unwrap();
        assert_eq!(
            fs::read_to_string(&member).unwrap(),
            "this file is foo.txt\n"
        );

        let entry = minato.cache().by_url(&server.url("/archive.zip")).unwrap();
        assert_eq!(entry.status, CacheStatus::Completed);
        assert!(entry.extraction_path.is_some());
    }

    #[test]
    fn test_unknown_scheme_has_no_side_effects() {
        let root = tempdir().unwrap();
        let minato = new_minato(root.path());

        let result = minato.cached_path("ftp://example.com/file.txt");
        assert!(matches!(result, Err(Error::UnknownScheme { .. })));
        assert!(minato.cache().all().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_resolutions_download_once() {
        let server = MockServer::start();
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/shared.txt");
            then.status(200).body("shared");
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/shared.txt");
            then.status(200);
        });

        let root = tempdir().unwrap();
        let url = server.url("/shared.txt");

        // Seed the entry so both workers resolve the same uid.
        {
            let cache = Cache::new(root.path().to_path_buf(), -1, false).unwrap();
            let entry = cache.new_entry(&url);
            cache.add(&entry).unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..2 {
            let root = root.path().to_path_buf();
            let url = url.clone();
            handles.push(std::thread::spawn(move || {
                let minato = Minato::with_cache(Cache::new(root, -1, false).unwrap());
                minato.cached_path(&url).unwrap()
            }));
        }
        let paths: Vec<PathBuf> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(paths[0], paths[1]);
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "shared");
        assert_eq!(get_mock.hits(), 1);
    }

    #[test]
    fn test_available_update() {
        let server = MockServer::start();
        let mut head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/tracked.txt");
            then.status(200).header("ETag", "\"v1\"");
        });
        server.mock(|when, then| {
            when.method(GET).path("/tracked.txt");
            then.status(200).header("ETag", "\"v1\"").body("tracked");
        });

        let root = tempdir().unwrap();
        let minato = new_minato(root.path());
        let url = server.url("/tracked.txt");

        minato.cached_path(&url).unwrap();
        assert!(!minato.available_update(&url).unwrap());

        head_mock.delete();
        server.mock(|when, then| {
            when.method(HEAD).path("/tracked.txt");
            then.status(200).header("ETag", "\"v2\"");
        });
        assert!(minato.available_update(&url).unwrap());

        // Local inputs never report an update.
        assert!(!minato.available_update("/tmp/anything").unwrap());
    }

    #[test]
    fn test_open_reads_through_cache() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/readable.txt");
            then.status(200).body("read through the cache");
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/readable.txt");
            then.status(200);
        });

        let root = tempdir().unwrap();
        let minato = new_minato(root.path());

        let mut reader = minato.open(&server.url("/readable.txt")).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "read through the cache");
    }
}
