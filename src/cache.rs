use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::filelock::{FileLock, FileLockGuard};
use crate::util::remove_file_or_directory;

/// Lifecycle state of a cache entry. The on-disk value is the authoritative
/// crash-recovery signal: transitions are persisted before the action they
/// label begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Pending,
    Downloading,
    Extracting,
    Completed,
    Failed,
    Deleted,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CacheStatus::Pending => "PENDING",
            CacheStatus::Downloading => "DOWNLOADING",
            CacheStatus::Extracting => "EXTRACTING",
            CacheStatus::Completed => "COMPLETED",
            CacheStatus::Failed => "FAILED",
            CacheStatus::Deleted => "DELETED",
        };
        f.write_str(label)
    }
}

/// Persistent metadata describing one cached artifact.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub uid: String,
    pub url: String,
    pub local_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expire_days: i64,
    pub extraction_path: Option<PathBuf>,
    pub status: CacheStatus,
    pub version: Option<String>,
    pub auto_update: bool,
}

impl CacheEntry {
    /// Where this entry's extraction output lives.
    pub fn derived_extraction_path(&self) -> PathBuf {
        let mut path = OsString::from(self.local_path.as_os_str());
        path.push("-extracted");
        PathBuf::from(path)
    }

    pub fn short_uid(&self) -> &str {
        &self.uid[..self.uid.len().min(8)]
    }
}

/// Metadata files written by older versions may lack some fields.
#[derive(Deserialize)]
struct CacheEntryRecord {
    uid: String,
    url: String,
    local_path: PathBuf,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default = "default_expire_days")]
    expire_days: i64,
    #[serde(default)]
    extraction_path: Option<PathBuf>,
    status: CacheStatus,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    auto_update: Option<bool>,
}

fn default_expire_days() -> i64 {
    -1
}

/// The on-disk store under `cache_root`: a map `uid -> entry metadata` plus
/// the artifact payloads and their extraction outputs.
///
/// Layout per entry: `<uid>.json` (metadata), `<uid>.lock` (advisory lock),
/// `<uid>` (payload), `<uid>-extracted` (extraction output).
#[derive(Debug)]
pub struct Cache {
    root: PathBuf,
    default_expire_days: i64,
    default_auto_update: bool,
}

impl Cache {
    pub fn new(
        root: PathBuf,
        default_expire_days: i64,
        default_auto_update: bool,
    ) -> Result<Cache, Error> {
        let root = if root.is_absolute() {
            root
        } else {
            env::current_dir()?.join(root)
        };
        if root.exists() && !root.is_dir() {
            return Err(Error::Config(format!(
                "cache root is not a directory: {}",
                root.display()
            )));
        }
        fs::create_dir_all(&root)?;
        Ok(Cache {
            root,
            default_expire_days,
            default_auto_update,
        })
    }

    pub fn from_config(config: &Config) -> Result<Cache, Error> {
        Cache::new(
            config.cache_root.clone(),
            config.expire_days,
            config.auto_update,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn url_hash(url: &str) -> String {
        format!("{:x}", md5::compute(url.as_bytes()))
    }

    fn generate_uid(url: &str) -> String {
        let random: u128 = rand::thread_rng().gen();
        format!("{}-{:032x}", Cache::url_hash(url), random)
    }

    pub(crate) fn metadata_path(&self, uid: &str) -> PathBuf {
        self.root.join(format!("{}.json", uid))
    }

    fn lockfile_path(&self, uid: &str) -> PathBuf {
        self.root.join(format!("{}.lock", uid))
    }

    /// Construct a fresh in-memory entry for `url`. Not persisted until
    /// [`add`](Cache::add) is called.
    pub fn new_entry(&self, url: &str) -> CacheEntry {
        let uid = Cache::generate_uid(url);
        let now = Utc::now();
        CacheEntry {
            local_path: self.root.join(&uid),
            uid,
            url: url.to_string(),
            created_at: now,
            updated_at: now,
            expire_days: self.default_expire_days,
            extraction_path: None,
            status: CacheStatus::Pending,
            version: None,
            auto_update: self.default_auto_update,
        }
    }

    /// Persist a new entry. Errors if metadata already exists at that uid.
    pub fn add(&self, entry: &CacheEntry) -> Result<(), Error> {
        if self.exists(entry) {
            return Err(Error::CacheAlreadyExists(entry.uid.clone()));
        }
        self.write_entry(entry)
    }

    /// Overwrite metadata unconditionally.
    pub fn save(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.write_entry(entry)
    }

    /// Refresh `updated_at` and save. Errors if the metadata file is missing.
    pub fn update(&self, entry: &mut CacheEntry) -> Result<(), Error> {
        if !self.exists(entry) {
            return Err(Error::CacheNotFound(entry.uid.clone()));
        }
        entry.updated_at = Utc::now();
        self.write_entry(entry)
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let serialized = serde_json::to_string_pretty(entry)?;
        fs::write(self.metadata_path(&entry.uid), serialized)?;
        Ok(())
    }

    fn read_entry(&self, path: &Path) -> Result<CacheEntry, Error> {
        let content = fs::read_to_string(path)?;
        let record: CacheEntryRecord = serde_json::from_str(&content)?;
        Ok(CacheEntry {
            uid: record.uid,
            url: record.url,
            local_path: record.local_path,
            created_at: record.created_at,
            updated_at: record.updated_at,
            expire_days: record.expire_days,
            extraction_path: record.extraction_path,
            status: record.status,
            version: record.version,
            auto_update: record.auto_update.unwrap_or(self.default_auto_update),
        })
    }

    pub fn exists(&self, entry: &CacheEntry) -> bool {
        self.metadata_path(&entry.uid).is_file()
    }

    pub fn by_uid(&self, uid: &str) -> Result<CacheEntry, Error> {
        let path = self.metadata_path(uid);
        if !path.is_file() {
            return Err(Error::CacheNotFound(uid.to_string()));
        }
        self.read_entry(&path)
    }

    /// Look up an entry by URL. Candidates are narrowed by the MD5 prefix of
    /// the metadata filename first; a full scan is the fallback. The URL is
    /// always re-checked after load, so hash collisions are harmless.
    pub fn by_url(&self, url: &str) -> Result<CacheEntry, Error> {
        let pattern = self
            .root
            .join(format!("{}-*.json", Cache::url_hash(url)));
        if let Some(pattern) = pattern.to_str() {
            if let Ok(paths) = glob::glob(pattern) {
                for path in paths.filter_map(Result::ok) {
                    if let Ok(entry) = self.read_entry(&path) {
                        if entry.url == url {
                            return Ok(entry);
                        }
                    }
                }
            }
        }
        for entry in self.all()? {
            if entry.url == url {
                return Ok(entry);
            }
        }
        Err(Error::CacheNotFound(url.to_string()))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.by_url(url).is_ok()
    }

    /// Scoped acquisition of the entry's advisory lock. Only the holder may
    /// mutate the payload, the extraction output, or the metadata file.
    pub fn lock(&self, entry: &CacheEntry) -> Result<FileLockGuard, Error> {
        FileLock::new(self.lockfile_path(&entry.uid)).acquire()
    }

    /// Remove payload, extraction output, metadata, and lock file, tolerating
    /// already-missing components.
    pub fn delete(&self, entry: &CacheEntry) -> Result<(), Error> {
        if let Some(extraction_path) = &entry.extraction_path {
            remove_file_or_directory(extraction_path)?;
        }
        remove_file_or_directory(entry.derived_extraction_path())?;
        remove_file_or_directory(&entry.local_path)?;
        remove_file_or_directory(self.metadata_path(&entry.uid))?;
        remove_file_or_directory(self.lockfile_path(&entry.uid))?;
        Ok(())
    }

    /// Whole-day expiry arithmetic against `updated_at`; a negative
    /// `expire_days` never expires.
    pub fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.expire_days >= 0
            && (Utc::now() - entry.updated_at).num_days() >= entry.expire_days
    }

    /// All entries, sorted by creation time ascending.
    pub fn all(&self) -> Result<Vec<CacheEntry>, Error> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.root)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read_entry(&path) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("skipping unreadable metadata {:?}: {}", path, err),
            }
        }
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    /// Keep entries whose URL contains every query term or whose uid starts
    /// with it, then apply the optional status filters.
    pub fn filter(
        &self,
        queries: &[String],
        expired: Option<bool>,
        failed: Option<bool>,
        completed: Option<bool>,
    ) -> Result<Vec<CacheEntry>, Error> {
        let mut entries = self.all()?;
        entries.retain(|entry| {
            queries
                .iter()
                .all(|q| entry.url.contains(q.as_str()) || entry.uid.starts_with(q.as_str()))
        });
        if let Some(want) = expired {
            entries.retain(|entry| self.is_expired(entry) == want);
        }
        if let Some(want) = failed {
            entries.retain(|entry| (entry.status == CacheStatus::Failed) == want);
        }
        if let Some(want) = completed {
            entries.retain(|entry| (entry.status == CacheStatus::Completed) == want);
        }
        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.uid.clone()));
        Ok(entries)
    }
}
