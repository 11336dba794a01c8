use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use color_eyre::eyre::Result;
use human_bytes::human_bytes;
use structopt::StructOpt;

use minato::util::is_archive_file;
use minato::{Cache, CacheEntry, Config};

use crate::commands::table::Table;

#[derive(Debug, StructOpt)]
pub struct ListOpt {
    /// Show only caches whose URL contains these terms or whose uid starts
    /// with them.
    query: Vec<String>,

    /// Sort by the given column.
    #[structopt(long)]
    sort: Option<String>,

    /// Sort in descending order.
    #[structopt(long)]
    desc: bool,

    /// Show paths and timestamps as well.
    #[structopt(long)]
    details: bool,

    /// Maximum column width; longer cells are truncated.
    #[structopt(long)]
    column_width: Option<usize>,

    /// Show only expired caches.
    #[structopt(long)]
    expired: bool,

    /// Show only caches whose download failed.
    #[structopt(long)]
    failed: bool,

    /// Show only completed caches.
    #[structopt(long)]
    completed: bool,

    /// Root directory of the cached data.
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,
}

fn flag(set: bool) -> Option<bool> {
    if set {
        Some(true)
    } else {
        None
    }
}

fn cache_type(path: &Path) -> &'static str {
    if path.is_dir() {
        "dir"
    } else if is_archive_file(path) {
        "archive"
    } else {
        "file"
    }
}

fn size_of(path: &Path) -> String {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => human_bytes(metadata.len() as f64),
        _ => "-".to_string(),
    }
}

fn expire_of(cache: &Cache, entry: &CacheEntry) -> String {
    if cache.is_expired(entry) {
        format!("EXPIRED({})", entry.expire_days)
    } else if entry.expire_days < 0 {
        "NONE".to_string()
    } else {
        let elapsed = (Utc::now() - entry.updated_at).num_days();
        format!("{}/{}", elapsed, entry.expire_days)
    }
}

pub fn run(opt: ListOpt) -> Result<()> {
    let config = Config::load_with_root(opt.root.clone())?;
    let cache = Cache::from_config(&config)?;

    let entries = cache.filter(
        &opt.query,
        flag(opt.expired),
        flag(opt.failed),
        flag(opt.completed),
    )?;

    let mut columns = vec!["uid", "url", "size", "type", "status", "expire_days"];
    if opt.details {
        columns.extend_from_slice(&["local_path", "created_at", "updated_at", "extraction_path"]);
    }

    let mut table = Table::new(&columns, opt.column_width);
    for entry in &entries {
        let mut row = vec![
            entry.short_uid().to_string(),
            entry.url.clone(),
            size_of(&entry.local_path),
            cache_type(&entry.local_path).to_string(),
            entry.status.to_string(),
            expire_of(&cache, entry),
        ];
        if opt.details {
            row.push(entry.local_path.display().to_string());
            row.push(entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
            row.push(entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string());
            row.push(
                entry
                    .extraction_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        table.add_row(row);
    }

    if let Some(key) = &opt.sort {
        table.sort(key, opt.desc)?;
    }
    table.print()?;
    Ok(())
}
