use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result};
use structopt::StructOpt;

use minato::{Config, Minato, Options};

use crate::commands::selector;

#[derive(Debug, StructOpt)]
pub struct CacheOpt {
    /// The file path or URL to cache. Prompted interactively when omitted.
    url: Option<String>,

    /// Extract the cached archive file.
    #[structopt(long)]
    extract: bool,

    /// Download a new version if the upstream has changed.
    #[structopt(long)]
    auto_update: bool,

    /// Download the file whether a cached copy exists or not.
    #[structopt(long)]
    force_download: bool,

    /// Re-extract the archive even if an extraction already exists.
    #[structopt(long)]
    force_extract: bool,

    /// Do not retry a resolution whose previous attempt failed.
    #[structopt(long)]
    not_retry: bool,

    /// Expiry of the cache in days; negative never expires.
    #[structopt(long)]
    expire_days: Option<i64>,

    /// Root directory of the cached data.
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,
}

pub fn run(opt: CacheOpt) -> Result<()> {
    let config = Config::load_with_root(opt.root.clone())?;
    let minato = Minato::new(&config)?;

    let url = match opt.url {
        Some(url) => url,
        None => {
            let candidates: Vec<String> = minato
                .cache()
                .all()?
                .into_iter()
                .map(|entry| entry.url)
                .collect();
            selector::select(&config, candidates)?.ok_or_else(|| eyre!("no URL selected"))?
        }
    };

    let options = Options {
        extract: opt.extract,
        auto_update: if opt.auto_update { Some(true) } else { None },
        expire_days: opt.expire_days,
        force_download: opt.force_download,
        force_extract: opt.force_extract,
        retry: !opt.not_retry,
    };
    let path = minato.cached_path_with_options(&url, &options)?;
    println!("{}", path.display());
    Ok(())
}
