use std::path::PathBuf;

use color_eyre::eyre::Result;
use log::warn;
use structopt::StructOpt;

use minato::{Config, Minato, Options};

#[derive(Debug, StructOpt)]
pub struct UpdateOpt {
    /// Select caches whose URL contains these terms or whose uid starts with
    /// them.
    query: Vec<String>,

    /// Refresh only caches whose upstream version has changed.
    #[structopt(long)]
    auto: bool,

    /// Update without confirmation.
    #[structopt(long)]
    force: bool,

    /// Re-download even if the cached copy looks fresh.
    #[structopt(long)]
    force_download: bool,

    /// Re-extract archives even if an extraction already exists.
    #[structopt(long)]
    force_extract: bool,

    /// Select only expired caches.
    #[structopt(long)]
    expired: bool,

    /// Select only caches whose download failed.
    #[structopt(long)]
    failed: bool,

    /// New expiry of the caches in days; negative never expires.
    #[structopt(long)]
    expire_days: Option<i64>,

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

pub fn run(opt: UpdateOpt) -> Result<()> {
    let config = Config::load_with_root(opt.root.clone())?;
    let minato = Minato::new(&config)?;

    let mut entries =
        minato
            .cache()
            .filter(&opt.query, flag(opt.expired), flag(opt.failed), None)?;

    if opt.auto {
        entries.retain(|entry| match minato.available_update(&entry.url) {
            Ok(available) => available,
            Err(err) => {
                warn!("could not check {} for updates: {}", entry.url, err);
                false
            }
        });
    }

    if entries.is_empty() {
        println!("No caches to update.");
        return Ok(());
    }

    println!("{} caches will be updated:", entries.len());
    for entry in &entries {
        println!("  [{}] {}", entry.short_uid(), entry.url);
    }

    if !opt.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Update these caches?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("canceled");
            return Ok(());
        }
    }

    for entry in &entries {
        let options = Options {
            extract: entry.extraction_path.is_some(),
            auto_update: if opt.auto { Some(true) } else { None },
            expire_days: opt.expire_days,
            force_download: opt.force_download || !opt.auto,
            force_extract: opt.force_extract,
            retry: true,
        };
        minato.cached_path_with_options(&entry.url, &options)?;
    }
    println!("Cache files were successfully updated.");
    Ok(())
}
