use std::path::PathBuf;

use color_eyre::eyre::Result;
use structopt::StructOpt;

use minato::{Config, Minato};

#[derive(Debug, StructOpt)]
pub struct RemoveOpt {
    /// Select caches whose URL contains these terms or whose uid starts with
    /// them.
    query: Vec<String>,

    /// Select only expired caches.
    #[structopt(long)]
    expired: bool,

    /// Select only caches whose download failed.
    #[structopt(long)]
    failed: bool,

    /// Delete without confirmation.
    #[structopt(long)]
    force: bool,

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

pub fn run(opt: RemoveOpt) -> Result<()> {
    let config = Config::load_with_root(opt.root.clone())?;
    let minato = Minato::new(&config)?;

    let entries =
        minato
            .cache()
            .filter(&opt.query, flag(opt.expired), flag(opt.failed), None)?;

    if entries.is_empty() {
        println!("No caches to delete.");
        return Ok(());
    }

    println!("{} caches:", entries.len());
    for entry in &entries {
        println!("  [{}] {}", entry.short_uid(), entry.url);
    }

    if !opt.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Delete these caches?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("canceled");
            return Ok(());
        }
    }

    for entry in &entries {
        minato.remove(entry)?;
    }
    println!("Cache files were successfully deleted.");
    Ok(())
}
