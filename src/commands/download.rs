use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result};
use structopt::StructOpt;

use minato::Minato;

#[derive(Debug, StructOpt)]
pub struct DownloadOpt {
    /// The URL to download.
    url: String,

    /// The local target path.
    #[structopt(parse(from_os_str))]
    path: PathBuf,

    /// Replace the target if it already exists.
    #[structopt(long)]
    overwrite: bool,
}

pub fn run(opt: DownloadOpt) -> Result<()> {
    if opt.path.is_file() && !opt.overwrite {
        return Err(eyre!(
            "{} already exists; use --overwrite to replace it",
            opt.path.display()
        ));
    }
    Minato::download(&opt.url, &opt.path)?;
    Ok(())
}
