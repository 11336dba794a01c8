use std::path::PathBuf;

use color_eyre::eyre::Result;
use structopt::StructOpt;

use minato::Minato;

#[derive(Debug, StructOpt)]
pub struct UploadOpt {
    /// The local file or directory to upload.
    #[structopt(parse(from_os_str))]
    path: PathBuf,

    /// The remote target URL.
    url: String,
}

pub fn run(opt: UploadOpt) -> Result<()> {
    Minato::upload(&opt.path, &opt.url)?;
    Ok(())
}
