use std::env;

use color_eyre::eyre::Result;
use log::debug;
use structopt::StructOpt;

mod commands;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "minato",
    about = "Cache & file access for both local and remote resources.",
    setting = structopt::clap::AppSettings::ColoredHelp,
)]
enum Opt {
    /// Cache a remote file and print the cached local path.
    Cache(commands::cache::CacheOpt),
    /// Show a table of cached files.
    List(commands::list::ListOpt),
    /// Remove cached files.
    Remove(commands::remove::RemoveOpt),
    /// Re-download cached files.
    Update(commands::update::UpdateOpt),
    /// Download a resource to a local path without touching the cache.
    Download(commands::download::DownloadOpt),
    /// Upload a local file or directory to a remote location.
    Upload(commands::upload::UploadOpt),
}

fn init_logger() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().filter("MINATO_LOG_LEVEL"));
    if env::var_os("MINATO_DEBUG").is_some() {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logger();

    let opt = Opt::from_args();
    debug!("{:?}", opt);

    match opt {
        Opt::Cache(opt) => commands::cache::run(opt),
        Opt::List(opt) => commands::list::run(opt),
        Opt::Remove(opt) => commands::remove::run(opt),
        Opt::Update(opt) => commands::update::run(opt),
        Opt::Download(opt) => commands::download::run(opt),
        Opt::Upload(opt) => commands::upload::run(opt),
    }
}
