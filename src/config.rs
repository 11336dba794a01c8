use std::env;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use log::debug;

use crate::error::Error;

const DEFAULT_EXPIRE_DAYS: i64 = -1;
const DEFAULT_AUTO_UPDATE: bool = true;

/// Layered configuration: built-in defaults, then `$HOME/.minato/config.ini`,
/// then `./minato.ini`, then call-site overrides. Later layers win.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the cached payloads and their metadata.
    pub cache_root: PathBuf,
    /// Default expiry in days for new entries; negative means never.
    pub expire_days: i64,
    /// Default upstream-version checking for new entries.
    pub auto_update: bool,
    /// External command used by the CLI to pick a URL interactively.
    pub selector_command: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Config::load_with_root(None)
    }

    /// Load configuration, optionally overriding the cache root.
    pub fn load_with_root(cache_root: Option<PathBuf>) -> Result<Config, Error> {
        let minato_root = dirs::home_dir()
            .map(|home| home.join(".minato"))
            .unwrap_or_else(|| PathBuf::from(".minato"));

        let mut config = Config {
            cache_root: minato_root.join("cache"),
            expire_days: DEFAULT_EXPIRE_DAYS,
            auto_update: DEFAULT_AUTO_UPDATE,
            selector_command: None,
        };

        config.apply_file(&minato_root.join("config.ini"))?;
        config.apply_file(Path::new("minato.ini"))?;

        if let Ok(command) = env::var("MINATO_SELECTOR_COMMAND") {
            if !command.is_empty() {
                config.selector_command = Some(command);
            }
        }
        if let Some(root) = cache_root {
            config.cache_root = root;
        }
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), Error> {
        if !path.is_file() {
            return Ok(());
        }
        debug!("reading config file {:?}", path);
        let mut ini = Ini::new();
        ini.load(path).map_err(|err| {
            Error::Config(format!("failed to parse {}: {}", path.display(), err))
        })?;

        if let Some(root) = ini.get("cache", "root") {
            self.cache_root = PathBuf::from(root);
        }
        if let Some(days) = ini.get("cache", "expire_days") {
            self.expire_days = days.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "invalid expire_days in {}: {}",
                    path.display(),
                    days
                ))
            })?;
        }
        if let Some(auto) = ini.get("cache", "auto_update") {
            self.auto_update = parse_bool(&auto).ok_or_else(|| {
                Error::Config(format!(
                    "invalid auto_update in {}: {}",
                    path.display(),
                    auto
                ))
            })?;
        }
        if let Some(command) = ini.get("ui", "selector_command") {
            self.selector_command = Some(command);
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
