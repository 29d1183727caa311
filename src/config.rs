use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::paths::{config_file_path, default_data_dir};

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub tmdb: TmdbSection,
    pub player: PlayerSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerSection {
    /// Command used to open embed URLs, e.g. `firefox --new-tab`.
    pub opener: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub opener: OpenerCommand,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl OpenerCommand {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                program: "open".to_string(),
                args: Vec::new(),
            }
        } else if cfg!(windows) {
            Self {
                program: "cmd".to_string(),
                args: vec!["/C".to_string(), "start".to_string(), String::new()],
            }
        } else {
            Self {
                program: "xdg-open".to_string(),
                args: Vec::new(),
            }
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let file = match config_file_path() {
            Some(path) => read_file_config(&path)?,
            None => FileConfig::default(),
        };
        let default_dir = default_data_dir()?;
        Ok(Self::resolve(file, default_dir, |key| env::var(key).ok()))
    }

    /// Merges the config file with environment overrides. Environment wins.
    pub fn resolve<F>(file: FileConfig, default_data_dir: PathBuf, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let tmdb_api_key = non_empty("NETPRIME_TMDB_KEY")
            .or_else(|| non_empty("TMDB_API_KEY"))
            .or(file.tmdb.api_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let tmdb_base_url = non_empty("NETPRIME_TMDB_BASE_URL")
            .or(file.tmdb.base_url)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_TMDB_BASE_URL.to_string());
        let opener = non_empty("NETPRIME_OPENER")
            .or(file.player.opener)
            .as_deref()
            .and_then(OpenerCommand::parse)
            .unwrap_or_else(OpenerCommand::platform_default);
        let data_dir = non_empty("NETPRIME_DATA_DIR")
            .map(PathBuf::from)
            .or(file.storage.data_dir)
            .unwrap_or(default_data_dir);

        Self {
            tmdb_api_key,
            tmdb_base_url,
            opener,
            data_dir,
        }
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    parse_file_config(&raw).with_context(|| format!("invalid config at {}", path.display()))
}

pub fn parse_file_config(raw: &str) -> Result<FileConfig> {
    Ok(toml::from_str(raw)?)
}
