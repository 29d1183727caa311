use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const APP_DIR: &str = "netprime";

pub fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join(APP_DIR))
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_DIR).join("config.toml"))
}

pub fn database_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("netprime.db")
}

pub fn log_file_name() -> &'static str {
    "netprime.log"
}
