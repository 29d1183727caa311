mod app;
mod cli;
mod config;
mod db;
mod http;
mod logging;
mod paths;
mod tmdb;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::load()?;
    let _log_guard = logging::init(&config.data_dir)?;
    tracing::debug!(data_dir = %config.data_dir.display(), "starting netprime");
    app::run(cli, &config)
}
