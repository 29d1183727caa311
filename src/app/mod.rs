mod catalog;
mod episode;
mod history;
mod metadata;
mod playback;
mod route;
mod tui;


use anyhow::{Context, Result, anyhow, bail};

use crate::cli::{Cli, Command, PlayArgs};
use crate::config::Config;
use crate::db::Database;
use crate::paths::database_file_path;
use crate::tmdb::{ListingMedia, TmdbClient};

pub(crate) use self::playback::MediaKind;

use self::catalog::{fetch_rows, kind_of, select_rows, watch_path};
use self::episode::{episode_code, format_timestamp_display, truncate};
use self::history::{HistoryKey, WatchHistory};
use self::playback::{
    CommandOpener, LaunchReport, WatchSession, WatchTarget, build_provider_list,
    play_with_fallback, provider_count,
};
use self::route::{canonical_path, content_id_from_slug, parse_watch_route};

pub(crate) fn run(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Some(Command::Browse { row }) => run_browse(config, row.as_deref())?,
        Some(Command::Search { query }) => run_search(config, &query)?,
        Some(Command::Watch { route, play }) => {
            run_watch(&open_db(config)?, config, &route, &play)?
        }
        Some(Command::Movie { id, play }) => {
            let target = WatchTarget::movie(resolve_id(&id)?);
            play_target(&open_db(config)?, config, target, &play)?
        }
        Some(Command::Tv {
            id,
            season,
            episode,
            play,
        }) => {
            let target = WatchTarget::tv(resolve_id(&id)?, season, episode);
            play_target(&open_db(config)?, config, target, &play)?
        }
        Some(Command::Anime { id, episode, play }) => {
            let target = WatchTarget::anime(resolve_id(&id)?, episode);
            play_target(&open_db(config)?, config, target, &play)?
        }
        Some(Command::Providers {
            kind,
            id,
            season,
            episode,
        }) => run_providers(kind, &id, season, episode)?,
        Some(Command::History { clear }) => run_history(&open_db(config)?, clear)?,
        Some(Command::Forget {
            id,
            season,
            episode,
        }) => run_forget(&open_db(config)?, &id, season, episode)?,
        Some(Command::Tui) | None => tui::run_tui(&open_db(config)?, config)?,
    }

    Ok(())
}

fn run_browse(config: &Config, row_filter: Option<&str>) -> Result<()> {
    let rows = select_rows(row_filter);
    if rows.is_empty() {
        bail!(
            "no curated row matches '{}'",
            row_filter.unwrap_or_default()
        );
    }
    let client = tmdb_client(config)?;
    let fetched = fetch_rows(&client, &rows);
    if fetched.is_empty() {
        bail!("failed to load any rows; see the log for details");
    }

    for row in fetched {
        println!("\n{}", row.title);
        for show in row.shows.iter().take(10) {
            let kind = kind_of(show, row.media);
            println!(
                "  {:<6} {:<40} {:<6} {}",
                kind,
                truncate(show.display_title(), 40),
                show.year().unwrap_or("-"),
                watch_path(show, kind)
            );
        }
    }
    Ok(())
}

fn run_search(config: &Config, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("search query cannot be empty");
    }
    let results = tmdb_client(config)?.search(query)?;
    if results.is_empty() {
        println!("No results for \"{query}\".");
        return Ok(());
    }

    println!("{:<6} {:<40} {:<6} {}", "TYPE", "TITLE", "YEAR", "ROUTE");
    for show in &results {
        let kind = kind_of(show, ListingMedia::Movie);
        println!(
            "{:<6} {:<40} {:<6} {}",
            kind,
            truncate(show.display_title(), 40),
            show.year().unwrap_or("-"),
            watch_path(show, kind)
        );
    }
    Ok(())
}

fn run_watch(db: &Database, config: &Config, raw_route: &str, play: &PlayArgs) -> Result<()> {
    let route = parse_watch_route(raw_route)?;
    let path = canonical_path(&route.target, &route.slug);
    if route.redirect.is_some() {
        println!("Redirecting to {path}");
    } else {
        println!("Opening {path}");
    }
    play_target(db, config, route.target, play)
}

fn play_target(db: &Database, config: &Config, target: WatchTarget, play: &PlayArgs) -> Result<()> {
    let mut session = WatchSession::open(target);
    if let Some(index) = play.provider {
        session
            .select_provider(index)
            .context("invalid --provider")?;
    }

    WatchHistory::new(db).record(session.history_entry());

    if play.print {
        println!(
            "{}\t{}",
            session.current_provider().name,
            session.current_url()
        );
        return Ok(());
    }

    let opener = CommandOpener::new(config.opener.clone());
    let report = play_with_fallback(&mut session, &opener, !play.no_fallback);
    if !matches!(report, LaunchReport::Launched { .. }) {
        tracing::warn!(title = %session.target().label(), ?report, "playback gave up");
    }
    println!("{}", launch_summary(&session, &report));
    Ok(())
}

/// Launch failures end the attempt with a notice rather than an error exit,
/// the same way the dashboard shows them.
fn launch_summary(session: &WatchSession, report: &LaunchReport) -> String {
    match report {
        LaunchReport::Launched {
            index,
            name,
            url,
            failed_attempts,
        } => {
            let mut out = String::new();
            if *failed_attempts > 0 {
                out.push_str(&format!(
                    "{failed_attempts} source(s) failed to open; fell back.\n"
                ));
            }
            out.push_str(&format!(
                "Playing {} via {name} [{index}]\n  {url}",
                session.target().label()
            ));
            out
        }
        LaunchReport::Failed { index, error } => {
            format!("Source {index} failed to open: {error}\nTry --provider with another index.")
        }
        LaunchReport::Exhausted { failed_attempts } => {
            format!("All sources failed to load ({failed_attempts} tried).")
        }
    }
}

fn run_providers(
    kind: MediaKind,
    id: &str,
    season: Option<u32>,
    episode: Option<u32>,
) -> Result<()> {
    let id = resolve_id(id)?;
    let target = match kind {
        MediaKind::Movie => WatchTarget::movie(id),
        MediaKind::Tv => WatchTarget::tv(id, season.unwrap_or(1), episode.unwrap_or(1)),
        MediaKind::Anime => WatchTarget::anime(id, episode.unwrap_or(1)),
    };
    println!(
        "{} sources for {}",
        provider_count(kind),
        target.label()
    );
    println!("{:<4} {:<24} URL", "#", "NAME");
    for (index, provider) in build_provider_list(&target).iter().enumerate() {
        println!("{:<4} {:<24} {}", index, provider.name, provider.url);
    }
    Ok(())
}

fn run_history(db: &Database, clear: bool) -> Result<()> {
    let history = WatchHistory::new(db);
    if clear {
        let count = history.list().len();
        history.clear()?;
        println!("Cleared {count} history entries.");
        return Ok(());
    }

    let entries = history.list();
    if entries.is_empty() {
        println!("No watch history yet. Play something with `netprime watch` first.");
        return Ok(());
    }

    println!("{:<6} {:<12} {:<8} {:<18}", "TYPE", "ID", "EPISODE", "WATCHED");
    for entry in entries {
        println!(
            "{:<6} {:<12} {:<8} {:<18}",
            entry.kind,
            truncate(&entry.id, 12),
            episode_code(entry.season, entry.episode),
            format_timestamp_display(&entry.timestamp)
        );
    }
    Ok(())
}

fn run_forget(db: &Database, id: &str, season: Option<u32>, episode: Option<u32>) -> Result<()> {
    let id = resolve_id(id)?;
    let history = WatchHistory::new(db);
    if season.is_none() && episode.is_none() {
        let removed = history.remove_title(&id)?;
        match removed {
            0 => println!("No history entries for {id}."),
            n => println!("Removed {n} history entries for {id}."),
        }
        return Ok(());
    }

    let key = HistoryKey {
        id: id.clone(),
        season,
        episode,
    };
    if history.remove(&key)? {
        println!("Removed {id} {} from history.", episode_code(season, episode));
    } else {
        println!("No history entry for {id} {}.", episode_code(season, episode));
    }
    Ok(())
}

fn resolve_id(raw: &str) -> Result<String> {
    content_id_from_slug(raw)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("'{}' does not end in a numeric id", raw.trim()))
}

pub(crate) fn tmdb_client(config: &Config) -> Result<TmdbClient> {
    let key = config.tmdb_api_key.as_deref().ok_or_else(|| {
        anyhow!("no TMDB API key configured; set NETPRIME_TMDB_KEY or tmdb.api_key in config.toml")
    })?;
    TmdbClient::new(key, config.tmdb_base_url.clone())
}

fn open_db(config: &Config) -> Result<Database> {
    let db_path = database_file_path(&config.data_dir);
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}
