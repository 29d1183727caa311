mod actions;
mod render;
mod session;

use std::collections::HashMap;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::config::Config;
use crate::db::Database;

use super::episode::{SeasonInfo, episode_code, truncate};
use super::history::{HistoryKey, WatchHistory, WatchHistoryEntry};
use super::metadata::TitleDetails;
use super::playback::{CommandOpener, MediaKind, WatchSession};
use super::tmdb_client;

use self::actions::{
    WatchKeyOutcome, drain_details_results, ensure_details, handle_watch_key, refresh_items,
    status_error, status_info,
};
use self::render::{draw_library, draw_watch};
use self::session::TuiSession;

/// Details are cached per title, not per episode.
pub(super) type DetailsKey = (MediaKind, String);

#[derive(Debug, Clone)]
pub(super) struct PendingDelete {
    pub(super) key: HistoryKey,
    pub(super) label: String,
}

#[derive(Debug, Clone)]
pub(super) struct PendingNotice {
    pub(super) title: &'static str,
    pub(super) message: String,
}

#[derive(Debug)]
pub(super) struct DetailsFetchResult {
    pub(super) key: DetailsKey,
    pub(super) details: Result<Option<TitleDetails>, String>,
}

#[derive(Debug, Clone)]
pub(super) enum DetailsState {
    Loading,
    Ready(Option<TitleDetails>),
    Failed(String),
    Unavailable,
}

impl DetailsState {
    pub(super) fn details(&self) -> Option<&TitleDetails> {
        match self {
            Self::Ready(Some(details)) => Some(details),
            _ => None,
        }
    }

    pub(super) fn seasons(&self) -> &[SeasonInfo] {
        self.details()
            .map(|details| details.seasons.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PickerKind {
    Season,
    Episode,
}

/// Season or episode list popup. Like the source dropdown, the cursor only
/// takes effect on Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct EpisodePicker {
    pub(super) kind: PickerKind,
    pub(super) cursor: usize,
}

/// The watch screen: an open title plus the dropdown cursor, which only
/// commits to the selector on Enter.
#[derive(Debug, Clone)]
pub(super) struct WatchView {
    pub(super) session: WatchSession,
    pub(super) dropdown_cursor: usize,
    pub(super) picker: Option<EpisodePicker>,
}

impl WatchView {
    pub(super) fn new(session: WatchSession) -> Self {
        let dropdown_cursor = session.selection().selected();
        Self {
            session,
            dropdown_cursor,
            picker: None,
        }
    }

    pub(super) fn details_key(&self) -> DetailsKey {
        let target = self.session.target();
        (target.kind, target.id.clone())
    }
}

enum Screen {
    Library,
    Watch(WatchView),
}

fn details_key_of(entry: &WatchHistoryEntry) -> DetailsKey {
    (entry.kind, entry.id.clone())
}

fn entry_label(entry: &WatchHistoryEntry) -> String {
    match entry.kind {
        MediaKind::Movie => format!("movie {}", entry.id),
        kind => format!(
            "{kind} {} {}",
            entry.id,
            episode_code(entry.season, entry.episode)
        ),
    }
}

pub(crate) fn run_tui(db: &Database, config: &Config) -> Result<()> {
    let history = WatchHistory::new(db);
    let client = match tmdb_client(config) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::info!(error = %err, "dashboard running without metadata");
            None
        }
    };
    let opener = CommandOpener::new(config.opener.clone());

    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut items = history.list();
    let mut table_state = TableState::default();
    table_state.select((!items.is_empty()).then_some(0));
    let mut screen = Screen::Library;
    let mut last_session = None::<WatchSession>;
    let mut pending_delete = None::<PendingDelete>;
    let mut pending_notice = None::<PendingNotice>;
    let mut details_by_key: HashMap<DetailsKey, DetailsState> = HashMap::new();
    let (details_tx, details_rx) = mpsc::channel::<DetailsFetchResult>();
    let mut status = if items.is_empty() {
        status_info("No watch history yet. Play something with `netprime watch` first.")
    } else {
        status_info("Ready.")
    };

    loop {
        drain_details_results(&details_rx, &mut details_by_key);
        let focused = match &screen {
            Screen::Library => table_state
                .selected()
                .and_then(|idx| items.get(idx))
                .map(details_key_of),
            Screen::Watch(view) => Some(view.details_key()),
        };
        if let Some(key) = focused {
            ensure_details(client.as_ref(), key, &mut details_by_key, &details_tx);
        }

        terminal.draw(|frame| match &screen {
            Screen::Library => draw_library(
                frame,
                &items,
                &mut table_state,
                &status,
                pending_delete.as_ref(),
                pending_notice.as_ref(),
                &details_by_key,
            ),
            Screen::Watch(view) => draw_watch(
                frame,
                view,
                &status,
                pending_notice.as_ref(),
                details_by_key.get(&view.details_key()),
            ),
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if pending_notice.is_some() {
            pending_notice = None;
            continue;
        }

        if let Some(dialog) = pending_delete.as_ref() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let deleting = dialog.clone();
                    pending_delete = None;
                    match history.remove(&deleting.key) {
                        Ok(true) => {
                            status = status_info(&format!("Deleted {}", deleting.label));
                        }
                        Ok(false) => {
                            status = status_error("Delete failed: entry no longer exists.");
                        }
                        Err(err) => status = status_error(&format!("Delete failed: {err}")),
                    }
                    refresh_items(&history, &mut items, &mut table_state, None);
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    pending_delete = None;
                    status = status_info("Delete canceled.");
                }
                _ => {}
            }
            continue;
        }

        let mut leave_watch = false;
        let mut open_view = None::<WatchView>;
        match &mut screen {
            Screen::Library => match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Up => {
                    if let Some(selected) = table_state.selected() {
                        table_state.select(Some(selected.saturating_sub(1)));
                    }
                }
                KeyCode::Down => {
                    if let Some(selected) = table_state.selected()
                        && !items.is_empty()
                    {
                        let next = (selected + 1).min(items.len().saturating_sub(1));
                        table_state.select(Some(next));
                    }
                }
                KeyCode::Char('d') => {
                    let Some(entry) = table_state.selected().and_then(|idx| items.get(idx)) else {
                        status = status_error("Delete failed: no entry selected.");
                        continue;
                    };
                    pending_delete = Some(PendingDelete {
                        key: entry.key(),
                        label: entry_label(entry),
                    });
                    status = status_info("Confirm delete: y/Enter to delete, n/Esc to cancel.");
                }
                KeyCode::Enter => {
                    let Some(entry) = table_state.selected().and_then(|idx| items.get(idx)) else {
                        continue;
                    };
                    // Reopening the same title keeps its source; another title starts over.
                    let watch = match last_session.take() {
                        Some(mut previous) => {
                            previous.close_dropdown();
                            previous.navigate(entry.target());
                            previous
                        }
                        None => WatchSession::open(entry.target()),
                    };
                    history.record(watch.history_entry());
                    status = status_info(&format!(
                        "Opened {}. Enter to play, p to pick a source.",
                        truncate(&watch.target().label(), 40)
                    ));
                    open_view = Some(WatchView::new(watch));
                }
                _ => {}
            },
            Screen::Watch(view) => {
                let seasons = details_by_key
                    .get(&view.details_key())
                    .map(DetailsState::seasons)
                    .unwrap_or_default();
                match handle_watch_key(view, key.code, &history, &opener, seasons) {
                    WatchKeyOutcome::Ignored => {}
                    WatchKeyOutcome::Status(message) => status = message,
                    WatchKeyOutcome::Notice { title, message } => {
                        status = status_info(&message);
                        pending_notice = Some(PendingNotice {
                            title,
                            message: format!("{message}\n\nPress any key to continue."),
                        });
                    }
                    WatchKeyOutcome::Back => leave_watch = true,
                }
            }
        }

        if let Some(view) = open_view {
            screen = Screen::Watch(view);
        }
        if leave_watch {
            let open_key = match std::mem::replace(&mut screen, Screen::Library) {
                Screen::Watch(view) => {
                    let key = view.session.history_entry().key();
                    last_session = Some(view.session);
                    Some(key)
                }
                Screen::Library => None,
            };
            refresh_items(&history, &mut items, &mut table_state, open_key.as_ref());
            status = status_info("Back to library.");
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}
