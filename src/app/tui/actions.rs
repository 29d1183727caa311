use std::collections::HashMap;
use std::sync::mpsc;

use crossterm::event::KeyCode;
use ratatui::widgets::TableState;

use crate::db::KeyValueStore;
use crate::tmdb::TmdbClient;

use super::super::episode::{SeasonInfo, truncate};
use super::super::history::{HistoryKey, WatchHistory, WatchHistoryEntry};
use super::super::metadata::fetch_details;
use super::super::playback::{
    EpisodeChange, FailureOutcome, LaunchReport, MediaKind, Opener, Step, play_with_fallback,
};
use super::{DetailsFetchResult, DetailsKey, DetailsState, EpisodePicker, PickerKind, WatchView};

pub(super) fn refresh_items<S: KeyValueStore + ?Sized>(
    history: &WatchHistory<'_, S>,
    items: &mut Vec<WatchHistoryEntry>,
    table_state: &mut TableState,
    preferred: Option<&HistoryKey>,
) {
    *items = history.list();
    if items.is_empty() {
        table_state.select(None);
        return;
    }

    if let Some(key) = preferred
        && let Some(idx) = items.iter().position(|item| item.key() == *key)
    {
        table_state.select(Some(idx));
        return;
    }

    match table_state.selected() {
        Some(selected) => table_state.select(Some(selected.min(items.len() - 1))),
        None => table_state.select(Some(0)),
    }
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

/// Starts a background fetch for `key` unless one already ran. Without a
/// client the title is marked unavailable once and never retried.
pub(super) fn ensure_details(
    client: Option<&TmdbClient>,
    key: DetailsKey,
    details_by_key: &mut HashMap<DetailsKey, DetailsState>,
    tx: &mpsc::Sender<DetailsFetchResult>,
) {
    if details_by_key.contains_key(&key) {
        return;
    }
    let Some(client) = client else {
        details_by_key.insert(key, DetailsState::Unavailable);
        return;
    };
    if key.0 == MediaKind::Anime {
        details_by_key.insert(key, DetailsState::Ready(None));
        return;
    }

    details_by_key.insert(key.clone(), DetailsState::Loading);
    let client = client.clone();
    let tx = tx.clone();
    std::thread::spawn(move || {
        let (kind, id) = &key;
        let details = fetch_details(&client, *kind, id).map_err(|err| {
            tracing::warn!(%id, error = %format!("{err:#}"), "failed to load title details");
            format!("{err:#}")
        });
        let _ = tx.send(DetailsFetchResult { key, details });
    });
}

/// Applies finished fetches. Results for titles nobody is waiting on any
/// more are dropped.
pub(super) fn drain_details_results(
    rx: &mpsc::Receiver<DetailsFetchResult>,
    details_by_key: &mut HashMap<DetailsKey, DetailsState>,
) {
    while let Ok(result) = rx.try_recv() {
        let Some(state) = details_by_key.get_mut(&result.key) else {
            continue;
        };
        if !matches!(state, DetailsState::Loading) {
            continue;
        }
        *state = match result.details {
            Ok(details) => DetailsState::Ready(details),
            Err(err) => DetailsState::Failed(err),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum WatchKeyOutcome {
    Ignored,
    Status(String),
    Notice {
        title: &'static str,
        message: String,
    },
    Back,
}

pub(super) fn handle_watch_key<S: KeyValueStore + ?Sized>(
    view: &mut WatchView,
    code: KeyCode,
    history: &WatchHistory<'_, S>,
    opener: &dyn Opener,
    seasons: &[SeasonInfo],
) -> WatchKeyOutcome {
    if view.session.selection().dropdown_open() {
        return handle_dropdown_key(view, code);
    }
    if let Some(picker) = view.picker {
        return handle_picker_key(view, picker, code, history, seasons);
    }

    match code {
        KeyCode::Esc => WatchKeyOutcome::Back,
        KeyCode::Char('p') => {
            view.session.toggle_dropdown();
            view.dropdown_cursor = view.session.selection().selected();
            WatchKeyOutcome::Status(status_info(
                "Pick a source: ↑/↓ move, Enter select, Esc close.",
            ))
        }
        KeyCode::Enter => launch(view, opener),
        KeyCode::Char('f') => match view.session.report_failure() {
            FailureOutcome::Advanced(index) => {
                view.dropdown_cursor = index;
                WatchKeyOutcome::Status(status_info(&format!(
                    "Switched to {}.",
                    view.session.current_provider().name
                )))
            }
            FailureOutcome::Exhausted => WatchKeyOutcome::Notice {
                title: "Playback Failed",
                message: "All sources failed to load.".to_string(),
            },
        },
        KeyCode::Char('a') => {
            let on = view.session.toggle_auto_next();
            WatchKeyOutcome::Status(status_info(if on {
                "Auto-next on."
            } else {
                "Auto-next off."
            }))
        }
        KeyCode::Char('s') => open_picker(view, PickerKind::Season, seasons),
        KeyCode::Char('l') => open_picker(view, PickerKind::Episode, seasons),
        KeyCode::Char('n') => step(view, Step::Next, history, seasons),
        KeyCode::Char('b') => step(view, Step::Previous, history, seasons),
        KeyCode::Char('e') => {
            if !view.session.auto_next() {
                return WatchKeyOutcome::Status(status_info(
                    "Episode finished. Auto-next is off.",
                ));
            }
            match view.session.on_playback_finished(seasons) {
                Some(change) => {
                    apply_change(view, history, change);
                    launch(view, opener)
                }
                None => no_more_episodes(view, Step::Next, seasons),
            }
        }
        _ => WatchKeyOutcome::Ignored,
    }
}

fn handle_dropdown_key(view: &mut WatchView, code: KeyCode) -> WatchKeyOutcome {
    let count = view.session.providers().len();
    match code {
        KeyCode::Up => {
            view.dropdown_cursor = view.dropdown_cursor.saturating_sub(1);
            WatchKeyOutcome::Ignored
        }
        KeyCode::Down => {
            view.dropdown_cursor = (view.dropdown_cursor + 1).min(count.saturating_sub(1));
            WatchKeyOutcome::Ignored
        }
        KeyCode::Enter => match view.session.select_provider(view.dropdown_cursor) {
            Ok(()) => WatchKeyOutcome::Status(status_info(&format!(
                "Source set to {}.",
                view.session.current_provider().name
            ))),
            Err(err) => WatchKeyOutcome::Status(status_error(&err.to_string())),
        },
        KeyCode::Esc | KeyCode::Char('p') => {
            view.session.close_dropdown();
            view.dropdown_cursor = view.session.selection().selected();
            WatchKeyOutcome::Status(status_info("Source unchanged."))
        }
        _ => WatchKeyOutcome::Ignored,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PickerOption {
    pub(super) number: u32,
    pub(super) label: String,
    pub(super) current: bool,
}

/// Rows of the season or episode popup for a TV title. Episodes are those of
/// the season being watched.
pub(super) fn picker_options(
    view: &WatchView,
    kind: PickerKind,
    seasons: &[SeasonInfo],
) -> Vec<PickerOption> {
    let target = view.session.target();
    if target.kind != MediaKind::Tv {
        return Vec::new();
    }
    let current_season = target.season.unwrap_or(1);
    match kind {
        PickerKind::Season => seasons
            .iter()
            .filter(|season| !season.episodes.is_empty())
            .map(|season| PickerOption {
                number: season.season_number,
                label: if season.name.is_empty() {
                    format!("Season {}", season.season_number)
                } else {
                    season.name.clone()
                },
                current: season.season_number == current_season,
            })
            .collect(),
        PickerKind::Episode => seasons
            .iter()
            .find(|season| season.season_number == current_season)
            .map(|season| {
                season
                    .episodes
                    .iter()
                    .map(|ep| PickerOption {
                        number: ep.number,
                        label: format!("E{:02} {}", ep.number, ep.name),
                        current: target.episode == Some(ep.number),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn open_picker(view: &mut WatchView, kind: PickerKind, seasons: &[SeasonInfo]) -> WatchKeyOutcome {
    if view.session.target().kind != MediaKind::Tv {
        return WatchKeyOutcome::Ignored;
    }
    let options = picker_options(view, kind, seasons);
    if options.is_empty() {
        return WatchKeyOutcome::Status(status_info("Episode list is not loaded yet."));
    }
    let cursor = options.iter().position(|option| option.current).unwrap_or(0);
    view.picker = Some(EpisodePicker { kind, cursor });
    let what = match kind {
        PickerKind::Season => "season",
        PickerKind::Episode => "episode",
    };
    WatchKeyOutcome::Status(status_info(&format!(
        "Pick a {what}: ↑/↓ move, Enter select, Esc close."
    )))
}

fn handle_picker_key<S: KeyValueStore + ?Sized>(
    view: &mut WatchView,
    picker: EpisodePicker,
    code: KeyCode,
    history: &WatchHistory<'_, S>,
    seasons: &[SeasonInfo],
) -> WatchKeyOutcome {
    let options = picker_options(view, picker.kind, seasons);
    match code {
        KeyCode::Up => {
            view.picker = Some(EpisodePicker {
                cursor: picker.cursor.saturating_sub(1),
                ..picker
            });
            WatchKeyOutcome::Ignored
        }
        KeyCode::Down => {
            view.picker = Some(EpisodePicker {
                cursor: (picker.cursor + 1).min(options.len().saturating_sub(1)),
                ..picker
            });
            WatchKeyOutcome::Ignored
        }
        KeyCode::Enter => {
            view.picker = None;
            let Some(option) = options.get(picker.cursor) else {
                return WatchKeyOutcome::Ignored;
            };
            let change = match picker.kind {
                PickerKind::Season => view.session.change_season(option.number),
                PickerKind::Episode => {
                    let season = view.session.target().season.unwrap_or(1);
                    view.session.change_episode(season, option.number)
                }
            };
            match change {
                Some(change) => {
                    apply_change(view, history, change);
                    WatchKeyOutcome::Status(status_info(&format!(
                        "Now on {}.",
                        view.session.target().label()
                    )))
                }
                None => WatchKeyOutcome::Status(status_info("Already watching that.")),
            }
        }
        KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('l') => {
            view.picker = None;
            WatchKeyOutcome::Status(status_info("Episode unchanged."))
        }
        _ => WatchKeyOutcome::Ignored,
    }
}

fn launch(view: &mut WatchView, opener: &dyn Opener) -> WatchKeyOutcome {
    let report = play_with_fallback(&mut view.session, opener, true);
    view.dropdown_cursor = view.session.selection().selected();
    match report {
        LaunchReport::Launched {
            name,
            failed_attempts,
            ..
        } => {
            let label = truncate(&view.session.target().label(), 40);
            let message = if failed_attempts > 0 {
                format!("Playing {label} via {name} after {failed_attempts} failed source(s).")
            } else {
                format!("Playing {label} via {name}.")
            };
            WatchKeyOutcome::Status(status_info(&message))
        }
        LaunchReport::Failed { error, .. } => {
            WatchKeyOutcome::Status(status_error(&format!("Launch failed: {error}")))
        }
        LaunchReport::Exhausted { .. } => WatchKeyOutcome::Notice {
            title: "Playback Failed",
            message: "All sources failed to load.".to_string(),
        },
    }
}

fn step<S: KeyValueStore + ?Sized>(
    view: &mut WatchView,
    direction: Step,
    history: &WatchHistory<'_, S>,
    seasons: &[SeasonInfo],
) -> WatchKeyOutcome {
    match view.session.target().kind {
        MediaKind::Movie => WatchKeyOutcome::Ignored,
        _ => match view.session.step(direction, seasons) {
            Some(change) => {
                apply_change(view, history, change);
                WatchKeyOutcome::Status(status_info(&format!(
                    "Now on {}.",
                    view.session.target().label()
                )))
            }
            None => no_more_episodes(view, direction, seasons),
        },
    }
}

fn apply_change<S: KeyValueStore + ?Sized>(
    view: &mut WatchView,
    history: &WatchHistory<'_, S>,
    change: EpisodeChange,
) {
    history.replace(&change.previous, change.entry);
    view.dropdown_cursor = view.session.selection().selected();
}

fn no_more_episodes(view: &WatchView, direction: Step, seasons: &[SeasonInfo]) -> WatchKeyOutcome {
    if view.session.target().kind == MediaKind::Tv && seasons.is_empty() {
        return WatchKeyOutcome::Status(status_info("Episode list is not loaded yet."));
    }
    let message = match direction {
        Step::Next => "No more episodes available.",
        Step::Previous => "No previous episode available.",
    };
    WatchKeyOutcome::Notice {
        title: "No More Episodes",
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::episode::EpisodeInfo;
    use crate::app::playback::testing::ScriptedOpener;
    use crate::app::playback::{WatchSession, WatchTarget};
    use crate::db::MemoryStore;

    fn seasons() -> Vec<SeasonInfo> {
        vec![SeasonInfo {
            season_number: 1,
            name: "Season 1".to_string(),
            episodes: (1..=2)
                .map(|number| EpisodeInfo {
                    number,
                    name: format!("Episode {number}"),
                    overview: String::new(),
                    still_url: None,
                })
                .collect(),
        }]
    }

    fn three_seasons() -> Vec<SeasonInfo> {
        (1..=3)
            .map(|season_number| SeasonInfo {
                season_number,
                name: format!("Season {season_number}"),
                episodes: (1..=4)
                    .map(|number| EpisodeInfo {
                        number,
                        name: format!("Episode {number}"),
                        overview: String::new(),
                        still_url: None,
                    })
                    .collect(),
            })
            .collect()
    }

    fn view(target: WatchTarget) -> WatchView {
        WatchView::new(WatchSession::open(target))
    }

    #[test]
    fn dropdown_cursor_commits_only_on_enter() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let mut view = view(WatchTarget::movie("550"));

        handle_watch_key(&mut view, KeyCode::Char('p'), &history, &opener, &[]);
        assert!(view.session.selection().dropdown_open());
        handle_watch_key(&mut view, KeyCode::Down, &history, &opener, &[]);
        handle_watch_key(&mut view, KeyCode::Down, &history, &opener, &[]);
        assert_eq!(view.session.selection().selected(), 0);

        handle_watch_key(&mut view, KeyCode::Enter, &history, &opener, &[]);
        assert_eq!(view.session.selection().selected(), 2);
        assert!(!view.session.selection().dropdown_open());
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn failure_key_advances_then_reports_exhaustion() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let mut view = view(WatchTarget::anime("209867", 1));

        for _ in 0..2 {
            let outcome = handle_watch_key(&mut view, KeyCode::Char('f'), &history, &opener, &[]);
            assert!(matches!(outcome, WatchKeyOutcome::Status(_)));
        }
        let outcome = handle_watch_key(&mut view, KeyCode::Char('f'), &history, &opener, &[]);
        assert!(matches!(outcome, WatchKeyOutcome::Notice { .. }));
        assert_eq!(view.session.selection().selected(), 2);
    }

    #[test]
    fn next_episode_replaces_history_entry() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let mut view = view(WatchTarget::tv("1399", 1, 1));
        history.record(view.session.history_entry());

        handle_watch_key(&mut view, KeyCode::Char('n'), &history, &opener, &seasons());
        let entries = history.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].episode, Some(2));

        let outcome = handle_watch_key(&mut view, KeyCode::Char('n'), &history, &opener, &seasons());
        assert!(matches!(outcome, WatchKeyOutcome::Notice { .. }));
    }

    #[test]
    fn finished_episode_launches_next_when_auto_next_is_on() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let mut view = view(WatchTarget::tv("1399", 1, 1));

        handle_watch_key(&mut view, KeyCode::Char('e'), &history, &opener, &seasons());
        assert_eq!(view.session.target().episode, Some(1));

        handle_watch_key(&mut view, KeyCode::Char('a'), &history, &opener, &seasons());
        handle_watch_key(&mut view, KeyCode::Char('e'), &history, &opener, &seasons());
        assert_eq!(view.session.target().episode, Some(2));
        assert_eq!(opener.opened.borrow().len(), 1);
        assert_eq!(
            opener.opened.borrow()[0],
            "https://vidzee.wtf/tv/multi.php?id=1399/1/2"
        );
    }

    #[test]
    fn season_picker_restarts_at_episode_one_and_replaces_history() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let seasons = three_seasons();
        let mut view = view(WatchTarget::tv("1399", 1, 3));
        view.session.select_provider(4).expect("select");
        history.record(view.session.history_entry());

        handle_watch_key(&mut view, KeyCode::Char('s'), &history, &opener, &seasons);
        assert_eq!(
            view.picker,
            Some(EpisodePicker {
                kind: PickerKind::Season,
                cursor: 0
            })
        );
        handle_watch_key(&mut view, KeyCode::Down, &history, &opener, &seasons);
        handle_watch_key(&mut view, KeyCode::Down, &history, &opener, &seasons);
        assert_eq!(view.session.target().season, Some(1));

        handle_watch_key(&mut view, KeyCode::Enter, &history, &opener, &seasons);
        assert_eq!(view.picker, None);
        assert_eq!(view.session.target(), &WatchTarget::tv("1399", 3, 1));
        assert_eq!(view.session.selection().selected(), 4);

        let entries = history.list();
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].season, entries[0].episode), (Some(3), Some(1)));
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn episode_list_jumps_within_current_season() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let seasons = three_seasons();
        let mut view = view(WatchTarget::tv("1399", 2, 2));

        handle_watch_key(&mut view, KeyCode::Char('l'), &history, &opener, &seasons);
        let options = picker_options(&view, PickerKind::Episode, &seasons);
        assert_eq!(options.len(), 4);
        assert!(options[1].current);
        assert_eq!(view.picker.map(|picker| picker.cursor), Some(1));

        for _ in 0..5 {
            handle_watch_key(&mut view, KeyCode::Down, &history, &opener, &seasons);
        }
        handle_watch_key(&mut view, KeyCode::Enter, &history, &opener, &seasons);
        assert_eq!(view.session.target(), &WatchTarget::tv("1399", 2, 4));
        assert_eq!(history.list()[0].episode, Some(4));
    }

    #[test]
    fn picker_needs_loaded_seasons_and_esc_leaves_episode() {
        let store = MemoryStore::default();
        let history = WatchHistory::new(&store);
        let opener = ScriptedOpener::failing(0);
        let mut view = view(WatchTarget::tv("1399", 1, 1));

        let outcome = handle_watch_key(&mut view, KeyCode::Char('s'), &history, &opener, &[]);
        assert_eq!(
            outcome,
            WatchKeyOutcome::Status(status_info("Episode list is not loaded yet."))
        );
        assert_eq!(view.picker, None);

        let seasons = three_seasons();
        handle_watch_key(&mut view, KeyCode::Char('s'), &history, &opener, &seasons);
        handle_watch_key(&mut view, KeyCode::Down, &history, &opener, &seasons);
        handle_watch_key(&mut view, KeyCode::Esc, &history, &opener, &seasons);
        assert_eq!(view.picker, None);
        assert_eq!(view.session.target(), &WatchTarget::tv("1399", 1, 1));
        assert!(history.list().is_empty());

        let mut movie = WatchView::new(WatchSession::open(WatchTarget::movie("550")));
        let outcome = handle_watch_key(&mut movie, KeyCode::Char('s'), &history, &opener, &seasons);
        assert_eq!(outcome, WatchKeyOutcome::Ignored);
    }

    #[test]
    fn stale_detail_results_are_dropped() {
        let (tx, rx) = mpsc::channel();
        let mut details = HashMap::new();
        details.insert((MediaKind::Movie, "550".to_string()), DetailsState::Loading);
        tx.send(DetailsFetchResult {
            key: (MediaKind::Movie, "13".to_string()),
            details: Ok(None),
        })
        .expect("send");
        tx.send(DetailsFetchResult {
            key: (MediaKind::Movie, "550".to_string()),
            details: Err("boom".to_string()),
        })
        .expect("send");

        drain_details_results(&rx, &mut details);
        assert_eq!(details.len(), 1);
        assert!(matches!(
            details.get(&(MediaKind::Movie, "550".to_string())),
            Some(DetailsState::Failed(_))
        ));
    }

    #[test]
    fn missing_client_marks_details_unavailable() {
        let (tx, _rx) = mpsc::channel();
        let mut details = HashMap::new();
        ensure_details(None, (MediaKind::Tv, "1399".to_string()), &mut details, &tx);
        assert!(matches!(
            details.get(&(MediaKind::Tv, "1399".to_string())),
            Some(DetailsState::Unavailable)
        ));
    }
}
