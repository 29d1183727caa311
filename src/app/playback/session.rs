use super::super::episode::{SeasonInfo, next_episode, previous_episode};
use super::super::history::{HistoryKey, WatchHistoryEntry};
use super::{
    EmbedProvider, FailureOutcome, MediaKind, PlaybackSelection, SelectError, WatchTarget,
    build_provider_list,
};

/// History bookkeeping for an episode switch inside an open title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EpisodeChange {
    pub(crate) previous: HistoryKey,
    pub(crate) entry: WatchHistoryEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Next,
    Previous,
}

/// State of one opened title: the target, its providers and the selector.
/// Lives as long as the watch view does; nothing here is persisted.
#[derive(Debug, Clone)]
pub(crate) struct WatchSession {
    target: WatchTarget,
    providers: Vec<EmbedProvider>,
    selection: PlaybackSelection,
    auto_next: bool,
}

impl WatchSession {
    pub(crate) fn open(target: WatchTarget) -> Self {
        let providers = build_provider_list(&target);
        let selection = PlaybackSelection::new(providers.len());
        Self {
            target,
            providers,
            selection,
            auto_next: false,
        }
    }

    pub(crate) fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub(crate) fn providers(&self) -> &[EmbedProvider] {
        &self.providers
    }

    pub(crate) fn selection(&self) -> &PlaybackSelection {
        &self.selection
    }

    pub(crate) fn current_provider(&self) -> &EmbedProvider {
        // Provider catalogs are never empty and `selection` is sized to them.
        &self.providers[self.selection.selected()]
    }

    pub(crate) fn current_url(&self) -> &str {
        &self.current_provider().url
    }

    pub(crate) fn history_entry(&self) -> WatchHistoryEntry {
        WatchHistoryEntry::now(&self.target)
    }

    pub(crate) fn toggle_dropdown(&mut self) {
        self.selection.toggle_dropdown();
    }

    pub(crate) fn close_dropdown(&mut self) {
        self.selection.close_dropdown();
    }

    pub(crate) fn select_provider(&mut self, index: usize) -> Result<(), SelectError> {
        self.selection.select(index)
    }

    pub(crate) fn report_failure(&mut self) -> FailureOutcome {
        let outcome = self.selection.report_failure();
        match outcome {
            FailureOutcome::Advanced(index) => tracing::info!(
                title = %self.target.label(),
                provider = self.providers[index].name,
                "falling back to next provider"
            ),
            FailureOutcome::Exhausted => tracing::error!(
                title = %self.target.label(),
                "all embed sources failed to load"
            ),
        }
        outcome
    }

    pub(crate) fn auto_next(&self) -> bool {
        self.auto_next
    }

    pub(crate) fn toggle_auto_next(&mut self) -> bool {
        self.auto_next = !self.auto_next;
        self.auto_next
    }

    /// Moves to another title, or to another episode of the same one.
    /// A different title starts over at provider 0.
    pub(crate) fn navigate(&mut self, target: WatchTarget) -> Option<EpisodeChange> {
        if target.kind != self.target.kind || target.id.trim() != self.target.id.trim() {
            let auto_next = self.auto_next;
            *self = Self::open(target);
            self.auto_next = auto_next;
            return None;
        }
        match target.season {
            Some(season) if self.target.kind == MediaKind::Tv => {
                self.change_episode(season, target.episode.unwrap_or(1))
            }
            _ => self.change_episode(
                self.target.season.unwrap_or(1),
                target.episode.unwrap_or(1),
            ),
        }
    }

    /// Switches episode within the open title, keeping the chosen provider.
    /// Returns `None` for movies or when nothing changes.
    pub(crate) fn change_episode(&mut self, season: u32, episode: u32) -> Option<EpisodeChange> {
        if !self.target.kind.is_episodic() {
            return None;
        }
        let season = match self.target.kind {
            MediaKind::Tv => Some(season),
            _ => self.target.season,
        };
        if self.target.season == season && self.target.episode == Some(episode) {
            return None;
        }

        let previous = HistoryKey::of_target(&self.target);
        self.target.season = season;
        self.target.episode = Some(episode);
        self.providers = build_provider_list(&self.target);
        self.selection.resize(self.providers.len());
        Some(EpisodeChange {
            previous,
            entry: self.history_entry(),
        })
    }

    /// Season changes always restart at episode 1.
    pub(crate) fn change_season(&mut self, season: u32) -> Option<EpisodeChange> {
        self.change_episode(season, 1)
    }

    pub(crate) fn step(&mut self, step: Step, seasons: &[SeasonInfo]) -> Option<EpisodeChange> {
        let (season, episode) = match self.target.kind {
            MediaKind::Movie => return None,
            MediaKind::Tv => {
                let season = self.target.season.unwrap_or(1);
                let episode = self.target.episode.unwrap_or(1);
                match step {
                    Step::Next => next_episode(seasons, season, episode)?,
                    Step::Previous => previous_episode(seasons, season, episode)?,
                }
            }
            MediaKind::Anime => {
                let episode = self.target.episode.unwrap_or(1);
                let moved = match step {
                    Step::Next => episode.checked_add(1)?,
                    Step::Previous => episode.checked_sub(1).filter(|&ep| ep >= 1)?,
                };
                (self.target.season.unwrap_or(1), moved)
            }
        };
        self.change_episode(season, episode)
    }

    /// Hook for "episode finished". Only acts when auto-next is on.
    pub(crate) fn on_playback_finished(&mut self, seasons: &[SeasonInfo]) -> Option<EpisodeChange> {
        if !self.auto_next {
            return None;
        }
        self.step(Step::Next, seasons)
    }
}
