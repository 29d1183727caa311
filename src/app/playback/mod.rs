mod launcher;
mod providers;
mod selector;
mod session;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub(crate) use launcher::*;
pub(crate) use providers::*;
pub(crate) use selector::*;
pub(crate) use session::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MediaKind {
    Movie,
    Tv,
    Anime,
}

impl MediaKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
            Self::Anime => "anime",
        }
    }

    pub(crate) fn is_episodic(self) -> bool {
        !matches!(self, Self::Movie)
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            "anime" => Some(Self::Anime),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What is being played: a movie, or one episode of a show.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct WatchTarget {
    pub(crate) kind: MediaKind,
    pub(crate) id: String,
    pub(crate) season: Option<u32>,
    pub(crate) episode: Option<u32>,
}

impl WatchTarget {
    pub(crate) fn movie(id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Movie,
            id: id.into(),
            season: None,
            episode: None,
        }
    }

    pub(crate) fn tv(id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            kind: MediaKind::Tv,
            id: id.into(),
            season: Some(season),
            episode: Some(episode),
        }
    }

    pub(crate) fn anime(id: impl Into<String>, episode: u32) -> Self {
        Self {
            kind: MediaKind::Anime,
            id: id.into(),
            season: None,
            episode: Some(episode),
        }
    }

    pub(crate) fn label(&self) -> String {
        match (self.season, self.episode) {
            (Some(season), Some(episode)) => {
                format!("{} {} S{season:02}E{episode:02}", self.kind, self.id)
            }
            (None, Some(episode)) => format!("{} {} episode {episode}", self.kind, self.id),
            _ => format!("{} {}", self.kind, self.id),
        }
    }
}
