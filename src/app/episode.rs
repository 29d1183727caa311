use chrono::{DateTime, Local};

use crate::tmdb::{SeasonDetails, image_url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EpisodeInfo {
    pub(crate) number: u32,
    pub(crate) name: String,
    pub(crate) overview: String,
    pub(crate) still_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeasonInfo {
    pub(crate) season_number: u32,
    pub(crate) name: String,
    pub(crate) episodes: Vec<EpisodeInfo>,
}

impl From<SeasonDetails> for SeasonInfo {
    fn from(details: SeasonDetails) -> Self {
        Self {
            season_number: details.season_number,
            name: details.name,
            episodes: details
                .episodes
                .into_iter()
                .map(|ep| EpisodeInfo {
                    number: ep.episode_number,
                    name: ep.name,
                    overview: ep.overview,
                    still_url: ep.still_path.map(|path| image_url(&path, "w300")),
                })
                .collect(),
        }
    }
}

// Seasons are matched by `season_number`, never by position: TMDB lists
// specials as season 0 and may skip numbers.
fn find_season(seasons: &[SeasonInfo], season: u32) -> Option<&SeasonInfo> {
    seasons.iter().find(|s| s.season_number == season)
}

pub(crate) fn find_episode(
    seasons: &[SeasonInfo],
    season: u32,
    episode: u32,
) -> Option<&EpisodeInfo> {
    find_season(seasons, season)?
        .episodes
        .iter()
        .find(|ep| ep.number == episode)
}

/// Next `(season, episode)` after the given one, crossing into the next
/// numbered season with episodes when the current season is finished.
pub(crate) fn next_episode(seasons: &[SeasonInfo], season: u32, episode: u32) -> Option<(u32, u32)> {
    let current = find_season(seasons, season)?;
    let following = match current.episodes.iter().position(|ep| ep.number == episode) {
        Some(idx) => current.episodes.get(idx + 1),
        None => current.episodes.iter().find(|ep| ep.number > episode),
    };
    if let Some(ep) = following {
        return Some((season, ep.number));
    }

    seasons
        .iter()
        .filter(|s| s.season_number > season && !s.episodes.is_empty())
        .min_by_key(|s| s.season_number)
        .and_then(|s| s.episodes.first().map(|ep| (s.season_number, ep.number)))
}

/// Previous `(season, episode)`. Specials (season 0) are only reached from
/// within season 0 itself.
pub(crate) fn previous_episode(
    seasons: &[SeasonInfo],
    season: u32,
    episode: u32,
) -> Option<(u32, u32)> {
    let current = find_season(seasons, season)?;
    let preceding = match current.episodes.iter().position(|ep| ep.number == episode) {
        Some(idx) if idx > 0 => current.episodes.get(idx - 1),
        Some(_) => None,
        None => current.episodes.iter().rev().find(|ep| ep.number < episode),
    };
    if let Some(ep) = preceding {
        return Some((season, ep.number));
    }

    seasons
        .iter()
        .filter(|s| s.season_number < season && (s.season_number > 0 || season == 0))
        .filter(|s| !s.episodes.is_empty())
        .max_by_key(|s| s.season_number)
        .and_then(|s| s.episodes.last().map(|ep| (s.season_number, ep.number)))
}

pub(crate) fn episode_code(season: Option<u32>, episode: Option<u32>) -> String {
    match (season, episode) {
        (Some(season), Some(episode)) => format!("S{season:02}E{episode:02}"),
        (None, Some(episode)) => format!("E{episode:02}"),
        _ => "-".to_string(),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

pub(crate) fn format_timestamp_display(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(number: u32, episodes: &[u32]) -> SeasonInfo {
        SeasonInfo {
            season_number: number,
            name: format!("Season {number}"),
            episodes: episodes
                .iter()
                .map(|&n| EpisodeInfo {
                    number: n,
                    name: format!("Episode {n}"),
                    overview: String::new(),
                    still_url: None,
                })
                .collect(),
        }
    }

    fn show() -> Vec<SeasonInfo> {
        vec![
            season(0, &[1, 2]),
            season(1, &[1, 2, 3]),
            season(2, &[]),
            season(3, &[1, 2]),
        ]
    }

    #[test]
    fn next_moves_within_season() {
        assert_eq!(next_episode(&show(), 1, 1), Some((1, 2)));
    }

    #[test]
    fn next_crosses_by_season_number_and_skips_empty_seasons() {
        assert_eq!(next_episode(&show(), 1, 3), Some((3, 1)));
        assert_eq!(next_episode(&show(), 0, 2), Some((1, 1)));
    }

    #[test]
    fn next_at_series_end_is_none() {
        assert_eq!(next_episode(&show(), 3, 2), None);
    }

    #[test]
    fn next_with_unknown_season_is_none() {
        assert_eq!(next_episode(&show(), 9, 1), None);
    }

    #[test]
    fn next_from_unlisted_episode_picks_following_number() {
        let seasons = vec![season(1, &[1, 4, 5])];
        assert_eq!(next_episode(&seasons, 1, 2), Some((1, 4)));
    }

    #[test]
    fn previous_skips_specials_from_regular_seasons() {
        assert_eq!(previous_episode(&show(), 3, 1), Some((1, 3)));
        assert_eq!(previous_episode(&show(), 1, 1), None);
        assert_eq!(previous_episode(&show(), 0, 2), Some((0, 1)));
    }

    #[test]
    fn find_episode_uses_season_number() {
        let seasons = show();
        let ep = find_episode(&seasons, 3, 2).expect("episode exists");
        assert_eq!(ep.name, "Episode 2");
        assert!(find_episode(&seasons, 2, 1).is_none());
    }

    #[test]
    fn season_details_convert_with_still_urls() {
        let details: SeasonDetails = serde_json::from_str(
            r#"{"season_number":2,"name":"Season 2","episodes":[
                {"episode_number":1,"name":"The North Remembers","overview":"","still_path":"/a.jpg"},
                {"episode_number":2,"name":"The Night Lands"}
            ]}"#,
        )
        .expect("season parses");
        let season = SeasonInfo::from(details);
        assert_eq!(season.season_number, 2);
        assert_eq!(
            season.episodes[0].still_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w300/a.jpg")
        );
        assert_eq!(season.episodes[1].still_url, None);
    }

    #[test]
    fn episode_code_formats() {
        assert_eq!(episode_code(Some(1), Some(2)), "S01E02");
        assert_eq!(episode_code(None, Some(12)), "E12");
        assert_eq!(episode_code(None, None), "-");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("Game of Thrones", 8), "Game ...");
        assert_eq!(truncate("Dune", 8), "Dune");
    }

    #[test]
    fn unparseable_timestamp_is_shown_verbatim() {
        assert_eq!(format_timestamp_display("yesterday"), "yesterday");
    }
}
