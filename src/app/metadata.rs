use anyhow::Result;

use crate::tmdb::TmdbClient;

use super::episode::SeasonInfo;
use super::playback::MediaKind;

/// What the details pane shows for a title. Seasons are only loaded for TV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TitleDetails {
    pub(crate) title: String,
    pub(crate) overview: String,
    pub(crate) year: Option<String>,
    pub(crate) runtime_minutes: Option<u32>,
    pub(crate) rating: Option<String>,
    /// Titles TMDB recommends alongside a movie.
    pub(crate) related: Vec<String>,
    pub(crate) seasons: Vec<SeasonInfo>,
}

/// Loads display metadata for a history entry. Anime ids are provider ids,
/// not TMDB ids, so there is nothing to look up for them.
pub(crate) fn fetch_details(
    client: &TmdbClient,
    kind: MediaKind,
    id: &str,
) -> Result<Option<TitleDetails>> {
    match kind {
        MediaKind::Movie => {
            let movie = client.movie(id)?;
            let related = match client.recommendations(id) {
                Ok(shows) => shows
                    .iter()
                    .take(5)
                    .map(|show| show.display_title().to_string())
                    .collect(),
                Err(err) => {
                    tracing::warn!(id, error = %format!("{err:#}"), "failed to fetch recommendations");
                    Vec::new()
                }
            };
            Ok(Some(TitleDetails {
                title: movie.title,
                overview: movie.overview.unwrap_or_default(),
                year: year_of(movie.release_date.as_deref()),
                runtime_minutes: movie.runtime.filter(|&minutes| minutes > 0),
                rating: rating_of(movie.vote_average),
                related,
                seasons: Vec::new(),
            }))
        }
        MediaKind::Tv => {
            let show = client.tv(id)?;
            let numbers = show
                .seasons
                .iter()
                .filter(|season| season.episode_count != Some(0))
                .map(|season| season.season_number);
            let seasons = fetch_seasons(client, id, numbers);
            Ok(Some(TitleDetails {
                title: show.name,
                overview: show.overview.unwrap_or_default(),
                year: year_of(show.first_air_date.as_deref()),
                runtime_minutes: None,
                rating: rating_of(show.vote_average),
                related: Vec::new(),
                seasons,
            }))
        }
        MediaKind::Anime => Ok(None),
    }
}

/// Fetches each listed season. A season that fails to load is logged and
/// left out rather than failing the whole show.
fn fetch_seasons(
    client: &TmdbClient,
    id: &str,
    season_numbers: impl Iterator<Item = u32>,
) -> Vec<SeasonInfo> {
    let mut seasons: Vec<SeasonInfo> = season_numbers
        .filter_map(|number| match client.season(id, number) {
            Ok(details) => Some(SeasonInfo::from(details)),
            Err(err) => {
                tracing::warn!(id, season = number, error = %format!("{err:#}"), "failed to fetch season");
                None
            }
        })
        .collect();
    seasons.sort_by_key(|season| season.season_number);
    seasons
}

fn rating_of(vote_average: Option<f64>) -> Option<String> {
    vote_average
        .filter(|score| *score > 0.0)
        .map(|score| format!("{score:.1}"))
}

fn year_of(date: Option<&str>) -> Option<String> {
    date.and_then(|d| d.get(..4)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::RetryPolicy;
    use crate::http::test_server::{Behavior, TestServer};

    fn client(server: &TestServer) -> TmdbClient {
        TmdbClient::new("k", server.base_url.clone())
            .expect("client")
            .with_policy(RetryPolicy {
                connect_timeout: Duration::from_millis(200),
                read_timeout: Duration::from_millis(500),
                attempts: 1,
                retry_delay: Duration::from_millis(1),
            })
    }

    #[test]
    fn tv_details_include_loaded_seasons_only() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(
                200,
                r#"{"id":1399,"name":"Game of Thrones","first_air_date":"2011-04-17","seasons":[
                    {"season_number":0,"name":"Specials","episode_count":0},
                    {"season_number":1,"name":"Season 1","episode_count":1},
                    {"season_number":2,"name":"Season 2"}
                ]}"#
                .to_string(),
            ),
            Behavior::Respond(
                200,
                r#"{"season_number":1,"name":"Season 1","episodes":[{"episode_number":1,"name":"Winter Is Coming"}]}"#
                    .to_string(),
            ),
            Behavior::Respond(404, r#"{"status_message":"not found"}"#.to_string()),
        ]);
        let details = fetch_details(&client(&server), MediaKind::Tv, "1399")
            .expect("details load")
            .expect("tv has details");
        assert_eq!(details.title, "Game of Thrones");
        assert_eq!(details.year.as_deref(), Some("2011"));
        assert_eq!(details.seasons.len(), 1);
        assert_eq!(details.seasons[0].episodes[0].name, "Winter Is Coming");
    }

    #[test]
    fn movie_details_survive_failed_recommendations() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(
                200,
                r#"{"id":550,"title":"Fight Club","release_date":"1999-10-15","runtime":139,"vote_average":8.438}"#
                    .to_string(),
            ),
            Behavior::Respond(404, "{}".to_string()),
        ]);
        let details = fetch_details(&client(&server), MediaKind::Movie, "550")
            .expect("details load")
            .expect("movie has details");
        assert_eq!(details.runtime_minutes, Some(139));
        assert_eq!(details.rating.as_deref(), Some("8.4"));
        assert!(details.related.is_empty());
    }

    #[test]
    fn anime_has_no_tmdb_details() {
        let server = TestServer::spawn(Vec::new());
        let details = fetch_details(&client(&server), MediaKind::Anime, "209867").expect("ok");
        assert_eq!(details, None);
        assert_eq!(server.request_count(), 0);
    }
}
