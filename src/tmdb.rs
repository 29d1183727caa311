//! Blocking TMDB v3 client for the handful of endpoints the front end reads.

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::http::{RetryPolicy, get_text_with_retries};

pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

pub fn image_url(path: &str, size: &str) -> String {
    format!("{IMAGE_BASE_URL}/{size}{path}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Show {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

impl Show {
    /// Movies carry `title`, shows carry `name`.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Untitled")
    }

    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(|date| date.get(..4))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    #[serde(default)]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvDetails {
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeDetails {
    pub episode_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonDetails {
    pub season_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Trending,
    Netflix,
    TopRated,
    Korean,
    Genre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMedia {
    All,
    Movie,
    Tv,
}

impl ListingMedia {
    fn path(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genre {
    Action,
    Adventure,
    Comedy,
    Fantasy,
    History,
    Music,
    Mystery,
    Romance,
    Thriller,
    TvMovie,
    War,
    Western,
    ActionAdventure,
    Kids,
    ScifiFantasy,
    Soap,
    WarPolitics,
}

impl Genre {
    pub fn id(self) -> u32 {
        match self {
            Self::Action => 28,
            Self::Adventure => 12,
            Self::Comedy => 35,
            Self::Fantasy => 14,
            Self::History => 36,
            Self::Music => 10402,
            Self::Mystery => 9648,
            Self::Romance => 10749,
            Self::Thriller => 53,
            Self::TvMovie => 10770,
            Self::War => 10752,
            Self::Western => 37,
            Self::ActionAdventure => 10759,
            Self::Kids => 10762,
            Self::ScifiFantasy => 10765,
            Self::Soap => 10766,
            Self::WarPolitics => 10768,
        }
    }
}

const NETFLIX_NETWORK_ID: u32 = 213;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRequest {
    pub request_type: RequestType,
    pub media: ListingMedia,
    pub genre: Option<Genre>,
}

impl ShowRequest {
    /// Endpoint path and extra query parameters for this listing.
    pub fn endpoint(&self) -> (String, Vec<(&'static str, String)>) {
        let media = self.media.path();
        let mut params = Vec::new();
        let path = match self.request_type {
            RequestType::Trending => format!("/trending/{media}/week"),
            RequestType::TopRated => format!("/{media}/top_rated"),
            RequestType::Netflix => {
                params.push(("with_networks", NETFLIX_NETWORK_ID.to_string()));
                format!("/discover/{media}")
            }
            RequestType::Korean => {
                params.push(("with_original_language", "ko".to_string()));
                format!("/discover/{media}")
            }
            RequestType::Genre => {
                params.push(("sort_by", "popularity.desc".to_string()));
                format!("/discover/{media}")
            }
        };
        if let Some(genre) = self.genre
            && self.request_type != RequestType::TopRated
        {
            params.push(("with_genres", genre.id().to_string()));
        }
        (path, params)
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    policy: RetryPolicy,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("TMDB API key cannot be empty");
        }
        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn movie(&self, id: &str) -> Result<MovieDetails> {
        self.get_json(&format!("/movie/{id}"), &[])
    }

    pub fn recommendations(&self, id: &str) -> Result<Vec<Show>> {
        let page: Page<Show> = self.get_json(&format!("/movie/{id}/recommendations"), &[])?;
        Ok(page.results)
    }

    pub fn tv(&self, id: &str) -> Result<TvDetails> {
        self.get_json(&format!("/tv/{id}"), &[])
    }

    pub fn season(&self, id: &str, season_number: u32) -> Result<SeasonDetails> {
        self.get_json(&format!("/tv/{id}/season/{season_number}"), &[])
    }

    pub fn search(&self, query: &str) -> Result<Vec<Show>> {
        let page: Page<Show> = self.get_json(
            "/search/multi",
            &[("query", query.to_string()), ("include_adult", "false".to_string())],
        )?;
        Ok(page
            .results
            .into_iter()
            .filter(|show| matches!(show.media_type.as_deref(), Some("movie" | "tv") | None))
            .collect())
    }

    pub fn listing(&self, request: &ShowRequest) -> Result<Vec<Show>> {
        let (path, params) = request.endpoint();
        let page: Page<Show> = self.get_json(&path, &params)?;
        Ok(page.results)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        query.extend(params.iter().map(|(key, value)| (*key, value.as_str())));

        tracing::debug!(path, "requesting TMDB");
        let body = get_text_with_retries(&url, &query, &self.policy).map_err(|err| {
            match err.status() {
                Some(401) => anyhow!("TMDB API key is invalid or missing"),
                Some(404) => anyhow!("TMDB has no resource at {path}"),
                _ => anyhow::Error::new(err).context(format!("TMDB request to {path} failed")),
            }
        })?;
        serde_json::from_str(&body).with_context(|| format!("unexpected TMDB response for {path}"))
    }
}
