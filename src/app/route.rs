use thiserror::Error;

use super::playback::{MediaKind, WatchTarget};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RouteError {
    #[error("not a watch route: {0}")]
    NotAWatchRoute(String),
    #[error("unknown media type '{0}' (expected movie, tv or anime)")]
    UnknownKind(String),
    #[error("no content id in '{0}'")]
    MissingId(String),
    #[error("'{value}' is not a valid {param} number")]
    InvalidNumber { param: &'static str, value: String },
}

/// A parsed `/watch/...` route. `redirect` holds the canonical path when the
/// input omitted defaults that the canonical form spells out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WatchRoute {
    pub(crate) target: WatchTarget,
    pub(crate) slug: String,
    pub(crate) redirect: Option<String>,
}

/// Extracts the numeric content id from a slug such as `fight-club-550`.
pub(crate) fn content_id_from_slug(slug: &str) -> Option<&str> {
    let id = slug.trim().rsplit('-').next()?.trim();
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then_some(id)
}

/// Builds a route slug from a display title: `Fight Club`, 550 -> `fight-club-550`.
pub(crate) fn slug_for(title: &str, id: u64) -> String {
    let mut slug = String::new();
    for word in title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        slug.push_str(&word.to_lowercase());
        slug.push('-');
    }
    slug.push_str(&id.to_string());
    slug
}

pub(crate) fn parse_watch_route(raw: &str) -> Result<WatchRoute, RouteError> {
    let trimmed = raw.trim();
    let without_origin = match trimmed.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => trimmed,
    };
    let without_fragment = without_origin
        .split_once('#')
        .map_or(without_origin, |(head, _)| head);
    let (path, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let [watch, kind, slug] = segments.as_slice() else {
        return Err(RouteError::NotAWatchRoute(raw.to_string()));
    };
    if *watch != "watch" {
        return Err(RouteError::NotAWatchRoute(raw.to_string()));
    }
    let kind = MediaKind::parse(kind).ok_or_else(|| RouteError::UnknownKind(kind.to_string()))?;
    let id = content_id_from_slug(slug).ok_or_else(|| RouteError::MissingId(slug.to_string()))?;
    let params = QueryParams::parse(query);

    let route = match kind {
        MediaKind::Movie => WatchRoute {
            target: WatchTarget::movie(id),
            slug: slug.to_string(),
            redirect: None,
        },
        MediaKind::Tv => {
            let season = params.number("s", "season")?;
            let episode = params.number("ep", "episode")?;
            let target = WatchTarget::tv(id, season.unwrap_or(1), episode.unwrap_or(1));
            let redirect = (season.is_none() || episode.is_none())
                .then(|| canonical_path(&target, slug));
            WatchRoute {
                target,
                slug: slug.to_string(),
                redirect,
            }
        }
        MediaKind::Anime => {
            let episode = params.number("ep", "episode")?;
            WatchRoute {
                target: WatchTarget::anime(id, episode.unwrap_or(1)),
                slug: slug.to_string(),
                redirect: None,
            }
        }
    };
    Ok(route)
}

/// Route path for a target, with explicit season/episode for TV.
pub(crate) fn canonical_path(target: &WatchTarget, slug: &str) -> String {
    let base = format!("/watch/{}/{}", target.kind, slug);
    match target.kind {
        MediaKind::Movie => base,
        MediaKind::Tv => format!(
            "{base}?s={}&ep={}",
            target.season.unwrap_or(1),
            target.episode.unwrap_or(1)
        ),
        MediaKind::Anime => format!("{base}?ep={}", target.episode.unwrap_or(1)),
    }
}

struct QueryParams<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> QueryParams<'a> {
    fn parse(raw: &'a str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .collect();
        Self { pairs }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| *value)
    }

    fn number(&self, key: &str, param: &'static str) -> Result<Option<u32>, RouteError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| RouteError::InvalidNumber {
                param,
                value: value.to_string(),
            })
    }
}
