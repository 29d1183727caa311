use anyhow::Result;

use crate::tmdb::{Genre, ListingMedia, RequestType, Show, ShowRequest, TmdbClient};

use super::playback::MediaKind;
use super::route::slug_for;

/// Anything that can answer a listing request. The TMDB client in
/// production, canned rows in tests.
pub(crate) trait ListingSource {
    fn listing(&self, request: &ShowRequest) -> Result<Vec<Show>>;
}

impl ListingSource for TmdbClient {
    fn listing(&self, request: &ShowRequest) -> Result<Vec<Show>> {
        TmdbClient::listing(self, request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CuratedRow {
    pub(crate) title: &'static str,
    pub(crate) request: ShowRequest,
}

#[derive(Debug, Clone)]
pub(crate) struct ShowRow {
    pub(crate) title: &'static str,
    pub(crate) media: ListingMedia,
    pub(crate) shows: Vec<Show>,
}

const fn row(
    title: &'static str,
    request_type: RequestType,
    media: ListingMedia,
    genre: Option<Genre>,
) -> (&'static str, RequestType, ListingMedia, Option<Genre>) {
    (title, request_type, media, genre)
}

const FRONT_PAGE: &[(&str, RequestType, ListingMedia, Option<Genre>)] = &[
    row("Trending Now", RequestType::Trending, ListingMedia::All, None),
    row("Netflix TV Shows", RequestType::Netflix, ListingMedia::Tv, None),
    row(
        "Popular TV Shows",
        RequestType::TopRated,
        ListingMedia::Tv,
        Some(Genre::TvMovie),
    ),
    row(
        "Korean Movies",
        RequestType::Korean,
        ListingMedia::Movie,
        Some(Genre::Thriller),
    ),
    row("Comedy Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Comedy)),
    row("Action Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Action)),
    row("Romance Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Romance)),
    row("Scary Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Thriller)),
    row(
        "Adventure Movies",
        RequestType::Genre,
        ListingMedia::Movie,
        Some(Genre::Adventure),
    ),
    row("Fantasy Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Fantasy)),
    row("History Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::History)),
    row("Music Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Music)),
    row("Mystery Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Mystery)),
    row("War Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::War)),
    row("Western Movies", RequestType::Genre, ListingMedia::Movie, Some(Genre::Western)),
    row(
        "Action & Adventure TV Shows",
        RequestType::Genre,
        ListingMedia::Tv,
        Some(Genre::ActionAdventure),
    ),
    row("Kids TV Shows", RequestType::Genre, ListingMedia::Tv, Some(Genre::Kids)),
    row(
        "Sci-Fi & Fantasy TV Shows",
        RequestType::Genre,
        ListingMedia::Tv,
        Some(Genre::ScifiFantasy),
    ),
    row("Soap TV Shows", RequestType::Genre, ListingMedia::Tv, Some(Genre::Soap)),
    row(
        "War & Politics TV Shows",
        RequestType::Genre,
        ListingMedia::Tv,
        Some(Genre::WarPolitics),
    ),
];

pub(crate) fn curated_rows() -> Vec<CuratedRow> {
    FRONT_PAGE
        .iter()
        .map(|&(title, request_type, media, genre)| CuratedRow {
            title,
            request: ShowRequest {
                request_type,
                media,
                genre,
            },
        })
        .collect()
}

/// Rows whose title contains `filter` (case-insensitive); all rows without one.
pub(crate) fn select_rows(filter: Option<&str>) -> Vec<CuratedRow> {
    let rows = curated_rows();
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => {
            let needle = filter.to_lowercase();
            rows.into_iter()
                .filter(|row| row.title.to_lowercase().contains(&needle))
                .collect()
        }
        None => rows,
    }
}

/// Fetches each row independently. A row that fails is logged and left out.
pub(crate) fn fetch_rows(source: &dyn ListingSource, rows: &[CuratedRow]) -> Vec<ShowRow> {
    rows.iter()
        .filter_map(|row| match source.listing(&row.request) {
            Ok(shows) => Some(ShowRow {
                title: row.title,
                media: row.request.media,
                shows,
            }),
            Err(err) => {
                tracing::warn!(row = row.title, error = %format!("{err:#}"), "failed to fetch row");
                None
            }
        })
        .collect()
}

/// Media kind of a listed show: its own `media_type` when present, else the
/// row's kind. Mixed rows default to movie.
pub(crate) fn kind_of(show: &Show, row_media: ListingMedia) -> MediaKind {
    match show.media_type.as_deref() {
        Some("tv") => MediaKind::Tv,
        Some("movie") => MediaKind::Movie,
        _ => match row_media {
            ListingMedia::Tv => MediaKind::Tv,
            ListingMedia::Movie | ListingMedia::All => MediaKind::Movie,
        },
    }
}

/// Watch route for a listed show, as the front page links it.
pub(crate) fn watch_path(show: &Show, kind: MediaKind) -> String {
    let slug = slug_for(show.display_title(), show.id);
    match kind {
        MediaKind::Movie => format!("/watch/movie/{slug}"),
        MediaKind::Tv => format!("/watch/tv/{slug}?s=1&ep=1"),
        MediaKind::Anime => format!("/watch/anime/{slug}?ep=1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct CannedSource;

    impl ListingSource for CannedSource {
        fn listing(&self, request: &ShowRequest) -> Result<Vec<Show>> {
            if request.media == ListingMedia::Tv {
                bail!("boom");
            }
            let show: Show = serde_json::from_str(r#"{"id":550,"title":"Fight Club"}"#)?;
            Ok(vec![show])
        }
    }

    #[test]
    fn front_page_has_every_row_in_order() {
        let rows = curated_rows();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].title, "Trending Now");
        assert_eq!(rows[19].title, "War & Politics TV Shows");
    }

    #[test]
    fn row_filter_is_case_insensitive() {
        let rows = select_rows(Some("tv shows"));
        assert_eq!(rows.len(), 7);
        assert_eq!(select_rows(Some("  ")).len(), 20);
        assert!(select_rows(Some("documentary")).is_empty());
    }

    #[test]
    fn failing_rows_are_skipped() {
        let rows = select_rows(Some("korean"));
        let mut all = rows.clone();
        all.extend(select_rows(Some("kids")));
        let fetched = fetch_rows(&CannedSource, &all);
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].title, "Korean Movies");
        assert_eq!(fetched[0].shows[0].id, 550);
    }

    #[test]
    fn watch_paths_follow_media_kind() {
        let tv: Show =
            serde_json::from_str(r#"{"id":1399,"media_type":"tv","name":"Game of Thrones"}"#)
                .expect("show");
        let kind = kind_of(&tv, ListingMedia::All);
        assert_eq!(kind, MediaKind::Tv);
        assert_eq!(watch_path(&tv, kind), "/watch/tv/game-of-thrones-1399?s=1&ep=1");

        let movie: Show = serde_json::from_str(r#"{"id":550,"title":"Fight Club"}"#).expect("show");
        assert_eq!(kind_of(&movie, ListingMedia::All), MediaKind::Movie);
        assert_eq!(kind_of(&movie, ListingMedia::Tv), MediaKind::Tv);
    }
}
