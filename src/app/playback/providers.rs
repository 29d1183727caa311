use super::{MediaKind, WatchTarget};

/// One candidate playback URL. Its identity is its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EmbedProvider {
    pub(crate) name: &'static str,
    pub(crate) url: String,
}

/// URL template with `{id}`, `{season}` and `{episode}` placeholders.
struct ProviderTemplate {
    name: &'static str,
    url: &'static str,
}

impl ProviderTemplate {
    const fn new(name: &'static str, url: &'static str) -> Self {
        Self { name, url }
    }

    fn render(&self, id: &str, season: u32, episode: u32) -> String {
        self.url
            .replace("{id}", id)
            .replace("{season}", &season.to_string())
            .replace("{episode}", &episode.to_string())
    }
}

const MOVIE_PROVIDERS: &[ProviderTemplate] = &[
    ProviderTemplate::new("Netprime Server 1 {Own Server}", "https://letsembed.cc/embed/movie/?id={id}"),
    ProviderTemplate::new("Netprime Server 1 {Multi}", "https://vidzee.wtf/movie/multi.php?id={id}"),
    ProviderTemplate::new("Netprime Server 2", "https://api.flixindia.site/movie/{id}"),
    ProviderTemplate::new("Netprime Server 3", "https://iframe.pstream.org/media/tmdb-movie-{id}"),
    ProviderTemplate::new("Netprime Server 4 {Og}", "https://vidzee.wtf/movie/{id}"),
    ProviderTemplate::new("Netprime Server 5", "https://vidlink.pro/movie/{id}"),
    ProviderTemplate::new("Netprime Server 6", "https://111movies.com/movie/{id}"),
    ProviderTemplate::new("Netprime Server 7 {4k}", "https://player.videasy.net/movie/{id}"),
    ProviderTemplate::new("Netprime Server 8 {4k}", "https://vidsrc.dev/embed/movie/{id}"),
    ProviderTemplate::new("Netprime Server 9", "https://rivestream.live/embed?type=movie&id={id}"),
    ProviderTemplate::new("Netprime Server 10", "https://embed.su/embed/movie/{id}"),
    ProviderTemplate::new("Netprime Server 11", "https://player.smashy.stream/movie/{id}"),
    ProviderTemplate::new("Netprime Server 12", "https://vidsrc.cc/v2/embed/movie/{id}"),
    ProviderTemplate::new("Netprime Server 13", "https://vidsrc.me/embed/movie/{id}"),
    ProviderTemplate::new("Netprime Server 14", "https://multiembed.mov/?video_id={id}&tmdb=1"),
    ProviderTemplate::new("Netprime Server 15", "https://2embed.cc/embed/{id}"),
    ProviderTemplate::new("Netprime Server 16", "https://moviesapi.to/movie/{id}"),
    ProviderTemplate::new("Netprime Server 17", "https://filmku.stream/embed/{id}"),
    ProviderTemplate::new("Netprime Server 18", "https://vidsrc.wtf/api/3/movie/?id={id}"),
];

const TV_PROVIDERS: &[ProviderTemplate] = &[
    ProviderTemplate::new("Netprime Server 1 {Multi}", "https://vidzee.wtf/tv/multi.php?id={id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 1 {Anime} {Multi}", "https://api.flixindia.site/anime/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 2 {Og}", "https://vidzee.wtf/tv/?id={id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 3", "https://vidlink.pro/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 4", "https://111movies.com/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 5", "https://player.videasy.net/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 6", "https://vidsrc.dev/embed/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 7", "https://rivestream.live/embed?type=tv&id={id}&season={season}&episode={episode}"),
    ProviderTemplate::new("Netprime Server 8", "https://embed.su/embed/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 9", "https://player.smashy.stream/tv/{id}?s={season}&e={episode}"),
    ProviderTemplate::new("Netprime Server 10", "https://vidsrc.cc/v2/embed/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 11", "https://vidsrc.me/embed/tv/{id}/{season}/{episode}"),
    ProviderTemplate::new("Netprime Server 12", "https://multiembed.mov/?video_id={id}&tmdb=1&s={season}&e={episode}"),
    ProviderTemplate::new("Netprime Server 13", "https://2embed.cc/embed/{id}&s={season}&e={episode}"),
];

const ANIME_PROVIDERS: &[ProviderTemplate] = &[
    ProviderTemplate::new("Netprime Anime {Sub}", "https://vidsrc.cc/v2/embed/anime/tmdb{id}/{episode}/sub?autoPlay=false"),
    ProviderTemplate::new("Netprime Anime {Dub}", "https://vidsrc.cc/v2/embed/anime/tmdb{id}/{episode}/dub?autoPlay=false"),
    ProviderTemplate::new("Netprime Anime {Multi}", "https://api.flixindia.site/anime/{id}/{season}/{episode}"),
];

fn templates_for(kind: MediaKind) -> &'static [ProviderTemplate] {
    match kind {
        MediaKind::Movie => MOVIE_PROVIDERS,
        MediaKind::Tv => TV_PROVIDERS,
        MediaKind::Anime => ANIME_PROVIDERS,
    }
}

/// Number of providers for a kind; stable regardless of id/season/episode.
pub(crate) fn provider_count(kind: MediaKind) -> usize {
    templates_for(kind).len()
}

/// Builds the ordered provider list. Index 0 is the default and fallback walks
/// forward. Callers must not pass an empty id; route parsing rejects those.
pub(crate) fn build_provider_list(target: &WatchTarget) -> Vec<EmbedProvider> {
    debug_assert!(!target.id.trim().is_empty(), "provider list for empty id");
    let id = target.id.trim();
    let season = target.season.unwrap_or(1);
    let episode = target.episode.unwrap_or(1);
    templates_for(target.kind)
        .iter()
        .map(|template| EmbedProvider {
            name: template.name,
            url: template.render(id, season, episode),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_list_starts_with_id_in_url() {
        let providers = build_provider_list(&WatchTarget::movie("550"));
        assert_eq!(providers.len(), 19);
        assert!(providers[0].url.contains("550"));
        assert_eq!(providers[0].url, "https://letsembed.cc/embed/movie/?id=550");
    }

    #[test]
    fn every_kind_yields_non_empty_deterministic_list() {
        for target in [
            WatchTarget::movie("550"),
            WatchTarget::tv("1399", 2, 5),
            WatchTarget::anime("37854", 3),
        ] {
            let first = build_provider_list(&target);
            let second = build_provider_list(&target);
            assert!(!first.is_empty());
            assert_eq!(first, second);
            assert_eq!(first.len(), provider_count(target.kind));
            assert!(first.iter().all(|provider| provider.url.contains(&target.id)));
        }
    }

    #[test]
    fn tv_urls_embed_season_and_episode_as_path_or_query() {
        let providers = build_provider_list(&WatchTarget::tv("1399", 2, 5));
        assert_eq!(providers[3].url, "https://vidlink.pro/tv/1399/2/5");
        assert_eq!(
            providers[9].url,
            "https://player.smashy.stream/tv/1399?s=2&e=5"
        );
        assert_eq!(
            providers[7].url,
            "https://rivestream.live/embed?type=tv&id=1399&season=2&episode=5"
        );
    }

    #[test]
    fn anime_defaults_missing_episode_to_one() {
        let target = WatchTarget {
            episode: None,
            ..WatchTarget::anime("37854", 1)
        };
        let providers = build_provider_list(&target);
        assert_eq!(
            providers[0].url,
            "https://vidsrc.cc/v2/embed/anime/tmdb37854/1/sub?autoPlay=false"
        );
    }

    #[test]
    fn trims_whitespace_around_id() {
        let providers = build_provider_list(&WatchTarget::movie(" 550 "));
        assert_eq!(providers[5].url, "https://vidlink.pro/movie/550");
    }
}
