use clap::{Args, Parser, Subcommand};

use crate::app::MediaKind;

#[derive(Debug, Parser)]
#[command(
    name = "netprime",
    version,
    about = "Browse TMDB titles and play them through embed providers"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Show the curated front-page rows.
    Browse {
        /// Only rows whose title contains this text.
        #[arg(long)]
        row: Option<String>,
    },
    /// Search movies and TV shows.
    Search { query: String },
    /// Play a watch route such as `/watch/tv/game-of-thrones-1399?s=1&ep=2`.
    Watch {
        route: String,
        #[command(flatten)]
        play: PlayArgs,
    },
    /// Play a movie by TMDB id.
    Movie {
        /// Numeric id or slug ending in the id.
        id: String,
        #[command(flatten)]
        play: PlayArgs,
    },
    /// Play a TV episode by TMDB id.
    Tv {
        id: String,
        #[arg(short, long, default_value_t = 1)]
        season: u32,
        #[arg(short, long, default_value_t = 1)]
        episode: u32,
        #[command(flatten)]
        play: PlayArgs,
    },
    /// Play an anime episode by id.
    Anime {
        id: String,
        #[arg(short, long, default_value_t = 1)]
        episode: u32,
        #[command(flatten)]
        play: PlayArgs,
    },
    /// List the embed providers for a title.
    Providers {
        #[arg(value_enum)]
        kind: MediaKind,
        id: String,
        #[arg(short, long)]
        season: Option<u32>,
        #[arg(short, long)]
        episode: Option<u32>,
    },
    /// Show watch history, newest first.
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Remove a title, or one of its episodes, from watch history.
    Forget {
        id: String,
        #[arg(short, long)]
        season: Option<u32>,
        #[arg(short, long)]
        episode: Option<u32>,
    },
    /// Open the history dashboard (the default).
    Tui,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PlayArgs {
    /// Start from this provider (0-based).
    #[arg(long)]
    pub provider: Option<usize>,
    /// Print the embed URL instead of opening it.
    #[arg(long)]
    pub print: bool,
    /// Do not move on to the next provider when one fails to open.
    #[arg(long)]
    pub no_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_dashboard() {
        let cli = Cli::try_parse_from(["netprime"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn every_subcommand_has_help_text() {
        use clap::CommandFactory;

        let command = Cli::command();
        for sub in command.get_subcommands() {
            assert!(
                sub.get_about().is_some(),
                "`{}` has no help text",
                sub.get_name()
            );
        }
    }

    #[test]
    fn tv_shorthand_flags() {
        let cli = Cli::try_parse_from(["netprime", "tv", "1399", "-s", "2", "-e", "5", "--print"])
            .expect("parses");
        match cli.command {
            Some(Command::Tv {
                id,
                season,
                episode,
                play,
            }) => {
                assert_eq!(id, "1399");
                assert_eq!((season, episode), (2, 5));
                assert!(play.print);
                assert!(!play.no_fallback);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn providers_takes_media_kind() {
        let cli = Cli::try_parse_from(["netprime", "providers", "anime", "209867", "-e", "3"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Providers {
                kind: MediaKind::Anime,
                episode: Some(3),
                ..
            })
        ));
        assert!(Cli::try_parse_from(["netprime", "providers", "podcast", "1"]).is_err());
    }

    #[test]
    fn watch_accepts_provider_index() {
        let cli = Cli::try_parse_from([
            "netprime",
            "watch",
            "/watch/movie/fight-club-550",
            "--provider",
            "4",
            "--no-fallback",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Watch { route, play }) => {
                assert_eq!(route, "/watch/movie/fight-club-550");
                assert_eq!(play.provider, Some(4));
                assert!(play.no_fallback);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
