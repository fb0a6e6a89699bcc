//! animine — anime streaming CLI
//!
//! Searches the AllAnime catalog, resolves episode stream links, and hands
//! the chosen URL to mpv or vlc. The heavy lifting (HTTP, decoding,
//! extraction) lives in animine-core; this binary is the interactive glue.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use animine_core::{Animine, Show, StreamFormat, StreamLink, TranslationType};

mod download;
mod history;
mod player;
mod ui;

use history::{DownloadEntry, History, HistoryEntry};
use player::PlayerKind;
use ui::PlayerAction;

#[derive(Parser, Debug)]
#[command(name = "animine", version, about = "Search and stream anime with mpv or vlc")]
struct Args {
    /// Search query; prompts interactively when omitted
    query: Vec<String>,

    /// Search dubbed instead of subtitled shows
    #[arg(long)]
    dub: bool,

    /// Force a specific media player instead of auto-detecting
    #[arg(long, value_enum)]
    player: Option<PlayerKind>,

    /// Preferred quality label (e.g. 1080p); best available otherwise
    #[arg(long)]
    quality: Option<String>,

    /// Episode to start from, skipping the episode menu
    #[arg(long)]
    episode: Option<String>,

    /// Download episodes instead of playing them
    #[arg(long)]
    download: bool,

    /// Directory downloads are written to [default: ./downloads]
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Resume the most recently watched unfinished show
    #[arg(long = "continue", short = 'c')]
    resume: bool,

    /// Print watch history and exit
    #[arg(long)]
    history: bool,

    /// Verbose debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let history = History::open_default()?;

    if args.history {
        return print_history(&history);
    }

    let scraper = Animine::new().context("failed to initialize scraper")?;
    let mode = if args.dub {
        TranslationType::Dub
    } else {
        TranslationType::Sub
    };

    let (show, episodes, start) = if args.resume {
        match pick_resume(&scraper, &history).await? {
            Some(state) => state,
            None => return Ok(()),
        }
    } else {
        match pick_fresh(&scraper, &args, mode).await? {
            Some(state) => state,
            None => return Ok(()),
        }
    };

    // Resume keeps the mode the show was watched in
    let mode = if args.resume {
        history
            .entries()?
            .iter()
            .find(|e| e.show_id == show.id)
            .map(|e| e.mode)
            .unwrap_or(mode)
    } else {
        mode
    };

    watch_session(&scraper, &history, &args, &show, &episodes, start, mode).await
}

/// Search flow: query → show → episode list → starting episode
async fn pick_fresh(
    scraper: &Animine,
    args: &Args,
    mode: TranslationType,
) -> Result<Option<(Show, Vec<String>, usize)>> {
    let query = if args.query.is_empty() {
        ui::prompt_query()?
    } else {
        args.query.join(" ")
    };

    let shows = scraper.search(&query, mode).await?;
    if shows.is_empty() {
        println!("No results for \"{}\" ({})", query.trim(), mode);
        return Ok(None);
    }

    let Some(index) = ui::select_show(&shows)? else {
        return Ok(None);
    };
    let show = shows[index].clone();

    let episodes = scraper.episodes(&show.id, mode).await?;

    let start = match &args.episode {
        Some(wanted) => episodes
            .iter()
            .position(|e| e == wanted)
            .with_context(|| format!("episode {} not available for {}", wanted, show.name))?,
        None => match ui::select_episode(&episodes, None)? {
            Some(index) => index,
            None => return Ok(None),
        },
    };

    Ok(Some((show, episodes, start)))
}

/// Continue-watching flow: history entry → next unwatched episode
async fn pick_resume(
    scraper: &Animine,
    history: &History,
) -> Result<Option<(Show, Vec<String>, usize)>> {
    let options = history.continue_options()?;
    if options.is_empty() {
        println!("Nothing to continue");
        return Ok(None);
    }

    let Some(index) = ui::select_continue(&options)? else {
        return Ok(None);
    };
    let entry = &options[index];
    let next = entry
        .next_episode()
        .context("selected entry has no next episode")?;

    let episodes = scraper.episodes(&entry.show_id, entry.mode).await?;
    let start = episodes
        .iter()
        .position(|e| *e == next)
        .with_context(|| format!("episode {} not yet available for {}", next, entry.show_name))?;

    let show = Show {
        id: entry.show_id.clone(),
        name: entry.show_name.clone(),
        english_name: None,
        native_name: None,
        episodes: entry.total_episodes,
        description: None,
    };
    Ok(Some((show, episodes, start)))
}

/// Plays (or downloads) episodes until the user quits
async fn watch_session(
    scraper: &Animine,
    history: &History,
    args: &Args,
    show: &Show,
    episodes: &[String],
    start: usize,
    mode: TranslationType,
) -> Result<()> {
    // Detected on first playback so pure download runs never probe PATH
    let mut player_kind: Option<PlayerKind> = None;
    let download_dir = args
        .download_dir
        .clone()
        .unwrap_or_else(download::default_dir);

    let mut position = start;

    'episode: loop {
        let episode = &episodes[position];
        let links = scraper.streams(&show.id, episode, mode).await?;
        if links.is_empty() {
            println!("No stream links found for episode {}", episode);
        }

        // The transfer step runs once per episode and again only on Replay;
        // every other action returns straight to the menu.
        let mut transfer = !links.is_empty();
        loop {
            if transfer {
                transfer = false;
                if args.download {
                    let candidates = mp4_links(&links);
                    if candidates.is_empty() {
                        println!(
                            "Episode {} only has HLS streams, nothing to download",
                            episode
                        );
                    } else if let Some(link) = pick_stream(&candidates, args.quality.as_deref())? {
                        let path =
                            download::download_episode(link, &show.name, episode, &download_dir)
                                .await?;
                        println!("Saved {}", path.display());
                        record_download(history, show, episode, link, &path)?;
                    }
                } else if let Some(link) = pick_stream(&links, args.quality.as_deref())? {
                    let kind = ensure_player(&mut player_kind, args.player).await?;
                    let title = format!("{} - Episode {}", show.name, episode);
                    player::play(kind, &link.url, &title, mode == TranslationType::Dub).await?;
                    record_watch(history, show, episode, mode, link)?;
                } else {
                    return Ok(());
                }
            }

            match ui::select_action(episode, episodes.len(), position)? {
                PlayerAction::NextEpisode => {
                    if position + 1 < episodes.len() {
                        position += 1;
                        continue 'episode;
                    }
                    println!("Already at the last episode of {}", show.name);
                    return Ok(());
                }
                PlayerAction::PreviousEpisode => {
                    if position > 0 {
                        position -= 1;
                        continue 'episode;
                    }
                    println!("Already at the first episode");
                }
                PlayerAction::Replay => transfer = !links.is_empty(),
                PlayerAction::SelectEpisode => match ui::select_episode(episodes, Some(episode))? {
                    Some(index) => {
                        position = index;
                        continue 'episode;
                    }
                    None => return Ok(()),
                },
                PlayerAction::ChangeQuality => {
                    let pool = if args.download {
                        mp4_links(&links)
                    } else {
                        links.clone()
                    };
                    if pool.is_empty() {
                        println!("No quality options available");
                    } else if let Some(index) = ui::select_stream(&pool)? {
                        let link = &pool[index];
                        if args.download {
                            let path = download::download_episode(
                                link,
                                &show.name,
                                episode,
                                &download_dir,
                            )
                            .await?;
                            println!("Saved {}", path.display());
                            record_download(history, show, episode, link, &path)?;
                        } else {
                            let kind = ensure_player(&mut player_kind, args.player).await?;
                            let title = format!("{} - Episode {}", show.name, episode);
                            player::play(kind, &link.url, &title, mode == TranslationType::Dub)
                                .await?;
                            record_watch(history, show, episode, mode, link)?;
                        }
                    }
                }
                PlayerAction::Download => {
                    let candidates = mp4_links(&links);
                    if candidates.is_empty() {
                        println!("No MP4 links available for download");
                    } else if let Some(index) = ui::select_stream(&candidates)? {
                        let link = &candidates[index];
                        let path =
                            download::download_episode(link, &show.name, episode, &download_dir)
                                .await?;
                        println!("Saved {}", path.display());
                        record_download(history, show, episode, link, &path)?;
                    }
                }
                PlayerAction::Quit => return Ok(()),
            }
        }
    }
}

/// Downloadable subset of an episode's links
fn mp4_links(links: &[StreamLink]) -> Vec<StreamLink> {
    links
        .iter()
        .filter(|l| l.format == StreamFormat::Mp4)
        .cloned()
        .collect()
}

/// Detects the player once and caches it for the rest of the session
async fn ensure_player(
    cached: &mut Option<PlayerKind>,
    forced: Option<PlayerKind>,
) -> Result<PlayerKind> {
    if let Some(kind) = *cached {
        return Ok(kind);
    }
    let kind = player::detect(forced).await?;
    *cached = Some(kind);
    Ok(kind)
}

/// Picks a stream link: explicit quality match, single candidate, or menu
fn pick_stream<'a>(
    links: &'a [StreamLink],
    quality: Option<&str>,
) -> Result<Option<&'a StreamLink>> {
    if let Some(wanted) = quality {
        if let Some(link) = links
            .iter()
            .find(|l| l.quality.eq_ignore_ascii_case(wanted))
        {
            return Ok(Some(link));
        }
        // Requested quality missing: fall back to the best link
        tracing::warn!(wanted, "requested quality not available, using best link");
        return Ok(links.first());
    }

    if links.len() == 1 {
        return Ok(links.first());
    }

    Ok(ui::select_stream(links)?.map(|index| &links[index]))
}

fn record_watch(
    history: &History,
    show: &Show,
    episode: &str,
    mode: TranslationType,
    link: &StreamLink,
) -> Result<()> {
    history.record(HistoryEntry {
        show_id: show.id.clone(),
        show_name: show.name.clone(),
        episode: episode.to_string(),
        mode,
        total_episodes: show.episodes,
        quality: Some(link.quality.clone()),
        provider: Some(link.provider.name().to_string()),
        last_watched: chrono::Utc::now(),
    })
}

fn record_download(
    history: &History,
    show: &Show,
    episode: &str,
    link: &StreamLink,
    path: &Path,
) -> Result<()> {
    history.record_download(DownloadEntry {
        show_name: show.name.clone(),
        episode: episode.to_string(),
        quality: Some(link.quality.clone()),
        path: path.to_path_buf(),
        downloaded_at: chrono::Utc::now(),
    })
}

fn print_history(history: &History) -> Result<()> {
    let entries = history.entries()?;
    let downloads = history.downloads()?;
    if entries.is_empty() && downloads.is_empty() {
        println!("No watch history");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {} EP{} ({}) {} via {}",
            entry.last_watched.format("%Y-%m-%d %H:%M"),
            entry.show_name,
            entry.episode,
            entry.mode,
            entry.quality.as_deref().unwrap_or("?"),
            entry.provider.as_deref().unwrap_or("?"),
        );
    }

    if !downloads.is_empty() {
        println!();
        println!("Downloads:");
        for entry in downloads {
            println!(
                "{}  {} EP{} {} -> {}",
                entry.downloaded_at.format("%Y-%m-%d %H:%M"),
                entry.show_name,
                entry.episode,
                entry.quality.as_deref().unwrap_or("?"),
                entry.path.display(),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use animine_core::Provider;

    fn link(quality: &str) -> StreamLink {
        StreamLink {
            provider: Provider::Wixmp,
            format: StreamFormat::Mp4,
            quality: quality.to_string(),
            url: format!("https://cdn.example.net/{}.mp4", quality),
        }
    }

    #[test]
    fn test_pick_stream_matches_quality_case_insensitive() {
        let links = vec![link("1080p"), link("720p")];
        let picked = pick_stream(&links, Some("720P")).unwrap().unwrap();
        assert_eq!(picked.quality, "720p");
    }

    #[test]
    fn test_pick_stream_falls_back_to_best() {
        let links = vec![link("1080p"), link("720p")];
        let picked = pick_stream(&links, Some("480p")).unwrap().unwrap();
        assert_eq!(picked.quality, "1080p");
    }

    #[test]
    fn test_pick_stream_single_link_auto_selected() {
        let links = vec![link("720p")];
        let picked = pick_stream(&links, None).unwrap().unwrap();
        assert_eq!(picked.quality, "720p");
    }

    #[test]
    fn test_mp4_links_filters_hls() {
        let hls = StreamLink {
            provider: Provider::Hianime,
            format: StreamFormat::Hls,
            quality: "HLS Master".to_string(),
            url: "https://cdn.example.net/master.m3u8".to_string(),
        };
        let links = vec![link("1080p"), hls, link("720p")];
        let candidates = mp4_links(&links);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|l| l.format == StreamFormat::Mp4));
    }

    #[test]
    fn test_cli_args_parse() {
        let args = Args::parse_from([
            "animine", "one", "piece", "--dub", "--player", "mpv", "--quality", "1080p",
        ]);
        assert_eq!(args.query, vec!["one", "piece"]);
        assert!(args.dub);
        assert_eq!(args.player, Some(PlayerKind::Mpv));
        assert_eq!(args.quality.as_deref(), Some("1080p"));
        assert!(!args.download);
    }

    #[test]
    fn test_cli_resume_flag() {
        let args = Args::parse_from(["animine", "-c"]);
        assert!(args.resume);
        assert!(args.query.is_empty());
    }
}
