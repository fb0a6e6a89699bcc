//! Interactive selection menus
//!
//! Thin dialoguer wrappers; every prompt returns `None` when the user
//! backs out so the caller can unwind the flow without special-casing.

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, Select};

use animine_core::{Show, StreamLink};

use crate::history::HistoryEntry;

/// Prompts for a search query when none was given on the command line
pub fn prompt_query() -> Result<String> {
    let query: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Search anime")
        .interact_text()?;
    Ok(query)
}

/// Show picker over search results
pub fn select_show(shows: &[Show]) -> Result<Option<usize>> {
    let items: Vec<String> = shows
        .iter()
        .map(|show| {
            let mut line = format!("{} ({} episodes)", show.name, show.episodes);
            if let Some(english) = &show.english_name {
                if english != &show.name {
                    line.push_str(&format!(" — {}", english));
                }
            }
            line
        })
        .collect();

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select anime")
        .items(&items)
        .default(0)
        .interact_opt()?;
    Ok(choice)
}

/// Episode picker, positioned on the current episode when stepping
pub fn select_episode(episodes: &[String], current: Option<&str>) -> Result<Option<usize>> {
    let default = current
        .and_then(|c| episodes.iter().position(|e| e == c))
        .unwrap_or(0);

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select episode")
        .items(episodes)
        .default(default)
        .interact_opt()?;
    Ok(choice)
}

/// Quality/provider picker over ranked stream links
pub fn select_stream(links: &[StreamLink]) -> Result<Option<usize>> {
    let items: Vec<String> = links
        .iter()
        .map(|link| {
            format!(
                "{} [{}] via {}",
                link.quality,
                match link.format {
                    animine_core::StreamFormat::Mp4 => "mp4",
                    animine_core::StreamFormat::Hls => "hls",
                },
                link.provider
            )
        })
        .collect();

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select quality")
        .items(&items)
        .default(0)
        .interact_opt()?;
    Ok(choice)
}

/// Continue-watching picker over history entries
pub fn select_continue(entries: &[HistoryEntry]) -> Result<Option<usize>> {
    let items: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "{} — continue from episode {} ({})",
                entry.show_name,
                entry.next_episode().unwrap_or_default(),
                entry.mode
            )
        })
        .collect();

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Continue watching")
        .items(&items)
        .default(0)
        .interact_opt()?;
    Ok(choice)
}

/// Action offered after the player exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    NextEpisode,
    PreviousEpisode,
    Replay,
    SelectEpisode,
    ChangeQuality,
    Download,
    Quit,
}

/// Post-playback menu
pub fn select_action(current: &str, total: usize, position: usize) -> Result<PlayerAction> {
    let items = [
        "Next episode",
        "Previous episode",
        "Replay",
        "Select episode",
        "Change quality",
        "Download this episode",
        "Quit",
    ];

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Episode {} ({}/{})",
            current,
            position + 1,
            total
        ))
        .items(&items)
        .default(0)
        .interact_opt()?;

    Ok(match choice {
        Some(0) => PlayerAction::NextEpisode,
        Some(1) => PlayerAction::PreviousEpisode,
        Some(2) => PlayerAction::Replay,
        Some(3) => PlayerAction::SelectEpisode,
        Some(4) => PlayerAction::ChangeQuality,
        Some(5) => PlayerAction::Download,
        _ => PlayerAction::Quit,
    })
}
