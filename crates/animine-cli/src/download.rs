//! Episode download support
//!
//! Streams an MP4 link to the downloads directory with a progress bar.
//! HLS playlists are playback-only and are rejected up front.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use animine_core::url::{REFERER, USER_AGENT};
use animine_core::{StreamFormat, StreamLink};

/// Downloads one MP4 stream link to `dir`
///
/// The file is named `<show>_EP<episode>_<quality>.mp4` with the show name
/// sanitized for cross-platform filesystems. An existing file with the
/// same name is kept as-is and its path returned.
pub async fn download_episode(
    link: &StreamLink,
    show_name: &str,
    episode: &str,
    dir: &Path,
) -> Result<PathBuf> {
    if link.format != StreamFormat::Mp4 {
        bail!("only MP4 links can be downloaded; {} is a stream playlist", link.quality);
    }

    let filename = format!(
        "{}_EP{}_{}.mp4",
        sanitize_filename(show_name),
        episode,
        link.quality
    );
    let path = dir.join(filename);
    if path.exists() {
        println!("{} already exists, skipping", path.display());
        tracing::info!(path = %path.display(), "skipping existing download");
        return Ok(path);
    }

    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build download client")?;

    tracing::info!(url = link.url.as_str(), "starting download");
    let mut response = client
        .get(&link.url)
        .header(reqwest::header::REFERER, REFERER)
        .send()
        .await
        .context("download request failed")?
        .error_for_status()
        .context("download request rejected")?;

    let bar = match response.content_length() {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "{bar:40.green/dim} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        }
        None => ProgressBar::new_spinner(),
    };

    let mut file = fs::File::create(&path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;

    while let Some(chunk) = response.chunk().await.context("download interrupted")? {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        bar.inc(chunk.len() as u64);
    }

    file.flush().await?;
    bar.finish();
    tracing::info!(path = %path.display(), "download complete");
    Ok(path)
}

/// Default downloads directory: `./downloads`
pub fn default_dir() -> PathBuf {
    PathBuf::from("downloads")
}

/// Sanitizes a show name into a filesystem-safe filename stem
///
/// Strips reserved and control characters, collapses whitespace and
/// underscore runs, and caps the length at 200 characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => cleaned.push('_'),
            c if c.is_control() => {}
            c => cleaned.push(c),
        }
    }

    // Collapse whitespace runs to single spaces, underscore runs to one
    let mut result = String::with_capacity(cleaned.len());
    let mut last_space = false;
    let mut last_underscore = false;
    for c in cleaned.chars() {
        if c.is_whitespace() {
            if !last_space {
                result.push(' ');
            }
            last_space = true;
            last_underscore = false;
        } else if c == '_' {
            if !last_underscore {
                result.push('_');
            }
            last_underscore = true;
            last_space = false;
        } else {
            result.push(c);
            last_space = false;
            last_underscore = false;
        }
    }

    let mut result = result.trim_matches(['_', ' ']).to_string();
    if result.len() > 200 {
        let mut cut = 200;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
        result = result.trim_matches(['_', ' ']).to_string();
    }

    if result.is_empty() {
        "unnamed".to_string()
    } else {
        result
    }
}
