//! External media player detection and dispatch
//!
//! The CLI never touches the video stream itself; it resolves a URL and
//! hands it to mpv or vlc with the headers the CDNs expect.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tokio::process::Command;

use animine_core::url::REFERER;

/// Supported external players, in detection preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlayerKind {
    Mpv,
    Vlc,
}

impl PlayerKind {
    /// Binary name probed on PATH
    pub fn binary(&self) -> &'static str {
        match self {
            PlayerKind::Mpv => "mpv",
            PlayerKind::Vlc => "vlc",
        }
    }
}

impl std::fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// Picks a player, honoring `--player`, then `ANIMINE_PLAYER`, then probing
///
/// # Errors
/// Fails if the forced player is not installed, or if neither mpv nor vlc
/// responds to `--version`.
pub async fn detect(forced: Option<PlayerKind>) -> Result<PlayerKind> {
    if let Some(kind) = forced {
        if is_available(kind).await {
            return Ok(kind);
        }
        bail!("{} was requested but is not on PATH", kind.binary());
    }

    if let Ok(value) = std::env::var("ANIMINE_PLAYER") {
        if let Ok(kind) = PlayerKind::from_str(&value, true) {
            if is_available(kind).await {
                return Ok(kind);
            }
            tracing::warn!(player = %kind, "ANIMINE_PLAYER set but player not found, probing others");
        }
    }

    for kind in [PlayerKind::Mpv, PlayerKind::Vlc] {
        if is_available(kind).await {
            return Ok(kind);
        }
    }

    bail!("no media player found; install mpv or vlc")
}

/// Probes a player binary by running `--version`
async fn is_available(kind: PlayerKind) -> bool {
    Command::new(kind.binary())
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Builds the player invocation for a stream URL
///
/// Both players get the catalog referer and a window title. Dub streams
/// ship burned-in audio, so subtitle autodetection is switched off for
/// them to avoid doubled dialogue text.
pub fn build_command(kind: PlayerKind, url: &str, title: &str, dub: bool) -> Command {
    let mut cmd = Command::new(kind.binary());

    match kind {
        PlayerKind::Mpv => {
            cmd.arg("--keep-open=no")
                .arg(format!("--http-header-fields=Referer: {}", REFERER))
                .arg(format!("--title={}", title));
            if dub {
                cmd.arg("--no-sub").arg("--sid=no");
            }
            cmd.arg(url);
        }
        PlayerKind::Vlc => {
            cmd.arg(url)
                .arg("--play-and-exit")
                .arg("--http-referrer")
                .arg(REFERER)
                .arg("--meta-title")
                .arg(title);
            if dub {
                cmd.arg("--no-sub-autodetect-file").arg("--no-spu");
            }
        }
    }

    cmd.stdout(Stdio::null()).stderr(Stdio::null());
    cmd
}

/// Launches the player and waits for it to exit
pub async fn play(kind: PlayerKind, url: &str, title: &str, dub: bool) -> Result<()> {
    tracing::info!(player = %kind, title, "launching player");

    let status = build_command(kind, url, title, dub)
        .status()
        .await
        .with_context(|| format!("failed to launch {}", kind.binary()))?;

    if !status.success() {
        tracing::warn!(player = %kind, code = ?status.code(), "player exited with failure");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_mpv_command_has_referer_and_title() {
        let cmd = build_command(
            PlayerKind::Mpv,
            "https://cdn.example.net/file.mp4",
            "Frieren - Episode 1",
            false,
        );
        let args = args_of(&cmd);
        assert!(args.contains(&"--http-header-fields=Referer: https://allmanga.to".to_string()));
        assert!(args.contains(&"--title=Frieren - Episode 1".to_string()));
        // URL goes last for mpv
        assert_eq!(args.last().unwrap(), "https://cdn.example.net/file.mp4");
        assert!(!args.contains(&"--no-sub".to_string()));
    }

    #[test]
    fn test_mpv_command_dub_disables_subtitles() {
        let cmd = build_command(PlayerKind::Mpv, "https://x/file.mp4", "t", true);
        let args = args_of(&cmd);
        assert!(args.contains(&"--no-sub".to_string()));
        assert!(args.contains(&"--sid=no".to_string()));
    }

    #[test]
    fn test_vlc_command_has_referrer_and_meta_title() {
        let cmd = build_command(PlayerKind::Vlc, "https://x/file.mp4", "Title", false);
        let args = args_of(&cmd);
        assert_eq!(args.first().unwrap(), "https://x/file.mp4");
        assert!(args.contains(&"--play-and-exit".to_string()));
        assert!(args.contains(&"--http-referrer".to_string()));
        assert!(args.contains(&"https://allmanga.to".to_string()));
        assert!(args.contains(&"--meta-title".to_string()));
    }

    #[test]
    fn test_vlc_command_dub_disables_subtitles() {
        let cmd = build_command(PlayerKind::Vlc, "https://x/file.mp4", "t", true);
        let args = args_of(&cmd);
        assert!(args.contains(&"--no-sub-autodetect-file".to_string()));
        assert!(args.contains(&"--no-spu".to_string()));
    }

    #[test]
    fn test_player_kind_binary_names() {
        assert_eq!(PlayerKind::Mpv.binary(), "mpv");
        assert_eq!(PlayerKind::Vlc.binary(), "vlc");
    }
}
