//! Watch history persistence
//!
//! History lives in a single JSON file under the platform data directory.
//! One watch entry per (show, translation mode), most recently watched
//! first, capped at 100 entries; completed downloads are ledgered in the
//! same file, one entry per saved path. Writes go through a temp file and
//! rename so a crash never leaves a half-written file behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use animine_core::TranslationType;

const MAX_ENTRIES: usize = 100;

/// One watched episode record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub show_id: String,
    pub show_name: String,
    pub episode: String,
    pub mode: TranslationType,
    pub total_episodes: u32,
    pub quality: Option<String>,
    pub provider: Option<String>,
    pub last_watched: DateTime<Utc>,
}

impl HistoryEntry {
    /// Next episode to continue with, if episodes remain
    ///
    /// Only plain integer episode numbers can be continued; "7.5"-style
    /// specials have no well-defined successor.
    pub fn next_episode(&self) -> Option<String> {
        let current: u32 = self.episode.parse().ok()?;
        if current < self.total_episodes {
            Some((current + 1).to_string())
        } else {
            None
        }
    }
}

/// One completed episode download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub show_name: String,
    pub episode: String,
    pub quality: Option<String>,
    pub path: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    history: Vec<HistoryEntry>,
    // Older files predate the downloads ledger
    #[serde(default)]
    downloads: Vec<DownloadEntry>,
    last_updated: Option<DateTime<Utc>>,
}

/// Watch history store backed by one JSON file
pub struct History {
    path: PathBuf,
}

impl History {
    /// Opens the history at the default platform location
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(default_path()?))
    }

    /// Opens the history at an explicit path (used by tests)
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Records a watched episode, replacing any entry for the same show
    /// and mode
    pub fn record(&self, entry: HistoryEntry) -> Result<()> {
        let mut file = self.load()?;

        file.history
            .retain(|e| !(e.show_id == entry.show_id && e.mode == entry.mode));
        file.history.insert(0, entry);
        file.history
            .sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        file.history.truncate(MAX_ENTRIES);

        self.save(&mut file)
    }

    /// All entries, most recently watched first
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.load()?.history)
    }

    /// Records a completed download, replacing any entry for the same path
    pub fn record_download(&self, entry: DownloadEntry) -> Result<()> {
        let mut file = self.load()?;

        file.downloads.retain(|e| e.path != entry.path);
        file.downloads.insert(0, entry);
        file.downloads
            .sort_by(|a, b| b.downloaded_at.cmp(&a.downloaded_at));
        file.downloads.truncate(MAX_ENTRIES);

        self.save(&mut file)
    }

    /// All recorded downloads, most recent first
    pub fn downloads(&self) -> Result<Vec<DownloadEntry>> {
        Ok(self.load()?.downloads)
    }

    /// Entries that still have unwatched episodes ahead
    pub fn continue_options(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.entries()?;
        Ok(entries
            .into_iter()
            .filter(|e| e.next_episode().is_some())
            .collect())
    }

    fn load(&self) -> Result<HistoryFile> {
        if !self.path.exists() {
            return Ok(HistoryFile::default());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        match serde_json::from_str(&data) {
            Ok(file) => Ok(file),
            Err(e) => {
                // A corrupt history is not worth failing playback over
                tracing::warn!("discarding corrupt history file: {}", e);
                Ok(HistoryFile::default())
            }
        }
    }

    fn save(&self, file: &mut HistoryFile) -> Result<()> {
        file.last_updated = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let data = serde_json::to_string_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `<data_dir>/animine/history.json`, falling back to the working directory
fn default_path() -> Result<PathBuf> {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("animine").join("history.json"))
}
