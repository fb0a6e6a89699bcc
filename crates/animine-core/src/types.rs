//! Core data types for the AllAnime scraper
//!
//! Contains the main data structures used throughout the library.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Translation mode for a show: subtitled or dubbed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationType {
    Sub,
    Dub,
}

impl TranslationType {
    /// Wire value used by the AllAnime API ("sub" or "dub")
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationType::Sub => "sub",
            TranslationType::Dub => "dub",
        }
    }
}

impl fmt::Display for TranslationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embed provider an episode source came from
///
/// Each provider is announced under a fixed `sourceName` in the episode
/// payload and is tried in priority order when links are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    Wixmp,
    Sharepoint,
    Yt,
    Hianime,
}

impl Provider {
    /// Maps the `sourceName` field from the episode payload to a provider
    pub fn from_source_name(name: &str) -> Option<Self> {
        match name {
            "Default" => Some(Provider::Wixmp),
            "S-mp4" => Some(Provider::Sharepoint),
            "Yt-mp4" => Some(Provider::Yt),
            "Luf-Mp4" | "Luf-mp4" => Some(Provider::Hianime),
            _ => None,
        }
    }

    /// Human-readable provider name
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Wixmp => "Wixmp",
            Provider::Sharepoint => "SharePoint",
            Provider::Yt => "YouTube",
            Provider::Hianime => "HiAnime",
        }
    }

    /// Ranking priority, lower is better
    pub fn priority(&self) -> u8 {
        match self {
            Provider::Wixmp => 1,
            Provider::Sharepoint => 2,
            Provider::Yt => 3,
            Provider::Hianime => 4,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Container format of a stream link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// Progressive MP4, playable and downloadable
    Mp4,
    /// HLS playlist, playable only
    Hls,
}

impl StreamFormat {
    fn priority(&self) -> u8 {
        match self {
            StreamFormat::Mp4 => 1,
            StreamFormat::Hls => 2,
        }
    }
}

/// A show returned from an AllAnime catalog search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Catalog identifier (e.g. "ReooPAxPMsHM4KPMY")
    pub id: String,

    /// Primary (romaji) title
    pub name: String,

    /// English title, if the catalog has one
    pub english_name: Option<String>,

    /// Native-script title, if the catalog has one
    pub native_name: Option<String>,

    /// Number of episodes available in the requested translation mode
    pub episodes: u32,

    /// Synopsis, truncated by the API
    pub description: Option<String>,
}

/// A single playable or downloadable link resolved for an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLink {
    /// Provider the link was extracted from
    pub provider: Provider,

    /// Container format
    pub format: StreamFormat,

    /// Quality label (e.g. "1080p", "SharePoint", "HLS Master")
    pub quality: String,

    /// Direct URL handed to the player or downloader
    pub url: String,
}

impl StreamLink {
    /// Sort key: provider priority, then format, then quality
    ///
    /// Named qualities rank 1080p > 720p > 480p > 360p; anything else
    /// sorts after them.
    pub fn rank(&self) -> (u8, u8, u8) {
        let quality_rank = match self.quality.as_str() {
            "1080p" => 1,
            "720p" => 2,
            "480p" => 3,
            "360p" => 4,
            _ => 5,
        };
        (self.provider.priority(), self.format.priority(), quality_rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_type_as_str() {
        assert_eq!(TranslationType::Sub.as_str(), "sub");
        assert_eq!(TranslationType::Dub.as_str(), "dub");
    }

    #[test]
    fn test_translation_type_serializes_lowercase() {
        let json = serde_json::to_string(&TranslationType::Dub).unwrap();
        assert_eq!(json, "\"dub\"");
    }

    #[test]
    fn test_provider_from_source_name() {
        assert_eq!(Provider::from_source_name("Default"), Some(Provider::Wixmp));
        assert_eq!(Provider::from_source_name("S-mp4"), Some(Provider::Sharepoint));
        assert_eq!(Provider::from_source_name("Yt-mp4"), Some(Provider::Yt));
        assert_eq!(Provider::from_source_name("Luf-Mp4"), Some(Provider::Hianime));
        assert_eq!(Provider::from_source_name("Luf-mp4"), Some(Provider::Hianime));
        assert_eq!(Provider::from_source_name("Ak"), None);
    }

    #[test]
    fn test_provider_priority_ordering() {
        assert!(Provider::Wixmp.priority() < Provider::Sharepoint.priority());
        assert!(Provider::Sharepoint.priority() < Provider::Yt.priority());
        assert!(Provider::Yt.priority() < Provider::Hianime.priority());
    }

    #[test]
    fn test_stream_link_rank_prefers_mp4_and_quality() {
        let hls = StreamLink {
            provider: Provider::Wixmp,
            format: StreamFormat::Hls,
            quality: "HLS Master".to_string(),
            url: "https://example.com/master.m3u8".to_string(),
        };
        let mp4_720 = StreamLink {
            provider: Provider::Wixmp,
            format: StreamFormat::Mp4,
            quality: "720p".to_string(),
            url: "https://example.com/720p.mp4".to_string(),
        };
        let mp4_1080 = StreamLink {
            provider: Provider::Wixmp,
            format: StreamFormat::Mp4,
            quality: "1080p".to_string(),
            url: "https://example.com/1080p.mp4".to_string(),
        };

        assert!(mp4_1080.rank() < mp4_720.rank());
        assert!(mp4_720.rank() < hls.rank());
    }

    #[test]
    fn test_stream_link_rank_prefers_provider() {
        let wixmp = StreamLink {
            provider: Provider::Wixmp,
            format: StreamFormat::Mp4,
            quality: "480p".to_string(),
            url: "https://example.com/480p.mp4".to_string(),
        };
        let sharepoint = StreamLink {
            provider: Provider::Sharepoint,
            format: StreamFormat::Mp4,
            quality: "1080p".to_string(),
            url: "https://example.com/sp.mp4".to_string(),
        };
        assert!(wixmp.rank() < sharepoint.rank());
    }

    #[test]
    fn test_show_serialization_round_trip() {
        let show = Show {
            id: "ReooPAxPMsHM4KPMY".to_string(),
            name: "One Piece".to_string(),
            english_name: Some("One Piece".to_string()),
            native_name: None,
            episodes: 1071,
            description: Some("Pirates.".to_string()),
        };
        let json = serde_json::to_string(&show).unwrap();
        let back: Show = serde_json::from_str(&json).unwrap();
        assert_eq!(show, back);
    }
}
