//! Stream link extraction from embed provider responses
//!
//! Each provider answers its decoded source path with a different body
//! shape: Wixmp embeds repackager URLs, SharePoint returns a JSON `links`
//! array, the YouTube proxy exposes fast4speed URLs, and HiAnime serves
//! m3u8 playlists. Every extractor is a pure function over the body text.

use regex::Regex;

use crate::types::{Provider, StreamFormat, StreamLink};

/// Extracts per-quality MP4 links from a Wixmp provider response
///
/// The body contains repackager URLs of the form
/// `https://repackager.wixmp.com/<base>/,<q1>,<q2>,.../mp4/file.mp4.urlset/master.m3u8`
/// where each quality expands to `https://<base>/<q>/mp4/file.mp4`.
pub fn extract_wixmp_links(body: &str) -> Vec<StreamLink> {
    let Ok(re) = Regex::new(
        r"https://repackager\.wixmp\.com/(video\.wixstatic\.com/video/[^/]+)/,([^,/]+(?:,[^,/]+)*),/mp4/file\.mp4\.urlset/master\.m3u8",
    ) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for caps in re.captures_iter(body) {
        let base = &caps[1];
        for quality in caps[2].split(',') {
            let quality = quality.trim();
            if quality.is_empty() {
                continue;
            }
            push_unique(
                &mut links,
                StreamLink {
                    provider: Provider::Wixmp,
                    format: StreamFormat::Mp4,
                    quality: quality.to_string(),
                    url: format!("https://{}/{}/mp4/file.mp4", base, quality),
                },
            );
        }
    }
    links
}

/// Extracts MP4 download links from a SharePoint provider response
///
/// Prefers the structured JSON `links` array; falls back to scanning for
/// quoted sharepoint.com download URLs when the body is not valid JSON.
pub fn extract_sharepoint_links(body: &str) -> Vec<StreamLink> {
    let mut links = Vec::new();

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(entries) = json.get("links").and_then(|l| l.as_array()) {
            for entry in entries {
                let is_mp4 = entry.get("mp4").and_then(|m| m.as_bool()).unwrap_or(false);
                let url = entry.get("link").and_then(|l| l.as_str());
                if let (true, Some(url)) = (is_mp4, url) {
                    let quality = entry
                        .get("resolutionStr")
                        .and_then(|r| r.as_str())
                        .unwrap_or("SharePoint");
                    push_unique(
                        &mut links,
                        StreamLink {
                            provider: Provider::Sharepoint,
                            format: StreamFormat::Mp4,
                            quality: quality.to_string(),
                            url: url.to_string(),
                        },
                    );
                }
            }
        }
    }

    if !links.is_empty() {
        return links;
    }

    // Fallback for malformed JSON bodies
    for pattern in [
        r#""link":"([^"]*sharepoint[^"]*download[^"]*)""#,
        r#""src":"([^"]*sharepoint[^"]*download[^"]*)""#,
    ] {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(body) {
            let url = &caps[1];
            if url.contains("sharepoint.com") && url.contains("download") {
                push_unique(
                    &mut links,
                    StreamLink {
                        provider: Provider::Sharepoint,
                        format: StreamFormat::Mp4,
                        quality: "SharePoint".to_string(),
                        url: url.to_string(),
                    },
                );
            }
        }
    }
    links
}

/// Extracts MP4 links from a YouTube proxy provider response
///
/// Links point at tools.fast4speed.rsvp. Some responses prepend the
/// allanime host to an already absolute URL; that prefix is stripped.
pub fn extract_yt_links(body: &str) -> Vec<StreamLink> {
    let mut links = Vec::new();

    for pattern in [
        r#"(https://tools\.fast4speed\.rsvp[^"\s]+)"#,
        r#""url":"([^"]*tools\.fast4speed[^"]*)""#,
    ] {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(body) {
            let mut url = caps[1].to_string();
            // Double-domain bug in some responses
            if let Some(stripped) = url.strip_prefix("https://allanime.dayhttps://") {
                url = format!("https://{}", stripped);
            }
            push_unique(
                &mut links,
                StreamLink {
                    provider: Provider::Yt,
                    format: StreamFormat::Mp4,
                    quality: "YouTube".to_string(),
                    url,
                },
            );
        }
    }
    links
}

/// Extracts HLS playlist links from a HiAnime provider response
///
/// Master playlists are labelled separately from media playlists so the
/// ranking prefers them.
pub fn extract_hianime_links(body: &str) -> Vec<StreamLink> {
    let mut links = Vec::new();

    for pattern in [
        r#""url":"([^"]*\.m3u8[^"]*)""#,
        r#"(https://[^"\s]+\.m3u8[^"\s]*)"#,
    ] {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(body) {
            let url = caps[1].to_string();
            let quality = if url.contains("master.m3u8") {
                "HLS Master"
            } else {
                "HLS Stream"
            };
            push_unique(
                &mut links,
                StreamLink {
                    provider: Provider::Hianime,
                    format: StreamFormat::Hls,
                    quality: quality.to_string(),
                    url,
                },
            );
        }
    }
    links
}

/// Dispatches to the extractor for the given provider
pub fn extract_links(provider: Provider, body: &str) -> Vec<StreamLink> {
    match provider {
        Provider::Wixmp => extract_wixmp_links(body),
        Provider::Sharepoint => extract_sharepoint_links(body),
        Provider::Yt => extract_yt_links(body),
        Provider::Hianime => extract_hianime_links(body),
    }
}

fn push_unique(links: &mut Vec<StreamLink>, link: StreamLink) {
    if !links.iter().any(|l| l.url == link.url) {
        links.push(link);
    }
}
