//! Episode source payload parsing for the AllAnime API
//!
//! The `sourceUrls` field of the episode query carries one entry per embed
//! provider. Providers we know how to extract announce themselves under a
//! fixed `sourceName`, and their `sourceUrl` is an obfuscated path: a `--`
//! prefix followed by hex pairs, each pair being the ASCII byte XORed
//! with 0x38.

use serde::Deserialize;

use crate::error::{AnimineError, Result};
use crate::types::Provider;

/// One entry of the `sourceUrls` array as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct RawSourceUrl {
    #[serde(rename = "sourceName")]
    pub source_name: String,

    #[serde(rename = "sourceUrl")]
    pub source_url: String,
}

/// A classified provider source with its decoded fetch path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    pub provider: Provider,
    pub path: String,
}

/// Decodes an obfuscated source URL into a plain path
///
/// Strips the leading `--`, XORs each hex pair with 0x38, and applies the
/// `/clock` → `/clock.json` endpoint rewrite. Hex pairs that do not decode
/// to printable ASCII are skipped rather than failing the whole URL.
///
/// # Errors
/// - `DecodeError` if the blob is empty or has an odd number of hex digits
///
/// # Example
/// ```
/// use animine_core::parser::decode_source_url;
/// // "--" + hex of each byte of "/x" XOR 0x38
/// let path = decode_source_url("--1740").unwrap();
/// assert_eq!(path, "/x");
/// ```
pub fn decode_source_url(blob: &str) -> Result<String> {
    let hex = blob.strip_prefix("--").unwrap_or(blob);

    if hex.is_empty() {
        return Err(AnimineError::DecodeError("empty blob".to_string()));
    }
    if hex.len() % 2 != 0 {
        return Err(AnimineError::DecodeError(format!(
            "odd hex length: {}",
            hex.len()
        )));
    }

    let bytes = hex.as_bytes();
    let mut decoded = String::with_capacity(hex.len() / 2);

    for pair in bytes.chunks(2) {
        let hi = hex_digit(pair[0]);
        let lo = hex_digit(pair[1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => {
                let byte = (hi << 4 | lo) ^ 0x38;
                // Skip anything outside printable ASCII instead of failing
                if (0x20..0x7f).contains(&byte) {
                    decoded.push(byte as char);
                } else {
                    tracing::debug!("skipping non-printable decoded byte {:#04x}", byte);
                }
            }
            _ => {
                tracing::debug!(
                    "skipping invalid hex pair {:?}",
                    std::str::from_utf8(pair).unwrap_or("??")
                );
            }
        }
    }

    // The clock endpoint only answers under its .json alias
    Ok(decoded.replace("/clock?", "/clock.json?"))
}

/// Classifies the raw `sourceUrls` entries into decodable provider sources
///
/// Entries from unknown providers or with undecodable URLs are dropped;
/// a degraded episode still plays from whatever providers survive.
pub fn classify_sources(raw: &[RawSourceUrl]) -> Vec<SourceUrl> {
    let mut sources = Vec::new();

    for entry in raw {
        let Some(provider) = Provider::from_source_name(&entry.source_name) else {
            tracing::debug!(source = %entry.source_name, "skipping unknown provider");
            continue;
        };

        if !entry.source_url.starts_with("--") {
            // Plain URLs from known providers do exist but point at embed
            // pages we cannot extract; only obfuscated API paths are usable.
            tracing::debug!(source = %entry.source_name, "skipping non-obfuscated source URL");
            continue;
        }

        match decode_source_url(&entry.source_url) {
            Ok(path) => sources.push(SourceUrl { provider, path }),
            Err(e) => {
                tracing::warn!(source = %entry.source_name, "undecodable source URL: {}", e);
            }
        }
    }

    sources
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
