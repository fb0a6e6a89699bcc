//! Parsers for AllAnime responses
//!
//! Contains modules for decoding episode source payloads and extracting
//! stream links from provider bodies.

pub mod links;
pub mod sources;

pub use links::{
    extract_hianime_links, extract_links, extract_sharepoint_links, extract_wixmp_links,
    extract_yt_links,
};
pub use sources::{classify_sources, decode_source_url, RawSourceUrl, SourceUrl};
