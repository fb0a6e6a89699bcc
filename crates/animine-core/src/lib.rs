//! AllAnime Scraper Core Library
//!
//! Provides an async API for searching the AllAnime catalog, listing
//! episodes, and resolving playable stream URLs from the embed providers.
//!
//! # Overview
//!
//! This crate provides a complete scraping solution for the AllAnime
//! catalog with:
//! - Rate-limited HTTP client to avoid overwhelming the server
//! - Decoder for the obfuscated provider source URLs
//! - Per-provider link extractors (Wixmp, SharePoint, YouTube, HiAnime)
//! - High-level API for searching shows and resolving ranked stream links
//!
//! # Example
//!
//! ```no_run
//! use animine_core::{Animine, Result, TranslationType};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scraper = Animine::new()?;
//!
//!     // Search the catalog
//!     let shows = scraper.search("frieren", TranslationType::Sub).await?;
//!
//!     if let Some(show) = shows.first() {
//!         // List episodes, then resolve stream links for the first one
//!         let episodes = scraper.episodes(&show.id, TranslationType::Sub).await?;
//!         let links = scraper
//!             .streams(&show.id, &episodes[0], TranslationType::Sub)
//!             .await?;
//!
//!         for link in &links {
//!             println!("{} {} {}", link.provider, link.quality, link.url);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Stream URLs
//!
//! The URLs returned by [`Animine::streams`] are ready to hand to an
//! external player or downloader, with the catalog referer attached as an
//! HTTP header. Provider CDNs expire their tokens after a while, so the
//! links are per-session values and must not be cached long-term.

mod client;
mod error;
pub mod parser;
mod scraper;
mod types;
pub mod url;

// Re-export client types
pub use client::{AllAnimeClient, ClientConfig, RateLimiter};

// Re-export error types
pub use error::{AnimineError, Result};

// Re-export main scraper API
pub use scraper::Animine;

// Re-export data types
pub use types::{Provider, Show, StreamFormat, StreamLink, TranslationType};
