//! Main scraper API for the AllAnime catalog
//!
//! Provides the high-level API combining the HTTP client, the source
//! decoder, and the provider link extractors.

use futures::future::join_all;
use serde_json::json;

use crate::client::{AllAnimeClient, ClientConfig};
use crate::error::{AnimineError, Result};
use crate::parser::{classify_sources, extract_links, RawSourceUrl, SourceUrl};
use crate::types::{Show, StreamLink, TranslationType};
use crate::url::{EPISODES_QUERY, SEARCH_QUERY, SOURCES_QUERY};

/// Default number of shows requested per search
const SEARCH_LIMIT: u32 = 20;

/// Main scraper API for the AllAnime catalog
///
/// Combines the rate-limited HTTP client with the GraphQL queries and
/// provider parsers to provide a simple interface for searching shows,
/// listing episodes, and resolving stream links.
pub struct Animine {
    client: AllAnimeClient,
}

impl Animine {
    /// Create a new scraper with default configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        let client = AllAnimeClient::new()?;
        Ok(Self { client })
    }

    /// Create a new scraper with custom client configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = AllAnimeClient::with_config(config)?;
        Ok(Self { client })
    }

    /// Search the catalog for shows
    ///
    /// Only shows with at least one episode available in the requested
    /// translation mode are returned.
    ///
    /// # Errors
    /// - `InvalidQuery` if the query is empty or whitespace only
    /// - `HttpError` if the network request fails
    /// - `ApiError` if the response shape is unexpected
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> animine_core::Result<()> {
    /// use animine_core::{Animine, TranslationType};
    /// let scraper = Animine::new()?;
    /// let shows = scraper.search("frieren", TranslationType::Sub).await?;
    /// for show in shows {
    ///     println!("{} ({} episodes)", show.name, show.episodes);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(&self, query: &str, mode: TranslationType) -> Result<Vec<Show>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AnimineError::InvalidQuery(
                "Search query cannot be empty".to_string(),
            ));
        }

        let variables = json!({
            "search": {"allowAdult": false, "allowUnknown": false, "query": trimmed},
            "limit": SEARCH_LIMIT,
            "page": 1,
            "translationType": mode.as_str(),
        });

        let body = self.client.graphql(SEARCH_QUERY, &variables).await?;
        let edges = body
            .pointer("/data/shows/edges")
            .and_then(|e| e.as_array())
            .ok_or_else(|| AnimineError::ApiError("missing shows.edges".to_string()))?;

        let mut shows = Vec::new();
        for edge in edges {
            let Some(id) = edge.get("_id").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(name) = edge.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let episodes = edge
                .pointer(&format!("/availableEpisodes/{}", mode.as_str()))
                .and_then(json_count)
                .unwrap_or(0);
            if episodes == 0 {
                continue;
            }

            shows.push(Show {
                id: id.to_string(),
                name: name.to_string(),
                english_name: non_empty_str(edge.get("englishName")),
                native_name: non_empty_str(edge.get("nativeName")),
                episodes,
                description: non_empty_str(edge.get("description")),
            });
        }

        tracing::debug!(query = trimmed, results = shows.len(), "search complete");
        Ok(shows)
    }

    /// List available episode numbers for a show
    ///
    /// Episode identifiers are strings ("1", "2", ... sometimes "7.5");
    /// they are sorted numerically when every identifier parses as a
    /// number, lexically otherwise.
    ///
    /// # Errors
    /// - `InvalidQuery` if the show id is empty
    /// - `NotFound` if the show has no episodes in the requested mode
    /// - `HttpError` / `ApiError` as for [`Animine::search`]
    pub async fn episodes(&self, show_id: &str, mode: TranslationType) -> Result<Vec<String>> {
        if show_id.trim().is_empty() {
            return Err(AnimineError::InvalidQuery(
                "Show id cannot be empty".to_string(),
            ));
        }

        let variables = json!({"showId": show_id});
        let body = self.client.graphql(EPISODES_QUERY, &variables).await?;

        let episodes = body
            .pointer(&format!(
                "/data/show/availableEpisodesDetail/{}",
                mode.as_str()
            ))
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                AnimineError::NotFound(format!("no {} episodes for show {}", mode, show_id))
            })?;

        let mut episodes: Vec<String> = episodes
            .iter()
            .filter_map(|e| match e {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();

        if episodes.is_empty() {
            return Err(AnimineError::NotFound(format!(
                "no {} episodes for show {}",
                mode, show_id
            )));
        }

        sort_episodes(&mut episodes);
        Ok(episodes)
    }

    /// Resolve all stream links for one episode
    ///
    /// Fetches the episode source payload, decodes the provider paths, then
    /// queries every known provider concurrently. A provider that fails or
    /// yields nothing degrades the result to fewer links rather than an
    /// error. Links are returned ranked best first (see
    /// [`StreamLink::rank`]).
    ///
    /// # Errors
    /// - `InvalidQuery` if show id or episode is empty
    /// - `NotFound` if the episode has no source URLs at all
    /// - `HttpError` / `ApiError` for the source payload fetch
    pub async fn streams(
        &self,
        show_id: &str,
        episode: &str,
        mode: TranslationType,
    ) -> Result<Vec<StreamLink>> {
        if show_id.trim().is_empty() || episode.trim().is_empty() {
            return Err(AnimineError::InvalidQuery(
                "Show id and episode cannot be empty".to_string(),
            ));
        }

        let variables = json!({
            "showId": show_id,
            "translationType": mode.as_str(),
            "episodeString": episode,
        });
        let body = self.client.graphql(SOURCES_QUERY, &variables).await?;

        let raw_sources = body
            .pointer("/data/episode/sourceUrls")
            .cloned()
            .ok_or_else(|| {
                AnimineError::NotFound(format!("episode {} of show {}", episode, show_id))
            })?;
        let raw_sources: Vec<RawSourceUrl> = serde_json::from_value(raw_sources)
            .map_err(|e| AnimineError::ApiError(format!("malformed sourceUrls: {}", e)))?;

        let sources = classify_sources(&raw_sources);
        if sources.is_empty() {
            tracing::warn!(show_id, episode, "no usable providers for episode");
            return Ok(Vec::new());
        }

        let fetches = sources.iter().map(|source| self.fetch_source(source));
        let mut links: Vec<StreamLink> = join_all(fetches).await.into_iter().flatten().collect();

        links.sort_by_key(|l| l.rank());
        tracing::debug!(show_id, episode, links = links.len(), "streams resolved");
        Ok(links)
    }

    /// Fetch one provider and extract its links; failures degrade to empty
    async fn fetch_source(&self, source: &SourceUrl) -> Vec<StreamLink> {
        match self.client.fetch_provider(&source.path).await {
            Ok(body) => extract_links(source.provider, &body),
            Err(e) => {
                tracing::warn!(provider = %source.provider, "provider fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Sorts episode identifiers numerically when possible, lexically otherwise
fn sort_episodes(episodes: &mut [String]) {
    let keys: Option<Vec<f64>> = episodes.iter().map(|e| e.parse().ok()).collect();
    match keys {
        Some(keys) => {
            let mut pairs: Vec<(f64, String)> =
                keys.into_iter().zip(episodes.iter().cloned()).collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            for (slot, (_, label)) in episodes.iter_mut().zip(pairs) {
                *slot = label;
            }
        }
        None => episodes.sort(),
    }
}

/// Reads an episode count that the API serves as number or numeric string
fn json_count(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Reads an optional non-empty string field
fn non_empty_str(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provider, StreamFormat};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param_contains};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_scraper(server_uri: &str) -> Animine {
        Animine::with_config(ClientConfig {
            requests_per_second: 1000.0,
            timeout_secs: 5,
            max_retries: 0,
            api_base: server_uri.to_string(),
            provider_base: server_uri.to_string(),
        })
        .unwrap()
    }

    /// Obfuscates a provider path the way the API does
    fn encode(path: &str) -> String {
        let hex: String = path.bytes().map(|b| format!("{:02x}", b ^ 0x38)).collect();
        format!("--{}", hex)
    }

    #[test]
    fn test_scraper_creation() {
        let scraper = Animine::new();
        assert!(scraper.is_ok());
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let scraper = Animine::new().unwrap();
        let result = scraper.search("", TranslationType::Sub).await;
        assert!(matches!(result, Err(AnimineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_search_whitespace_query() {
        let scraper = Animine::new().unwrap();
        let result = scraper.search("   ", TranslationType::Sub).await;
        assert!(matches!(result, Err(AnimineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_episodes_empty_show_id() {
        let scraper = Animine::new().unwrap();
        let result = scraper.episodes("", TranslationType::Sub).await;
        assert!(matches!(result, Err(AnimineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_streams_empty_episode() {
        let scraper = Animine::new().unwrap();
        let result = scraper.streams("abc", "", TranslationType::Sub).await;
        assert!(matches!(result, Err(AnimineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_search_filters_shows_without_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"shows": {"edges": [
                    {
                        "_id": "id1",
                        "name": "Has Episodes",
                        "availableEpisodes": {"sub": 12, "dub": 0},
                        "englishName": "Has Episodes EN",
                        "nativeName": "",
                        "description": "A show."
                    },
                    {
                        "_id": "id2",
                        "name": "Sub Only Missing",
                        "availableEpisodes": {"sub": 0, "dub": 12}
                    }
                ]}}
            })))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let shows = scraper.search("test", TranslationType::Sub).await.unwrap();

        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].id, "id1");
        assert_eq!(shows[0].episodes, 12);
        assert_eq!(shows[0].english_name.as_deref(), Some("Has Episodes EN"));
        // Empty native name collapses to None
        assert_eq!(shows[0].native_name, None);
    }

    #[tokio::test]
    async fn test_search_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let result = scraper.search("test", TranslationType::Sub).await;
        assert!(matches!(result, Err(AnimineError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_episodes_sorted_numerically() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"show": {
                    "_id": "id1",
                    "name": "Test",
                    "availableEpisodesDetail": {
                        "sub": ["10", "2", "1", "7.5"],
                        "dub": []
                    }
                }}
            })))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let episodes = scraper.episodes("id1", TranslationType::Sub).await.unwrap();
        assert_eq!(episodes, vec!["1", "2", "7.5", "10"]);
    }

    #[tokio::test]
    async fn test_episodes_missing_mode_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"show": {
                    "_id": "id1",
                    "availableEpisodesDetail": {"sub": ["1"]}
                }}
            })))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let result = scraper.episodes("id1", TranslationType::Dub).await;
        assert!(matches!(result, Err(AnimineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_streams_end_to_end_ranked() {
        let server = MockServer::start().await;

        // Episode payload announcing a Wixmp and a HiAnime source
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param_contains("variables", "episodeString"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"episode": {
                    "episodeString": "1",
                    "sourceUrls": [
                        {"sourceName": "Default", "sourceUrl": encode("/wixmp?id=1")},
                        {"sourceName": "Luf-Mp4", "sourceUrl": encode("/clock?id=2")},
                        {"sourceName": "Ak", "sourceUrl": encode("/ak?id=3")}
                    ]
                }}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/wixmp"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"url":"https://repackager.wixmp.com/video.wixstatic.com/video/abc/,720p,1080p,/mp4/file.mp4.urlset/master.m3u8"}"#,
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/clock.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"url":"https://cdn.example.net/hls/master.m3u8"}"#,
            ))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let links = scraper.streams("id1", "1", TranslationType::Sub).await.unwrap();

        assert_eq!(links.len(), 3);
        // Ranked: Wixmp 1080p, Wixmp 720p, then HiAnime HLS
        assert_eq!(links[0].quality, "1080p");
        assert_eq!(links[0].provider, Provider::Wixmp);
        assert_eq!(links[1].quality, "720p");
        assert_eq!(links[2].provider, Provider::Hianime);
        assert_eq!(links[2].format, StreamFormat::Hls);
    }

    #[tokio::test]
    async fn test_streams_provider_failure_degrades() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"episode": {
                    "episodeString": "1",
                    "sourceUrls": [
                        {"sourceName": "Default", "sourceUrl": encode("/wixmp?id=1")},
                        {"sourceName": "S-mp4", "sourceUrl": encode("/broken?id=2")}
                    ]
                }}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/wixmp"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"https://repackager.wixmp.com/video.wixstatic.com/video/abc/,480p,/mp4/file.mp4.urlset/master.m3u8"#,
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let links = scraper.streams("id1", "1", TranslationType::Sub).await.unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].quality, "480p");
    }

    #[tokio::test]
    async fn test_streams_no_sources_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"episode": {"episodeString": "1", "sourceUrls": []}}
            })))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server.uri());
        let links = scraper.streams("id1", "1", TranslationType::Sub).await.unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_sort_episodes_numeric() {
        let mut eps = vec![
            "10".to_string(),
            "2".to_string(),
            "7.5".to_string(),
            "1".to_string(),
        ];
        sort_episodes(&mut eps);
        assert_eq!(eps, vec!["1", "2", "7.5", "10"]);
    }

    #[test]
    fn test_sort_episodes_lexical_fallback() {
        let mut eps = vec!["special".to_string(), "1".to_string(), "2".to_string()];
        sort_episodes(&mut eps);
        assert_eq!(eps, vec!["1", "2", "special"]);
    }
}
