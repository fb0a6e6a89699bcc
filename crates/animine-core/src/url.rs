//! URL helpers and GraphQL documents for the AllAnime API
//!
//! The API accepts GET requests with the GraphQL document and its variables
//! passed as URL-encoded query parameters.

/// Host serving the embed provider endpoints
pub const PROVIDER_BASE: &str = "https://allanime.day";

/// GraphQL API endpoint
pub const API_BASE: &str = "https://api.allanime.day";

/// Referer the site expects on API and provider requests
pub const REFERER: &str = "https://allmanga.to";

/// Browser User-Agent sent with every request
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0";

/// Search query over the show catalog
pub const SEARCH_QUERY: &str = r#"
query($search: SearchInput, $limit: Int, $page: Int, $translationType: VaildTranslationTypeEnumType) {
    shows(search: $search, limit: $limit, page: $page, translationType: $translationType) {
        edges {
            _id
            name
            availableEpisodes
            englishName
            nativeName
            description
            __typename
        }
    }
}
"#;

/// Per-show episode listing query
pub const EPISODES_QUERY: &str = r#"
query($showId: String!) {
    show(_id: $showId) {
        _id
        availableEpisodesDetail
        name
    }
}
"#;

/// Episode source URLs query
pub const SOURCES_QUERY: &str = r#"
query($showId: String!, $translationType: VaildTranslationTypeEnumType!, $episodeString: String!) {
    episode(showId: $showId, translationType: $translationType, episodeString: $episodeString) {
        episodeString sourceUrls
    }
}
"#;

/// Builds a full GraphQL request URL
///
/// # Arguments
/// * `api_base` - API origin (e.g. "https://api.allanime.day")
/// * `query` - GraphQL document text
/// * `variables` - Variables object, serialized to JSON
///
/// # Example
/// ```
/// use animine_core::url::build_api_url;
/// let url = build_api_url("https://api.allanime.day", "query { x }", &serde_json::json!({"a": 1}));
/// assert_eq!(
///     url,
///     "https://api.allanime.day/api?variables=%7B%22a%22%3A1%7D&query=query%20%7B%20x%20%7D"
/// );
/// ```
pub fn build_api_url(api_base: &str, query: &str, variables: &serde_json::Value) -> String {
    let variables_json = variables.to_string();
    format!(
        "{}/api?variables={}&query={}",
        api_base,
        urlencoding::encode(&variables_json),
        urlencoding::encode(query)
    )
}

/// Builds a provider fetch URL from a decoded source path
///
/// # Example
/// ```
/// use animine_core::url::build_provider_url;
/// let url = build_provider_url("https://allanime.day", "/apivtwo/clock.json?id=abc");
/// assert_eq!(url, "https://allanime.day/apivtwo/clock.json?id=abc");
/// ```
pub fn build_provider_url(provider_base: &str, path: &str) -> String {
    format!("{}{}", provider_base, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_api_url_encodes_variables() {
        let url = build_api_url(API_BASE, "query { x }", &json!({"showId": "abc 123"}));
        assert!(url.starts_with("https://api.allanime.day/api?variables="));
        assert!(url.contains("abc%20123"));
        // Raw JSON delimiters must not survive encoding
        assert!(!url.contains('{'));
        assert!(!url.contains('"'));
    }

    #[test]
    fn test_build_api_url_encodes_query_document() {
        let url = build_api_url(API_BASE, SEARCH_QUERY, &json!({}));
        assert!(url.contains("query=%0Aquery"));
        assert!(url.contains("translationType"));
    }

    #[test]
    fn test_build_provider_url() {
        let url = build_provider_url(PROVIDER_BASE, "/apivtwo/clock.json?id=x");
        assert_eq!(url, "https://allanime.day/apivtwo/clock.json?id=x");
    }
}
