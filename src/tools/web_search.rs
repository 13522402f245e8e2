//! Web search tool
//!
//! Google results through SerpAPI. Requires a SerpAPI key; the tool is not
//! registered without one.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::{query_arg, query_schema, Tool, ToolResult};
use super::validators::{parse_code, parse_count, split_query, validate_search_query};
use crate::config::SerpApiConfig;
use crate::error::{Error, Result};

/// Timeout for search requests
const SEARCH_TIMEOUT_SECS: u64 = 30;

const USAGE: &str = "'search_term' or 'search_term|num_results|language|country'";

/// SerpAPI response, reduced to the fields we render
#[derive(Debug, Deserialize)]
struct SerpResponse {
    error: Option<String>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// A parsed `term|num|lang|country` query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub term: String,
    pub num_results: u8,
    pub language: String,
    pub country: String,
}

impl SearchRequest {
    /// Parse the pipe-separated query format
    pub fn parse(query: &str, default_results: u8) -> std::result::Result<Self, String> {
        let parts = split_query(query, 4, USAGE)?;

        let term = parts[0];
        validate_search_query(term)?;

        let num_results = match parts.get(1) {
            Some(raw) if !raw.is_empty() => parse_count(raw, 1, 10)?,
            _ => default_results,
        };
        let language = match parts.get(2) {
            Some(raw) if !raw.is_empty() => parse_code(raw, &[2], "Language")?,
            _ => "en".to_string(),
        };
        let country = match parts.get(3) {
            Some(raw) if !raw.is_empty() => parse_code(raw, &[2], "Country")?,
            _ => "us".to_string(),
        };

        Ok(SearchRequest {
            term: term.to_string(),
            num_results,
            language,
            country,
        })
    }
}

/// Web search tool backed by SerpAPI
pub struct WebSearchTool {
    client: Client,
    config: SerpApiConfig,
    default_results: u8,
}

impl WebSearchTool {
    /// Create a new search tool
    pub fn new(config: SerpApiConfig, default_results: u8) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()?;

        info!("Web search enabled (SerpAPI)");
        Ok(Self {
            client,
            config,
            default_results: default_results.clamp(1, 10),
        })
    }

    async fn search(&self, request: &SearchRequest) -> Result<SerpResponse> {
        let url = format!("{}/search.json", self.config.base_url);
        let num = request.num_results.to_string();

        debug!(
            "SerpAPI search: q={:?} num={} hl={} gl={}",
            request.term, request.num_results, request.language, request.country
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", request.term.as_str()),
                ("num", num.as_str()),
                ("hl", request.language.as_str()),
                ("gl", request.country.as_str()),
                ("api_key", self.config.api_key.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // SerpAPI reports most failures as `{"error": ...}`, whatever the status
        match serde_json::from_str::<SerpResponse>(&text) {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => Err(Error::Tool(format!(
                "search failed with status {}: {}",
                status, text
            ))),
            Err(e) => Err(Error::Tool(format!("failed to parse SerpAPI response: {}", e))),
        }
    }
}

/// Render organic results as a numbered list
fn format_results(results: &[OrganicResult], limit: usize) -> String {
    results
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\nURL: {}\n{}\n",
                i + 1,
                r.title.as_deref().unwrap_or("No title"),
                r.link.as_deref().unwrap_or("No link"),
                r.snippet.as_deref().unwrap_or("No description"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Input format: 'search_term' or \
         'search_term|num_results|language|country'. \
         Example: 'python programming' or 'python programming|5|en|us'"
    }

    fn parameters_schema(&self) -> Value {
        query_schema("Search query: 'search_term' or 'search_term|num_results|language|country'")
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = query_arg(&args)?;

        let request = match SearchRequest::parse(query, self.default_results) {
            Ok(r) => r,
            Err(msg) => return Ok(ToolResult::failure(msg)),
        };

        match self.search(&request).await {
            Ok(SerpResponse { error: Some(err), .. }) => {
                warn!("SerpAPI returned an error: {}", err);
                Ok(ToolResult::success(format!("SerpAPI Error: {}", err)))
            }
            Ok(SerpResponse { organic_results, .. }) if organic_results.is_empty() => Ok(
                ToolResult::success(format!("No results found for '{}'", request.term)),
            ),
            Ok(SerpResponse { organic_results, .. }) => {
                info!("Web search returned {} results", organic_results.len());
                Ok(ToolResult::success(format_results(
                    &organic_results,
                    request.num_results as usize,
                )))
            }
            Err(e) => Ok(ToolResult::failure(format!("Error performing search: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(base_url: &str) -> WebSearchTool {
        let mut config = SerpApiConfig::new("test-key");
        config.base_url = base_url.to_string();
        WebSearchTool::new(config, 5).unwrap()
    }

    #[test]
    fn test_parse_request() {
        let r = SearchRequest::parse("python programming", 5).unwrap();
        assert_eq!(r.term, "python programming");
        assert_eq!(r.num_results, 5);
        assert_eq!(r.language, "en");
        assert_eq!(r.country, "us");

        let r = SearchRequest::parse("paris tourism|3|fr|FR", 5).unwrap();
        assert_eq!(r.num_results, 3);
        assert_eq!(r.language, "fr");
        assert_eq!(r.country, "fr");

        assert!(SearchRequest::parse("ab", 5).is_err());
        assert!(SearchRequest::parse("rust|11", 5).is_err());
        assert!(SearchRequest::parse("rust|2|eng", 5).is_err());
        assert!(SearchRequest::parse("rust|2|en|us|extra", 5).is_err());
    }

    #[tokio::test]
    async fn test_search_formats_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("engine", "google"))
            .and(query_param("q", "rust language"))
            .and(query_param("num", "2"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"title": "Rust", "link": "https://www.rust-lang.org", "snippet": "A language"},
                    {"title": "Rust (game)", "link": "https://rust.facepunch.com"},
                    {"title": "Extra", "link": "https://example.com", "snippet": "ignored"}
                ]
            })))
            .mount(&server)
            .await;

        let result = tool(&server.uri())
            .execute(serde_json::json!({"query": "rust language|2"}))
            .await
            .unwrap();

        assert_eq!(
            result.to_string(),
            "1. Rust\nURL: https://www.rust-lang.org\nA language\n\n\
             2. Rust (game)\nURL: https://rust.facepunch.com\nNo description\n"
        );
    }

    #[tokio::test]
    async fn test_search_api_error_and_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "bad key query"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Invalid API key."})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "nothing here"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let tool = tool(&server.uri());

        let err = tool
            .execute(serde_json::json!({"query": "bad key query"}))
            .await
            .unwrap();
        assert_eq!(err.to_string(), "SerpAPI Error: Invalid API key.");

        let empty = tool
            .execute(serde_json::json!({"query": "nothing here"}))
            .await
            .unwrap();
        assert_eq!(empty.to_string(), "No results found for 'nothing here'");
    }

    #[tokio::test]
    async fn test_invalid_query_is_failure() {
        let result = tool("http://127.0.0.1:9")
            .execute(serde_json::json!({"query": "!!!"}))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
