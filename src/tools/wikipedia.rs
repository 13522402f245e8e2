//! Wikipedia tool
//!
//! Searches with the MediaWiki action API, then reads each hit's summary
//! from the REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::traits::{query_arg, query_schema, Tool, ToolResult};
use super::validators::{parse_code, parse_count, split_query};
use crate::config::ToolsConfig;
use crate::error::{Error, Result};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const MAX_DISAMBIGUATION_OPTIONS: usize = 5;
const USAGE: &str = "'search_term' or 'search_term|num_results|language'";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    #[serde(default)]
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: PageUrl,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

/// A parsed `term|num|lang` query
#[derive(Debug, Clone, PartialEq)]
pub struct WikiRequest {
    pub term: String,
    pub num_results: u8,
    pub language: String,
}

impl WikiRequest {
    pub fn parse(query: &str, default_language: &str) -> std::result::Result<Self, String> {
        let parts = split_query(query, 3, USAGE)?;

        let term = parts[0];
        if term.is_empty() {
            return Err("Search term cannot be empty".to_string());
        }

        let num_results = match parts.get(1) {
            Some(raw) if !raw.is_empty() => parse_count(raw, 1, 5)?,
            _ => 1,
        };
        let language = match parts.get(2) {
            Some(raw) if !raw.is_empty() => parse_code(raw, &[2, 3], "Language")
                .map_err(|_| format!("Invalid language code: {}", raw))?,
            _ => default_language.to_string(),
        };

        Ok(WikiRequest {
            term: term.to_string(),
            num_results,
            language,
        })
    }
}

/// Wikipedia search and summary tool
pub struct WikipediaTool {
    client: Client,
    default_language: String,
    base_url_override: Option<String>,
}

impl WikipediaTool {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("toolagent/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            default_language: config.wiki_language.clone(),
            base_url_override: config.wiki_base_url.clone(),
        })
    }

    fn base_url(&self, language: &str) -> Result<Url> {
        let raw = match self.base_url_override {
            Some(ref url) => url.clone(),
            None => format!("https://{}.wikipedia.org", language),
        };
        Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid Wikipedia URL {}: {}", raw, e)))
    }

    fn endpoint(&self, language: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url(language)?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("Wikipedia URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn search(&self, term: &str, limit: usize, language: &str) -> Result<Vec<String>> {
        let url = self.endpoint(language, &["w", "api.php"])?;
        let limit = limit.to_string();

        let response: SearchResponse = self
            .client
            .get(url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", term),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    /// Fetch a page summary; `None` when the page does not exist
    async fn summary(&self, title: &str, language: &str) -> Result<Option<PageSummary>> {
        let slug = title.replace(' ', "_");
        let url = self.endpoint(language, &["api", "rest_v1", "page", "summary", slug.as_str()])?;

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn describe(&self, title: &str, language: &str) -> Result<Option<String>> {
        let summary = match self.summary(title, language).await? {
            Some(s) => s,
            None => {
                debug!("Wikipedia page '{}' not found", title);
                return Ok(None);
            }
        };

        if summary.page_type == "disambiguation" {
            let options: Vec<String> = self
                .search(title, MAX_DISAMBIGUATION_OPTIONS + 1, language)
                .await?
                .into_iter()
                .filter(|t| t != title)
                .take(MAX_DISAMBIGUATION_OPTIONS)
                .collect();
            return Ok(Some(format!(
                "'{}' is ambiguous. Options: {}\n",
                title,
                options.join(", ")
            )));
        }

        let first_paragraph = summary.extract.split('\n').next().unwrap_or_default();
        let page_url = summary
            .content_urls
            .map(|c| c.desktop.page)
            .unwrap_or_default();

        Ok(Some(format!(
            "Title: {}\nURL: {}\nSummary: {}\n",
            title, page_url, first_paragraph
        )))
    }

    async fn lookup(&self, request: &WikiRequest) -> Result<String> {
        let titles = self
            .search(&request.term, request.num_results as usize, &request.language)
            .await?;

        if titles.is_empty() {
            return Ok(format!("No Wikipedia articles found for '{}'", request.term));
        }

        let mut sections = Vec::new();
        for title in &titles {
            if let Some(section) = self.describe(title, &request.language).await? {
                sections.push(section);
            }
        }

        if sections.is_empty() {
            Ok(format!("Could not retrieve content for '{}'", request.term))
        } else {
            Ok(sections.join("\n"))
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Search Wikipedia articles for factual and background information. Use format: \
         'search_term' or 'search_term|num_results|language'. \
         Example: 'Albert Einstein' or 'Albert Einstein|3|en'"
    }

    fn parameters_schema(&self) -> Value {
        query_schema("Wikipedia query: 'search_term' or 'search_term|num_results|language'")
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = query_arg(&args)?;

        let request = match WikiRequest::parse(query, &self.default_language) {
            Ok(r) => r,
            Err(msg) => return Ok(ToolResult::failure(msg)),
        };

        match self.lookup(&request).await {
            Ok(text) => Ok(ToolResult::success(text)),
            Err(e) => {
                warn!("Wikipedia lookup failed: {}", e);
                Ok(ToolResult::failure(format!("Error searching Wikipedia: {}", e)))
            }
        }
    }
}
