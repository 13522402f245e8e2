//! URL fetch tool
//!
//! Downloads a web page and reduces it to readable text.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::{query_arg, query_schema, Tool, ToolResult};
use super::validators::validate_url;
use crate::config::ToolsConfig;
use crate::error::Result;
use crate::format::{collapse_whitespace, truncate};

/// Elements dropped before text extraction
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head", "header", "footer", "nav", "noscript"];

const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; toolagent/", env!("CARGO_PKG_VERSION"), ")");

/// Extract visible text from an HTML document
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    collect_text(document.root_element(), &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push(text.to_string());
        }
    }
}

/// Built-in tool: fetch a URL as text
pub struct UrlFetchTool {
    client: Client,
    max_chars: usize,
}

impl UrlFetchTool {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.url_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_chars: config.url_max_chars,
        })
    }

    async fn fetch(&self, url: url::Url) -> std::result::Result<String, String> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                "Request timed out".to_string()
            } else {
                e.to_string()
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));

        let body = response.text().await.map_err(|e| e.to_string())?;
        debug!("Fetched {} ({} bytes, html={})", url, body.len(), is_html);

        let text = if is_html {
            clean_html(&body)
        } else {
            collapse_whitespace(&body)
        };

        Ok(truncate(&text, self.max_chars))
    }
}

#[async_trait]
impl Tool for UrlFetchTool {
    fn name(&self) -> &str {
        "url_fetch"
    }

    fn description(&self) -> &str {
        "Fetch and extract text content from a web URL. \
         Input should be a valid URL starting with http:// or https://."
    }

    fn parameters_schema(&self) -> Value {
        query_schema("The URL to fetch content from (must start with http:// or https://)")
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = query_arg(&args)?;

        let url = match validate_url(query) {
            Ok(url) => url,
            Err(msg) => return Ok(ToolResult::failure(msg)),
        };

        info!("Fetching URL: {}", url);
        match self.fetch(url).await {
            Ok(text) => Ok(ToolResult::success(text)),
            Err(msg) => Ok(ToolResult::failure(format!(
                "Error fetching URL content: {}",
                msg
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html>
        <head><title>Ignored</title><style>body { color: red; }</style></head>
        <body>
            <nav>Home | About</nav>
            <header>Site banner</header>
            <h1>Main   heading</h1>
            <p>First
               paragraph.</p>
            <script>var x = 1;</script>
            <footer>Copyright</footer>
        </body>
    </html>"#;

    fn tool(max_chars: usize) -> UrlFetchTool {
        let config = ToolsConfig {
            url_max_chars: max_chars,
            ..ToolsConfig::default()
        };
        UrlFetchTool::new(&config).unwrap()
    }

    #[test]
    fn test_clean_html() {
        assert_eq!(clean_html(PAGE), "Main heading First paragraph.");
    }

    #[tokio::test]
    async fn test_fetch_and_truncate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let result = tool(12)
            .execute(serde_json::json!({"query": format!("{}/article", server.uri())}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.to_string(), "Main heading...");
    }

    #[tokio::test]
    async fn test_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = tool(1000)
            .execute(serde_json::json!({"query": format!("{}/missing", server.uri())}))
            .await
            .unwrap();

        assert_eq!(
            result.to_string(),
            "Error: Error fetching URL content: HTTP 404: Not Found"
        );
    }

    #[tokio::test]
    async fn test_rejects_bad_scheme() {
        let result = tool(1000)
            .execute(serde_json::json!({"query": "file:///etc/passwd"}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.to_string().contains("Invalid scheme"));
    }
}
