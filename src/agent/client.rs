//! OpenAI chat-completions client

use crate::agent::types::*;
use crate::config::OpenAiConfig;
use crate::error::{Error, Result};
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let key = config.api_key.expose_secret();
        if key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key not configured (set OPENAI_API_KEY)".to_string(),
            ));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiClient { client, config })
    }

    /// Get the configured model
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Default generation options derived from the configuration
    pub fn default_options(&self) -> GenerationOptions {
        GenerationOptions::with_temperature(self.config.temperature)
    }

    /// Create a chat completion without tools
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools: None,
            tool_choice: None,
        };

        self.send_request(request).await
    }

    /// Create a chat completion with tools/functions
    pub async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools: Some(tools),
            tool_choice: Some("auto".to_string()),
        };

        self.send_request(request).await
    }

    /// Send a request to the chat-completions endpoint
    async fn send_request(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!(
            "Sending request to OpenAI: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!(
                        "OpenAI request timed out after {}s",
                        self.config.timeout_secs
                    ))
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| Error::OpenAi(format!("Malformed response: {}", e)))?;

            if let Some(ref usage) = body.usage {
                info!(
                    "OpenAI response: model={}, tokens={}",
                    body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            match status.as_u16() {
                429 => {
                    warn!("Rate limit exceeded: {}", error_text);
                    Err(Error::RateLimit(error_text))
                }
                401 => Err(Error::Unauthorized("Invalid OpenAI API key".to_string())),
                _ => Err(Error::OpenAi(format!("API error ({}): {}", status, error_text))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: SecretString::from("sk-test-key"),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            base_url: base_url.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_client_requires_key() {
        let mut config = test_config("http://localhost");
        config.api_key = SecretString::from("");
        assert!(matches!(OpenAiClient::new(config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-3.5-turbo",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();
        let response = client
            .chat(vec![Message::user("Hi")], client.default_options())
            .await
            .unwrap();

        assert_eq!(response.choices[0].message.content, "Hello!");
        assert_eq!(response.usage.unwrap().total_tokens, 7);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .chat(vec![Message::user("Hi")], GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_and_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();

        let first = client.chat(vec![Message::user("a")], GenerationOptions::default()).await;
        assert!(matches!(first, Err(Error::RateLimit(ref body)) if body == "slow down"));

        let second = client.chat(vec![Message::user("b")], GenerationOptions::default()).await;
        assert!(matches!(second, Err(Error::OpenAi(ref msg)) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .chat(vec![Message::user("Hi")], GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::OpenAi(ref msg) if msg.starts_with("Malformed response")));
    }
}
