//! OpenAI-compatible chat completions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, CompletionResponse, ContentPart, FinishReason, LlmClient, Message,
    MessageContent, TokenUsage,
};
use crate::llm::retry::{LlmRetryConfig, error_from_response};

const PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any endpoint speaking the OpenAI chat completions protocol.
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: LlmRetryConfig,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: LlmRetryConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another compatible service.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry = config;
        self
    }

    async fn send(&self, url: &str, body: &ChatRequest<'_>) -> Result<ChatResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, PROVIDER).await);
        }
        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Value,
}

fn encode_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
        ContentPart::ImageUrl { url } => json!({ "type": "image_url", "image_url": { "url": url } }),
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let content = match &message.content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Parts(parts) => parts.iter().map(encode_part).collect(),
        };
        Self {
            role: message.role.as_str(),
            content,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl TryFrom<ChatResponse> for CompletionResponse {
    type Error = AiError;

    fn try_from(response: ChatResponse) -> Result<Self> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidFormat("no choices in response".to_string()))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            None | Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::MaxTokens,
            Some(_) => FinishReason::Error,
        };

        Ok(CompletionResponse {
            content: choice.message.content,
            finish_reason,
            usage: response.usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self.retry.run(PROVIDER, || self.send(&url, &body)).await?;
        response.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("test-key")
            .with_base_url(server.uri())
            .with_retry_config(LlmRetryConfig::immediate(1))
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "User likes tea." },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14 }
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("I like tea")]))
            .await
            .unwrap();

        assert_eq!(response.text(), "User likes tea.");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.unwrap().total_tokens, 14);
    }

    #[tokio::test]
    async fn complete_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }]
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        assert_eq!(response.text(), "ok");
    }

    #[tokio::test]
    async fn complete_surfaces_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap_err();
        match err {
            AiError::LlmHttp { status, .. } => assert_eq!(status, 401),
            other => panic!("expected LlmHttp, got {other:?}"),
        }
    }

    #[test]
    fn parts_are_encoded_as_openai_content_array() {
        let message = Message::user(MessageContent::Parts(vec![
            ContentPart::Text {
                text: "what is this".to_string(),
            },
            ContentPart::ImageUrl {
                url: "https://example.com/a.png".to_string(),
            },
        ]));
        let encoded = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(encoded["role"], "user");
        assert_eq!(encoded["content"][0]["type"], "text");
        assert_eq!(encoded["content"][1]["image_url"]["url"], "https://example.com/a.png");
    }
}
