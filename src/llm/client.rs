//! LLM client for API communication

use super::{CompletionProvider, CompletionRequest};
use crate::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Response from LLM
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated content
    pub content: String,
    /// Number of tokens used
    pub tokens_used: Option<usize>,
}

/// Wire protocol spoken by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    #[serde(alias = "openai-compatible")]
    OpenAi,
    Ollama,
}

/// Configuration for LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// API endpoint URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Maximum tokens for response
    pub max_tokens: usize,
    /// Temperature for generation
    pub temperature: f32,
    /// Attempts per completion before giving up
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_key: None,
            max_tokens: 32768,
            temperature: 0.3,
            max_retries: 3,
        }
    }
}

impl LlmConfig {
    /// Defaults with the endpoint each provider usually listens on
    pub fn for_provider(provider: LlmProvider) -> Self {
        let endpoint = match provider {
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
            LlmProvider::OpenAi => "https://api.openai.com",
            LlmProvider::Ollama => "http://localhost:11434",
        };

        Self {
            provider,
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }
}

/// LLM client for scoring and synthesis
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create with Gemini defaults
    pub fn gemini(model: &str, api_key: &str) -> Self {
        Self::new(LlmConfig {
            model: model.to_string(),
            api_key: Some(api_key.to_string()),
            ..Default::default()
        })
    }

    /// Create with Ollama defaults
    pub fn ollama(model: &str) -> Self {
        Self::new(LlmConfig {
            model: model.to_string(),
            ..LlmConfig::for_provider(LlmProvider::Ollama)
        })
    }

    /// Create with OpenAI-compatible endpoint
    pub fn openai_compatible(endpoint: &str, model: &str, api_key: Option<&str>) -> Self {
        Self::new(LlmConfig {
            provider: LlmProvider::OpenAi,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generate a completion
    pub async fn generate(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        match self.config.provider {
            LlmProvider::Gemini => self.generate_gemini(request).await,
            LlmProvider::OpenAi => self.generate_openai(request).await,
            LlmProvider::Ollama => self.generate_ollama(request).await,
        }
    }

    /// Generate completion using the Gemini generateContent API
    async fn generate_gemini(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );

        let mut parts: Vec<GeminiPart> = request
            .context_documents
            .iter()
            .map(|text| GeminiPart { text: text.clone() })
            .collect();
        parts.push(GeminiPart {
            text: request.user_query.clone(),
        });

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let mut req_builder = self.client.post(&url).json(&body);

        if let Some(ref key) = self.config.api_key {
            req_builder = req_builder.header("x-goog-api-key", key);
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini request failed: {} - {}", status, body);
        }

        let result: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let content: String = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if content.is_empty() {
            tracing::error!(
                finish_reason = ?result.candidates.first().and_then(|c| c.finish_reason.as_deref()),
                "Gemini returned no text"
            );
        }

        Ok(LlmResponse {
            content,
            tokens_used: result.usage_metadata.map(|u| u.total_token_count as usize),
        })
    }

    /// Generate completion using Ollama API
    async fn generate_ollama(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let url = format!("{}/api/generate", self.config.endpoint);

        let body = OllamaGenerateRequest {
            model: self.config.model.clone(),
            system: request.system_instruction.clone(),
            prompt: request.user_text(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens as i32,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama request failed: {} - {}", status, body);
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(LlmResponse {
            content: result.response,
            tokens_used: Some(result.eval_count.unwrap_or(0) as usize),
        })
    }

    /// Generate completion using OpenAI-compatible API
    async fn generate_openai(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        let mut messages = vec![OpenAIMessage {
            role: "system".to_string(),
            content: request.system_instruction.clone(),
        }];
        messages.extend(request.context_documents.iter().map(|doc| OpenAIMessage {
            role: "user".to_string(),
            content: doc.clone(),
        }));
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: request.user_query.clone(),
        });

        let body = OpenAIChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let mut req_builder = self.client.post(&url).json(&body);

        if let Some(ref key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send request to OpenAI-compatible API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI request failed: {} - {}", status, body);
        }

        let result: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        let tokens_used = result.usage.map(|u| u.total_tokens as usize);

        Ok(LlmResponse {
            content,
            tokens_used,
        })
    }

    /// Generate completion with retry
    pub async fn generate_with_retry(
        &self,
        request: &CompletionRequest,
        max_retries: usize,
    ) -> Result<LlmResponse> {
        let mut last_error = None;

        for attempt in 0..max_retries.max(1) {
            match self.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("LLM request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);

                    // Wait before retry
                    tokio::time::sleep(tokio::time::Duration::from_millis(
                        500 * (attempt as u64 + 1),
                    ))
                    .await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }
}

#[async_trait::async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> crate::Result<String> {
        let response = self
            .generate_with_retry(request, self.config.max_retries)
            .await
            .map_err(|e| Error::Completion(format!("{:#}", e)))?;

        tracing::debug!(
            model = %self.config.model,
            tokens = ?response.tokens_used,
            "completion finished"
        );

        Ok(response.content)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    total_token_count: i64,
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    eval_count: Option<i32>,
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: i32,
}

/// Mock LLM client for testing
///
/// Answers with the first registered response whose key occurs in the
/// system instruction or the user text, and counts every call.
#[derive(Default)]
pub struct MockLlmClient {
    responses: Vec<(String, String)>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Create a new mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mock response
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .push((prompt_contains.to_string(), response.to_string()));
    }

    /// Number of completions served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn respond(&self, request: &CompletionRequest) -> String {
        let text = request.user_text();
        self.responses
            .iter()
            .find(|(key, _)| request.system_instruction.contains(key) || text.contains(key))
            .map(|(_, response)| response.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> crate::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(self.respond(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_mock_client() {
        let mut client = MockLlmClient::new();
        client.add_response("test", r#"{"result": "success"}"#);

        let request = CompletionRequest::new("system", "this is a test prompt".to_string());
        let response = client.complete(&request).await.unwrap();
        assert!(response.contains("success"));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.provider, LlmProvider::Gemini);
        assert!(config.temperature > 0.0);
    }

    #[tokio::test]
    async fn test_gemini_request_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "k1"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "rate documents"}]},
                "contents": [{"role": "user", "parts": [{"text": "doc"}, {"text": "Kotlin arrays"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "```json\n{}\n```"}]}}],
                "usageMetadata": {"totalTokenCount": 12}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(LlmConfig {
            endpoint: server.uri(),
            model: "gemini-test".to_string(),
            api_key: Some("k1".to_string()),
            max_retries: 1,
            ..Default::default()
        });

        let request = CompletionRequest::new("rate documents", "Kotlin arrays".to_string())
            .with_documents(vec!["doc".to_string()]);
        let response = client.generate(&request).await.unwrap();

        assert_eq!(response.content, "```json\n{}\n```");
        assert_eq!(response.tokens_used, Some(12));
    }

    #[tokio::test]
    async fn test_openai_request_carries_system_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "title: x"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::openai_compatible(&server.uri(), "gpt", None);
        let request = CompletionRequest::new("outline", "Swift closures".to_string());
        let response = client.generate(&request).await.unwrap();
        assert_eq!(response.content, "title: x");

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "outline");
        assert_eq!(body["messages"][1]["content"], "Swift closures");
    }

    #[tokio::test]
    async fn test_failed_completion_maps_to_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = LlmClient::new(LlmConfig {
            endpoint: server.uri(),
            max_retries: 1,
            ..Default::default()
        });

        let request = CompletionRequest::new("x", "y".to_string());
        let err = CompletionProvider::complete(&client, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Completion(ref msg) if msg.contains("500")));
    }
}
