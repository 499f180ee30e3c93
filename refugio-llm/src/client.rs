//! LLM Client — unified interface for Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse, LlmTask};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally (recommended).
    Ollama {
        /// e.g. `http://localhost:11434`
        base_url: String,
    },
    /// OpenAI-compatible chat-completions API.
    OpenAiCompatible {
        /// API root without the `/v1` suffix.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM available — all calls return an error.
    None,
}

impl LlmProvider {
    /// Build a provider from its config name.
    ///
    /// # Errors
    ///
    /// [`LlmError::BadProvider`] for an unknown name, or for `openai` without
    /// an API key.
    pub fn from_name(
        name: &str,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        match name.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama { base_url }),
            "openai" | "openai-compatible" => {
                let api_key = api_key.ok_or_else(|| {
                    LlmError::BadProvider("openai provider needs an api_key".into())
                })?;
                Ok(Self::OpenAiCompatible { base_url, api_key })
            }
            "none" | "" => Ok(Self::None),
            other => Err(LlmError::BadProvider(format!("unknown LLM provider '{other}'"))),
        }
    }
}

/// The main LLM client that routes requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    story_model: String,
    extraction_model: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("story_model", &self.story_model)
            .field("extraction_model", &self.extraction_model)
            .field("max_retries", &self.max_retries)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(
        provider: LlmProvider,
        story_model: impl Into<String>,
        extraction_model: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            provider,
            http: Client::new(),
            story_model: story_model.into(),
            extraction_model: extraction_model.into(),
            max_retries,
            retry_backoff: Duration::from_millis(250),
        }
    }

    /// Create a client with no LLM backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), String::new(), 0)
    }

    /// Base delay between retries; attempt `n` waits `n * backoff`.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Model name used for `task`.
    #[must_use]
    pub fn model_for(&self, task: LlmTask) -> &str {
        match task {
            LlmTask::Story => &self.story_model,
            LlmTask::Extraction => &self.extraction_model,
        }
    }

    /// Generate a response from the LLM.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the LLM is unavailable or all retries fail.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::NoBackend("provider is `none`".into())),
            LlmProvider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.generate_openai(base_url, api_key, request).await
            }
        }
    }

    /// Generate using Ollama's API.
    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.model_for(request.task);
        let url = format!("{base_url}/api/generate");
        let mut body = json!({
            "model": model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if request.json_mode {
            body["format"] = json!("json");
        }

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            self.backoff(attempt, "Ollama").await;

            let start = Instant::now();
            let result = self
                .http
                .post(&url)
                .json(&body)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;
            let latency_ms = elapsed_ms(start);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::Malformed(e.to_string()))?;

                    let text = json["response"].as_str().unwrap_or("").to_string();
                    if text.trim().is_empty() {
                        last_error = LlmError::EmptyResponse.to_string();
                        warn!(model, "Ollama returned an empty response");
                        continue;
                    }

                    debug!(model, latency_ms, chars = text.len(), "Ollama generation finished");
                    return Ok(LlmResponse {
                        text,
                        tokens_generated: token_count(&json["eval_count"]),
                        latency_ms,
                        model: model.to_string(),
                    });
                }
                Ok(resp) => {
                    last_error = format!(
                        "HTTP {}: {}",
                        resp.status(),
                        resp.text().await.unwrap_or_default()
                    );
                    warn!(error = %last_error, "Ollama returned error");
                }
                Err(e) if e.is_timeout() => {
                    last_error = LlmError::Timeout(request.timeout_ms).to_string();
                    warn!(timeout_ms = request.timeout_ms, "Ollama request timed out");
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(error = %last_error, "Ollama request failed");
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Generate using an OpenAI-compatible API.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.model_for(request.task);
        let url = format!("{base_url}/v1/chat/completions");

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            self.backoff(attempt, "OpenAI").await;

            let start = Instant::now();
            let result = self
                .http
                .post(&url)
                .bearer_auth(api_key)
                .json(&body)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;
            let latency_ms = elapsed_ms(start);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::Malformed(e.to_string()))?;

                    let text = json["choices"][0]["message"]["content"]
                        .as_str()
                        .unwrap_or("")
                        .to_string();
                    if text.trim().is_empty() {
                        last_error = LlmError::EmptyResponse.to_string();
                        warn!(model, "OpenAI API returned an empty response");
                        continue;
                    }

                    debug!(model, latency_ms, chars = text.len(), "OpenAI generation finished");
                    return Ok(LlmResponse {
                        text,
                        tokens_generated: token_count(&json["usage"]["completion_tokens"]),
                        latency_ms,
                        model: model.to_string(),
                    });
                }
                Ok(resp) => {
                    last_error = format!("HTTP {}", resp.status());
                    warn!(error = %last_error, "OpenAI API returned error");
                }
                Err(e) if e.is_timeout() => {
                    last_error = LlmError::Timeout(request.timeout_ms).to_string();
                    warn!(timeout_ms = request.timeout_ms, "OpenAI API request timed out");
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(error = %last_error, "OpenAI API request failed");
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    async fn backoff(&self, attempt: u32, backend: &str) {
        if attempt == 0 {
            return;
        }
        debug!(
            backend,
            attempt = attempt + 1,
            of = self.max_retries + 1,
            "Retrying LLM call"
        );
        tokio::time::sleep(self.retry_backoff * attempt).await;
    }

    /// Parse a raw LLM response text as structured JSON.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the text is not valid JSON or doesn't match `T`.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(
        &self,
        response: &LlmResponse,
    ) -> Result<T, LlmError> {
        serde_json::from_str(&response.text).map_err(|e| {
            LlmError::Malformed(format!("JSON parse error: {e} — raw text: '{}'", response.text))
        })
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn token_count(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names() {
        assert!(matches!(
            LlmProvider::from_name("Ollama", "http://localhost:11434/", None),
            Ok(LlmProvider::Ollama { base_url }) if base_url == "http://localhost:11434"
        ));
        assert!(matches!(
            LlmProvider::from_name("openai", "https://api.example.com", None),
            Err(LlmError::BadProvider(_))
        ));
        assert!(matches!(
            LlmProvider::from_name("openai", "https://api.example.com", Some("k".into())),
            Ok(LlmProvider::OpenAiCompatible { .. })
        ));
        assert!(matches!(LlmProvider::from_name("none", "", None), Ok(LlmProvider::None)));
        assert!(LlmProvider::from_name("gemini", "", None).is_err());
    }

    #[test]
    fn models_are_routed_by_task() {
        let client = LlmClient::new(
            LlmProvider::Ollama { base_url: "http://localhost:11434".into() },
            "mistral:7b-instruct",
            "qwen2.5:1.5b",
            1,
        );
        assert_eq!(client.model_for(LlmTask::Story), "mistral:7b-instruct");
        assert_eq!(client.model_for(LlmTask::Extraction), "qwen2.5:1.5b");
        assert!(client.is_available());
    }

    #[tokio::test]
    async fn none_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client
            .generate(&LlmRequest::story("hola"))
            .await
            .expect_err("no backend");
        assert!(matches!(err, LlmError::NoBackend(_)));
    }

    #[test]
    fn parse_structured_reports_raw_text() {
        let client = LlmClient::none();
        let response = LlmResponse {
            text: "not json".into(),
            tokens_generated: 0,
            latency_ms: 0,
            model: String::new(),
        };
        let err = client
            .parse_structured::<serde_json::Value>(&response)
            .expect_err("invalid");
        assert!(err.to_string().contains("not json"));
    }
}
