//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use async_stream::try_stream;
use futures::StreamExt;
use ragdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time allowed to establish a connection, for both buffered and streamed calls.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

/// Sampling options, nested under `options` in the generate API.
#[derive(Debug, Serialize, Default)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Ollama API response format (one object per line when streaming).
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// Timeout for buffered completions
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url(ragdesk_core::config::DEFAULT_OLLAMA_ENDPOINT)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client with a custom base URL and completion timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            stream: request.stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                top_p: request.top_p,
            },
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Turn a non-success HTTP response into a generation error.
    async fn error_from_response(response: reqwest::Response) -> AppError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        AppError::Generation(format!("Ollama API error ({}): {}", status, error_text))
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one NDJSON line of a streaming response.
///
/// Blank lines yield `None`; an `error` object from the server is a failure.
fn parse_stream_line(line: &[u8]) -> AppResult<Option<LlmStreamChunk>> {
    let line = std::str::from_utf8(line)
        .map_err(|e| AppError::Generation(format!("Invalid UTF-8 in stream: {}", e)))?
        .trim();

    if line.is_empty() {
        return Ok(None);
    }

    let parsed: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| AppError::Generation(format!("Failed to parse chunk: {}", e)))?;

    if let Some(error) = parsed.error {
        return Err(AppError::Generation(format!("Ollama stream error: {}", error)));
    }

    let usage = parsed.done.then(|| parsed.usage());

    Ok(Some(LlmStreamChunk {
        content: parsed.response,
        model: parsed.model,
        done: parsed.done,
        usage,
    }))
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Ollama");

        let mut ollama_request = self.to_ollama_request(request);
        ollama_request.stream = false;

        let response = self
            .client
            .post(self.generate_url())
            .timeout(self.timeout)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Ollama response: {}", e)))?;

        if let Some(error) = ollama_response.error {
            return Err(AppError::Generation(format!("Ollama error: {}", error)));
        }

        tracing::info!(
            "Received completion from Ollama ({} chars)",
            ollama_response.response.len()
        );

        let usage = ollama_response.usage();
        Ok(LlmResponse {
            content: ollama_response.response,
            model: ollama_response.model,
            usage,
            done: ollama_response.done,
        })
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to Ollama");

        let mut ollama_request = self.to_ollama_request(request);
        ollama_request.stream = true;

        // No total timeout here: a long answer may legitimately stream for minutes
        let response = self
            .client
            .post(self.generate_url())
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send streaming request: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let mut body = response.bytes_stream();

        // Lines may straddle byte-chunk boundaries, so buffer until each newline
        let stream = try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;

            while !finished {
                let Some(next) = body.next().await else { break };
                let bytes = next.map_err(|e| AppError::Generation(format!("Stream error: {}", e)))?;
                buffer.extend_from_slice(&bytes);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if let Some(chunk) = parse_stream_line(&line)? {
                        finished = chunk.done;
                        yield chunk;
                        if finished {
                            break;
                        }
                    }
                }
            }

            if !finished {
                if let Some(chunk) = parse_stream_line(&buffer)? {
                    yield chunk;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
