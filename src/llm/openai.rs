//! OpenAI-compatible chat completions provider.
//!
//! Talks to any endpoint implementing `POST {base_url}/chat/completions`, buffered or
//! streamed as server-sent events.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

use super::costs::model_cost;
use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, TextStream,
};
use crate::error::LlmError;

const PROVIDER: &str = "openai";

/// Default maximum silence between two stream events before the stream is failed.
const CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default endpoint when `OPENAI_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions client for a single model.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    chunk_timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            chunk_timeout: CHUNK_TIMEOUT,
        })
    }

    /// Override how long a stream may stay silent before it fails with `StreamTimeout`.
    pub fn with_chunk_timeout(mut self, chunk_timeout: Duration) -> Self {
        self.chunk_timeout = chunk_timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = ChatCompletionBody::new(&self.model, request, stream);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = resp.text().await.unwrap_or_default();

        tracing::error!(status = %status, url = %self.base_url, "Chat completion request failed");
        Err(error_for_status(status.as_u16(), retry_after, &body))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        model_cost(&self.model)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let resp = self.send(&request, false).await?;
        let body = resp.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        let completion: ChatCompletion = serde_json::from_str(&body)?;
        completion.into_response()
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
        let resp = self.send(&request, true).await?;

        let (tx, rx) = mpsc::channel::<Result<String, LlmError>>(100);
        let events = resp.bytes_stream().eventsource();
        let chunk_timeout = self.chunk_timeout;

        tokio::spawn(async move {
            let mut events = std::pin::pin!(events);
            loop {
                let event = match timeout(chunk_timeout, events.next()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => {
                        let _ = tx
                            .send(Err(LlmError::RequestFailed {
                                provider: PROVIDER.to_string(),
                                reason: "stream closed before [DONE]".to_string(),
                            }))
                            .await;
                        break;
                    }
                    Err(_) => {
                        let _ = tx
                            .send(Err(LlmError::StreamTimeout {
                                provider: PROVIDER.to_string(),
                                timeout: chunk_timeout,
                            }))
                            .await;
                        break;
                    }
                };

                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = tx
                            .send(Err(LlmError::RequestFailed {
                                provider: PROVIDER.to_string(),
                                reason: format!("Stream error: {}", e),
                            }))
                            .await;
                        break;
                    }
                };

                if event.data.is_empty() {
                    continue;
                }
                if event.data == "[DONE]" {
                    break;
                }

                match parse_chunk(&event.data) {
                    Ok(Some(delta)) => {
                        if tx.send(Ok(delta)).await.is_err() {
                            // Consumer went away.
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(LlmError::Json(e)) => {
                        tracing::debug!(error = %e, data = %event.data, "Skipping unparseable chunk");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Provider reported an error mid-stream");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

impl<'a> ChatCompletionBody<'a> {
    fn new(model: &'a str, request: &'a CompletionRequest, stream: bool) -> Self {
        Self {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            response_format: request.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    id: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

impl ChatCompletion {
    fn into_response(self) -> Result<CompletionResponse, LlmError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "response contained no choices".to_string(),
            })?;
        let usage = self.usage.unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
            response_id: self.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Extract the text delta from one SSE `data` payload. Role-only and empty deltas yield `None`;
/// an `error` payload becomes `RequestFailed`.
fn parse_chunk(data: &str) -> Result<Option<String>, LlmError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: error
                .message
                .unwrap_or_else(|| "provider reported an error".to_string()),
        });
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty()))
}

/// Map a non-success HTTP status and body to an `LlmError`.
fn error_for_status(status: u16, retry_after: Option<Duration>, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        429 => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after,
        },
        _ => {
            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("error")?.get("message")?.as_str().map(String::from))
                .unwrap_or_else(|| {
                    let preview: String = body.chars().take(200).collect();
                    format!("HTTP {}: {}", status, preview)
                });
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: message,
            }
        }
    }
}
