use anyhow::{Context, Result};
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

/// Client for the OpenAI-compatible capability APIs: chat completions
/// (one-shot and streamed), moderation, vector store search and embeddings.
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

/// A chat message sent to the scoring or relevance capability.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    /// One-shot chat completion. Returns the assistant message content;
    /// `response_format` carries a JSON schema the capability must conform to.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        response_format: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = ChatCompletionRequest {
            model,
            messages,
            response_format,
            stream: false,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to call chat completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Chat completion API failed with status {}: {}",
                status,
                error_text
            );
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            anyhow::bail!("Chat completion returned no content");
        }

        Ok(content)
    }

    /// Streamed chat completion. Yields assistant content fragments in the
    /// order produced, ending when the capability signals completion.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        response_format: Option<serde_json::Value>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = ChatCompletionRequest {
            model,
            messages,
            response_format,
            stream: true,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to call streaming chat completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Streaming chat completion API failed with status {}: {}",
                status,
                error_text
            );
        }

        let mut bytes = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buffer = String::new();
            let mut done = false;

            while !done {
                let chunk = match bytes.next().await {
                    Some(chunk) => chunk.context("Failed to read stream chunk")?,
                    None => break,
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Server-sent events are newline-delimited; hold back any
                // partial trailing line until the next chunk arrives.
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();

                    let payload = match line.strip_prefix("data: ") {
                        Some(payload) => payload,
                        None => continue,
                    };

                    if payload == "[DONE]" {
                        done = true;
                        break;
                    }

                    let parsed: ChatStreamChunk = serde_json::from_str(payload)
                        .context("Failed to parse stream chunk")?;

                    if let Some(content) = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                    {
                        if !content.is_empty() {
                            yield content;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// Content-safety check. Returns the typed result together with the raw
    /// response body so callers can persist it for audit.
    pub async fn moderate(&self, model: &str, input: &str) -> Result<(ModerationResult, String)> {
        let url = format!("{}/moderations", self.base_url);

        let request_body = ModerationRequest { model, input };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to call moderation API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Moderation API failed with status {}: {}", status, error_text);
        }

        let raw = response
            .text()
            .await
            .context("Failed to read moderation response")?;

        let result: ModerationResult =
            serde_json::from_str(&raw).context("Failed to parse moderation response")?;

        Ok((result, raw))
    }

    /// Search a vector store for rubric context. Returns the concatenated
    /// text of the top results, or `None` when the store has nothing.
    pub async fn search_vector_store(&self, store_id: &str, query: &str) -> Result<Option<String>> {
        let url = format!("{}/vector_stores/{}/search", self.base_url, store_id);

        let request_body = VectorSearchRequest {
            query,
            max_num_results: 3,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to call vector store search API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Vector store search API failed with status {}: {}",
                status,
                error_text
            );
        }

        let search: VectorSearchResponse = response
            .json()
            .await
            .context("Failed to parse vector store search response")?;

        let text: Vec<String> = search
            .data
            .into_iter()
            .flat_map(|result| result.content)
            .map(|content| content.text)
            .collect();

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.join("\n")))
        }
    }

    /// Look up the embedding vector for a piece of text.
    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);

        let request_body = EmbeddingRequest { model, input };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to call embedding API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API failed with status {}: {}", status, error_text);
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .context("Embedding response contained no data")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Typed shape of a moderation response: one entry per input, each with a
/// flagged bit, per-category flags and per-category confidence scores.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationResult {
    pub results: Vec<ModerationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationEntry {
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct VectorSearchRequest<'a> {
    query: &'a str,
    max_num_results: u32,
}

#[derive(Debug, Deserialize)]
struct VectorSearchResponse {
    #[serde(default)]
    data: Vec<VectorSearchResult>,
}

#[derive(Debug, Deserialize)]
struct VectorSearchResult {
    #[serde(default)]
    content: Vec<VectorSearchContent>,
}

#[derive(Debug, Deserialize)]
struct VectorSearchContent {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
