//! OpenAI-compatible backend.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, llama.cpp server and any other
//! endpoint that follows the chat completions and embeddings contract.

use crate::annotation::GroundingAnnotator;
use crate::traits::{ChatReply, EmbeddingBackend, GenerationBackend};
use crate::util::{api_key_from_env, from_reqwest};
use pl_domain::config::LlmConfig;
use pl_domain::error::{Error, Result};
use pl_domain::stream::{BoxStream, StreamMode};
use serde_json::Value;
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiCompatBackend {
    id: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    annotator: Option<GroundingAnnotator>,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: "openai_compat".into(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: api_key_from_env(&cfg.api_key_env),
            model: cfg.model.clone(),
            embedding_model: cfg.embedding_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            annotator: None,
            client,
        })
    }

    /// Write grounding-box artifacts for replies that reference a picture.
    pub fn with_annotator(mut self, annotator: GroundingAnnotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    // ── Internal: build authenticated request builder ──────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    fn build_chat_body(&self, query: &str, history: &[(String, String)], stream: bool) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": history_to_messages(query, history),
            "stream": stream,
            "temperature": self.temperature,
        });
        if let Some(max) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .authed_post(url)
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::backend(
                self.id.clone(),
                format!("HTTP {} - {}", status.as_u16(), err_text),
            ));
        }
        Ok(resp)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Expand `(query, response)` pairs into alternating user/assistant messages,
/// ending with the pending query.
fn history_to_messages(query: &str, history: &[(String, String)]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 1);
    for (q, r) in history {
        messages.push(serde_json::json!({"role": "user", "content": q}));
        messages.push(serde_json::json!({"role": "assistant", "content": r}));
    }
    messages.push(serde_json::json!({"role": "user", "content": query}));
    messages
}

fn parse_chat_response(backend: &str, body: &Value) -> Result<String> {
    let message = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("message"))
        .ok_or_else(|| Error::backend(backend, "no message in response"))?;

    Ok(message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string())
}

/// Text delta carried by one streamed chunk, if any.
fn parse_sse_data(data: &str) -> Vec<Result<String>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(Error::Json(e))],
    };

    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("stream error")
            .to_string();
        return vec![Err(Error::backend("openai_compat", message))];
    }

    let text = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|t| t.as_str());

    match text {
        Some(t) if !t.is_empty() => vec![Ok(t.to_string())],
        _ => Vec::new(),
    }
}

fn parse_embedding(backend: &str, body: &Value) -> Result<Vec<f32>> {
    let embedding = body
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|a| a.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::backend(backend, "missing 'data[0].embedding' in response"))?;

    Ok(embedding
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl GenerationBackend for OpenAiCompatBackend {
    async fn chat(&self, query: &str, history: &[(String, String)]) -> Result<ChatReply> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(query, history, false);

        tracing::debug!(backend = %self.id, url = %url, pairs = history.len(), "chat request");

        let resp = self.post_json(&url, &body).await?;
        let resp_text = resp.text().await.map_err(from_reqwest)?;
        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let response = parse_chat_response(&self.id, &resp_json)?;

        let mut next = history.to_vec();
        next.push((query.to_string(), response.clone()));
        Ok(ChatReply {
            response,
            history: next,
        })
    }

    async fn chat_stream(
        &self,
        query: &str,
        history: &[(String, String)],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(query, history, true);

        tracing::debug!(backend = %self.id, url = %url, pairs = history.len(), "stream request");

        let resp = self.post_json(&url, &body).await?;
        Ok(crate::sse::sse_text_stream(resp, parse_sse_data))
    }

    fn stream_mode(&self) -> StreamMode {
        StreamMode::Incremental
    }

    async fn draw_annotation(
        &self,
        response: &str,
        history: &[(String, String)],
    ) -> Result<Option<PathBuf>> {
        match &self.annotator {
            Some(annotator) => annotator.annotate(response, history).await,
            None => Ok(None),
        }
    }

    fn backend_id(&self) -> &str {
        &self.id
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for OpenAiCompatBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({ "model": self.embedding_model, "input": text });

        let resp = self.post_json(&url, &body).await?;
        let resp_text = resp.text().await.map_err(from_reqwest)?;
        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_embedding(&self.id, &resp_json)
    }

    fn backend_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
