//! Streaming generation backend.
//!
//! [`ChatBackend`] is the seam to the language model: it takes a composed
//! request and delivers answer fragments in emission order, resolving with
//! the full answer text on end-of-stream. [`OllamaChat`] implements it
//! against an Ollama-compatible `POST /api/chat` endpoint with
//! `stream: true`, where the response body is NDJSON — one JSON object
//! per line carrying a `message.content` fragment until `done: true`.
//!
//! The await between fragments is the sole suspension point of the whole
//! program; the cancellation token is honored there.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One message of a chat request, in wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// A fully composed generation request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// The black-box streaming text generator.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue one request and stream the answer.
    ///
    /// Every fragment is passed to `on_fragment` in emission order, with
    /// no buffering beyond the transport's. Returns the concatenation of
    /// all fragments once the backend signals end-of-stream. Any backend
    /// error, a timeout, or cancellation between fragments fails the
    /// whole call.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
        on_fragment: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String>;
}

/// Chat backend for an Ollama-compatible model server.
pub struct OllamaChat {
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OllamaChat {
    /// `timeout` bounds the whole exchange, connection through last byte.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            model: model.to_string(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
        on_fragment: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "stream": true,
            "options": { "temperature": request.temperature },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("Chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chat API error {}: {}", status, body_text);
        }

        let mut stream = Box::pin(response.bytes_stream());
        let mut buf: Vec<u8> = Vec::new();
        let mut answer = String::new();
        let mut done = false;

        while !done {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => bail!("Generation cancelled"),
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    buf.extend_from_slice(&bytes);
                    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&line);
                        done |= handle_line(line.trim(), &mut answer, &mut *on_fragment)?;
                    }
                }
                Some(Err(e)) => return Err(e).context("Chat stream read failed"),
                None => {
                    // Flush a trailing line without a newline terminator
                    if !buf.is_empty() {
                        let line = String::from_utf8_lossy(&buf).to_string();
                        done |= handle_line(line.trim(), &mut answer, &mut *on_fragment)?;
                    }
                    break;
                }
            }
        }

        if !done {
            bail!("Chat stream ended before completion signal");
        }

        Ok(answer)
    }
}

/// Parse one NDJSON line, deliver its fragment, and report whether it
/// carried the completion signal. Blank lines are skipped.
fn handle_line(
    line: &str,
    answer: &mut String,
    on_fragment: &mut (dyn FnMut(&str) + Send),
) -> Result<bool> {
    match parse_stream_line(line)? {
        None => Ok(false),
        Some(update) => {
            if let Some(fragment) = update.fragment {
                on_fragment(&fragment);
                answer.push_str(&fragment);
            }
            Ok(update.done)
        }
    }
}

/// What one stream line contributed.
#[derive(Debug, PartialEq)]
struct StreamUpdate {
    fragment: Option<String>,
    done: bool,
}

/// Decode one NDJSON stream line. Returns `None` for blank lines and an
/// error if the backend reported one inline.
fn parse_stream_line(line: &str) -> Result<Option<StreamUpdate>> {
    if line.is_empty() {
        return Ok(None);
    }

    let json: serde_json::Value =
        serde_json::from_str(line).with_context(|| format!("Invalid stream line: {}", line))?;

    if let Some(error) = json.get("error").and_then(|e| e.as_str()) {
        bail!("Chat backend error: {}", error);
    }

    let fragment = json
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    let done = json.get("done").and_then(|d| d.as_bool()).unwrap_or(false);

    Ok(Some(StreamUpdate { fragment, done }))
}
