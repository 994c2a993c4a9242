//! Streaming HTTP transport.
//!
//! One POST per user send. The body streams back as SSE-style lines:
//!
//! ```text
//! data: {"text":"Hel","done":false}
//! data: {"text":"lo","done":false}
//! data: {"done":true}
//! ```
//!
//! A frame carrying `"error"` fails the answer. A body that ends without a
//! terminal frame counts as complete.

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::core::identity::Identity;
use crate::transport::{
    ConnectionStatus, OutgoingMessage, TransportAdapter, TransportError, TransportEvent,
};

/// Request body: the payload plus who is asking.
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    #[serde(flatten)]
    payload: &'a OutgoingMessage,
    user_id: &'a str,
    session_id: &'a str,
}

#[derive(Serialize, Debug)]
struct UserActionRequest<'a> {
    event: &'a str,
    attributes: serde_json::Value,
    user_id: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct StreamFrame {
    #[serde(default)]
    text: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// What one decoded line means for the answer.
#[derive(Debug, PartialEq)]
enum Frame {
    Text(String),
    Done(String),
    Failed(String),
    Skip,
}

fn parse_line(line: &str) -> Result<Frame, TransportError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(Frame::Skip);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(Frame::Skip);
    }
    if data == "[DONE]" {
        return Ok(Frame::Done(String::new()));
    }
    let frame: StreamFrame =
        serde_json::from_str(data).map_err(|e| TransportError::Parse(e.to_string()))?;
    Ok(match frame {
        StreamFrame {
            error: Some(message),
            ..
        } => Frame::Failed(message),
        StreamFrame {
            text, done: true, ..
        } => Frame::Done(text),
        StreamFrame { text, .. } => Frame::Text(text),
    })
}

/// Accumulates raw body bytes and yields complete lines. Decoding waits for
/// the newline, so a character split across network reads stays intact.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.bytes.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Whatever is left once the body ends.
    fn remainder(&mut self) -> String {
        let rest = std::mem::take(&mut self.bytes);
        String::from_utf8_lossy(&rest).trim().to_string()
    }
}

pub struct HttpTransport {
    chat_url: String,
    events_url: Option<String>,
    identity: Identity,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(chat_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            chat_url: chat_url.into(),
            events_url: None,
            identity,
            client: reqwest::Client::new(),
        }
    }

    /// Where `track_user_action` posts. Without it, actions are only logged.
    pub fn with_events_url(mut self, url: impl Into<String>) -> Self {
        self.events_url = Some(url.into());
        self
    }

    async fn emit(
        &self,
        events: &Sender<TransportEvent>,
        event: TransportEvent,
    ) -> Result<(), TransportError> {
        events.send(event).await.map_err(|_| {
            warn!("Transport event dropped: receiver gone");
            TransportError::ChannelClosed
        })
    }
}

#[async_trait]
impl TransportAdapter for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(
        &self,
        payload: OutgoingMessage,
        events: Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        let request = ChatRequest {
            payload: &payload,
            user_id: &self.identity.user_id,
            session_id: &self.identity.session_id,
        };
        info!(
            "Sending chat message (len={}, callback={})",
            payload.user_input.len(),
            payload.callback_details.is_some()
        );

        let response = match self.client.post(&self.chat_url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                self.emit(
                    &events,
                    TransportEvent::StatusChange(ConnectionStatus::Disconnected),
                )
                .await?;
                return Err(TransportError::Network(e.to_string()));
            }
        };
        self.emit(&events, TransportEvent::StatusChange(ConnectionStatus::Connected))
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Chat backend error: {} - {}", status, message);
            return Err(TransportError::Api { status, message });
        }

        let mut stream = response.bytes_stream();
        let mut buffer = LineBuffer::default();
        let mut chunk_count = 0usize;

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|e| TransportError::Network(e.to_string()))?;
            buffer.push(&bytes);

            while let Some(line) = buffer.next_line() {
                match parse_line(&line)? {
                    Frame::Skip => {}
                    Frame::Text(text) => {
                        if !text.is_empty() {
                            chunk_count += 1;
                            self.emit(&events, TransportEvent::Chunk(text)).await?;
                        }
                    }
                    Frame::Done(text) => {
                        if !text.is_empty() {
                            chunk_count += 1;
                            self.emit(&events, TransportEvent::Chunk(text)).await?;
                        }
                        debug!("Answer complete after {} chunks", chunk_count);
                        return self.emit(&events, TransportEvent::Complete).await;
                    }
                    Frame::Failed(message) => {
                        warn!("Backend reported an error: {}", message);
                        return self.emit(&events, TransportEvent::Error(message)).await;
                    }
                }
            }
        }

        // Trailing line without a newline
        match parse_line(&buffer.remainder())? {
            Frame::Text(text) | Frame::Done(text) if !text.is_empty() => {
                self.emit(&events, TransportEvent::Chunk(text)).await?;
            }
            Frame::Failed(message) => {
                return self.emit(&events, TransportEvent::Error(message)).await;
            }
            _ => {}
        }
        debug!("Stream ended without terminal frame after {} chunks", chunk_count);
        self.emit(&events, TransportEvent::Complete).await
    }

    async fn track_user_action(
        &self,
        event_name: &str,
        attributes: serde_json::Value,
    ) -> Result<(), TransportError> {
        let Some(url) = &self.events_url else {
            debug!("User action {} (not posted): {}", event_name, attributes);
            return Ok(());
        };
        let request = UserActionRequest {
            event: event_name,
            attributes,
            user_id: &self.identity.user_id,
            session_id: &self.identity.session_id,
        };
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(TransportError::Api {
                status,
                message: format!("user action {event_name} rejected"),
            });
        }
        debug!("User action {} recorded", event_name);
        Ok(())
    }
}
