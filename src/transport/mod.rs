//! # Transport
//!
//! The connection to the conversational backend. The widget core never talks
//! to the network itself: it hands an `OutgoingMessage` to a
//! `TransportAdapter` and receives `TransportEvent`s back, in order, on a
//! channel.

pub mod http;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::Sender;

pub use http::HttpTransport;

/// Connection state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Disconnected,
}

/// Structured callback request, sent alongside the chat text.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CallbackDetails {
    pub name: String,
    pub phone_number: String,
    pub vehicle_type: String,
}

/// Payload for one user send.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub user_input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_details: Option<CallbackDetails>,
}

impl OutgoingMessage {
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            user_input: text.into(),
            callback_details: None,
        }
    }

    pub fn callback(details: CallbackDetails) -> Self {
        Self {
            user_input: format!(
                "Request callback for {} with phone number {} for {}",
                details.name, details.phone_number, details.vehicle_type
            ),
            callback_details: Some(details),
        }
    }
}

/// Everything the backend can tell the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A piece of the assistant answer currently streaming.
    Chunk(String),
    /// The terminal signal for the current answer.
    Complete,
    /// The backend failed to answer.
    Error(String),
    StatusChange(ConnectionStatus),
}

/// Errors that can occur while delivering a message.
#[derive(Debug)]
pub enum TransportError {
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// Backend answered with a non-success status.
    Api { status: u16, message: String },
    /// A frame could not be decoded.
    Parse(String),
    /// The receiving side dropped the event channel.
    ChannelClosed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {msg}"),
            TransportError::Api { status, message } => {
                write!(f, "backend error (HTTP {status}): {message}")
            }
            TransportError::Parse(msg) => write!(f, "parse error: {msg}"),
            TransportError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for TransportError {}

#[async_trait]
pub trait TransportAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Announces the initial connection state. Stateless transports are
    /// connected as soon as they exist.
    async fn connect(&self, events: Sender<TransportEvent>) -> Result<(), TransportError> {
        events
            .send(TransportEvent::StatusChange(ConnectionStatus::Connected))
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Delivers `payload` and streams the answer back through `events`.
    /// Returns once the answer has settled or failed.
    async fn send(
        &self,
        payload: OutgoingMessage,
        events: Sender<TransportEvent>,
    ) -> Result<(), TransportError>;

    /// Best-effort user-action telemetry.
    async fn track_user_action(
        &self,
        event_name: &str,
        attributes: serde_json::Value,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_payload_omits_callback_details() {
        let json = serde_json::to_string(&OutgoingMessage::chat("hello")).unwrap();
        assert_eq!(json, r#"{"user_input":"hello"}"#);
    }

    #[test]
    fn test_callback_payload() {
        let msg = OutgoingMessage::callback(CallbackDetails {
            name: "Asha".into(),
            phone_number: "555".into(),
            vehicle_type: "SUV".into(),
        });
        assert_eq!(msg.user_input, "Request callback for Asha with phone number 555 for SUV");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["callback_details"]["phone_number"], "555");
        assert_eq!(json["callback_details"]["vehicle_type"], "SUV");
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&ConnectionStatus::Disconnected).unwrap();
        assert_eq!(json, "\"DISCONNECTED\"");
    }
}
