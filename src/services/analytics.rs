//! # Analytics Sink
//!
//! Best-effort HTTP telemetry. Every event carries the locally stored
//! `user_id`/`session_id` pair and timestamps truncated to whole seconds
//! (`YYYY-MM-DD HH:MM:SS`). Callers swallow failures; only lead capture is
//! awaited, because the callback form needs to know whether it went through.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::core::feedback::{Issue, SupportOption};

/// Formats a timestamp the way the analytics backend stores it.
pub fn wire_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LeadCapture {
    pub name: String,
    pub lead_type: String,
}

impl LeadCapture {
    pub fn callback_request(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lead_type: "callback_request".to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HumanHandover {
    pub user_id: String,
    pub session_id: String,
    pub issues: Vec<Issue>,
    pub other_text: String,
    pub support_option: SupportOption,
    pub requested_at: String,
    pub last_message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatbotClose {
    pub user_id: String,
    pub session_id: String,
    pub closed_at: String,
    pub time_spent_seconds: i64,
    pub last_user_message: String,
    pub last_bot_message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub user_id: String,
    pub session_id: String,
    pub end_time: String,
    pub duration: i64,
}

/// Fire-and-forget events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    HumanHandover(HumanHandover),
    ChatbotClose(ChatbotClose),
    SessionEnd(SessionEnd),
}

impl AnalyticsEvent {
    /// Path relative to the analytics base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            AnalyticsEvent::HumanHandover(_) => "human_handover",
            AnalyticsEvent::ChatbotClose(_) => "chatbot_close",
            AnalyticsEvent::SessionEnd(_) => "session_end",
        }
    }

    fn body(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            AnalyticsEvent::HumanHandover(e) => serde_json::to_value(e),
            AnalyticsEvent::ChatbotClose(e) => serde_json::to_value(e),
            AnalyticsEvent::SessionEnd(e) => serde_json::to_value(e),
        }
    }
}

#[derive(Debug)]
pub enum AnalyticsError {
    /// Could not reach the analytics backend at all.
    Network(String),
    /// Backend answered with a non-success status.
    Api { status: u16 },
    Serialize(String),
}

impl fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyticsError::Network(msg) => write!(f, "analytics network error: {msg}"),
            AnalyticsError::Api { status } => write!(f, "analytics backend returned HTTP {status}"),
            AnalyticsError::Serialize(msg) => write!(f, "analytics serialization failed: {msg}"),
        }
    }
}

impl std::error::Error for AnalyticsError {}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn capture_lead(&self, lead: &LeadCapture) -> Result<(), AnalyticsError>;

    async fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError>;
}

pub struct AnalyticsClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalyticsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, endpoint: &str, body: &serde_json::Value) -> Result<(), AnalyticsError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Analytics POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AnalyticsError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("Analytics endpoint {} returned {}", endpoint, status);
            return Err(AnalyticsError::Api { status });
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for AnalyticsClient {
    async fn capture_lead(&self, lead: &LeadCapture) -> Result<(), AnalyticsError> {
        let body = serde_json::to_value(lead).map_err(|e| AnalyticsError::Serialize(e.to_string()))?;
        self.post("leads", &body).await
    }

    async fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let body = event
            .body()
            .map_err(|e| AnalyticsError::Serialize(e.to_string()))?;
        self.post(event.endpoint(), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wire_timestamp_truncates_to_seconds() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap()
            + chrono::Duration::milliseconds(987);
        assert_eq!(wire_timestamp(at), "2026-03-09 07:05:01");
    }

    #[test]
    fn test_handover_body_shape() {
        let event = AnalyticsEvent::HumanHandover(HumanHandover {
            user_id: "u".into(),
            session_id: "s".into(),
            issues: vec![Issue::TooShort, Issue::Other],
            other_text: "more".into(),
            support_option: SupportOption::TalkToHuman,
            requested_at: "2026-01-01 00:00:00".into(),
            last_message: "help".into(),
        });
        assert_eq!(event.endpoint(), "human_handover");
        let body = event.body().unwrap();
        assert_eq!(body["issues"], serde_json::json!(["too-short", "other"]));
        assert_eq!(body["support_option"], "talk-exec");
        assert_eq!(body["last_message"], "help");
    }

    #[test]
    fn test_lead_type() {
        let lead = LeadCapture::callback_request("Asha");
        assert_eq!(
            serde_json::to_string(&lead).unwrap(),
            r#"{"name":"Asha","lead_type":"callback_request"}"#
        );
    }
}
