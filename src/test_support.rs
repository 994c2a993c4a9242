//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::core::config::ResolvedConfig;
use crate::core::identity::Identity;
use crate::core::state::Session;
use crate::core::suggestions::{QuestionSource, SuggestionFetchError};
use crate::core::transcript::Turn;
use crate::services::analytics::{AnalyticsError, AnalyticsEvent, AnalyticsSink, LeadCapture};
use crate::transport::{OutgoingMessage, TransportAdapter, TransportError, TransportEvent};

pub fn test_config() -> ResolvedConfig {
    ResolvedConfig {
        company_name: "Acme".to_string(),
        introduction_text: "Welcome".to_string(),
        initial_suggested_questions: ["q1", "q2", "q3", "q4", "q5"]
            .iter()
            .map(|q| q.to_string())
            .collect(),
        show_number_of_questions: 3,
        ..ResolvedConfig::default()
    }
}

pub fn test_identity() -> Identity {
    Identity {
        user_id: "user-1".to_string(),
        session_id: "sess-1".to_string(),
        issued_at: 0,
    }
}

/// A fresh, not yet started session with fixed config and identity.
pub fn test_session() -> Session {
    Session::new(test_config(), test_identity())
}

/// Question source with a canned answer.
pub struct StaticQuestions {
    answer: Option<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticQuestions {
    pub fn ok(questions: &[&str]) -> Self {
        Self {
            answer: Some(questions.iter().map(|q| q.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_topic(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl QuestionSource for StaticQuestions {
    async fn generate(
        &self,
        _history: &[Turn],
        topic: &str,
    ) -> Result<Vec<String>, SuggestionFetchError> {
        self.calls.lock().unwrap().push(topic.to_string());
        self.answer
            .clone()
            .ok_or_else(|| SuggestionFetchError::Network("connection refused".into()))
    }
}

/// Transport that replays a fixed list of events for every send.
pub struct ScriptedTransport {
    script: Vec<TransportEvent>,
    failure: Option<String>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub tracked: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn replying(chunks: &[&str]) -> Self {
        let mut script: Vec<TransportEvent> = chunks
            .iter()
            .map(|c| TransportEvent::Chunk(c.to_string()))
            .collect();
        script.push(TransportEvent::Complete);
        Self::with_script(script)
    }

    pub fn with_script(script: Vec<TransportEvent>) -> Self {
        Self {
            script,
            failure: None,
            sent: Mutex::new(Vec::new()),
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Streams `chunks`, then fails the send with a network error.
    pub fn failing_after(chunks: &[&str], message: &str) -> Self {
        let mut transport = Self::with_script(
            chunks
                .iter()
                .map(|c| TransportEvent::Chunk(c.to_string()))
                .collect(),
        );
        transport.failure = Some(message.to_string());
        transport
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn tracked_events(&self) -> Vec<String> {
        self.tracked
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl TransportAdapter for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(
        &self,
        payload: OutgoingMessage,
        events: Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload);
        for event in &self.script {
            events
                .send(event.clone())
                .await
                .map_err(|_| TransportError::ChannelClosed)?;
        }
        match &self.failure {
            Some(message) => Err(TransportError::Network(message.clone())),
            None => Ok(()),
        }
    }

    async fn track_user_action(
        &self,
        event_name: &str,
        attributes: serde_json::Value,
    ) -> Result<(), TransportError> {
        self.tracked
            .lock()
            .unwrap()
            .push((event_name.to_string(), attributes));
        Ok(())
    }
}

/// Analytics sink that remembers everything it was given.
#[derive(Default)]
pub struct RecordingAnalytics {
    pub fail_leads: bool,
    pub leads: Mutex<Vec<LeadCapture>>,
    pub events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn failing_leads() -> Self {
        Self {
            fail_leads: true,
            ..Self::default()
        }
    }

    pub fn endpoints(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.endpoint())
            .collect()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn capture_lead(&self, lead: &LeadCapture) -> Result<(), AnalyticsError> {
        if self.fail_leads {
            return Err(AnalyticsError::Network("connection refused".into()));
        }
        self.leads.lock().unwrap().push(lead.clone());
        Ok(())
    }

    async fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
