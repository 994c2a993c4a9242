//! HTTP client for the question-generation service.
//!
//! Request: `{"conversation_history": [Turn], "current_topic": "..."}`.
//! Response: `{"questions": ["..."]}`. Anything else is a failure.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::suggestions::{QuestionSource, SuggestionFetchError};
use crate::core::transcript::Turn;

#[derive(Serialize, Debug)]
struct QuestionRequest<'a> {
    conversation_history: &'a [Turn],
    current_topic: &'a str,
}

#[derive(Deserialize, Debug)]
struct QuestionResponse {
    questions: Vec<String>,
}

pub struct QuestionClient {
    url: String,
    client: reqwest::Client,
}

impl QuestionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QuestionSource for QuestionClient {
    async fn generate(
        &self,
        history: &[Turn],
        topic: &str,
    ) -> Result<Vec<String>, SuggestionFetchError> {
        let request = QuestionRequest {
            conversation_history: history,
            current_topic: topic,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SuggestionFetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("Question service error: HTTP {}", status);
            return Err(SuggestionFetchError::Api { status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SuggestionFetchError::Network(e.to_string()))?;
        let parsed: QuestionResponse = serde_json::from_str(&body)
            .map_err(|e| SuggestionFetchError::Malformed(e.to_string()))?;
        debug!("Question service returned {} questions", parsed.questions.len());
        Ok(parsed.questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::Role;

    #[test]
    fn test_request_serialization() {
        let history = vec![Turn::new(Role::System, "intro"), Turn::new(Role::User, "hi")];
        let req = QuestionRequest {
            conversation_history: &history,
            current_topic: "general",
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"conversation_history":[{"role":"system","text":"intro"},{"role":"user","text":"hi"}],"current_topic":"general"}"#
        );
    }

    #[test]
    fn test_response_requires_questions_field() {
        assert!(serde_json::from_str::<QuestionResponse>(r#"{"items":[]}"#).is_err());
        let ok: QuestionResponse = serde_json::from_str(r#"{"questions":["a"]}"#).unwrap();
        assert_eq!(ok.questions, vec!["a"]);
    }
}
