//! # Suggested Questions
//!
//! Decides which follow-up questions to offer. Before any exchange the static
//! seed list is used as-is. After that, questions come from the
//! question-generation backend, scoped to the transcript and a coarse topic.
//! A failed or useless backend answer degrades to a fixed fallback list, so
//! a refresh never leaves the user with nothing to click.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::core::transcript::{Role, Turn};

/// Keyword → topic, checked in order. First match wins.
const TOPIC_KEYWORDS: &[(&str, &str)] = &[
    ("warranty", "warranty"),
    ("dealer", "dealer"),
    ("price", "pricing"),
    ("maintenance", "maintenance"),
    ("installation", "installation"),
    ("safety", "safety"),
    ("performance", "performance"),
];

pub const DEFAULT_TOPIC: &str = "general";

pub const FALLBACK_QUESTIONS: &[&str] = &[
    "What is the warranty period for Apollo tyres?",
    "How do I find a nearby Apollo dealer?",
    "What are the different types of Apollo tyres?",
    "How to maintain my tyres properly?",
    "What is the recommended tyre pressure?",
];

/// Derives the topic from the most recent user turn.
pub fn extract_topic(turns: &[Turn]) -> String {
    let last_user = turns
        .iter()
        .rev()
        .find(|t| t.role == Role::User)
        .map(|t| t.text.to_lowercase())
        .unwrap_or_default();

    TOPIC_KEYWORDS
        .iter()
        .find(|(keyword, _)| last_user.contains(keyword))
        .map(|(_, topic)| topic.to_string())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    /// No exchange yet: show the seed list right away.
    Seed(Vec<String>),
    /// Ask the backend.
    Fetch { topic: String },
}

fn truncated(list: &[String], limit: usize) -> Vec<String> {
    list.iter().take(limit).cloned().collect()
}

/// Failure talking to the question-generation service.
#[derive(Debug)]
pub enum SuggestionFetchError {
    Network(String),
    Api { status: u16 },
    Malformed(String),
}

impl fmt::Display for SuggestionFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionFetchError::Network(msg) => write!(f, "network error: {msg}"),
            SuggestionFetchError::Api { status } => write!(f, "question service returned HTTP {status}"),
            SuggestionFetchError::Malformed(msg) => write!(f, "malformed question response: {msg}"),
        }
    }
}

impl std::error::Error for SuggestionFetchError {}

/// Something that can generate contextual follow-up questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn generate(
        &self,
        history: &[Turn],
        topic: &str,
    ) -> Result<Vec<String>, SuggestionFetchError>;
}

pub struct SuggestionScheduler {
    source: Arc<dyn QuestionSource>,
    seed: Vec<String>,
    fallback: Vec<String>,
    limit: usize,
}

impl SuggestionScheduler {
    pub fn new(source: Arc<dyn QuestionSource>, seed: Vec<String>, limit: usize) -> Self {
        Self {
            source,
            seed,
            fallback: FALLBACK_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn plan(&self, turns: &[Turn]) -> RefreshPlan {
        plan(turns, &self.seed, self.limit)
    }

    pub fn fallback(&self) -> Vec<String> {
        truncated(&self.fallback, self.limit)
    }

    /// Computes the next suggestion list. Never fails.
    pub async fn refresh(&self, turns: &[Turn]) -> Vec<String> {
        let topic = match self.plan(turns) {
            RefreshPlan::Seed(seed) => return seed,
            RefreshPlan::Fetch { topic } => topic,
        };

        debug!(
            "Refreshing suggestions: topic={}, history_len={}",
            topic,
            turns.len()
        );
        match self.source.generate(turns, &topic).await {
            Ok(questions) if !questions.is_empty() => truncated(&questions, self.limit),
            Ok(_) => {
                warn!("Question service returned no questions, using fallback");
                self.fallback()
            }
            Err(e) => {
                warn!("Suggestion refresh failed, using fallback: {}", e);
                self.fallback()
            }
        }
    }
}

/// Pure planning step shared by the reducer and the scheduler.
pub fn plan(turns: &[Turn], seed: &[String], limit: usize) -> RefreshPlan {
    if turns.iter().all(|t| t.role == Role::System) {
        RefreshPlan::Seed(truncated(seed, limit))
    } else {
        RefreshPlan::Fetch {
            topic: extract_topic(turns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticQuestions;

    fn history(user_texts: &[&str]) -> Vec<Turn> {
        let mut turns = vec![Turn::new(Role::System, "intro")];
        for text in user_texts {
            turns.push(Turn::new(Role::User, *text));
            turns.push(Turn::new(Role::Assistant, "answer"));
        }
        turns
    }

    fn seed() -> Vec<String> {
        vec!["s1".into(), "s2".into(), "s3".into(), "s4".into()]
    }

    #[test]
    fn test_topic_uses_most_recent_user_turn() {
        assert_eq!(extract_topic(&history(&["warranty?", "nearest dealer?"])), "dealer");
        assert_eq!(extract_topic(&history(&["What's the PRICE"])), "pricing");
        assert_eq!(extract_topic(&history(&["hello"])), "general");
        assert_eq!(extract_topic(&history(&[])), "general");
    }

    #[test]
    fn test_topic_first_keyword_wins() {
        assert_eq!(extract_topic(&history(&["dealer warranty and price"])), "warranty");
    }

    #[test]
    fn test_plan_seeds_before_any_exchange() {
        let plan = plan(&history(&[]), &seed(), 3);
        assert_eq!(plan, RefreshPlan::Seed(vec!["s1".into(), "s2".into(), "s3".into()]));
    }

    #[test]
    fn test_plan_fetches_after_exchange() {
        let plan = plan(&history(&["safety rating"]), &seed(), 3);
        assert_eq!(plan, RefreshPlan::Fetch { topic: "safety".into() });
    }

    #[tokio::test]
    async fn test_refresh_truncates_backend_questions() {
        let source = Arc::new(StaticQuestions::ok(&["q1", "q2", "q3", "q4", "q5"]));
        let scheduler = SuggestionScheduler::new(source.clone(), seed(), 2);
        let result = scheduler.refresh(&history(&["tell me about warranty"])).await;
        assert_eq!(result, vec!["q1", "q2"]);
        assert_eq!(source.last_topic().as_deref(), Some("warranty"));
    }

    #[tokio::test]
    async fn test_refresh_falls_back_on_failure() {
        let scheduler =
            SuggestionScheduler::new(Arc::new(StaticQuestions::failing()), seed(), 3);
        let result = scheduler.refresh(&history(&["hi"])).await;
        assert_eq!(result, FALLBACK_QUESTIONS[..3].to_vec());
    }

    #[tokio::test]
    async fn test_refresh_falls_back_on_empty_answer() {
        let scheduler = SuggestionScheduler::new(Arc::new(StaticQuestions::ok(&[])), seed(), 4);
        let result = scheduler.refresh(&history(&["hi"])).await;
        assert_eq!(result.len(), 4);
        assert_eq!(result[0], FALLBACK_QUESTIONS[0]);
    }

    #[tokio::test]
    async fn test_refresh_without_exchange_never_calls_backend() {
        let source = Arc::new(StaticQuestions::ok(&["q1"]));
        let scheduler = SuggestionScheduler::new(source.clone(), seed(), 3);
        let result = scheduler.refresh(&history(&[])).await;
        assert_eq!(result, vec!["s1", "s2", "s3"]);
        assert_eq!(source.calls(), 0);
    }
}
