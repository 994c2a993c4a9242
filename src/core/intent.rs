//! Phrase-based intent detection for outgoing user text.

/// What a piece of user text asked for, beyond an ordinary answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    /// Wants to book an appointment. Detected, but nothing is bound to it yet.
    pub scheduling: bool,
    /// Wants a human to call back. Opens the schedule form.
    pub callback: bool,
}

pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

const SCHEDULING_PHRASES: &[&str] = &[
    "schedule an appointment",
    "book an appointment",
    "make an appointment",
    "set up an appointment",
    "i need an appointment",
    "booking",
];

const CALLBACK_PHRASES: &[&str] = &[
    "talk to someone",
    "talk to an expert",
    "speak with someone",
    "speak with an expert",
    "talk to a person",
    "speak to a person",
    "talk to a human",
    "speak to a human",
    "connect with expert",
    "connect with someone",
    "get expert advice",
    "need expert help",
    "want to talk",
    "want to speak",
    "need assistance",
    "need help",
    "contact expert",
    "contact someone",
    "call me back",
    "callback",
    "call back",
    "reach out",
    "get in touch",
    "contact me",
    "call me",
    "speak to me",
    "talk to me",
];

/// Case-insensitive substring match against two fixed phrase lists.
pub struct PhraseClassifier {
    scheduling: Vec<String>,
    callback: Vec<String>,
}

impl PhraseClassifier {
    pub fn new<S: AsRef<str>>(scheduling: &[S], callback: &[S]) -> Self {
        let lower = |list: &[S]| list.iter().map(|p| p.as_ref().to_lowercase()).collect();
        Self {
            scheduling: lower(scheduling),
            callback: lower(callback),
        }
    }
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(SCHEDULING_PHRASES, CALLBACK_PHRASES)
    }
}

impl IntentClassifier for PhraseClassifier {
    fn classify(&self, text: &str) -> Intent {
        let normalized = text.trim().to_lowercase();
        let hit = |phrases: &[String]| phrases.iter().any(|p| normalized.contains(p.as_str()));
        Intent {
            scheduling: hit(&self.scheduling),
            callback: hit(&self.callback),
        }
    }
}
