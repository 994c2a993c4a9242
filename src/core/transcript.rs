//! # Transcript
//!
//! The ordered conversation log and the single source of truth for what gets
//! rendered. Turns are appended in arrival order. The only in-place edit is
//! extending an assistant turn while its answer is still streaming.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One role-tagged message. Serializes to the `conversation_history` shape
/// the question service expects: `{"role": "user", "text": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            is_error: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Resets the log to the single introduction turn.
    pub fn start(&mut self, introduction: &str) {
        self.turns.clear();
        self.turns.push(Turn::new(Role::System, introduction));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> usize {
        self.push(Turn::new(Role::User, text))
    }

    /// Appends a settled assistant turn (no further chunks expected).
    pub fn push_assistant(&mut self, text: impl Into<String>) -> usize {
        self.push(Turn::new(Role::Assistant, text))
    }

    /// Appends the first chunk of a streaming answer. Returns its index so
    /// later chunks can be routed to it.
    pub fn open_assistant(&mut self, chunk: &str) -> usize {
        self.push(Turn::new(Role::Assistant, chunk))
    }

    /// Appends `chunk` to the assistant turn at `idx`.
    /// Returns false (and changes nothing) if `idx` is not an assistant turn.
    pub fn extend(&mut self, idx: usize, chunk: &str) -> bool {
        match self.turns.get_mut(idx) {
            Some(turn) if turn.role == Role::Assistant && !turn.is_error => {
                turn.text.push_str(chunk);
                true
            }
            _ => false,
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>) -> usize {
        self.push(Turn {
            role: Role::Assistant,
            text: message.into(),
            is_error: true,
        })
    }

    pub fn last_index(&self, role: Role) -> Option<usize> {
        self.turns.iter().rposition(|t| t.role == role)
    }

    pub fn last_text(&self, role: Role) -> Option<&str> {
        self.last_index(role).map(|i| self.turns[i].text.as_str())
    }

    /// True once anything beyond the introduction has been exchanged.
    pub fn has_exchange(&self) -> bool {
        self.turns.iter().any(|t| t.role != Role::System)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Transcript {
        let mut t = Transcript::default();
        t.start("Welcome");
        t
    }

    #[test]
    fn test_start_seeds_single_system_turn() {
        let mut t = started();
        t.push_user("hi");
        t.start("Again");
        assert_eq!(t.turns(), &[Turn::new(Role::System, "Again")]);
        assert!(!t.has_exchange());
    }

    #[test]
    fn test_appends_keep_arrival_order() {
        let mut t = started();
        let texts = ["one", "two", "three", "four"];
        for (i, text) in texts.iter().enumerate() {
            if i % 2 == 0 {
                t.push_user(*text);
            } else {
                t.push_assistant(*text);
            }
        }
        let read: Vec<&str> = t.turns()[1..].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(read, texts);
        assert!(t.has_exchange());
    }

    #[test]
    fn test_extend_only_touches_assistant_turns() {
        let mut t = started();
        let user = t.push_user("question");
        let answer = t.open_assistant("Hel");
        assert!(t.extend(answer, "lo"));
        assert!(!t.extend(user, "tamper"));
        assert!(!t.extend(0, "tamper"));
        assert!(!t.extend(99, "tamper"));
        assert_eq!(t.turns()[answer].text, "Hello");
        assert_eq!(t.turns()[user].text, "question");
    }

    #[test]
    fn test_error_turns_are_sealed() {
        let mut t = started();
        let idx = t.push_error("boom");
        assert!(!t.extend(idx, "more"));
        assert!(t.turns()[idx].is_error);
    }

    #[test]
    fn test_last_text_by_role() {
        let mut t = started();
        assert_eq!(t.last_text(Role::User), None);
        t.push_user("first");
        t.push_assistant("reply");
        t.push_user("second");
        assert_eq!(t.last_text(Role::User), Some("second"));
        assert_eq!(t.last_text(Role::Assistant), Some("reply"));
        assert_eq!(t.last_index(Role::Assistant), Some(2));
    }

    #[test]
    fn test_turn_serialization_matches_history_shape() {
        let ok = serde_json::to_string(&Turn::new(Role::User, "hello")).unwrap();
        assert_eq!(ok, r#"{"role":"user","text":"hello"}"#);

        let err = serde_json::to_string(&Turn {
            role: Role::Assistant,
            text: "oops".into(),
            is_error: true,
        })
        .unwrap();
        assert_eq!(err, r#"{"role":"assistant","text":"oops","isError":true}"#);
    }
}
