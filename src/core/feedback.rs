//! # Feedback Workflow
//!
//! A small per-answer state machine bound to the latest settled assistant
//! turn:
//!
//! ```text
//! None ──(answer settles)──► Prompted ──Yes──► Thanked
//!                               │                 ▲
//!                               No                │ submit
//!                               ▼                 │
//!                            FormOpen ────────────┘
//!                               │
//!                             cancel ──► None
//! ```
//!
//! Every new assistant turn, error turns included, replaces the whole flow,
//! so only one turn ever carries an active prompt.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed copy appended when the user asks to be handed over to a person.
pub const HUMAN_HANDOVER_TEXT: &str = "Thanks you for sharing feedback. You can connect with our support team between 9am-6pm on number 1800-102-1838 TOLL FREE NUMBER";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Issue {
    OffTopic,
    TooShort,
    TooComplex,
    DifferentHelp,
    Other,
}

impl Issue {
    pub const ALL: [Issue; 5] = [
        Issue::OffTopic,
        Issue::TooShort,
        Issue::TooComplex,
        Issue::DifferentHelp,
        Issue::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Issue::OffTopic => "The answer was off-topic",
            Issue::TooShort => "It was too short",
            Issue::TooComplex => "It was too complex",
            Issue::DifferentHelp => "I need a different kind of help",
            Issue::Other => "Other:",
        }
    }
}

/// How the user wants to continue after a bad answer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportOption {
    #[serde(rename = "rephrase")]
    Rephrase,
    #[serde(rename = "talk-exec")]
    TalkToHuman,
}

impl SupportOption {
    pub fn label(self) -> &'static str {
        match self {
            SupportOption::Rephrase => "Try rephrasing your question",
            SupportOption::TalkToHuman => "Talk to a human executive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackForm {
    issues: Vec<Issue>,
    other_text: String,
    support: Option<SupportOption>,
}

impl FeedbackForm {
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn other_text(&self) -> &str {
        &self.other_text
    }

    pub fn support(&self) -> Option<SupportOption> {
        self.support
    }

    /// Selects or deselects an issue. Deselecting `Other` drops its text.
    pub fn toggle_issue(&mut self, issue: Issue) {
        if let Some(pos) = self.issues.iter().position(|i| *i == issue) {
            self.issues.remove(pos);
            if issue == Issue::Other {
                self.other_text.clear();
            }
        } else {
            self.issues.push(issue);
        }
    }

    /// Free text is only accepted while `Other` is selected.
    pub fn set_other_text(&mut self, text: impl Into<String>) -> bool {
        if !self.issues.contains(&Issue::Other) {
            return false;
        }
        self.other_text = text.into();
        true
    }

    pub fn choose_support(&mut self, option: SupportOption) {
        self.support = Some(option);
    }

    pub fn can_submit(&self) -> bool {
        !self.issues.is_empty() && self.support.is_some()
    }

    fn submission(&self) -> Result<FeedbackSubmission, FeedbackError> {
        if self.issues.is_empty() {
            return Err(FeedbackError::NoIssue);
        }
        let support = self.support.ok_or(FeedbackError::NoSupportOption)?;
        let other_text = if self.issues.contains(&Issue::Other) {
            self.other_text.clone()
        } else {
            String::new()
        };
        Ok(FeedbackSubmission {
            issues: self.issues.clone(),
            other_text,
            support,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSubmission {
    pub issues: Vec<Issue>,
    pub other_text: String,
    pub support: SupportOption,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackPhase {
    None,
    Prompted,
    FormOpen(FeedbackForm),
    /// `acknowledged` is true while the transient "thank you" is visible.
    Thanked { acknowledged: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    /// Submit attempted outside the form.
    NotOpen,
    NoIssue,
    NoSupportOption,
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackError::NotOpen => write!(f, "feedback form is not open"),
            FeedbackError::NoIssue => write!(f, "select at least one issue"),
            FeedbackError::NoSupportOption => write!(f, "choose how you would like to continue"),
        }
    }
}

impl std::error::Error for FeedbackError {}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackWorkflow {
    bound_to: Option<usize>,
    phase: FeedbackPhase,
}

impl Default for FeedbackWorkflow {
    fn default() -> Self {
        Self {
            bound_to: None,
            phase: FeedbackPhase::None,
        }
    }
}

impl FeedbackWorkflow {
    pub fn bound_to(&self) -> Option<usize> {
        self.bound_to
    }

    pub fn phase(&self) -> &FeedbackPhase {
        &self.phase
    }

    /// Binds a fresh prompt to a new assistant turn, discarding the old flow.
    pub fn rearm(&mut self, turn: usize) {
        self.bound_to = Some(turn);
        self.phase = FeedbackPhase::Prompted;
    }

    /// "Yes": `Prompted → Thanked`. Returns false if not prompted.
    pub fn accept(&mut self) -> bool {
        if self.phase != FeedbackPhase::Prompted {
            return false;
        }
        self.phase = FeedbackPhase::Thanked { acknowledged: true };
        true
    }

    /// "No": `Prompted → FormOpen`. Returns false if not prompted.
    pub fn decline(&mut self) -> bool {
        if self.phase != FeedbackPhase::Prompted {
            return false;
        }
        self.phase = FeedbackPhase::FormOpen(FeedbackForm::default());
        true
    }

    pub fn form_mut(&mut self) -> Option<&mut FeedbackForm> {
        match &mut self.phase {
            FeedbackPhase::FormOpen(form) => Some(form),
            _ => None,
        }
    }

    /// `FormOpen → Thanked`, guarded by the form being complete.
    /// A rejected submit leaves the form and its input untouched.
    pub fn submit(&mut self) -> Result<FeedbackSubmission, FeedbackError> {
        let submission = match &self.phase {
            FeedbackPhase::FormOpen(form) => form.submission()?,
            _ => return Err(FeedbackError::NotOpen),
        };
        self.phase = FeedbackPhase::Thanked { acknowledged: true };
        Ok(submission)
    }

    /// `FormOpen → None`, discarding input. Returns false if no form was open.
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.phase, FeedbackPhase::FormOpen(_)) {
            return false;
        }
        self.phase = FeedbackPhase::None;
        true
    }

    pub fn hide_acknowledgment(&mut self) {
        if let FeedbackPhase::Thanked { acknowledged } = &mut self.phase {
            *acknowledged = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompted() -> FeedbackWorkflow {
        let mut flow = FeedbackWorkflow::default();
        flow.rearm(2);
        flow
    }

    #[test]
    fn test_yes_thanks_immediately() {
        let mut flow = prompted();
        assert!(flow.accept());
        assert_eq!(flow.phase(), &FeedbackPhase::Thanked { acknowledged: true });
        flow.hide_acknowledgment();
        assert_eq!(flow.phase(), &FeedbackPhase::Thanked { acknowledged: false });
        // Terminal: no second answer
        assert!(!flow.accept());
        assert!(!flow.decline());
    }

    #[test]
    fn test_no_opens_empty_form() {
        let mut flow = prompted();
        assert!(flow.decline());
        assert_eq!(flow.phase(), &FeedbackPhase::FormOpen(FeedbackForm::default()));
    }

    #[test]
    fn test_submit_rejected_without_issue() {
        let mut flow = prompted();
        flow.decline();
        flow.form_mut().unwrap().choose_support(SupportOption::Rephrase);
        assert!(!flow.form_mut().unwrap().can_submit());
        assert_eq!(flow.submit(), Err(FeedbackError::NoIssue));
        assert!(matches!(flow.phase(), FeedbackPhase::FormOpen(_)));
    }

    #[test]
    fn test_submit_rejected_without_support_option() {
        let mut flow = prompted();
        flow.decline();
        flow.form_mut().unwrap().toggle_issue(Issue::TooShort);
        assert_eq!(flow.submit(), Err(FeedbackError::NoSupportOption));
    }

    #[test]
    fn test_submit_reports_other_text_only_when_other_selected() {
        let mut flow = prompted();
        flow.decline();
        let form = flow.form_mut().unwrap();
        form.toggle_issue(Issue::Other);
        assert!(form.set_other_text("wrong tyre size"));
        form.toggle_issue(Issue::OffTopic);
        form.choose_support(SupportOption::TalkToHuman);

        let submission = flow.submit().unwrap();
        assert_eq!(submission.issues, vec![Issue::Other, Issue::OffTopic]);
        assert_eq!(submission.other_text, "wrong tyre size");
        assert_eq!(submission.support, SupportOption::TalkToHuman);
        assert_eq!(flow.phase(), &FeedbackPhase::Thanked { acknowledged: true });
    }

    #[test]
    fn test_deselecting_other_clears_text() {
        let mut form = FeedbackForm::default();
        assert!(!form.set_other_text("ignored"));
        form.toggle_issue(Issue::Other);
        form.set_other_text("typed");
        form.toggle_issue(Issue::Other);
        assert_eq!(form.other_text(), "");
        assert!(form.issues().is_empty());
    }

    #[test]
    fn test_cancel_returns_to_none() {
        let mut flow = prompted();
        flow.decline();
        flow.form_mut().unwrap().toggle_issue(Issue::TooComplex);
        assert!(flow.cancel());
        assert_eq!(flow.phase(), &FeedbackPhase::None);
        assert!(!flow.cancel());
        assert_eq!(flow.submit(), Err(FeedbackError::NotOpen));
    }

    #[test]
    fn test_rearm_discards_previous_flow() {
        let mut flow = prompted();
        flow.decline();
        flow.rearm(5);
        assert_eq!(flow.bound_to(), Some(5));
        assert_eq!(flow.phase(), &FeedbackPhase::Prompted);
    }

    #[test]
    fn test_support_option_wire_values() {
        assert_eq!(serde_json::to_string(&SupportOption::Rephrase).unwrap(), "\"rephrase\"");
        assert_eq!(serde_json::to_string(&SupportOption::TalkToHuman).unwrap(), "\"talk-exec\"");
        assert_eq!(serde_json::to_string(&Issue::DifferentHelp).unwrap(), "\"different-help\"");
    }
}
