//! # Session State
//!
//! Everything one widget instance knows, in one place. No presentation types
//! here; `view.rs` derives what to draw.
//!
//! ```text
//! Session
//! ├── config: ResolvedConfig          // static widget options
//! ├── identity: Identity              // user/session ids for analytics
//! ├── transcript: Transcript          // conversation log
//! ├── stream: StreamState             // idle / awaiting / receiving
//! ├── connection: ConnectionStatus    // transport banner
//! ├── started_at: Option<DateTime>    // set once by Start
//! ├── input: String                   // draft in the input box
//! ├── suggestions: Vec<String>        // follow-up questions on screen
//! ├── suggestions_loading: bool       // fetch in flight
//! ├── suggestion_generation: u64      // bumps on every refresh/clear
//! ├── used_suggestions: Vec<String>   // informational only
//! ├── feedback: FeedbackWorkflow      // per-answer Yes/No flow
//! ├── schedule: ScheduleForm          // callback request form
//! ├── timers: Timers                  // cancellable scheduled tasks
//! ├── fullscreen / closed: bool
//! └── classifier: Box<dyn IntentClassifier>
//! ```
//!
//! State changes only happen through `update(session, action)` in action.rs.

use chrono::{DateTime, Utc};

use crate::core::config::ResolvedConfig;
use crate::core::feedback::FeedbackWorkflow;
use crate::core::identity::Identity;
use crate::core::intent::{IntentClassifier, PhraseClassifier};
use crate::core::schedule::ScheduleForm;
use crate::core::timer::Timers;
use crate::core::transcript::Transcript;
use crate::transport::ConnectionStatus;

/// The streaming/idle machine. At most one answer is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    /// Sent, no chunk yet.
    Awaiting,
    /// Chunks are landing in the assistant turn at `turn`.
    Receiving { turn: usize },
}

pub struct Session {
    pub config: ResolvedConfig,
    pub identity: Identity,
    pub transcript: Transcript,
    pub stream: StreamState,
    pub connection: ConnectionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub input: String,
    pub suggestions: Vec<String>,
    pub suggestions_loading: bool,
    pub suggestion_generation: u64,
    pub used_suggestions: Vec<String>,
    pub feedback: FeedbackWorkflow,
    pub schedule: ScheduleForm,
    pub timers: Timers,
    pub fullscreen: bool,
    pub closed: bool,
    pub classifier: Box<dyn IntentClassifier>,
}

impl Session {
    pub fn new(config: ResolvedConfig, identity: Identity) -> Self {
        Self {
            config,
            identity,
            transcript: Transcript::default(),
            stream: StreamState::Idle,
            connection: ConnectionStatus::Connecting,
            started_at: None,
            input: String::new(),
            suggestions: Vec::new(),
            suggestions_loading: false,
            suggestion_generation: 0,
            used_suggestions: Vec::new(),
            feedback: FeedbackWorkflow::default(),
            schedule: ScheduleForm::default(),
            timers: Timers::default(),
            fullscreen: false,
            closed: false,
            classifier: Box::new(PhraseClassifier::default()),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.stream != StreamState::Idle
    }

    /// The single gate for anything that starts a backend answer.
    pub fn can_send(&self) -> bool {
        !self.is_streaming() && !self.schedule.is_submitting() && !self.closed
    }
}
