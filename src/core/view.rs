//! # View Model
//!
//! A flat, presentation-ready snapshot derived from `Session`. Hosts render
//! this and never read `Session` directly.

use crate::core::feedback::{FeedbackPhase, Issue, SupportOption};
use crate::core::schedule::{ScheduleForm, VehicleType};
use crate::core::state::{Session, StreamState};
use crate::core::transcript::Role;
use crate::transport::ConnectionStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackView {
    /// "Was this helpful?" with Yes/No.
    Prompt,
    Form {
        /// Every issue with its checked state, in display order.
        issues: Vec<(Issue, bool)>,
        /// Present only while "other" is checked.
        other_text: Option<String>,
        support: Option<SupportOption>,
        can_submit: bool,
    },
    Acknowledged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnView {
    pub label: String,
    pub text: String,
    pub is_error: bool,
    pub feedback: Option<FeedbackView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleFormView {
    pub name: String,
    pub phone_number: String,
    pub vehicle_type: Option<VehicleType>,
    pub error: Option<String>,
    pub vehicle_choices: &'static [VehicleType],
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub title: String,
    pub logo: String,
    pub primary_color: String,
    pub placeholder: String,
    pub turns: Vec<TurnView>,
    pub banner: Option<&'static str>,
    pub typing: bool,
    pub suggestions: Vec<String>,
    pub suggestions_enabled: bool,
    pub schedule: Option<ScheduleFormView>,
    pub input: String,
    pub input_enabled: bool,
    pub send_enabled: bool,
    pub fullscreen: bool,
}

pub fn banner(status: ConnectionStatus) -> Option<&'static str> {
    match status {
        ConnectionStatus::Connected => None,
        ConnectionStatus::Connecting => Some("Connecting..."),
        ConnectionStatus::Disconnected => Some("Disconnected - Please check your connection"),
    }
}

fn feedback_view(phase: &FeedbackPhase) -> Option<FeedbackView> {
    match phase {
        FeedbackPhase::None => None,
        FeedbackPhase::Prompted => Some(FeedbackView::Prompt),
        FeedbackPhase::FormOpen(form) => {
            let other_selected = form.issues().contains(&Issue::Other);
            Some(FeedbackView::Form {
                issues: Issue::ALL
                    .iter()
                    .map(|issue| (*issue, form.issues().contains(issue)))
                    .collect(),
                other_text: other_selected.then(|| form.other_text().to_string()),
                support: form.support(),
                can_submit: form.can_submit(),
            })
        }
        FeedbackPhase::Thanked { acknowledged: true } => Some(FeedbackView::Acknowledged),
        FeedbackPhase::Thanked { acknowledged: false } => None,
    }
}

fn schedule_view(form: &ScheduleForm) -> Option<ScheduleFormView> {
    let (fields, error, submitting) = match form {
        ScheduleForm::Open { fields, error } => (fields, error.map(|e| e.to_string()), false),
        ScheduleForm::Submitting { fields } => (fields, None, true),
        ScheduleForm::Closed | ScheduleForm::Submitted { .. } => return None,
    };
    Some(ScheduleFormView {
        name: fields.name.clone(),
        phone_number: fields.phone_number.clone(),
        vehicle_type: fields.vehicle_type,
        error,
        vehicle_choices: &VehicleType::ALL,
        submitting,
    })
}

pub fn render(session: &Session) -> ViewModel {
    let title = format!("{} AI Assistant", session.config.company_name);
    let bound = session.feedback.bound_to();

    let turns = session
        .transcript
        .turns()
        .iter()
        .enumerate()
        .map(|(idx, turn)| TurnView {
            label: match turn.role {
                Role::User => "You".to_string(),
                Role::System | Role::Assistant => title.clone(),
            },
            text: turn.text.clone(),
            is_error: turn.is_error,
            feedback: if bound == Some(idx) {
                feedback_view(session.feedback.phase())
            } else {
                None
            },
        })
        .collect();

    let streaming = session.is_streaming();
    let schedule = if streaming {
        None
    } else {
        schedule_view(&session.schedule)
    };
    let suggestions = if streaming || schedule.is_some() {
        Vec::new()
    } else {
        session.suggestions.clone()
    };

    ViewModel {
        logo: session.config.company_logo.clone(),
        primary_color: session.config.primary_color.clone(),
        placeholder: session.config.input_placeholder.clone(),
        turns,
        banner: banner(session.connection),
        typing: session.stream == StreamState::Awaiting,
        suggestions_enabled: !session.suggestions_loading && session.can_send(),
        suggestions,
        schedule,
        input: session.input.clone(),
        input_enabled: !session.closed,
        send_enabled: session.can_send() && !session.input.trim().is_empty(),
        fullscreen: session.fullscreen,
        title,
    }
}
