//! # Actions
//!
//! Everything that can happen to the widget becomes an `Action`.
//! User presses send? That's `Action::SubmitInput`.
//! Backend streams a token? That's `Action::Transport(TransportEvent::Chunk(..))`.
//!
//! `update()` takes the current session and an action, mutates the session,
//! and returns the side effects to perform. No I/O happens here; the runtime
//! executes the effects and feeds results back in as new actions.
//!
//! ```text
//! Session + Action  →  update()  →  Session' + [Effect]
//! ```

use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::json;

use crate::core::feedback::{HUMAN_HANDOVER_TEXT, Issue, SupportOption};
use crate::core::schedule::{self, ScheduleField};
use crate::core::state::{Session, StreamState};
use crate::core::suggestions::{self, RefreshPlan};
use crate::core::timer::{Timer, TimerId};
use crate::core::transcript::{Role, Turn};
use crate::services::analytics::{
    AnalyticsEvent, ChatbotClose, HumanHandover, LeadCapture, SessionEnd, wire_timestamp,
};
use crate::transport::{OutgoingMessage, TransportEvent};

#[derive(Debug, Clone)]
pub enum Action {
    /// Widget mounted.
    Start,
    /// Launcher clicked.
    Open,
    EditInput(String),
    /// Sends the current draft.
    SubmitInput,
    SubmitText(String),
    SelectSuggestion(String),
    Transport(TransportEvent),
    TimerFired(TimerId),
    SuggestionsReady {
        generation: u64,
        questions: Vec<String>,
    },
    FeedbackYes,
    FeedbackNo,
    ToggleIssue(Issue),
    SetOtherText(String),
    ChooseSupport(SupportOption),
    SubmitFeedback,
    CancelFeedback,
    RequestCallback,
    EditSchedule(ScheduleField, String),
    SubmitSchedule,
    CancelSchedule,
    /// Lead capture reached the analytics backend.
    LeadCaptured,
    /// Lead capture could not be delivered.
    LeadFailed(String),
    ToggleFullscreen,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(OutgoingMessage),
    Track {
        event: &'static str,
        attributes: serde_json::Value,
    },
    /// Fire-and-forget telemetry.
    Analytics(AnalyticsEvent),
    /// Awaited; answered with `LeadCaptured` or `LeadFailed`.
    CaptureLead(LeadCapture),
    /// Answered with `SuggestionsReady { generation, .. }`.
    FetchSuggestions {
        generation: u64,
        history: Vec<Turn>,
    },
    StartTimer {
        id: TimerId,
        delay: Duration,
    },
    CancelTimer(TimerId),
    Exit,
}

fn track(event: &'static str, attributes: serde_json::Value) -> Effect {
    Effect::Track { event, attributes }
}

pub fn update(session: &mut Session, action: Action) -> Vec<Effect> {
    if session.closed {
        debug!("Ignoring {:?}: widget is closed", action);
        return Vec::new();
    }
    if session.started_at.is_none()
        && !matches!(
            action,
            Action::Start | Action::Transport(TransportEvent::StatusChange(_))
        )
    {
        debug!("Ignoring {:?}: session not started", action);
        return Vec::new();
    }

    match action {
        Action::Start => start(session),
        Action::Open => vec![track("chatbot_opened", json!({ "method": "button_click" }))],
        Action::EditInput(text) => {
            session.input = text;
            Vec::new()
        }
        Action::SubmitInput => {
            let text = session.input.clone();
            let effects = submit_text(session, &text);
            // A rejected send keeps the draft
            if !effects.is_empty() {
                session.input.clear();
            }
            effects
        }
        Action::SubmitText(text) => submit_text(session, &text),
        Action::SelectSuggestion(question) => {
            let effects = submit_text(session, &question);
            if !effects.is_empty() {
                session.used_suggestions.push(question);
            }
            effects
        }
        Action::Transport(event) => on_transport_event(session, event),
        Action::TimerFired(id) => on_timer(session, id),
        Action::SuggestionsReady {
            generation,
            questions,
        } => {
            on_suggestions(session, generation, questions);
            Vec::new()
        }
        Action::FeedbackYes => feedback_yes(session),
        Action::FeedbackNo => {
            if !session.feedback.decline() {
                debug!("Feedback \"No\" ignored in {:?}", session.feedback.phase());
            }
            Vec::new()
        }
        Action::ToggleIssue(issue) => {
            if let Some(form) = session.feedback.form_mut() {
                form.toggle_issue(issue);
            }
            Vec::new()
        }
        Action::SetOtherText(text) => {
            if let Some(form) = session.feedback.form_mut() {
                form.set_other_text(text);
            }
            Vec::new()
        }
        Action::ChooseSupport(option) => {
            if let Some(form) = session.feedback.form_mut() {
                form.choose_support(option);
            }
            Vec::new()
        }
        Action::SubmitFeedback => submit_feedback(session),
        Action::CancelFeedback => {
            session.feedback.cancel();
            Vec::new()
        }
        Action::RequestCallback => {
            session.schedule.open();
            Vec::new()
        }
        Action::EditSchedule(field, value) => {
            session.schedule.edit(field, &value);
            Vec::new()
        }
        Action::SubmitSchedule => submit_schedule(session),
        Action::CancelSchedule => {
            session.schedule.cancel();
            Vec::new()
        }
        Action::LeadCaptured => lead_captured(session),
        Action::LeadFailed(reason) => {
            warn!("Callback request failed: {}", reason);
            session.schedule.fail();
            Vec::new()
        }
        Action::ToggleFullscreen => {
            session.fullscreen = !session.fullscreen;
            Vec::new()
        }
        Action::Close => close(session),
    }
}

fn start(session: &mut Session) -> Vec<Effect> {
    if session.started_at.is_some() {
        debug!("Start ignored: session already running");
        return Vec::new();
    }
    session.transcript.start(&session.config.introduction_text);
    session.started_at = Some(Utc::now());
    info!(
        "Session started: user={} session={}",
        session.identity.user_id, session.identity.session_id
    );

    let mut effects = vec![track("session_start", json!({}))];
    effects.extend(request_refresh(session));
    effects
}

/// Computes suggestions now (seed) or asks the runtime to fetch them.
fn request_refresh(session: &mut Session) -> Vec<Effect> {
    if session.is_streaming() {
        debug!("Suggestion refresh skipped: streaming");
        return Vec::new();
    }
    session.suggestion_generation += 1;
    let plan = suggestions::plan(
        session.transcript.turns(),
        &session.config.initial_suggested_questions,
        session.config.show_number_of_questions,
    );
    match plan {
        RefreshPlan::Seed(seed) => {
            session.suggestions = seed;
            session.suggestions_loading = false;
            Vec::new()
        }
        RefreshPlan::Fetch { topic } => {
            debug!(
                "Requesting suggestions (generation {}, topic {})",
                session.suggestion_generation, topic
            );
            // Last-known-good list stays visible (disabled) until the answer lands
            session.suggestions_loading = true;
            vec![Effect::FetchSuggestions {
                generation: session.suggestion_generation,
                history: session.transcript.turns().to_vec(),
            }]
        }
    }
}

fn clear_suggestions(session: &mut Session) -> Vec<Effect> {
    session.suggestions.clear();
    session.suggestions_loading = false;
    session.suggestion_generation += 1;
    session
        .timers
        .cancel(Timer::SuggestionRefresh)
        .into_iter()
        .collect()
}

/// Enters streaming: suggestions vanish and pending refreshes are cancelled.
fn begin_streaming(session: &mut Session, stream: StreamState) -> Vec<Effect> {
    session.stream = stream;
    let mut effects = clear_suggestions(session);
    effects.extend(session.timers.cancel(Timer::FeedbackRestore));
    effects
}

fn submit_text(session: &mut Session, text: &str) -> Vec<Effect> {
    if text.trim().is_empty() {
        debug!("Ignoring blank submission");
        return Vec::new();
    }
    if !session.can_send() {
        debug!("Send rejected: an answer is already in flight");
        return Vec::new();
    }

    let intent = session.classifier.classify(text);
    session.transcript.push_user(text);

    let mut effects = vec![track("question_asked", json!({ "question": text }))];
    effects.extend(begin_streaming(session, StreamState::Awaiting));

    if intent.scheduling {
        debug!("Scheduling intent detected; nothing is bound to it");
    }
    if intent.callback {
        info!("Callback intent detected, opening schedule form");
        session.schedule.open();
    }

    effects.push(Effect::Send(OutgoingMessage::chat(text)));
    effects
}

fn on_transport_event(session: &mut Session, event: TransportEvent) -> Vec<Effect> {
    match event {
        TransportEvent::Chunk(text) => match session.stream {
            StreamState::Receiving { turn } => {
                if !session.transcript.extend(turn, &text) {
                    warn!("Chunk for turn {} could not be applied", turn);
                }
                Vec::new()
            }
            StreamState::Awaiting => {
                let turn = session.transcript.open_assistant(&text);
                session.stream = StreamState::Receiving { turn };
                Vec::new()
            }
            StreamState::Idle => {
                debug!("Unsolicited chunk, opening a new answer");
                let turn = session.transcript.open_assistant(&text);
                begin_streaming(session, StreamState::Receiving { turn })
            }
        },
        TransportEvent::Complete => {
            match session.stream {
                StreamState::Idle => {
                    debug!("Complete with no answer in flight");
                    return Vec::new();
                }
                StreamState::Awaiting => debug!("Answer completed without content"),
                StreamState::Receiving { turn } => session.feedback.rearm(turn),
            }
            session.stream = StreamState::Idle;
            session.timers.schedule(Timer::SuggestionRefresh)
        }
        TransportEvent::Error(message) => {
            if !session.is_streaming() {
                warn!("Transport error with no answer in flight: {}", message);
                return Vec::new();
            }
            warn!("Answer failed: {}", message);
            let turn = session.transcript.push_error(message);
            session.feedback.rearm(turn);
            session.stream = StreamState::Idle;
            session.timers.schedule(Timer::SuggestionRefresh)
        }
        TransportEvent::StatusChange(status) => {
            if session.connection != status {
                info!("Connection status: {:?} -> {:?}", session.connection, status);
                session.connection = status;
            }
            Vec::new()
        }
    }
}

fn on_timer(session: &mut Session, id: TimerId) -> Vec<Effect> {
    match session.timers.fire(id) {
        None => {
            debug!("Stale timer {:?} ignored", id);
            Vec::new()
        }
        Some(Timer::SuggestionRefresh) | Some(Timer::FeedbackRestore) => request_refresh(session),
        Some(Timer::HideAcknowledgment) => {
            session.feedback.hide_acknowledgment();
            Vec::new()
        }
        Some(Timer::ClearScheduleForm) => {
            session.schedule.clear();
            Vec::new()
        }
    }
}

fn on_suggestions(session: &mut Session, generation: u64, questions: Vec<String>) {
    if generation != session.suggestion_generation || session.is_streaming() {
        debug!(
            "Dropping stale suggestions (generation {}, current {})",
            generation, session.suggestion_generation
        );
        return;
    }
    session.suggestions = questions;
    session.suggestions_loading = false;
}

fn feedback_yes(session: &mut Session) -> Vec<Effect> {
    if !session.feedback.accept() {
        debug!("Feedback \"Yes\" ignored in {:?}", session.feedback.phase());
        return Vec::new();
    }
    let mut effects = session.timers.schedule(Timer::HideAcknowledgment);
    // The post-answer refresh already covers visible or loading suggestions
    if session.suggestions.is_empty() && !session.suggestions_loading {
        effects.extend(session.timers.schedule(Timer::FeedbackRestore));
    }
    effects
}

fn submit_feedback(session: &mut Session) -> Vec<Effect> {
    if session.is_streaming() {
        debug!("Feedback submit rejected: streaming");
        return Vec::new();
    }
    let submission = match session.feedback.submit() {
        Ok(s) => s,
        Err(e) => {
            debug!("Feedback submit rejected: {}", e);
            return Vec::new();
        }
    };
    info!(
        "Feedback submitted: issues={:?} support={:?}",
        submission.issues, submission.support
    );

    let mut effects = clear_suggestions(session);
    effects.extend(session.timers.schedule(Timer::HideAcknowledgment));

    if submission.support == SupportOption::TalkToHuman {
        let last_message = session
            .transcript
            .last_text(Role::User)
            .unwrap_or_default()
            .to_string();
        let turn = session.transcript.push_assistant(HUMAN_HANDOVER_TEXT);
        session.feedback.rearm(turn);
        effects.push(Effect::Analytics(AnalyticsEvent::HumanHandover(HumanHandover {
            user_id: session.identity.user_id.clone(),
            session_id: session.identity.session_id.clone(),
            issues: submission.issues,
            other_text: submission.other_text,
            support_option: submission.support,
            requested_at: wire_timestamp(Utc::now()),
            last_message,
        })));
    }

    effects.extend(session.timers.schedule(Timer::FeedbackRestore));
    effects
}

fn submit_schedule(session: &mut Session) -> Vec<Effect> {
    if !session.can_send() {
        debug!("Callback submit rejected: an answer is already in flight");
        return Vec::new();
    }
    match session.schedule.begin_submit() {
        Ok(details) => {
            info!("Callback form valid, capturing lead");
            vec![Effect::CaptureLead(LeadCapture::callback_request(details.name))]
        }
        Err(e) => {
            debug!("Callback form rejected: {}", e);
            Vec::new()
        }
    }
}

fn lead_captured(session: &mut Session) -> Vec<Effect> {
    if session.is_streaming() {
        warn!("Lead captured while an answer is streaming; asking the user to retry");
        session.schedule.fail();
        return Vec::new();
    }
    let Some(details) = session.schedule.acknowledge() else {
        debug!("Lead capture acknowledged with no submission pending");
        return Vec::new();
    };

    session.transcript.push_user(schedule::summary(&details));
    let mut effects = begin_streaming(session, StreamState::Awaiting);
    effects.push(Effect::Send(OutgoingMessage::callback(details)));
    effects.extend(session.timers.schedule(Timer::ClearScheduleForm));
    effects
}

fn close(session: &mut Session) -> Vec<Effect> {
    let now = Utc::now();
    let elapsed = session
        .started_at
        .map(|started| (now - started).num_seconds())
        .unwrap_or(0);
    let last_user = session.transcript.last_text(Role::User).unwrap_or_default().to_string();
    let last_bot = session
        .transcript
        .last_text(Role::Assistant)
        .unwrap_or_default()
        .to_string();
    info!("Closing widget after {}s", elapsed);

    session.closed = true;
    let mut effects = session.timers.cancel_all();
    effects.push(Effect::Analytics(AnalyticsEvent::ChatbotClose(ChatbotClose {
        user_id: session.identity.user_id.clone(),
        session_id: session.identity.session_id.clone(),
        closed_at: wire_timestamp(now),
        time_spent_seconds: elapsed,
        last_user_message: last_user,
        last_bot_message: last_bot,
    })));
    effects.push(Effect::Analytics(AnalyticsEvent::SessionEnd(SessionEnd {
        user_id: session.identity.user_id.clone(),
        session_id: session.identity.session_id.clone(),
        end_time: wire_timestamp(now),
        duration: elapsed,
    })));
    effects.push(Effect::Exit);
    effects
}
