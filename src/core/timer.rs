//! # Scheduled Tasks
//!
//! Delayed work is modelled as data: the reducer asks for a timer with
//! `Effect::StartTimer`, the runtime sleeps and feeds back
//! `Action::TimerFired(id)`. Each kind has at most one live timer.
//! Rescheduling a kind supersedes the older timer, and a firing whose id is no
//! longer live is reported as stale.

use std::collections::HashMap;
use std::time::Duration;

use crate::core::action::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Debounced suggestion refresh after an answer settles.
    SuggestionRefresh,
    /// Restores suggestions after the feedback flow finishes.
    FeedbackRestore,
    /// Hides the "thank you" acknowledgment.
    HideAcknowledgment,
    /// Wipes schedule form fields after a successful submission.
    ClearScheduleForm,
}

impl Timer {
    pub fn delay(self) -> Duration {
        match self {
            Timer::SuggestionRefresh => Duration::from_millis(500),
            Timer::FeedbackRestore => Duration::from_secs(3),
            Timer::HideAcknowledgment => Duration::from_secs(2),
            Timer::ClearScheduleForm => Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Default)]
pub struct Timers {
    next_id: u64,
    live: HashMap<Timer, TimerId>,
}

impl Timers {
    /// Schedules `timer`, cancelling any live timer of the same kind.
    pub fn schedule(&mut self, timer: Timer) -> Vec<Effect> {
        let mut effects: Vec<Effect> = self.cancel(timer).into_iter().collect();
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.live.insert(timer, id);
        effects.push(Effect::StartTimer {
            id,
            delay: timer.delay(),
        });
        effects
    }

    pub fn cancel(&mut self, timer: Timer) -> Option<Effect> {
        self.live.remove(&timer).map(Effect::CancelTimer)
    }

    pub fn cancel_all(&mut self) -> Vec<Effect> {
        self.live.drain().map(|(_, id)| Effect::CancelTimer(id)).collect()
    }

    /// Consumes a firing. Returns the timer kind if `id` was still live.
    pub fn fire(&mut self, id: TimerId) -> Option<Timer> {
        let timer = self
            .live
            .iter()
            .find_map(|(timer, live)| (*live == id).then_some(*timer))?;
        self.live.remove(&timer);
        Some(timer)
    }

    pub fn is_pending(&self, timer: Timer) -> bool {
        self.live.contains_key(&timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_id(effects: &[Effect]) -> TimerId {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::StartTimer { id, .. } => Some(*id),
                _ => None,
            })
            .expect("schedule always starts a timer")
    }

    #[test]
    fn test_schedule_then_fire() {
        let mut timers = Timers::default();
        let effects = timers.schedule(Timer::SuggestionRefresh);
        assert_eq!(effects.len(), 1);
        let id = started_id(&effects);
        assert!(timers.is_pending(Timer::SuggestionRefresh));
        assert_eq!(timers.fire(id), Some(Timer::SuggestionRefresh));
        assert!(!timers.is_pending(Timer::SuggestionRefresh));
        // A second firing of the same id is stale
        assert_eq!(timers.fire(id), None);
    }

    #[test]
    fn test_reschedule_supersedes_older_timer() {
        let mut timers = Timers::default();
        let first = started_id(&timers.schedule(Timer::SuggestionRefresh));
        let effects = timers.schedule(Timer::SuggestionRefresh);
        assert_eq!(effects[0], Effect::CancelTimer(first));
        let second = started_id(&effects);
        assert_ne!(first, second);
        assert_eq!(timers.fire(first), None);
        assert_eq!(timers.fire(second), Some(Timer::SuggestionRefresh));
    }

    #[test]
    fn test_cancel_makes_firing_stale() {
        let mut timers = Timers::default();
        let id = started_id(&timers.schedule(Timer::FeedbackRestore));
        assert_eq!(timers.cancel(Timer::FeedbackRestore), Some(Effect::CancelTimer(id)));
        assert_eq!(timers.cancel(Timer::FeedbackRestore), None);
        assert_eq!(timers.fire(id), None);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut timers = Timers::default();
        let refresh = started_id(&timers.schedule(Timer::SuggestionRefresh));
        let hide = started_id(&timers.schedule(Timer::HideAcknowledgment));
        timers.cancel(Timer::SuggestionRefresh);
        assert_eq!(timers.fire(refresh), None);
        assert_eq!(timers.fire(hide), Some(Timer::HideAcknowledgment));
    }

    #[test]
    fn test_cancel_all() {
        let mut timers = Timers::default();
        timers.schedule(Timer::SuggestionRefresh);
        timers.schedule(Timer::ClearScheduleForm);
        assert_eq!(timers.cancel_all().len(), 2);
        assert!(!timers.is_pending(Timer::SuggestionRefresh));
    }
}
