//! # Runtime
//!
//! The event loop around the pure core. One task owns the `Session`; every
//! input (user commands, transport events, timer firings, fetch results)
//! arrives as an `Action` on a single channel, so they are applied strictly
//! one at a time.
//!
//! ```text
//!   host ──Action──┐
//!                  ▼
//!   ┌──────── mpsc<Action> ◄──────── spawned tasks
//!   │              │                  (send, fetch, timers, analytics)
//!   │              ▼                        ▲
//!   │      update(session, action)          │
//!   │              │                        │
//!   │              └──► [Effect] ──execute──┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

use crate::core::action::{Action, Effect, update};
use crate::core::state::Session;
use crate::core::suggestions::SuggestionScheduler;
use crate::core::timer::TimerId;
use crate::services::analytics::{AnalyticsError, AnalyticsSink};
use crate::transport::{TransportAdapter, TransportEvent};

/// Capacity of the per-send event channel between transport and forwarder.
const EVENT_BUFFER: usize = 100;

pub struct Runtime {
    session: Session,
    transport: Arc<dyn TransportAdapter>,
    scheduler: Arc<SuggestionScheduler>,
    analytics: Arc<dyn AnalyticsSink>,
    tx: UnboundedSender<Action>,
    rx: UnboundedReceiver<Action>,
    timers: HashMap<TimerId, AbortHandle>,
    send_task: Option<AbortHandle>,
}

impl Runtime {
    pub fn new(
        session: Session,
        transport: Arc<dyn TransportAdapter>,
        scheduler: SuggestionScheduler,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            transport,
            scheduler: Arc::new(scheduler),
            analytics,
            tx,
            rx,
            timers: HashMap::new(),
            send_task: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A sender hosts use to inject user actions.
    pub fn handle(&self) -> UnboundedSender<Action> {
        self.tx.clone()
    }

    /// Mounts the widget: starts the session and asks the transport to connect.
    pub fn start(&mut self) {
        info!("Starting runtime with transport {}", self.transport.name());
        let transport = self.transport.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (events_tx, mut events_rx) = mpsc::channel::<TransportEvent>(EVENT_BUFFER);
            let connect = async move {
                if let Err(e) = transport.connect(events_tx).await {
                    warn!("Transport connect failed: {}", e);
                }
            };
            let forward = async {
                while let Some(event) = events_rx.recv().await {
                    if tx.send(Action::Transport(event)).is_err() {
                        return;
                    }
                }
            };
            tokio::join!(connect, forward);
        });
        self.dispatch(Action::Start);
    }

    /// Applies one action and executes its effects. Returns `false` once the
    /// widget has exited.
    pub fn dispatch(&mut self, action: Action) -> bool {
        if let Action::TimerFired(id) = &action {
            self.timers.remove(id);
        }
        let effects = update(&mut self.session, action);
        let mut running = true;
        for effect in effects {
            running &= self.execute(effect);
        }
        running
    }

    /// Waits for the next action and applies it. `None` when every sender is gone.
    pub async fn step(&mut self) -> Option<bool> {
        let action = self.rx.recv().await?;
        Some(self.dispatch(action))
    }

    /// Runs until `Close`. `on_change` sees the session after every action.
    pub async fn run(mut self, mut on_change: impl FnMut(&Session)) -> Session {
        on_change(&self.session);
        while let Some(running) = self.step().await {
            on_change(&self.session);
            if !running {
                break;
            }
        }
        info!("Runtime stopped");
        self.session
    }

    fn execute(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::Send(payload) => {
                if let Some(previous) = self.send_task.take() {
                    previous.abort();
                }
                let handle = self.spawn_send(payload);
                self.send_task = Some(handle);
            }
            Effect::Track { event, attributes } => {
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    if let Err(e) = transport.track_user_action(event, attributes).await {
                        warn!("Tracking {} failed: {}", event, e);
                    }
                });
            }
            Effect::Analytics(event) => {
                let analytics = self.analytics.clone();
                tokio::spawn(async move {
                    if let Err(e) = analytics.record(&event).await {
                        warn!("Analytics {} not recorded: {}", event.endpoint(), e);
                    }
                });
            }
            Effect::CaptureLead(lead) => {
                let analytics = self.analytics.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let action = match analytics.capture_lead(&lead).await {
                        Ok(()) => Action::LeadCaptured,
                        // Non-2xx still counts as delivered
                        Err(AnalyticsError::Api { status }) => {
                            warn!("Lead capture returned HTTP {}, continuing", status);
                            Action::LeadCaptured
                        }
                        Err(e) => Action::LeadFailed(e.to_string()),
                    };
                    if tx.send(action).is_err() {
                        warn!("Lead capture result dropped: receiver gone");
                    }
                });
            }
            Effect::FetchSuggestions {
                generation,
                history,
            } => {
                let scheduler = self.scheduler.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let questions = scheduler.refresh(&history).await;
                    if tx
                        .send(Action::SuggestionsReady {
                            generation,
                            questions,
                        })
                        .is_err()
                    {
                        debug!("Suggestions dropped: receiver gone");
                    }
                });
            }
            Effect::StartTimer { id, delay } => {
                let tx = self.tx.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Action::TimerFired(id));
                });
                self.timers.insert(id, handle.abort_handle());
            }
            Effect::CancelTimer(id) => {
                if let Some(handle) = self.timers.remove(&id) {
                    handle.abort();
                }
            }
            Effect::Exit => {
                for (_, handle) in self.timers.drain() {
                    handle.abort();
                }
                if let Some(handle) = self.send_task.take() {
                    handle.abort();
                }
                return false;
            }
        }
        true
    }

    /// Delivers one message. Transport events and the final outcome travel
    /// through the same channel, so an error can never overtake a chunk.
    fn spawn_send(&self, payload: crate::transport::OutgoingMessage) -> AbortHandle {
        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let (events_tx, mut events_rx) = mpsc::channel::<TransportEvent>(EVENT_BUFFER);

            let deliver = async move {
                if let Err(e) = transport.send(payload, events_tx.clone()).await {
                    warn!("Send failed: {}", e);
                    let _ = events_tx.send(TransportEvent::Error(e.to_string())).await;
                }
            };

            let forward = async {
                let mut settled = false;
                let mut forwarded = 0usize;
                while let Some(event) = events_rx.recv().await {
                    forwarded += 1;
                    if matches!(event, TransportEvent::Complete | TransportEvent::Error(_)) {
                        settled = true;
                    }
                    if tx.send(Action::Transport(event)).is_err() {
                        warn!("Transport event dropped: receiver gone");
                        return;
                    }
                }
                debug!("Send finished after {} events", forwarded);
                // A send that returns without a terminal event still ends the answer
                if !settled {
                    let _ = tx.send(Action::Transport(TransportEvent::Complete));
                }
            };

            tokio::join!(deliver, forward);
        });
        handle.abort_handle()
    }
}
