use std::time::Duration;

use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::events::{AppMessage, InputEvent};
use crate::outbound::OutboundQueue;
use crate::pause::{PauseHandshake, PauseState, PausedChanged};
use crate::reload::{ReloadRequest, Reloader};
use crate::router::{InputRouter, Routed};
use crate::session_event::{EventKind, SessionEvent};
use crate::store::AggregateState;
use crate::surfaces::{Action, PaneContent};

pub struct AppParts {
    pub session: String,
    pub screen: Rect,
    pub pause: PauseHandshake,
    pub outbound: OutboundQueue,
    pub reloader: Reloader,
    pub tick_interval: Duration,
}

/// Controller state. Every change goes through [`App::handle_message`], one message at a
/// time, on the UI thread.
pub struct App {
    pub running: bool,
    session: String,
    router: InputRouter,
    history: Vec<SessionEvent>,
    state: AggregateState,
    pause: PauseHandshake,
    last_pause_change: Option<PausedChanged>,
    outbound: OutboundQueue,
    reloader: Reloader,
    worker_busy: bool,
    /// Set once an iteration event of this session has been applied; from then on only
    /// iteration events move `worker_busy`.
    busy_from_events: bool,
    iteration_elapsed: Duration,
    tick_interval: Duration,
    store_error: Option<String>,
    subscription_error: Option<String>,
    healthy: bool,
    status_line: Option<String>,
}

impl App {
    pub fn new(parts: AppParts) -> Self {
        Self {
            running: true,
            router: InputRouter::new(parts.screen),
            session: parts.session,
            history: Vec::new(),
            state: AggregateState::default(),
            pause: parts.pause,
            last_pause_change: None,
            outbound: parts.outbound,
            reloader: parts.reloader,
            worker_busy: false,
            busy_from_events: false,
            iteration_elapsed: Duration::ZERO,
            tick_interval: parts.tick_interval,
            store_error: None,
            subscription_error: None,
            healthy: true,
            status_line: None,
        }
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::Input(input) => {
                self.handle_input(input);
            }
            AppMessage::SessionEvent(event) => self.on_session_event(event),
            AppMessage::StateReloaded(Ok(state)) => {
                if self.store_error.take().is_some() {
                    info!(session = %self.session, "state store recovered");
                }
                if !self.busy_from_events {
                    self.worker_busy = state
                        .last_iteration
                        .as_ref()
                        .is_some_and(|iteration| !iteration.finished);
                }
                self.state = state;
                self.sync_router();
            }
            AppMessage::StateReloaded(Err(err)) => {
                self.store_error = Some(err);
            }
            AppMessage::SubscriptionFailed(err) => {
                self.status_line = Some(format!("Event source unavailable: {err}"));
                self.subscription_error = Some(err);
            }
            AppMessage::OutboundDepth(depth) => {
                self.status_line = Some(format!("Message queued ({depth} pending)"));
            }
            AppMessage::HealthChecked(healthy) => {
                if healthy != self.healthy {
                    info!(session = %self.session, healthy, "session health changed");
                }
                self.healthy = healthy;
            }
            AppMessage::DurationTick => {
                if self.worker_busy {
                    self.iteration_elapsed += self.tick_interval;
                }
            }
        }
    }

    pub fn handle_input(&mut self, input: InputEvent) -> Routed {
        let routed = self.router.route(input);
        if let Some(action) = routed.action.clone() {
            self.apply_action(action);
        }
        routed
    }

    /// Asks the store for a fresh aggregate view of the session.
    pub fn request_reload(&self) {
        match self.reloader.request(&self.session) {
            ReloadRequest::Queued => {}
            ReloadRequest::Coalesced => debug!(session = %self.session, "reload coalesced"),
            ReloadRequest::Closed => warn!(session = %self.session, "reload worker gone"),
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        // A wildcard pattern also follows neighbouring sessions. Their events are listed
        // but never drive this session's worker, outbound or store state.
        if event.session != self.session {
            debug!(session = %self.session, from = %event.session, "foreign session event");
            self.history.push(event);
            self.sync_router();
            return;
        }
        match (&event.kind, event.action.as_str()) {
            (EventKind::Iteration, "started") => {
                self.worker_busy = true;
                self.busy_from_events = true;
                self.iteration_elapsed = Duration::ZERO;
            }
            (EventKind::Iteration, "completed") => {
                self.worker_busy = false;
                self.busy_from_events = true;
            }
            (EventKind::Control, "message_processing") => self.outbound.mark_processed(),
            (EventKind::Control, "paused") => {
                self.pause.acknowledge();
                self.status_line = Some("Loop acknowledged pause".to_string());
            }
            (EventKind::Control, "resumed") => {
                self.status_line = Some("Loop resumed".to_string());
            }
            _ => {}
        }
        self.history.push(event);
        self.sync_router();
        self.request_reload();
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::TogglePause => self.toggle_pause(),
            Action::SendMessage(text) => {
                // A rejected message is logged by the queue and otherwise dropped.
                self.outbound.enqueue(text);
            }
        }
    }

    fn toggle_pause(&mut self) {
        // Both facts are read here, on the loop that also applies iteration events.
        let busy = self.worker_busy && !self.pause.worker_confirms_paused();
        match self.pause.toggle(busy) {
            Ok(Some(changed)) => {
                self.last_pause_change = Some(changed);
                self.status_line = Some(
                    match (changed, busy) {
                        (PausedChanged(true), _) => "Pause requested",
                        (PausedChanged(false), true) => "Pause cancelled",
                        (PausedChanged(false), false) => "Resumed",
                    }
                    .to_string(),
                );
            }
            Ok(None) => {
                self.status_line = Some("No worker attached".to_string());
            }
            Err(err) => {
                warn!(session = %self.session, error = %err, "pause toggle failed");
                self.status_line = Some(format!("Pause toggle failed: {err}"));
            }
        }
    }

    fn sync_router(&mut self) {
        self.router.sync_content(PaneContent {
            task_ids: self.state.tasks.iter().map(|task| task.id.clone()).collect(),
            event_count: self.history.len(),
            note_count: self.state.notes.len(),
        });
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn history(&self) -> &[SessionEvent] {
        &self.history
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    #[cfg(test)]
    pub fn pause_state(&self) -> PauseState {
        self.pause.state()
    }

    pub fn can_pause(&self) -> bool {
        self.pause.has_worker()
    }

    pub fn pause_display(&self) -> PauseState {
        self.pause.display_state()
    }

    pub fn last_pause_change(&self) -> Option<PausedChanged> {
        self.last_pause_change
    }

    pub fn outbound_depth(&self) -> usize {
        self.outbound.depth()
    }

    pub fn outbound_capacity(&self) -> usize {
        self.outbound.capacity()
    }

    pub fn worker_busy(&self) -> bool {
        self.worker_busy
    }

    pub fn iteration_elapsed(&self) -> Duration {
        self.iteration_elapsed
    }

    pub fn store_error(&self) -> Option<&str> {
        self.store_error.as_deref()
    }

    pub fn subscription_error(&self) -> Option<&str> {
        self.subscription_error.as_deref()
    }

    pub fn healthy(&self) -> bool {
        self.healthy
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }
}


#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
