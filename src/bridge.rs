use std::sync::mpsc::Sender;

use tracing::{debug, info, warn};

use crate::event_queue::{EventQueueSender, PushOutcome};
use crate::event_source::{EventSource, PayloadHandler, Subscription};
use crate::events::AppMessage;
use crate::session_event::SessionEvent;
use crate::shutdown::Shutdown;

/// Owns the subscription that feeds the inbound event queue.
///
/// The queue sender lives only inside the payload handler, so releasing the subscription
/// closes the queue. Subscription failures are reported once as a message and are not
/// retried.
pub struct EventBridge {
    pattern: String,
    subscription: Option<Box<dyn Subscription>>,
}

impl EventBridge {
    pub fn start(
        source: &dyn EventSource,
        pattern: &str,
        queue: EventQueueSender,
        messages: &Sender<AppMessage>,
    ) -> Self {
        let subscription = match source.subscribe(pattern, payload_handler(queue)) {
            Ok(subscription) => {
                info!(pattern, "event bridge subscribed");
                Some(subscription)
            }
            Err(err) => {
                warn!(pattern, error = %err, "event bridge subscription failed");
                let _ = messages.send(AppMessage::SubscriptionFailed(err.to_string()));
                None
            }
        };
        Self {
            pattern: pattern.to_string(),
            subscription,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!(pattern = %self.pattern, "event bridge stopped");
        }
    }

    /// Hands the bridge to the shutdown signal, which stops it when triggered.
    pub fn stop_on(mut self, shutdown: &Shutdown) {
        shutdown.on_trigger(move || self.stop());
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn payload_handler(queue: EventQueueSender) -> PayloadHandler {
    Box::new(move |payload: &[u8]| {
        let Ok(event) = SessionEvent::parse(payload) else {
            return;
        };
        if queue.push(event) == PushOutcome::DroppedFull {
            debug!("event queue full; dropping newest event");
        }
    })
}
