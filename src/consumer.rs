use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::event_queue::EventQueueReceiver;
use crate::events::AppMessage;

/// Drains the inbound queue into the controller loop, one event at a time and in arrival
/// order. The loop ends when the queue closes or the controller stops listening; it
/// returns the number of events forwarded.
pub fn spawn_event_consumer(
    queue: EventQueueReceiver,
    messages: Sender<AppMessage>,
) -> io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("event-consumer".to_string())
        .spawn(move || run_event_consumer(&queue, &messages))
}

pub fn run_event_consumer(queue: &EventQueueReceiver, messages: &Sender<AppMessage>) -> u64 {
    let mut forwarded = 0_u64;
    while let Some(event) = queue.wait_next() {
        if messages.send(AppMessage::SessionEvent(event)).is_err() {
            debug!(forwarded, "controller gone; event consumer exiting");
            return forwarded;
        }
        forwarded += 1;
    }
    debug!(forwarded, "event queue closed; event consumer exiting");
    forwarded
}
