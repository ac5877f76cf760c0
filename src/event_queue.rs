//! Bounded inbound queue between the event source callback and the consumer thread.
//!
//! Overflow drops the arriving event and never an already-queued one. The queue closes
//! when every sender is dropped; the receiver still yields whatever was buffered before
//! reporting closure.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::session_event::SessionEvent;

pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    DroppedFull,
    Closed,
}

#[derive(Debug, Clone)]
pub struct EventQueueSender {
    tx: SyncSender<SessionEvent>,
}

#[derive(Debug)]
pub struct EventQueueReceiver {
    rx: Receiver<SessionEvent>,
    capacity: usize,
}

pub fn bounded(capacity: usize) -> (EventQueueSender, EventQueueReceiver) {
    // A zero-capacity sync channel is a rendezvous, which would block the source.
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::sync_channel(capacity);
    (EventQueueSender { tx }, EventQueueReceiver { rx, capacity })
}

impl EventQueueSender {
    /// Never blocks.
    pub fn push(&self, event: SessionEvent) -> PushOutcome {
        match self.tx.try_send(event) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => PushOutcome::DroppedFull,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Closed,
        }
    }
}

impl EventQueueReceiver {
    /// Blocks until an event is available; `None` once the queue is closed and drained.
    pub fn wait_next(&self) -> Option<SessionEvent> {
        self.rx.recv().ok()
    }

    pub fn try_next(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
