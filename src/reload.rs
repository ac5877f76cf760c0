use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::events::AppMessage;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest {
    Queued,
    /// A reload is already pending and will observe the newer log.
    Coalesced,
    Closed,
}

/// Requests full state reloads from the store. At most one request is pending at a time,
/// so bursts of events collapse into a single reload.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: SyncSender<String>,
}

impl Reloader {
    pub fn channel() -> (Self, Receiver<String>) {
        let (tx, rx) = mpsc::sync_channel(1);
        (Self { tx }, rx)
    }

    pub fn request(&self, session: &str) -> ReloadRequest {
        match self.tx.try_send(session.to_string()) {
            Ok(()) => ReloadRequest::Queued,
            Err(TrySendError::Full(_)) => ReloadRequest::Coalesced,
            Err(TrySendError::Disconnected(_)) => ReloadRequest::Closed,
        }
    }
}

pub fn spawn_reload_worker(
    requests: Receiver<String>,
    store: Arc<dyn StateStore>,
    messages: Sender<AppMessage>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("state-reload".to_string())
        .spawn(move || run_reload_worker(&requests, store.as_ref(), &messages))
}

fn run_reload_worker(
    requests: &Receiver<String>,
    store: &dyn StateStore,
    messages: &Sender<AppMessage>,
) {
    for session in requests.iter() {
        let result = store.load_state(&session).map_err(|err| {
            warn!(session = %session, error = %err, "state reload failed");
            err.to_string()
        });
        if messages.send(AppMessage::StateReloaded(result)).is_err() {
            break;
        }
    }
    debug!("state reload worker exiting");
}
