use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, warn};

use crate::events::AppMessage;

pub const DEFAULT_OUTBOUND_CAPACITY: usize = 16;

/// Messages the user wrote for the iteration loop. `depth` counts accepted messages the
/// loop has not yet reported as being processed.
pub struct OutboundQueue {
    tx: SyncSender<String>,
    capacity: usize,
    depth: usize,
    refresh: Sender<AppMessage>,
}

pub fn channel(capacity: usize, refresh: Sender<AppMessage>) -> (OutboundQueue, Receiver<String>) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::sync_channel(capacity);
    let queue = OutboundQueue {
        tx,
        capacity,
        depth: 0,
        refresh,
    };
    (queue, rx)
}

impl OutboundQueue {
    pub fn enqueue(&mut self, text: impl Into<String>) -> bool {
        self.depth += 1;
        match self.tx.try_send(text.into()) {
            Ok(()) => {
                let _ = self.refresh.send(AppMessage::OutboundDepth(self.depth));
                true
            }
            Err(TrySendError::Full(_)) => {
                self.depth -= 1;
                warn!(capacity = self.capacity, "outbound queue full; message discarded");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.depth -= 1;
                warn!("outbound consumer gone; message discarded");
                false
            }
        }
    }

    pub fn mark_processed(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Serialize)]
struct InboxLine<'a> {
    text: &'a str,
    queued_at: u64,
}

/// Appends each outbound message to the session inbox as a JSON line. Exits when the
/// queue is dropped.
pub fn spawn_inbox_writer(messages: Receiver<String>, path: PathBuf) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("inbox-writer".to_string())
        .spawn(move || {
            for text in messages.iter() {
                if let Err(err) = append_inbox_line(&path, &text) {
                    warn!(path = %path.display(), error = %err, "failed to write inbox message");
                }
            }
            debug!("inbox writer exiting");
        })
}

fn append_inbox_line(path: &Path, text: &str) -> io::Result<()> {
    let queued_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let line = serde_json::to_string(&InboxLine { text, queued_at })?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}
