use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info};

use crate::error::EventSourceError;

pub const SESSION_LOG_SUFFIX: &str = ".jsonl";
pub const INBOX_LOG_SUFFIX: &str = ".inbox.jsonl";

/// Receives raw payloads. May be invoked from a thread owned by the source.
pub type PayloadHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

pub trait EventSource {
    fn subscribe(
        &self,
        pattern: &str,
        on_message: PayloadHandler,
    ) -> Result<Box<dyn Subscription>, EventSourceError>;
}

pub trait Subscription: Send {
    fn unsubscribe(self: Box<Self>);
}

/// Publishes every line appended to `<dir>/<session>.jsonl` files whose session name
/// matches the subscription pattern.
#[derive(Debug, Clone)]
pub struct JsonlLogSource {
    dir: PathBuf,
    poll_interval: Duration,
}

impl JsonlLogSource {
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
        }
    }
}

impl EventSource for JsonlLogSource {
    fn subscribe(
        &self,
        pattern: &str,
        mut on_message: PayloadHandler,
    ) -> Result<Box<dyn Subscription>, EventSourceError> {
        if !self.dir.is_dir() {
            return Err(EventSourceError::MissingDirectory(self.dir.clone()));
        }

        let pattern = pattern.to_string();
        let mut tail = LogTail::default();
        let entries = fs::read_dir(&self.dir).map_err(|source| EventSourceError::Scan {
            path: self.dir.clone(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if session_name(&path).is_some_and(|name| glob_matches(&pattern, name)) {
                tail.skip_existing(&path);
            }
        }

        let handler_pattern = pattern.clone();
        let mut watcher = PollWatcher::new(
            move |res: Result<NotifyEvent, notify::Error>| {
                let Ok(event) = res else {
                    return;
                };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                for path in &event.paths {
                    let matched =
                        session_name(path).is_some_and(|name| glob_matches(&handler_pattern, name));
                    if !matched {
                        continue;
                    }
                    for line in tail.read_new_lines(path) {
                        on_message(line.as_slice());
                    }
                }
            },
            notify::Config::default().with_poll_interval(self.poll_interval),
        )?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        info!(dir = %self.dir.display(), pattern = %pattern, "watching session logs");

        Ok(Box::new(JsonlSubscription { watcher }))
    }
}

struct JsonlSubscription {
    watcher: PollWatcher,
}

impl Subscription for JsonlSubscription {
    fn unsubscribe(self: Box<Self>) {
        // Dropping the watcher stops polling and releases the payload handler.
        drop(self.watcher);
        debug!("session log subscription released");
    }
}

#[derive(Debug, Default)]
struct LogTail {
    offsets: HashMap<PathBuf, u64>,
    partial: HashMap<PathBuf, Vec<u8>>,
}

impl LogTail {
    fn skip_existing(&mut self, path: &Path) {
        let len = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        self.offsets.insert(path.to_path_buf(), len);
    }

    fn read_new_lines(&mut self, path: &Path) -> Vec<Vec<u8>> {
        let Ok(mut file) = File::open(path) else {
            return Vec::new();
        };
        let len = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        let offset = self.offsets.entry(path.to_path_buf()).or_insert(0);
        if len < *offset {
            // Truncated or replaced; start over.
            *offset = 0;
            self.partial.remove(path);
        }
        if file.seek(SeekFrom::Start(*offset)).is_err() {
            return Vec::new();
        }
        let mut appended = Vec::new();
        let Ok(read) = file.read_to_end(&mut appended) else {
            return Vec::new();
        };
        *offset += read as u64;

        let buffer = self.partial.entry(path.to_path_buf()).or_default();
        buffer.extend_from_slice(&appended);
        split_complete_lines(buffer)
    }
}

fn split_complete_lines(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let Some(last_newline) = buffer.iter().rposition(|byte| *byte == b'\n') else {
        return Vec::new();
    };
    let rest = buffer.split_off(last_newline + 1);
    let complete = std::mem::replace(buffer, rest);
    complete
        .split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(<[u8]>::to_vec)
        .collect()
}

/// Session name for a session log path, `None` for inbox logs and unrelated files.
pub fn session_name(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.ends_with(INBOX_LOG_SUFFIX) {
        return None;
    }
    file_name
        .strip_suffix(SESSION_LOG_SUFFIX)
        .filter(|name| !name.is_empty())
}

/// `*` matches any run of characters; everything else matches literally.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|byte| *byte == b'*')
}
