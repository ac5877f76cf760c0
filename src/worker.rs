use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::WorkerError;

const PAUSE_FILE: &str = "pause";
const RESUME_FILE: &str = "resume";
const PAUSED_ACK_FILE: &str = "paused";

/// The only capabilities the controller needs from the iteration loop.
pub trait WorkerControl {
    fn request_pause(&self) -> Result<(), WorkerError>;
    fn cancel_pause(&self) -> Result<(), WorkerError>;
    fn resume(&self) -> Result<(), WorkerError>;
    fn is_paused(&self) -> bool;
}

/// Talks to the loop through marker files in `<dir>/<session>.control/`. The loop polls
/// for `pause` and `resume` and writes `paused` once it has stopped between iterations.
#[derive(Debug, Clone)]
pub struct ControlDirWorker {
    dir: PathBuf,
}

impl ControlDirWorker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_session(events_dir: &Path, session: &str) -> Self {
        Self::new(events_dir.join(format!("{session}.control")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_marker(&self, name: &str) -> Result<(), WorkerError> {
        let path = self.dir.join(name);
        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(&path, epoch_secs().to_string()))
            .map_err(|source| WorkerError::Control { path, source })
    }

    fn remove_marker(&self, name: &str) -> Result<(), WorkerError> {
        let path = self.dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkerError::Control { path, source }),
        }
    }
}

impl WorkerControl for ControlDirWorker {
    fn request_pause(&self) -> Result<(), WorkerError> {
        self.remove_marker(RESUME_FILE)?;
        self.write_marker(PAUSE_FILE)
    }

    fn cancel_pause(&self) -> Result<(), WorkerError> {
        self.remove_marker(PAUSE_FILE)
    }

    fn resume(&self) -> Result<(), WorkerError> {
        self.remove_marker(PAUSE_FILE)?;
        self.write_marker(RESUME_FILE)
    }

    fn is_paused(&self) -> bool {
        self.dir.join(PAUSED_ACK_FILE).exists()
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
