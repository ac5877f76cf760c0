use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("event directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("failed to scan event directory '{}': {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to watch event directory: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read session log '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to update worker control file '{}': {source}", path.display())]
    Control {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
