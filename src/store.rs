use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::event_source::SESSION_LOG_SUFFIX;
use crate::session_event::{EventKind, SessionEvent};

pub trait StateStore: Send + Sync {
    fn load_state(&self, session: &str) -> Result<AggregateState, StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    pub tasks: Vec<TaskView>,
    pub notes: Vec<NoteView>,
    pub iterations: u64,
    pub last_iteration: Option<IterationView>,
    pub event_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationView {
    pub number: u64,
    pub finished: bool,
    pub outcome: Option<String>,
}

impl TaskStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "in_progress" | "in-progress" | "active" | "running" => Self::InProgress,
            "done" | "complete" | "completed" => Self::Done,
            "blocked" | "failed" => Self::Blocked,
            _ => Self::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Pending => "[ ]",
            Self::InProgress => "[~]",
            Self::Done => "[x]",
            Self::Blocked => "[!]",
        }
    }
}

impl AggregateState {
    pub fn task(&self, id: &str) -> Option<&TaskView> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn apply(&mut self, event: &SessionEvent) {
        self.event_count += 1;
        match event.kind {
            EventKind::Task => self.apply_task(event),
            EventKind::Note => {
                if event.action == "added" {
                    self.notes.push(NoteView {
                        id: event.data_str("id").unwrap_or(event.id.as_str()).to_string(),
                        text: event.data_str("text").unwrap_or_default().to_string(),
                    });
                }
            }
            EventKind::Iteration => self.apply_iteration(event),
            EventKind::Control | EventKind::Other(_) => {}
        }
    }

    fn apply_task(&mut self, event: &SessionEvent) {
        let Some(id) = event.data_str("id") else {
            return;
        };
        if event.action == "deleted" {
            self.tasks.retain(|task| task.id != id);
            return;
        }
        let index = match self.tasks.iter().position(|task| task.id == id) {
            Some(index) => index,
            None => {
                self.tasks.push(TaskView {
                    id: id.to_string(),
                    title: id.to_string(),
                    status: TaskStatus::Pending,
                });
                self.tasks.len() - 1
            }
        };
        let task = &mut self.tasks[index];
        if let Some(title) = event.data_str("title") {
            task.title = title.to_string();
        }
        if let Some(status) = event.data_str("status") {
            task.status = TaskStatus::from_label(status);
        }
        if event.action == "completed" {
            task.status = TaskStatus::Done;
        }
    }

    fn apply_iteration(&mut self, event: &SessionEvent) {
        match event.action.as_str() {
            "started" => {
                self.iterations += 1;
                self.last_iteration = Some(IterationView {
                    number: event.data_u64("number").unwrap_or(self.iterations),
                    finished: false,
                    outcome: None,
                });
            }
            "completed" => {
                let number = event.data_u64("number").unwrap_or(self.iterations);
                self.last_iteration = Some(IterationView {
                    number,
                    finished: true,
                    outcome: event.data_str("outcome").map(str::to_string),
                });
            }
            _ => {}
        }
    }
}

pub fn fold_events<'a>(events: impl IntoIterator<Item = &'a SessionEvent>) -> AggregateState {
    let mut state = AggregateState::default();
    for event in events {
        state.apply(event);
    }
    state
}

/// Rebuilds the aggregate view from `<dir>/<session>.jsonl` on every load.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn session_log_path(&self, session: &str) -> PathBuf {
        session_log_path(&self.dir, session)
    }
}

pub fn session_log_path(dir: &Path, session: &str) -> PathBuf {
    dir.join(format!("{session}{SESSION_LOG_SUFFIX}"))
}

impl StateStore for JsonlStore {
    fn load_state(&self, session: &str) -> Result<AggregateState, StoreError> {
        let path = self.session_log_path(session);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(AggregateState::default());
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        let events = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| SessionEvent::parse(line.as_bytes()).ok())
            .filter(|event| event.session == session)
            .collect::<Vec<_>>();
        Ok(fold_events(&events))
    }
}
