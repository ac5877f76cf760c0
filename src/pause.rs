use tracing::info;

use crate::error::WorkerError;
use crate::worker::WorkerControl;

/// `Paused` is entered from `PauseRequested` once the worker acknowledges the request,
/// either when the acknowledgement is observed or at the next toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseState {
    #[default]
    Running,
    PauseRequested,
    Paused,
}

impl PauseState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::PauseRequested => "pausing",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PausedChanged(pub bool);

/// Pause/resume negotiation with the iteration loop.
///
/// `worker_busy` is read by the caller at the moment of the toggle; the worker's own
/// pause acknowledgement is a separate signal and only affects [`display_state`].
///
/// [`display_state`]: PauseHandshake::display_state
pub struct PauseHandshake {
    state: PauseState,
    worker: Option<Box<dyn WorkerControl>>,
}

impl PauseHandshake {
    pub fn new(worker: Option<Box<dyn WorkerControl>>) -> Self {
        Self {
            state: PauseState::Running,
            worker,
        }
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    pub fn worker_confirms_paused(&self) -> bool {
        self.worker.as_deref().is_some_and(|worker| worker.is_paused())
    }

    /// What the status bar shows: a requested pause the worker has acknowledged reads as
    /// paused.
    pub fn display_state(&self) -> PauseState {
        if self.state == PauseState::PauseRequested && self.worker_confirms_paused() {
            PauseState::Paused
        } else {
            self.state
        }
    }

    /// Promotes a requested pause to `Paused` when the worker has acknowledged it.
    pub fn acknowledge(&mut self) {
        if self.state == PauseState::PauseRequested && self.worker_confirms_paused() {
            info!("worker acknowledged pause");
            self.state = PauseState::Paused;
        }
    }

    /// Without a worker this is a no-op. A failed worker call leaves the state unchanged.
    pub fn toggle(&mut self, worker_busy: bool) -> Result<Option<PausedChanged>, WorkerError> {
        self.acknowledge();
        let Some(worker) = self.worker.as_deref() else {
            return Ok(None);
        };
        let (next, changed) = match (self.state, worker_busy) {
            (PauseState::Running, _) => {
                worker.request_pause()?;
                (PauseState::PauseRequested, PausedChanged(true))
            }
            (PauseState::PauseRequested, true) => {
                worker.cancel_pause()?;
                (PauseState::Running, PausedChanged(false))
            }
            (PauseState::PauseRequested, false) | (PauseState::Paused, _) => {
                worker.resume()?;
                (PauseState::Running, PausedChanged(false))
            }
        };
        info!(from = ?self.state, to = ?next, worker_busy, "pause handshake transition");
        self.state = next;
        Ok(Some(changed))
    }
}
