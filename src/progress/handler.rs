//! Progress handler trait and events

use crate::pipeline::{Artifact, IndexAction, RunStatus, StageId};
use std::time::Duration;
use uuid::Uuid;

/// Events emitted while a run moves through its stages
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { run_id: Uuid },

    /// Every artifact was already present
    Converged,

    /// Stage had nothing to do
    StageSkipped { stage: StageId },

    StageStarted { stage: StageId },

    StageCompleted { stage: StageId, duration: Duration },

    /// Stage wrote partial data
    StageDegraded {
        stage: StageId,
        reason: String,
        duration: Duration,
    },

    /// Stage failed; `fatal` means the run stops here
    StageFailed {
        stage: StageId,
        error: String,
        duration: Duration,
        fatal: bool,
    },

    /// An upstream change forced a dependent artifact to be rebuilt
    InvalidationRaised { source: Artifact, target: Artifact },

    IndexReconciled { action: IndexAction },

    /// Run finished, whatever the outcome
    Completed {
        status: RunStatus,
        total_time: Duration,
    },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
