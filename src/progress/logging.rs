//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use crate::pipeline::{IndexAction, RunStatus};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { run_id } => {
                info!(run_id = %run_id, "Starting ingestion run");
            }
            ProgressEvent::Converged => {
                info!("All sources already present, nothing to ingest");
            }
            ProgressEvent::StageSkipped { stage } => {
                debug!(stage = %stage, "Stage not needed, skipping");
            }
            ProgressEvent::StageStarted { stage } => {
                info!(stage = %stage, "Starting stage");
            }
            ProgressEvent::StageCompleted { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::StageDegraded {
                stage,
                reason,
                duration,
            } => {
                warn!(
                    stage = %stage,
                    reason = %reason,
                    duration_ms = duration.as_millis(),
                    "Stage completed with partial data"
                );
            }
            ProgressEvent::StageFailed {
                stage,
                error,
                duration,
                fatal,
            } => {
                warn!(
                    stage = %stage,
                    error = %error,
                    fatal,
                    duration_ms = duration.as_millis(),
                    "Stage failed"
                );
            }
            ProgressEvent::InvalidationRaised { source, target } => {
                info!(
                    source = %source,
                    target = %target,
                    "Upstream artifact changed, rebuilding dependent"
                );
            }
            ProgressEvent::IndexReconciled { action } => match action {
                IndexAction::Failed { error } => {
                    warn!(error = %error, "Index reconciliation failed");
                }
                other => debug!(action = ?other, "Index reconciled"),
            },
            ProgressEvent::Completed { status, total_time } => {
                if matches!(status, RunStatus::Aborted | RunStatus::CompletedWithErrors) {
                    warn!(
                        status = %status,
                        total_time_ms = total_time.as_millis(),
                        "Run finished with errors"
                    );
                } else {
                    info!(
                        status = %status,
                        total_time_ms = total_time.as_millis(),
                        "Run finished"
                    );
                }
            }
        }
    }
}
