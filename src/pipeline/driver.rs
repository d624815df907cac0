use super::artifact::Artifact;
use super::context::{RunPlan, StageContext};
use super::index::{IndexAction, IndexMaintainer};
use super::probe::{PresenceSnapshot, StateProbe};
use super::report::{RunReport, RunStatus, StageRecord, StageStatus};
use super::resolver::{self, Resolution};
use super::stage_trait::{FailurePolicy, Stage, StageId, StageOutcome};
use super::stages::{catalogue_prefix_scope, default_stages};
use crate::config::SyncConfig;
use crate::producers::Producers;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::store::{DocumentStore, MongoStore, PostgresStore, RelationalStore};
use anyhow::anyhow;
use chrono::Utc;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// Runs one probe → resolve → stages → index pass over both stores.
pub struct PipelineDriver {
    probe: StateProbe,
    index: IndexMaintainer,
    context: StageContext,
    stages: Vec<Box<dyn Stage>>,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl PipelineDriver {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        documents: Arc<dyn DocumentStore>,
        context: StageContext,
        seasonal_policy: FailurePolicy,
    ) -> Self {
        Self {
            probe: StateProbe::new(relational, documents.clone()),
            index: IndexMaintainer::new(documents),
            context,
            stages: default_stages(seasonal_policy),
            progress_handler: None,
        }
    }

    /// Wires the production stores from configuration. Nothing connects
    /// until the first run.
    pub fn from_config(config: &SyncConfig, producers: Producers) -> Self {
        let relational: Arc<dyn RelationalStore> = Arc::new(PostgresStore::new(&config.postgres));
        let documents: Arc<dyn DocumentStore> = Arc::new(MongoStore::new(&config.mongo));
        let context = StageContext::new(
            producers,
            catalogue_prefix_scope(&config.tabular_path, config.fallback_chunk_size),
        );
        Self::new(relational, documents, context, config.seasonal_failure_policy)
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn stage_order(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Read-only preview: what would the next run need?
    pub async fn plan(&self) -> (PresenceSnapshot, Resolution) {
        let snapshot = self.probe.snapshot().await;
        let resolution = resolver::resolve(&snapshot);
        (snapshot, resolution)
    }

    /// Reconciles the search index without touching any data.
    pub async fn reindex(&self) -> IndexAction {
        let action = self.reconcile_index().await;
        self.emit(ProgressEvent::IndexReconciled {
            action: action.clone(),
        });
        action
    }

    /// Never returns an error: failures end up in the report. A panicking
    /// stage counts as a failed one; the outer catch only covers the probe
    /// and the driver's own bookkeeping. The index is reconciled regardless.
    pub async fn run(&self) -> RunReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let mut report = RunReport::new(run_id, Utc::now());
        self.emit(ProgressEvent::Started { run_id });

        let converged = AssertUnwindSafe(self.converge(&mut report))
            .catch_unwind()
            .await;
        if let Err(panic) = converged {
            let message = panic_message(panic.as_ref());
            error!(run_id = %run_id, panic = %message, "Pipeline panicked, aborting run");
            report.errors.push(format!("pipeline panicked: {}", message));
            report.status = RunStatus::Aborted;
        }

        let action = self.reconcile_index().await;
        if let IndexAction::Failed { error } = &action {
            report.errors.push(format!("index: {}", error));
            if report.status == RunStatus::Completed {
                report.status = RunStatus::CompletedWithErrors;
            }
        }
        self.emit(ProgressEvent::IndexReconciled {
            action: action.clone(),
        });
        report.index = Some(action);

        let total_time = start.elapsed();
        report.duration_ms = total_time.as_millis() as u64;
        self.emit(ProgressEvent::Completed {
            status: report.status,
            total_time,
        });
        report
    }

    async fn reconcile_index(&self) -> IndexAction {
        match AssertUnwindSafe(self.index.reconcile()).catch_unwind().await {
            Ok(action) => action,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Index reconciliation panicked");
                IndexAction::Failed {
                    error: format!("index reconciliation panicked: {}", message),
                }
            }
        }
    }

    async fn converge(&self, report: &mut RunReport) {
        let snapshot = self.probe.snapshot().await;
        report.snapshot = snapshot.clone();

        let needs = match resolver::resolve(&snapshot) {
            Resolution::Converged => {
                self.emit(ProgressEvent::Converged);
                report.status = RunStatus::Converged;
                return;
            }
            Resolution::Pending(needs) => needs,
        };
        info!(
            needed = ?needs.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
            "Resolved artifacts to produce"
        );
        report.needs = needs.clone();

        let mut plan = RunPlan::new(snapshot, needs);
        for stage in &self.stages {
            let id = stage.id();
            if !stage.should_run(&plan) {
                self.emit(ProgressEvent::StageSkipped { stage: id });
                report.stages.push(StageRecord::skipped(id));
                continue;
            }

            self.emit(ProgressEvent::StageStarted { stage: id });
            let stage_start = Instant::now();
            let outcome = AssertUnwindSafe(stage.execute(&self.context))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    StageOutcome::failed(anyhow!(
                        "stage panicked: {}",
                        panic_message(panic.as_ref())
                    ))
                });
            let duration = stage_start.elapsed();

            match outcome {
                StageOutcome::Completed { changed } => {
                    self.emit(ProgressEvent::StageCompleted {
                        stage: id,
                        duration,
                    });
                    report
                        .stages
                        .push(record(id, StageStatus::Completed, duration, None));
                    self.apply_changes(&mut plan, &changed, report);
                }
                StageOutcome::Degraded { changed, reason } => {
                    self.emit(ProgressEvent::StageDegraded {
                        stage: id,
                        reason: reason.clone(),
                        duration,
                    });
                    report.stages.push(record(
                        id,
                        StageStatus::Degraded,
                        duration,
                        Some(reason),
                    ));
                    self.apply_changes(&mut plan, &changed, report);
                }
                StageOutcome::Failed { error } => {
                    let message = format!("{:#}", error);
                    let fatal = stage.failure_policy() == FailurePolicy::Abort;
                    error!(stage = %id, error = %message, fatal, "Stage failed");
                    self.emit(ProgressEvent::StageFailed {
                        stage: id,
                        error: message.clone(),
                        duration,
                        fatal,
                    });
                    report.errors.push(format!("{}: {}", id, message));
                    report.stages.push(record(
                        id,
                        StageStatus::Failed,
                        duration,
                        Some(message),
                    ));
                    if fatal {
                        error!(stage = %id, "Aborting run, remaining stages will not execute");
                        report.status = RunStatus::Aborted;
                        return;
                    }
                }
            }
        }

        let clean = report
            .stages
            .iter()
            .all(|r| matches!(r.status, StageStatus::Completed | StageStatus::Skipped));
        report.status = if clean {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };
    }

    fn apply_changes(&self, plan: &mut RunPlan, changed: &[Artifact], report: &mut RunReport) {
        for invalidation in plan.record_changes(changed) {
            self.emit(ProgressEvent::InvalidationRaised {
                source: invalidation.source,
                target: invalidation.target,
            });
            report.invalidations.push(invalidation);
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }
}

fn record(
    stage: StageId,
    status: StageStatus,
    duration: Duration,
    detail: Option<String>,
) -> StageRecord {
    StageRecord {
        stage,
        status,
        duration_ms: duration.as_millis() as u64,
        detail,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
