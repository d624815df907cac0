use super::artifact::Artifact;
use super::context::Invalidation;
use super::index::IndexAction;
use super::probe::PresenceSnapshot;
use super::resolver::{NeedSet, Resolution};
use super::stage_trait::StageId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Nothing was needed; no stage ran.
    Converged,
    Completed,
    CompletedWithErrors,
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Converged => "converged",
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithErrors => "completed_with_errors",
            RunStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Skipped,
    Completed,
    Degraded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: StageId,
    pub status: StageStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageRecord {
    pub fn skipped(stage: StageId) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            duration_ms: 0,
            detail: None,
        }
    }
}

/// Summary of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub snapshot: PresenceSnapshot,
    pub needs: NeedSet,
    pub stages: Vec<StageRecord>,
    pub invalidations: Vec<Invalidation>,
    pub index: Option<IndexAction>,
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            duration_ms: 0,
            status: RunStatus::Converged,
            snapshot: PresenceSnapshot::default(),
            needs: NeedSet::default(),
            stages: Vec::new(),
            invalidations: Vec::new(),
            index: None,
            errors: Vec::new(),
        }
    }

    pub fn stage(&self, id: StageId) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == id)
    }

    /// Stages that actually called their producers, in run order.
    pub fn executed_stages(&self) -> Vec<StageId> {
        self.stages
            .iter()
            .filter(|r| r.status != StageStatus::Skipped)
            .map(|r| r.stage)
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Read-only preview produced by `foodsync plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub converged: bool,
    pub present: Vec<Artifact>,
    pub absent: Vec<Artifact>,
    pub needs: NeedSet,
}

impl PlanReport {
    pub fn new(snapshot: &PresenceSnapshot, resolution: &Resolution) -> Self {
        let needs = match resolution {
            Resolution::Converged => NeedSet::default(),
            Resolution::Pending(needs) => needs.clone(),
        };
        Self {
            converged: resolution.is_converged(),
            present: snapshot.present().collect(),
            absent: snapshot.absent(),
            needs,
        }
    }
}
