//! Output formatting for multiple formats
//!
//! Run reports, plans and index results can be rendered as JSON, YAML or
//! human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::pipeline::{
    Artifact, IndexAction, PlanReport, RunReport, RunStatus, StageRecord, StageStatus,
};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "run report"),
            OutputFormat::Yaml => to_yaml(report, "run report"),
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_plan(&self, plan: &PlanReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(plan, "plan"),
            OutputFormat::Yaml => to_yaml(plan, "plan"),
            OutputFormat::Human => Ok(self.format_plan_human(plan)),
        }
    }

    pub fn format_index(&self, action: &IndexAction) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(action, "index action"),
            OutputFormat::Yaml => to_yaml(action, "index action"),
            OutputFormat::Human => Ok(format!("Text index: {}\n", describe_index(action))),
        }
    }

    fn format_report_human(&self, report: &RunReport) -> String {
        let mut output = String::new();

        let marker = match report.status {
            RunStatus::Converged | RunStatus::Completed => "\u{2713}",
            RunStatus::CompletedWithErrors | RunStatus::Aborted => "\u{26A0}",
        };
        output.push_str(&format!("{} Ingestion Run ({})\n", marker, report.status));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Run ID:   {}\n", report.run_id));
        output.push_str(&format!(
            "Started:  {}\n\n",
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if report.status == RunStatus::Converged {
            output.push_str("All sources already present, nothing to do.\n");
        } else {
            let needed: Vec<Artifact> = report.needs.iter().collect();
            output.push_str(&format!("Needed:   {}\n\n", join_artifacts(&needed)));

            output.push_str("Stages:\n");
            for (i, record) in report.stages.iter().enumerate() {
                let connector = if i + 1 == report.stages.len() {
                    "\u{2514}\u{2500}"
                } else {
                    "\u{251C}\u{2500}"
                };
                output.push_str(&format!("{} {}\n", connector, describe_stage(record)));
            }

            if !report.invalidations.is_empty() {
                output.push_str("\nRebuilt because upstream changed:\n");
                for inv in &report.invalidations {
                    output.push_str(&format!("  - {} (after {})\n", inv.target, inv.source));
                }
            }
        }

        if let Some(action) = &report.index {
            output.push_str(&format!("\nText index: {}\n", describe_index(action)));
        }

        if !report.errors.is_empty() {
            output.push_str("\n\u{26A0} Errors:\n");
            for error in &report.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        output.push_str(&format!("\nFinished in {}ms\n", report.duration_ms));
        output
    }

    fn format_plan_human(&self, plan: &PlanReport) -> String {
        let mut output = String::new();
        output.push_str("Ingestion Plan\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Present:  {}\n", join_artifacts(&plan.present)));
        output.push_str(&format!("Absent:   {}\n\n", join_artifacts(&plan.absent)));

        if plan.converged {
            output.push_str("Converged: a run would only check the text index.\n");
        } else {
            let needed: Vec<Artifact> = plan.needs.iter().collect();
            output.push_str(&format!("A run would produce: {}\n", join_artifacts(&needed)));
            output.push_str("Dependents of anything rebuilt are rebuilt as well.\n");
        }
        output
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}

fn join_artifacts(artifacts: &[Artifact]) -> String {
    if artifacts.is_empty() {
        return "(none)".to_string();
    }
    artifacts
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_stage(record: &StageRecord) -> String {
    let status = match record.status {
        StageStatus::Skipped => return format!("{:<20} skipped", record.stage.as_str()),
        StageStatus::Completed => "completed",
        StageStatus::Degraded => "degraded",
        StageStatus::Failed => "FAILED",
    };
    let mut line = format!(
        "{:<20} {} in {}ms",
        record.stage.as_str(),
        status,
        record.duration_ms
    );
    if let Some(detail) = &record.detail {
        line.push_str(&format!(" ({})", detail));
    }
    line
}

fn describe_index(action: &IndexAction) -> String {
    match action {
        IndexAction::Created => "created".to_string(),
        IndexAction::Unchanged => "up to date".to_string(),
        IndexAction::Recreated { previous_fields } => {
            format!("recreated (was on {})", previous_fields.join(", "))
        }
        IndexAction::Failed { error } => format!("FAILED ({})", error),
    }
}
