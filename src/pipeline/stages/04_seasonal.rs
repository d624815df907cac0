use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{FailurePolicy, Stage, StageId, StageOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Scrapes the produce seasonality calendar and persists it. Its failure
/// policy is configurable; with `Abort` a failure ends the run.
pub struct SeasonalCalendarStage {
    policy: FailurePolicy,
}

impl SeasonalCalendarStage {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    async fn scrape_and_persist(&self, context: &StageContext) -> Result<StageOutcome> {
        let producer = &context.producers.seasonal;
        let calendar = producer
            .scrape()
            .await
            .context("failed to scrape seasonal calendar")?;

        let entries = match &calendar.0 {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        };
        info!(entries, "Persisting seasonal calendar");

        producer
            .persist(&calendar)
            .await
            .context("failed to persist seasonal calendar")?;

        Ok(StageOutcome::completed(vec![Artifact::SeasonalCalendar]))
    }
}

#[async_trait]
impl Stage for SeasonalCalendarStage {
    fn id(&self) -> StageId {
        StageId::SeasonalCalendar
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::SeasonalCalendar)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        self.scrape_and_persist(context)
            .await
            .unwrap_or_else(StageOutcome::failed)
    }
}
