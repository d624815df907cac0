use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{Stage, StageId, StageOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

pub struct NutritionStage;

impl NutritionStage {
    async fn extract_and_load(&self, context: &StageContext) -> Result<StageOutcome> {
        let producer = &context.producers.nutrition;
        let rows = producer
            .extract()
            .await
            .context("failed to extract nutrition reference data")?;

        if rows.is_empty() {
            warn!("Nutrition extraction returned no rows, nothing to load");
            return Ok(StageOutcome::completed(Vec::new()));
        }

        info!(rows = rows.len(), "Loading nutrition reference data");
        producer
            .load(&rows)
            .await
            .context("failed to load nutrition reference data")?;

        Ok(StageOutcome::completed(vec![Artifact::Nutrition]))
    }
}

#[async_trait]
impl Stage for NutritionStage {
    fn id(&self) -> StageId {
        StageId::Nutrition
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::Nutrition)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        self.extract_and_load(context)
            .await
            .unwrap_or_else(StageOutcome::failed)
    }
}
