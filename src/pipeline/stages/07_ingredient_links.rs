use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{Stage, StageId, StageOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

/// Rebuilds the ingredient-to-product link relation from scratch.
pub struct IngredientLinksStage;

impl IngredientLinksStage {
    async fn rebuild(&self, context: &StageContext) -> Result<()> {
        let linker = &context.producers.linker;
        linker
            .create_schema()
            .await
            .context("failed to recreate ingredient link schema")?;
        linker
            .populate()
            .await
            .context("failed to populate ingredient links")?;
        Ok(())
    }
}

#[async_trait]
impl Stage for IngredientLinksStage {
    fn id(&self) -> StageId {
        StageId::IngredientLinks
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::IngredientLink)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        info!("Rebuilding ingredient links");
        match self.rebuild(context).await {
            Ok(()) => StageOutcome::completed(vec![Artifact::IngredientLink]),
            Err(e) => StageOutcome::failed(e),
        }
    }
}
