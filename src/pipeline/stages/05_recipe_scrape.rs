use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{Stage, StageId, StageOutcome};
use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

pub struct RecipeScrapeStage;

#[async_trait]
impl Stage for RecipeScrapeStage {
    fn id(&self) -> StageId {
        StageId::RecipeScrape
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::Recipes)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        info!("Recipe collection empty, scraping recipe sites");
        match context
            .producers
            .recipes
            .scrape_all()
            .await
            .context("recipe scrape failed")
        {
            Ok(()) => StageOutcome::completed(vec![Artifact::Recipes]),
            Err(e) => StageOutcome::failed(e),
        }
    }
}
