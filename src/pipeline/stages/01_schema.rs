use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{Stage, StageId, StageOutcome};
use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

/// Creates tables and extensions the relational loaders rely on.
pub struct SchemaInitStage;

#[async_trait]
impl Stage for SchemaInitStage {
    fn id(&self) -> StageId {
        StageId::SchemaInit
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::ProductVector) || plan.needs(Artifact::Users)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        info!("Initializing relational schema");
        match context
            .producers
            .schema
            .init_schema()
            .await
            .context("schema initialization failed")
        {
            // Schema creation alone does not populate anything.
            Ok(()) => StageOutcome::completed(Vec::new()),
            Err(e) => StageOutcome::failed(e),
        }
    }
}
