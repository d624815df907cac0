use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{Stage, StageId, StageOutcome};
use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{error, info};

/// Parses recipe ingredients, feeds new ones into `product_vector` and
/// writes the parsed details back onto the recipes.
///
/// Steps are attempted independently; only the upsert depends on the
/// extraction. Any failing step degrades the stage, all of them failing
/// fails it.
pub struct RecipeEnrichmentStage;

#[derive(Default)]
struct StepLog {
    attempted: usize,
    failures: Vec<String>,
}

impl StepLog {
    fn record<T>(&mut self, step: &str, result: anyhow::Result<T>) -> Option<T> {
        self.attempted += 1;
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let message = format!("{}: {:#}", step, e);
                error!(step, error = %format!("{:#}", e), "Enrichment step failed");
                self.failures.push(message);
                None
            }
        }
    }
}

#[async_trait]
impl Stage for RecipeEnrichmentStage {
    fn id(&self) -> StageId {
        StageId::RecipeEnrichment
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::ParsedRecipes) && plan.is_available(Artifact::Recipes)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        let enricher = &context.producers.enricher;
        let mut steps = StepLog::default();
        let mut changed = Vec::new();

        let extracted = steps.record(
            "extract distinct ingredients",
            enricher.extract_distinct_ingredients().await,
        );
        match extracted {
            Some(ingredients) if ingredients.is_empty() => {
                info!("No new ingredients found in recipes, skipping product_vector upsert");
            }
            Some(ingredients) => {
                info!(ingredients = ingredients.len(), "Upserting recipe ingredients");
                let upserted = steps.record(
                    "upsert ingredients",
                    enricher.upsert_ingredients(&ingredients).await,
                );
                match upserted {
                    Some(0) => info!("product_vector unchanged by ingredient upsert"),
                    Some(rows) => {
                        info!(rows, "product_vector rows inserted or updated");
                        changed.push(Artifact::ProductVector);
                    }
                    None => {}
                }
            }
            None => {}
        }

        if steps
            .record(
                "write back parsed ingredients",
                enricher.write_back_parsed_ingredients().await,
            )
            .is_some()
        {
            info!("Parsed ingredient details written back to recipes");
            changed.push(Artifact::ParsedRecipes);
        }

        if steps
            .record("normalize durations", enricher.normalize_durations().await)
            .is_some()
        {
            info!("Recipe durations normalized");
        }

        if steps.failures.is_empty() {
            StageOutcome::completed(changed)
        } else if steps.failures.len() == steps.attempted {
            StageOutcome::failed(anyhow!(steps.failures.join("; ")))
        } else {
            StageOutcome::Degraded {
                changed,
                reason: steps.failures.join("; "),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::probe::PresenceSnapshot;
    use crate::pipeline::resolver::NeedSet;

    fn plan(present: &[Artifact]) -> RunPlan {
        let snapshot = PresenceSnapshot::from_present(present.iter().copied());
        let needs = NeedSet::from_snapshot(&snapshot);
        RunPlan::new(snapshot, needs)
    }

    #[test]
    fn test_skipped_without_recipes() {
        assert!(!RecipeEnrichmentStage.should_run(&plan(&[])));
    }

    #[test]
    fn test_runs_after_scrape_in_same_run() {
        let mut plan = plan(&[]);
        plan.record_changes(&[Artifact::Recipes]);
        assert!(RecipeEnrichmentStage.should_run(&plan));
    }

    #[test]
    fn test_runs_for_existing_unparsed_recipes() {
        assert!(RecipeEnrichmentStage.should_run(&plan(&[Artifact::Recipes])));
        assert!(!RecipeEnrichmentStage
            .should_run(&plan(&[Artifact::Recipes, Artifact::ParsedRecipes])));
    }

    #[test]
    fn test_step_log_counts_failures() {
        let mut steps = StepLog::default();
        assert_eq!(steps.record("ok", Ok::<_, anyhow::Error>(3)), Some(3));
        assert_eq!(steps.record::<()>("bad", Err(anyhow!("boom"))), None);
        assert_eq!(steps.attempted, 2);
        assert_eq!(steps.failures, vec!["bad: boom".to_string()]);
    }
}
