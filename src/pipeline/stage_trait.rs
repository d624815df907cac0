use super::artifact::Artifact;
use super::context::{RunPlan, StageContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    SchemaInit,
    Nutrition,
    TabularCatalogue,
    SeasonalCalendar,
    RecipeScrape,
    RecipeEnrichment,
    IngredientLinks,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::SchemaInit => "schema_init",
            StageId::Nutrition => "nutrition",
            StageId::TabularCatalogue => "tabular_catalogue",
            StageId::SeasonalCalendar => "seasonal_calendar",
            StageId::RecipeScrape => "recipe_scrape",
            StageId::RecipeEnrichment => "recipe_enrichment",
            StageId::IngredientLinks => "ingredient_links",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the driver does after a stage reports `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Continue,
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Continue => f.write_str("continue"),
            FailurePolicy::Abort => f.write_str("abort"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "unknown failure policy '{}', expected 'abort' or 'continue'",
                other
            )),
        }
    }
}

#[derive(Debug)]
pub enum StageOutcome {
    Completed {
        changed: Vec<Artifact>,
    },
    /// Partial success: some data was written but not all of it.
    Degraded {
        changed: Vec<Artifact>,
        reason: String,
    },
    Failed {
        error: anyhow::Error,
    },
}

impl StageOutcome {
    pub fn completed(changed: Vec<Artifact>) -> Self {
        StageOutcome::Completed { changed }
    }

    pub fn failed(error: impl Into<anyhow::Error>) -> Self {
        StageOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn changed(&self) -> &[Artifact] {
        match self {
            StageOutcome::Completed { changed } | StageOutcome::Degraded { changed, .. } => changed,
            StageOutcome::Failed { .. } => &[],
        }
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Continue
    }

    /// Evaluated against the live plan, after earlier stages have reported.
    fn should_run(&self, plan: &RunPlan) -> bool;

    /// Producer errors must come back as `Failed`, never as a panic.
    async fn execute(&self, context: &StageContext) -> StageOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!(" Continue ".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        let err = "retry".parse::<FailurePolicy>().unwrap_err();
        assert!(err.contains("retry"));
    }

    #[test]
    fn test_failure_policy_display_round_trips() {
        for policy in [FailurePolicy::Abort, FailurePolicy::Continue] {
            assert_eq!(policy.to_string().parse::<FailurePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_failed_outcome_changes_nothing() {
        let outcome = StageOutcome::failed(anyhow::anyhow!("boom"));
        assert!(outcome.changed().is_empty());

        let outcome = StageOutcome::completed(vec![Artifact::Recipes]);
        assert_eq!(outcome.changed(), &[Artifact::Recipes]);
    }

    #[test]
    fn test_stage_id_serializes_snake_case() {
        let json = serde_json::to_string(&StageId::RecipeEnrichment).unwrap();
        assert_eq!(json, "\"recipe_enrichment\"");
        assert_eq!(StageId::IngredientLinks.to_string(), "ingredient_links");
    }
}
