use crate::pipeline::artifact::Artifact;
use crate::pipeline::context::{RunPlan, StageContext};
use crate::pipeline::stage_trait::{Stage, StageId, StageOutcome};
use crate::producers::PrefixScope;
use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info};

/// Columns kept when only the first chunk of the catalogue can be loaded.
pub const CATALOGUE_COLUMNS: [&str; 35] = [
    "code",
    "product_name",
    "generic_name",
    "brands",
    "categories",
    "labels_tags",
    "origins_tags",
    "packaging_tags",
    "countries_tags",
    "image_url",
    "energy-kcal_100g",
    "fat_100g",
    "saturated-fat_100g",
    "carbohydrates_100g",
    "sugars_100g",
    "fiber_100g",
    "proteins_100g",
    "salt_100g",
    "sodium_100g",
    "vitamin-c_100g",
    "vitamin-b12_100g",
    "vitamin-d_100g",
    "iron_100g",
    "calcium_100g",
    "nutriscore_score",
    "nutriscore_grade",
    "nova_group",
    "environmental_score_score",
    "environmental_score_grade",
    "ingredients_text",
    "ingredients_analysis_tags",
    "additives_tags",
    "allergens",
    "serving_size",
    "serving_quantity",
];

pub fn catalogue_prefix_scope(path: &Path, chunk_size: usize) -> PrefixScope {
    PrefixScope {
        path: path.to_path_buf(),
        columns: CATALOGUE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        chunk_size,
        delimiter: '\t',
    }
}

/// Loads the product catalogue, falling back to a single narrowed chunk
/// when the full pipeline fails. The fallback is tried exactly once.
pub struct TabularCatalogueStage;

#[async_trait]
impl Stage for TabularCatalogueStage {
    fn id(&self) -> StageId {
        StageId::TabularCatalogue
    }

    fn should_run(&self, plan: &RunPlan) -> bool {
        plan.needs(Artifact::TabularCatalogue)
    }

    async fn execute(&self, context: &StageContext) -> StageOutcome {
        let producer = &context.producers.tabular;

        let primary = match producer.run_full_pipeline().await {
            Ok(()) => {
                info!("Full catalogue loaded");
                return StageOutcome::completed(vec![Artifact::TabularCatalogue]);
            }
            Err(e) => e,
        };

        error!(
            error = %format!("{:#}", primary),
            "Full catalogue pipeline failed, falling back to first chunk"
        );

        let scope = &context.fallback_scope;
        info!(
            path = %scope.path.display(),
            chunk_size = scope.chunk_size,
            columns = scope.columns.len(),
            "Loading catalogue prefix"
        );

        match producer.load_prefix(scope).await {
            Ok(()) => StageOutcome::Degraded {
                changed: vec![Artifact::TabularCatalogue],
                reason: format!(
                    "full pipeline failed ({:#}); loaded first {} records only",
                    primary, scope.chunk_size
                ),
            },
            Err(fallback) => StageOutcome::failed(fallback.context(format!(
                "catalogue fallback failed after full pipeline error ({:#})",
                primary
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_scope_uses_allowlist() {
        let scope = catalogue_prefix_scope(Path::new("data/products.csv"), 50);

        assert_eq!(scope.chunk_size, 50);
        assert_eq!(scope.delimiter, '\t');
        assert_eq!(scope.columns.len(), 35);
        assert_eq!(scope.columns.first().map(String::as_str), Some("code"));
        assert!(scope.columns.iter().any(|c| c == "nutriscore_grade"));
    }

    #[test]
    fn test_allowlist_has_no_duplicates() {
        let unique: std::collections::BTreeSet<_> = CATALOGUE_COLUMNS.iter().collect();
        assert_eq!(unique.len(), CATALOGUE_COLUMNS.len());
    }
}
