// Ingestion stages, in execution order.
//
// Each stage decides from the live run plan whether it has work to do and
// reports which artifacts it changed. Ordering lives in `default_stages`.

#[path = "01_schema.rs"]
pub mod schema;
#[path = "02_nutrition.rs"]
pub mod nutrition;
#[path = "03_catalogue.rs"]
pub mod catalogue;
#[path = "04_seasonal.rs"]
pub mod seasonal;
#[path = "05_recipe_scrape.rs"]
pub mod recipe_scrape;
#[path = "06_enrichment.rs"]
pub mod enrichment;
#[path = "07_ingredient_links.rs"]
pub mod ingredient_links;

pub use catalogue::{catalogue_prefix_scope, TabularCatalogueStage, CATALOGUE_COLUMNS};
pub use enrichment::RecipeEnrichmentStage;
pub use ingredient_links::IngredientLinksStage;
pub use nutrition::NutritionStage;
pub use recipe_scrape::RecipeScrapeStage;
pub use schema::SchemaInitStage;
pub use seasonal::SeasonalCalendarStage;

use super::stage_trait::{FailurePolicy, Stage};

/// Enrichment must follow the scrape, and links must follow enrichment so
/// they see a settled `product_vector`.
pub fn default_stages(seasonal_policy: FailurePolicy) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(SchemaInitStage),
        Box::new(NutritionStage),
        Box::new(TabularCatalogueStage),
        Box::new(SeasonalCalendarStage::new(seasonal_policy)),
        Box::new(RecipeScrapeStage),
        Box::new(RecipeEnrichmentStage),
        Box::new(IngredientLinksStage),
    ]
}
