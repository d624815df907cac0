use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an artifact's presence is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A relational table, present when it exists and holds at least one row.
    Table(&'static str),
    /// The recipe collection, present when it holds at least one document.
    RecipeCollection,
    /// At least one recipe carries a non-empty `parsed_ingredients_details`.
    ParsedRecipePredicate,
}

/// A named dataset whose presence the orchestrator tracks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Nutrition,
    ProductVector,
    TabularCatalogue,
    SeasonalCalendar,
    Users,
    IngredientLink,
    Recipes,
    ParsedRecipes,
}

impl Artifact {
    pub const ALL: [Artifact; 8] = [
        Artifact::Nutrition,
        Artifact::ProductVector,
        Artifact::TabularCatalogue,
        Artifact::SeasonalCalendar,
        Artifact::Users,
        Artifact::IngredientLink,
        Artifact::Recipes,
        Artifact::ParsedRecipes,
    ];

    pub fn location(self) -> Location {
        match self {
            Artifact::Nutrition => Location::Table("agribalyse"),
            Artifact::ProductVector => Location::Table("product_vector"),
            Artifact::TabularCatalogue => Location::Table("openfoodfacts"),
            Artifact::SeasonalCalendar => Location::Table("greenpeace_season"),
            Artifact::Users => Location::Table("users"),
            Artifact::IngredientLink => Location::Table("ingredient_link"),
            Artifact::Recipes => Location::RecipeCollection,
            Artifact::ParsedRecipes => Location::ParsedRecipePredicate,
        }
    }

    /// Artifacts derived from this one. A change to `self` during a run
    /// forces every dependent to be produced again in the same run.
    pub fn dependents(self) -> &'static [Artifact] {
        match self {
            Artifact::ProductVector => &[Artifact::IngredientLink],
            Artifact::Recipes => &[Artifact::ParsedRecipes],
            _ => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Artifact::Nutrition => "nutrition",
            Artifact::ProductVector => "product_vector",
            Artifact::TabularCatalogue => "tabular_catalogue",
            Artifact::SeasonalCalendar => "seasonal_calendar",
            Artifact::Users => "users",
            Artifact::IngredientLink => "ingredient_link",
            Artifact::Recipes => "recipes",
            Artifact::ParsedRecipes => "parsed_recipes",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
