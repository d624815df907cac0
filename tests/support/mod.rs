//! In-memory stand-ins for both stores and every producer.
//!
//! One `FakeWorld` plays all roles at once, so a test can arrange store state,
//! make chosen producer steps fail or panic, run the driver and then inspect
//! the resulting state and the ordered log of write calls.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use foodsync::pipeline::stages::catalogue_prefix_scope;
use foodsync::pipeline::{
    recipe_text_index, Artifact, FailurePolicy, Location, PipelineDriver, StageContext,
};
use foodsync::producers::{
    IngredientEnricher, IngredientLinker, NutritionProducer, PrefixScope, Producers,
    RecipeScraper, Records, SchemaProducer, SeasonalCalendar, SeasonalProducer, TabularProducer,
};
use foodsync::progress::{ProgressEvent, ProgressHandler};
use foodsync::store::{
    DocumentStore, IndexDescriptor, IndexField, RelationalStore, StoreError, TableState,
};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub const SCHEMA_INIT: &str = "schema.init";
pub const NUTRITION_EXTRACT: &str = "nutrition.extract";
pub const NUTRITION_LOAD: &str = "nutrition.load";
pub const TABULAR_FULL: &str = "tabular.full";
pub const TABULAR_PREFIX: &str = "tabular.prefix";
pub const SEASONAL_SCRAPE: &str = "seasonal.scrape";
pub const SEASONAL_PERSIST: &str = "seasonal.persist";
pub const RECIPES_SCRAPE: &str = "recipes.scrape";
pub const ENRICH_EXTRACT: &str = "enrich.extract";
pub const ENRICH_UPSERT: &str = "enrich.upsert";
pub const ENRICH_WRITE_BACK: &str = "enrich.write_back";
pub const ENRICH_DURATIONS: &str = "enrich.durations";
pub const LINKS_CREATE: &str = "links.create";
pub const LINKS_POPULATE: &str = "links.populate";
pub const INDEX_CREATE: &str = "index.create";
pub const INDEX_DROP: &str = "index.drop";

pub const CATALOGUE_PATH: &str = "data/fr.openfoodfacts.org.products.csv";

pub struct WorldState {
    /// Row count per existing table; a missing key is a missing table.
    pub tables: BTreeMap<String, u64>,
    pub recipes: u64,
    pub parsed_recipes: u64,
    pub indexes: Vec<IndexDescriptor>,

    /// Every producer and index write, in call order.
    pub calls: Vec<&'static str>,
    pub mutations: usize,
    pub prefix_scopes: Vec<PrefixScope>,

    pub failing: BTreeSet<&'static str>,
    pub panicking: BTreeSet<&'static str>,
    pub relational_down: bool,
    pub documents_down: bool,

    pub nutrition_rows: usize,
    pub scraped_recipes: u64,
    pub extracted_ingredients: usize,
    pub upsert_rows: u64,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
            recipes: 0,
            parsed_recipes: 0,
            indexes: Vec::new(),
            calls: Vec::new(),
            mutations: 0,
            prefix_scopes: Vec::new(),
            failing: BTreeSet::new(),
            panicking: BTreeSet::new(),
            relational_down: false,
            documents_down: false,
            nutrition_rows: 3,
            scraped_recipes: 5,
            extracted_ingredients: 4,
            upsert_rows: 4,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeWorld {
    state: Arc<Mutex<WorldState>>,
}

impl FakeWorld {
    /// Both stores empty: no tables, no recipes, no index.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every artifact present, recipes parsed and the text index in place.
    pub fn complete() -> Self {
        let world = Self::default();
        {
            let mut state = world.state();
            for artifact in Artifact::ALL {
                if let Location::Table(table) = artifact.location() {
                    state.tables.insert(table.to_string(), 10);
                }
            }
            state.recipes = 5;
            state.parsed_recipes = 5;
            state.indexes.push(recipe_text_index());
        }
        world
    }

    pub fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap()
    }

    pub fn without(self, artifact: Artifact) -> Self {
        {
            let mut state = self.state();
            match artifact.location() {
                Location::Table(table) => {
                    state.tables.remove(table);
                }
                Location::RecipeCollection => {
                    state.recipes = 0;
                    state.parsed_recipes = 0;
                }
                Location::ParsedRecipePredicate => state.parsed_recipes = 0,
            }
        }
        self
    }

    pub fn failing(self, step: &'static str) -> Self {
        self.state().failing.insert(step);
        self
    }

    pub fn panicking(self, step: &'static str) -> Self {
        self.state().panicking.insert(step);
        self
    }

    pub fn with_nutrition_rows(self, rows: usize) -> Self {
        self.state().nutrition_rows = rows;
        self
    }

    pub fn with_upsert_rows(self, rows: u64) -> Self {
        self.state().upsert_rows = rows;
        self
    }

    pub fn with_extracted_ingredients(self, count: usize) -> Self {
        self.state().extracted_ingredients = count;
        self
    }

    pub fn with_indexes(self, indexes: Vec<IndexDescriptor>) -> Self {
        self.state().indexes = indexes;
        self
    }

    pub fn documents_down(self) -> Self {
        self.state().documents_down = true;
        self
    }

    pub fn relational_down(self) -> Self {
        self.state().relational_down = true;
        self
    }

    pub fn rows(&self, table: &str) -> Option<u64> {
        self.state().tables.get(table).copied()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, step: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == step).count()
    }

    pub fn mutations(&self) -> usize {
        self.state().mutations
    }

    pub fn clear_log(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.prefix_scopes.clear();
    }

    pub fn producers(&self) -> Producers {
        let shared = Arc::new(self.clone());
        Producers {
            schema: shared.clone(),
            nutrition: shared.clone(),
            tabular: shared.clone(),
            seasonal: shared.clone(),
            recipes: shared.clone(),
            enricher: shared.clone(),
            linker: shared,
        }
    }

    pub fn driver(&self, seasonal_policy: FailurePolicy) -> PipelineDriver {
        let context = StageContext::new(
            self.producers(),
            catalogue_prefix_scope(Path::new(CATALOGUE_PATH), 50),
        );
        PipelineDriver::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            context,
            seasonal_policy,
        )
    }

    /// Logs the call, then fails or panics if the step was told to.
    fn enter(&self, step: &'static str) -> Result<MutexGuard<'_, WorldState>> {
        let mut state = self.state();
        state.calls.push(step);
        if state.panicking.contains(step) {
            drop(state);
            panic!("{} exploded", step);
        }
        if state.failing.contains(step) {
            bail!("{} failed", step);
        }
        Ok(state)
    }
}

fn add_rows(state: &mut WorldState, table: &str, rows: u64) {
    *state.tables.entry(table.to_string()).or_insert(0) += rows;
    state.mutations += 1;
}

fn records(count: usize, key: &str) -> Records {
    Records(
        (0..count)
            .map(|i| {
                let mut row = Map::new();
                row.insert(key.to_string(), Value::String(format!("{}-{}", key, i)));
                row
            })
            .collect(),
    )
}

#[async_trait]
impl RelationalStore for FakeWorld {
    async fn inspect_table(&self, table: &str) -> Result<TableState, StoreError> {
        let state = self.state();
        if state.relational_down {
            return Err(StoreError::InvalidIdentifier(format!(
                "{} (connection refused)",
                table
            )));
        }
        Ok(match state.tables.get(table) {
            None => TableState::Missing,
            Some(0) => TableState::Empty,
            Some(_) => TableState::Populated,
        })
    }
}

#[async_trait]
impl DocumentStore for FakeWorld {
    async fn has_recipes(&self) -> Result<bool, StoreError> {
        let state = self.state();
        if state.documents_down {
            return Err(StoreError::InvalidIndex("server selection timeout".to_string()));
        }
        Ok(state.recipes > 0)
    }

    async fn has_parsed_recipes(&self) -> Result<bool, StoreError> {
        let state = self.state();
        if state.documents_down {
            return Err(StoreError::InvalidIndex("server selection timeout".to_string()));
        }
        Ok(state.parsed_recipes > 0)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>, StoreError> {
        let state = self.state();
        if state.documents_down {
            return Err(StoreError::InvalidIndex("server selection timeout".to_string()));
        }
        Ok(state.indexes.clone())
    }

    async fn create_index(&self, index: &IndexDescriptor) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.push(INDEX_CREATE);
        if state.failing.contains(INDEX_CREATE) {
            return Err(StoreError::InvalidIndex(format!("{} rejected", index.name)));
        }
        state.indexes.push(index.clone());
        state.mutations += 1;
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.push(INDEX_DROP);
        state.indexes.retain(|i| i.name != name);
        state.mutations += 1;
        Ok(())
    }
}

#[async_trait]
impl SchemaProducer for FakeWorld {
    async fn init_schema(&self) -> Result<()> {
        let mut state = self.enter(SCHEMA_INIT)?;
        for artifact in Artifact::ALL {
            if let Location::Table(table) = artifact.location() {
                state.tables.entry(table.to_string()).or_insert(0);
            }
        }
        // Schema scripts seed the reference users and base products.
        for (table, seed) in [("users", 1), ("product_vector", 10)] {
            let rows = state.tables.entry(table.to_string()).or_insert(0);
            if *rows == 0 {
                *rows = seed;
            }
        }
        state.mutations += 1;
        Ok(())
    }
}

#[async_trait]
impl NutritionProducer for FakeWorld {
    async fn extract(&self) -> Result<Records> {
        let state = self.enter(NUTRITION_EXTRACT)?;
        Ok(records(state.nutrition_rows, "food_code"))
    }

    async fn load(&self, rows: &Records) -> Result<()> {
        let mut state = self.enter(NUTRITION_LOAD)?;
        add_rows(&mut state, "agribalyse", rows.len() as u64);
        Ok(())
    }
}

#[async_trait]
impl TabularProducer for FakeWorld {
    async fn run_full_pipeline(&self) -> Result<()> {
        let mut state = self.enter(TABULAR_FULL)?;
        add_rows(&mut state, "openfoodfacts", 1_000);
        Ok(())
    }

    async fn load_prefix(&self, scope: &PrefixScope) -> Result<()> {
        {
            let mut state = self.state();
            state.prefix_scopes.push(scope.clone());
        }
        let mut state = self.enter(TABULAR_PREFIX)?;
        add_rows(&mut state, "openfoodfacts", scope.chunk_size as u64);
        Ok(())
    }
}

#[async_trait]
impl SeasonalProducer for FakeWorld {
    async fn scrape(&self) -> Result<SeasonalCalendar> {
        let _state = self.enter(SEASONAL_SCRAPE)?;
        Ok(SeasonalCalendar(json!({
            "tomate": ["juin", "juillet", "août"],
            "poireau": ["octobre", "novembre"],
        })))
    }

    async fn persist(&self, _calendar: &SeasonalCalendar) -> Result<()> {
        let mut state = self.enter(SEASONAL_PERSIST)?;
        add_rows(&mut state, "greenpeace_season", 12);
        Ok(())
    }
}

#[async_trait]
impl RecipeScraper for FakeWorld {
    async fn scrape_all(&self) -> Result<()> {
        let mut state = self.enter(RECIPES_SCRAPE)?;
        let scraped = state.scraped_recipes;
        state.recipes += scraped;
        state.mutations += 1;
        Ok(())
    }
}

#[async_trait]
impl IngredientEnricher for FakeWorld {
    async fn extract_distinct_ingredients(&self) -> Result<Records> {
        let state = self.enter(ENRICH_EXTRACT)?;
        Ok(records(state.extracted_ingredients, "ingredient"))
    }

    async fn upsert_ingredients(&self, _ingredients: &Records) -> Result<u64> {
        let mut state = self.enter(ENRICH_UPSERT)?;
        let rows = state.upsert_rows;
        if rows > 0 {
            add_rows(&mut state, "product_vector", rows);
        }
        Ok(rows)
    }

    async fn write_back_parsed_ingredients(&self) -> Result<()> {
        let mut state = self.enter(ENRICH_WRITE_BACK)?;
        let recipes = state.recipes;
        state.parsed_recipes = recipes;
        state.mutations += 1;
        Ok(())
    }

    async fn normalize_durations(&self) -> Result<()> {
        let mut state = self.enter(ENRICH_DURATIONS)?;
        state.mutations += 1;
        Ok(())
    }
}

#[async_trait]
impl IngredientLinker for FakeWorld {
    async fn create_schema(&self) -> Result<()> {
        let mut state = self.enter(LINKS_CREATE)?;
        state.tables.insert("ingredient_link".to_string(), 0);
        state.mutations += 1;
        Ok(())
    }

    async fn populate(&self) -> Result<()> {
        let mut state = self.enter(LINKS_POPULATE)?;
        let products = state.tables.get("product_vector").copied().unwrap_or(0);
        add_rows(&mut state, "ingredient_link", products);
        Ok(())
    }
}

/// Keeps every progress event for later assertions.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn text_index(name: &str, fields: &[&str]) -> IndexDescriptor {
    IndexDescriptor::new(name, fields.iter().map(|f| IndexField::text(f)).collect())
}
