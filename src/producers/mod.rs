//! Producer contracts
//!
//! Producers do the actual work behind each stage: scraping, file ETL,
//! ingredient parsing. The orchestrator only decides when to call them and
//! what to do when they fail.

pub mod command;

pub use command::{CommandProducers, CommandSpec, ProducerCommands, ProducerError, ProducerStep};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Tabular payload exchanged with producers: one JSON object per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Records(pub Vec<Map<String, Value>>);

impl Records {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Structured output of the seasonal-calendar scrape, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonalCalendar(pub Value);

/// Narrowed scope for the tabular fallback: the first `chunk_size` records of
/// `path`, restricted to `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixScope {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub chunk_size: usize,
    pub delimiter: char,
}

#[async_trait]
pub trait SchemaProducer: Send + Sync {
    /// Creates the required tables and extensions.
    async fn init_schema(&self) -> Result<()>;
}

#[async_trait]
pub trait NutritionProducer: Send + Sync {
    async fn extract(&self) -> Result<Records>;

    async fn load(&self, rows: &Records) -> Result<()>;
}

#[async_trait]
pub trait TabularProducer: Send + Sync {
    /// Streams the whole source file in one call.
    async fn run_full_pipeline(&self) -> Result<()>;

    async fn load_prefix(&self, scope: &PrefixScope) -> Result<()>;
}

#[async_trait]
pub trait SeasonalProducer: Send + Sync {
    async fn scrape(&self) -> Result<SeasonalCalendar>;

    async fn persist(&self, calendar: &SeasonalCalendar) -> Result<()>;
}

#[async_trait]
pub trait RecipeScraper: Send + Sync {
    /// Writes scraped recipes straight into the document store.
    async fn scrape_all(&self) -> Result<()>;
}

#[async_trait]
pub trait IngredientEnricher: Send + Sync {
    /// Distinct ingredient names referenced by recipes that lack enrichment.
    async fn extract_distinct_ingredients(&self) -> Result<Records>;

    /// Returns the number of `product_vector` rows inserted or updated.
    async fn upsert_ingredients(&self, ingredients: &Records) -> Result<u64>;

    async fn write_back_parsed_ingredients(&self) -> Result<()>;

    /// Must leave already-numeric durations untouched.
    async fn normalize_durations(&self) -> Result<()>;
}

#[async_trait]
pub trait IngredientLinker: Send + Sync {
    /// Drops and recreates the link relation.
    async fn create_schema(&self) -> Result<()>;

    async fn populate(&self) -> Result<()>;
}

/// The full set of producers a run may call, one per stage concern.
#[derive(Clone)]
pub struct Producers {
    pub schema: Arc<dyn SchemaProducer>,
    pub nutrition: Arc<dyn NutritionProducer>,
    pub tabular: Arc<dyn TabularProducer>,
    pub seasonal: Arc<dyn SeasonalProducer>,
    pub recipes: Arc<dyn RecipeScraper>,
    pub enricher: Arc<dyn IngredientEnricher>,
    pub linker: Arc<dyn IngredientLinker>,
}

impl Producers {
    pub fn from_commands(commands: CommandProducers) -> Self {
        let shared = Arc::new(commands);
        Self {
            schema: shared.clone(),
            nutrition: shared.clone(),
            tabular: shared.clone(),
            seasonal: shared.clone(),
            recipes: shared.clone(),
            enricher: shared.clone(),
            linker: shared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_round_trip_as_plain_array() {
        let records: Records =
            serde_json::from_str(r#"[{"name": "tomate"}, {"name": "basilic"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.0[1]["name"], "basilic");

        let json = serde_json::to_string(&records).unwrap();
        assert!(json.starts_with('['));
    }

    #[test]
    fn test_empty_records() {
        let records: Records = serde_json::from_str("[]").unwrap();
        assert!(records.is_empty());
    }
}
