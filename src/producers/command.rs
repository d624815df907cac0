//! Producers backed by external commands
//!
//! Each producer step maps to a command declared in the producers file:
//!
//! ```toml
//! working_dir = "."
//!
//! [producers.schema_init]
//! program = "python"
//! args = ["-m", "processing.init_pgvector_tables"]
//!
//! [producers.ingredients_upsert]
//! program = "python"
//! args = ["-m", "processing.clean_marmiton_ingredients", "upsert"]
//! env = { BATCH_SIZE = "500" }
//! ```
//!
//! Payloads travel as JSON: producer output on stdout, producer input on
//! stdin. A non-zero exit status is a failure carrying the tail of stderr.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{
    IngredientEnricher, IngredientLinker, NutritionProducer, PrefixScope, Records, RecipeScraper,
    SchemaProducer, SeasonalCalendar, SeasonalProducer, TabularProducer,
};

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerStep {
    SchemaInit,
    NutritionExtract,
    NutritionLoad,
    TabularPipeline,
    TabularPrefix,
    SeasonalScrape,
    SeasonalPersist,
    RecipeScrape,
    IngredientsExtract,
    IngredientsUpsert,
    IngredientsWriteBack,
    DurationsNormalize,
    LinksCreate,
    LinksPopulate,
}

impl ProducerStep {
    pub const ALL: [ProducerStep; 14] = [
        ProducerStep::SchemaInit,
        ProducerStep::NutritionExtract,
        ProducerStep::NutritionLoad,
        ProducerStep::TabularPipeline,
        ProducerStep::TabularPrefix,
        ProducerStep::SeasonalScrape,
        ProducerStep::SeasonalPersist,
        ProducerStep::RecipeScrape,
        ProducerStep::IngredientsExtract,
        ProducerStep::IngredientsUpsert,
        ProducerStep::IngredientsWriteBack,
        ProducerStep::DurationsNormalize,
        ProducerStep::LinksCreate,
        ProducerStep::LinksPopulate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProducerStep::SchemaInit => "schema_init",
            ProducerStep::NutritionExtract => "nutrition_extract",
            ProducerStep::NutritionLoad => "nutrition_load",
            ProducerStep::TabularPipeline => "tabular_pipeline",
            ProducerStep::TabularPrefix => "tabular_prefix",
            ProducerStep::SeasonalScrape => "seasonal_scrape",
            ProducerStep::SeasonalPersist => "seasonal_persist",
            ProducerStep::RecipeScrape => "recipe_scrape",
            ProducerStep::IngredientsExtract => "ingredients_extract",
            ProducerStep::IngredientsUpsert => "ingredients_upsert",
            ProducerStep::IngredientsWriteBack => "ingredients_write_back",
            ProducerStep::DurationsNormalize => "durations_normalize",
            ProducerStep::LinksCreate => "links_create",
            ProducerStep::LinksPopulate => "links_populate",
        }
    }
}

impl fmt::Display for ProducerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("producer {0} is not configured")]
    NotConfigured(ProducerStep),

    #[error("failed to read producers file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid producers file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to spawn producer {step} ({program}): {source}")]
    Spawn {
        step: ProducerStep,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("producer {step} I/O failed: {source}")]
    Io {
        step: ProducerStep,
        #[source]
        source: io::Error,
    },

    #[error("producer {step} exited with {status}: {stderr}")]
    Failed {
        step: ProducerStep,
        status: String,
        stderr: String,
    },

    #[error("producer {step} input could not be encoded: {source}")]
    Encode {
        step: ProducerStep,
        #[source]
        source: serde_json::Error,
    },

    #[error("producer {step} returned invalid JSON: {source}")]
    InvalidOutput {
        step: ProducerStep,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerCommands {
    pub schema_init: Option<CommandSpec>,
    pub nutrition_extract: Option<CommandSpec>,
    pub nutrition_load: Option<CommandSpec>,
    pub tabular_pipeline: Option<CommandSpec>,
    pub tabular_prefix: Option<CommandSpec>,
    pub seasonal_scrape: Option<CommandSpec>,
    pub seasonal_persist: Option<CommandSpec>,
    pub recipe_scrape: Option<CommandSpec>,
    pub ingredients_extract: Option<CommandSpec>,
    pub ingredients_upsert: Option<CommandSpec>,
    pub ingredients_write_back: Option<CommandSpec>,
    pub durations_normalize: Option<CommandSpec>,
    pub links_create: Option<CommandSpec>,
    pub links_populate: Option<CommandSpec>,
}

impl ProducerCommands {
    pub fn get(&self, step: ProducerStep) -> Option<&CommandSpec> {
        match step {
            ProducerStep::SchemaInit => self.schema_init.as_ref(),
            ProducerStep::NutritionExtract => self.nutrition_extract.as_ref(),
            ProducerStep::NutritionLoad => self.nutrition_load.as_ref(),
            ProducerStep::TabularPipeline => self.tabular_pipeline.as_ref(),
            ProducerStep::TabularPrefix => self.tabular_prefix.as_ref(),
            ProducerStep::SeasonalScrape => self.seasonal_scrape.as_ref(),
            ProducerStep::SeasonalPersist => self.seasonal_persist.as_ref(),
            ProducerStep::RecipeScrape => self.recipe_scrape.as_ref(),
            ProducerStep::IngredientsExtract => self.ingredients_extract.as_ref(),
            ProducerStep::IngredientsUpsert => self.ingredients_upsert.as_ref(),
            ProducerStep::IngredientsWriteBack => self.ingredients_write_back.as_ref(),
            ProducerStep::DurationsNormalize => self.durations_normalize.as_ref(),
            ProducerStep::LinksCreate => self.links_create.as_ref(),
            ProducerStep::LinksPopulate => self.links_populate.as_ref(),
        }
    }

    pub fn missing(&self) -> Vec<ProducerStep> {
        ProducerStep::ALL
            .into_iter()
            .filter(|step| self.get(*step).is_none())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProducersFile {
    working_dir: Option<PathBuf>,
    #[serde(default)]
    producers: ProducerCommands,
}

#[derive(Debug, Clone, Default)]
pub struct CommandProducers {
    commands: ProducerCommands,
    working_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct UpsertSummary {
    rows_changed: u64,
}

impl CommandProducers {
    pub fn new(commands: ProducerCommands, working_dir: Option<PathBuf>) -> Self {
        Self {
            commands,
            working_dir,
        }
    }

    /// Loads the producers file. A missing file yields an empty set, so every
    /// stage that runs will fail with [`ProducerError::NotConfigured`].
    pub fn load(path: &Path) -> Result<Self, ProducerError> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Producers file not found, no producer commands configured"
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ProducerError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Parses producers from TOML. A relative `working_dir` is resolved
    /// against the directory holding `path`.
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ProducerError> {
        let file: ProducersFile = toml::from_str(raw).map_err(|source| ProducerError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let working_dir = file.working_dir.map(|dir| {
            if dir.is_relative() {
                base.join(dir)
            } else {
                dir
            }
        });

        let missing = file.producers.missing();
        if !missing.is_empty() {
            debug!(?missing, "Some producer steps are not configured");
        }

        Ok(Self::new(file.producers, working_dir))
    }

    pub fn commands(&self) -> &ProducerCommands {
        &self.commands
    }

    async fn invoke(
        &self,
        step: ProducerStep,
        input: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ProducerError> {
        let spec = self
            .commands
            .get(step)
            .ok_or(ProducerError::NotConfigured(step))?;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(producer = %step, program = %spec.program, "Invoking producer");
        let start = Instant::now();

        let mut child = command.spawn().map_err(|source| ProducerError::Spawn {
            step,
            program: spec.program.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            match (stdin, input) {
                (Some(mut stdin), Some(bytes)) => {
                    stdin.write_all(&bytes).await?;
                    stdin.shutdown().await
                }
                _ => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|source| ProducerError::Io { step, source })?;

        if !output.status.success() {
            return Err(ProducerError::Failed {
                step,
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        // A producer may exit successfully without draining its input.
        if let Err(source) = fed {
            if source.kind() != io::ErrorKind::BrokenPipe {
                return Err(ProducerError::Io { step, source });
            }
        }

        debug!(
            producer = %step,
            duration_ms = start.elapsed().as_millis(),
            stdout_bytes = output.stdout.len(),
            "Producer finished"
        );

        Ok(output.stdout)
    }

    async fn invoke_json<T: DeserializeOwned>(
        &self,
        step: ProducerStep,
        input: Option<Vec<u8>>,
    ) -> Result<T, ProducerError> {
        let stdout = self.invoke(step, input).await?;
        parse_payload(step, &stdout)
    }
}

fn encode<T: serde::Serialize>(step: ProducerStep, payload: &T) -> Result<Vec<u8>, ProducerError> {
    serde_json::to_vec(payload).map_err(|source| ProducerError::Encode { step, source })
}

/// Accepts either a stdout that is a single JSON document, or one whose last
/// non-empty line is, so producers may log progress before the payload.
fn parse_payload<T: DeserializeOwned>(
    step: ProducerStep,
    stdout: &[u8],
) -> Result<T, ProducerError> {
    match serde_json::from_slice(stdout) {
        Ok(value) => Ok(value),
        Err(whole) => {
            let text = String::from_utf8_lossy(stdout);
            match text.lines().rev().find(|line| !line.trim().is_empty()) {
                Some(last) => serde_json::from_str(last.trim())
                    .map_err(|source| ProducerError::InvalidOutput { step, source }),
                None => Err(ProducerError::InvalidOutput {
                    step,
                    source: whole,
                }),
            }
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "(no stderr output)".to_string();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl SchemaProducer for CommandProducers {
    async fn init_schema(&self) -> Result<()> {
        self.invoke(ProducerStep::SchemaInit, None).await?;
        Ok(())
    }
}

#[async_trait]
impl NutritionProducer for CommandProducers {
    async fn extract(&self) -> Result<Records> {
        Ok(self
            .invoke_json(ProducerStep::NutritionExtract, None)
            .await?)
    }

    async fn load(&self, rows: &Records) -> Result<()> {
        let input = encode(ProducerStep::NutritionLoad, rows)?;
        self.invoke(ProducerStep::NutritionLoad, Some(input)).await?;
        Ok(())
    }
}

#[async_trait]
impl TabularProducer for CommandProducers {
    async fn run_full_pipeline(&self) -> Result<()> {
        self.invoke(ProducerStep::TabularPipeline, None).await?;
        Ok(())
    }

    async fn load_prefix(&self, scope: &PrefixScope) -> Result<()> {
        let input = encode(ProducerStep::TabularPrefix, scope)?;
        self.invoke(ProducerStep::TabularPrefix, Some(input)).await?;
        Ok(())
    }
}

#[async_trait]
impl SeasonalProducer for CommandProducers {
    async fn scrape(&self) -> Result<SeasonalCalendar> {
        Ok(self.invoke_json(ProducerStep::SeasonalScrape, None).await?)
    }

    async fn persist(&self, calendar: &SeasonalCalendar) -> Result<()> {
        let input = encode(ProducerStep::SeasonalPersist, calendar)?;
        self.invoke(ProducerStep::SeasonalPersist, Some(input)).await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeScraper for CommandProducers {
    async fn scrape_all(&self) -> Result<()> {
        self.invoke(ProducerStep::RecipeScrape, None).await?;
        Ok(())
    }
}

#[async_trait]
impl IngredientEnricher for CommandProducers {
    async fn extract_distinct_ingredients(&self) -> Result<Records> {
        Ok(self
            .invoke_json(ProducerStep::IngredientsExtract, None)
            .await?)
    }

    async fn upsert_ingredients(&self, ingredients: &Records) -> Result<u64> {
        let input = encode(ProducerStep::IngredientsUpsert, ingredients)?;
        let summary: UpsertSummary = self
            .invoke_json(ProducerStep::IngredientsUpsert, Some(input))
            .await?;
        Ok(summary.rows_changed)
    }

    async fn write_back_parsed_ingredients(&self) -> Result<()> {
        self.invoke(ProducerStep::IngredientsWriteBack, None).await?;
        Ok(())
    }

    async fn normalize_durations(&self) -> Result<()> {
        self.invoke(ProducerStep::DurationsNormalize, None).await?;
        Ok(())
    }
}

#[async_trait]
impl IngredientLinker for CommandProducers {
    async fn create_schema(&self) -> Result<()> {
        self.invoke(ProducerStep::LinksCreate, None).await?;
        Ok(())
    }

    async fn populate(&self) -> Result<()> {
        self.invoke(ProducerStep::LinksPopulate, None).await?;
        Ok(())
    }
}
