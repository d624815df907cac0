//! foodsync - dependency-aware ingestion for the food data stores
//!
//! Brings a PostgreSQL database and a MongoDB recipe collection to a complete
//! state by running only the ingestion stages whose outputs are missing or
//! stale. Re-running against a complete state does nothing.
//!
//! # Core Concepts
//!
//! - **Artifact**: a dataset in one of the stores, present or absent
//! - **Need-set**: artifacts the current run must produce; starts as the
//!   absent ones and grows when an upstream artifact changes
//! - **Stage**: a unit of ingestion work that reports the artifacts it changed
//! - **Producers**: the collaborators that do the actual scraping and loading,
//!   configured as external commands
//!
//! # Example Usage
//!
//! ```no_run
//! use foodsync::{CommandProducers, PipelineDriver, Producers, SyncConfig};
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = SyncConfig::from_env()?;
//! let commands = CommandProducers::load(Path::new("foodsync.toml"))?;
//! let driver = PipelineDriver::from_config(&config, Producers::from_commands(commands));
//!
//! let report = driver.run().await;
//! println!("{}: {} error(s)", report.status, report.errors.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: presence probe, need resolution, stages, index maintenance
//! - [`store`]: PostgreSQL and MongoDB adapters
//! - [`producers`]: producer contracts and the command-backed implementation

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod producers;
pub mod progress;
pub mod store;
pub mod util;

pub use config::{ConfigError, MongoSettings, PostgresSettings, SyncConfig};
pub use pipeline::{
    Artifact, FailurePolicy, IndexAction, NeedSet, PipelineDriver, PresenceSnapshot, RunReport,
    RunStatus, StageId,
};
pub use producers::{CommandProducers, ProducerError, Producers};
pub use store::{DocumentStore, RelationalStore, StoreError};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
