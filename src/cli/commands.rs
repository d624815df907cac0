use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::pipeline::FailurePolicy;

/// Dependency-aware ingestion runner for the food data stores
#[derive(Parser, Debug)]
#[command(
    name = "foodsync",
    about = "Dependency-aware ingestion runner for the food data stores",
    version,
    author,
    long_about = "foodsync inspects PostgreSQL and MongoDB, works out which datasets are \
                  missing or stale, and runs only the ingestion stages needed to bring \
                  both stores to a complete state. Running it twice in a row does nothing \
                  the second time."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose output (debug logging)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Bring both stores to a complete state",
        long_about = "Probes both stores, runs every stage whose output is missing or stale, \
                      then reconciles the recipe text index.\n\n\
                      Examples:\n  \
                      foodsync run\n  \
                      foodsync run --format json\n  \
                      foodsync run --producers /etc/foodsync/producers.toml"
    )]
    Run(RunArgs),

    #[command(
        about = "Show what the next run would do",
        long_about = "Probes both stores and prints the presence snapshot and the resulting \
                      need-set. Nothing is written.\n\n\
                      Examples:\n  \
                      foodsync plan\n  \
                      foodsync plan --format yaml"
    )]
    Plan(PlanArgs),

    #[command(about = "Reconcile the recipe text index only")]
    Reindex(ReindexArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Report format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'p',
        long,
        value_name = "FILE",
        help = "Producers file (overrides FOODSYNC_PRODUCERS)"
    )]
    pub producers: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        value_name = "POLICY",
        help = "What a failed seasonal calendar stage does (overrides FOODSYNC_SEASONAL_FAILURE)"
    )]
    pub seasonal_failure: Option<FailurePolicyArg>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ReindexArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicyArg {
    /// Stop the run; remaining stages are skipped
    Abort,
    /// Record the failure and carry on
    Continue,
}

impl From<FailurePolicyArg> for FailurePolicy {
    fn from(arg: FailurePolicyArg) -> Self {
        match arg {
            FailurePolicyArg::Abort => FailurePolicy::Abort,
            FailurePolicyArg::Continue => FailurePolicy::Continue,
        }
    }
}
