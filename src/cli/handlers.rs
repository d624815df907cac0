//! Subcommand handlers. Each returns the process exit code.

use super::commands::{OutputFormatArg, PlanArgs, ReindexArgs, RunArgs};
use super::output::OutputFormatter;
use crate::config::SyncConfig;
use crate::pipeline::{IndexAction, PipelineDriver, PlanReport};
use crate::producers::{CommandProducers, Producers};
use crate::progress::LoggingHandler;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};

fn load_config() -> Result<SyncConfig> {
    let config = SyncConfig::from_env()?;
    config.validate()?;
    debug!("{}", config);
    Ok(config)
}

fn print(format: OutputFormatArg, render: impl FnOnce(&OutputFormatter) -> Result<String>) -> i32 {
    let formatter = OutputFormatter::new(format.into());
    match render(&formatter) {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

/// Driver for commands that never call a producer.
fn read_only_driver(config: &SyncConfig) -> PipelineDriver {
    let producers = Producers::from_commands(CommandProducers::default());
    PipelineDriver::from_config(config, producers).with_progress(Arc::new(LoggingHandler))
}

/// Runs the full pipeline. Stage failures are reported, not turned into a
/// non-zero exit: only unusable configuration is.
pub async fn handle_run(args: &RunArgs) -> i32 {
    let mut config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return 1;
        }
    };

    if let Some(path) = &args.producers {
        config.producers_file = path.clone();
    }
    if let Some(policy) = args.seasonal_failure {
        config.seasonal_failure_policy = policy.into();
    }

    let commands = match CommandProducers::load(&config.producers_file) {
        Ok(commands) => commands,
        Err(e) => {
            error!("Failed to load producers: {}", e);
            return 1;
        }
    };

    let driver = PipelineDriver::from_config(&config, Producers::from_commands(commands))
        .with_progress(Arc::new(LoggingHandler));
    let report = driver.run().await;

    print(args.format, |f| f.format_report(&report))
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return 1;
        }
    };

    let (snapshot, resolution) = read_only_driver(&config).plan().await;
    let plan = PlanReport::new(&snapshot, &resolution);
    print(args.format, |f| f.format_plan(&plan))
}

/// Exits non-zero when the index could not be reconciled, since that is
/// the only thing this command does.
pub async fn handle_reindex(args: &ReindexArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return 1;
        }
    };

    let action = read_only_driver(&config).reindex().await;
    let failed = matches!(action, IndexAction::Failed { .. });
    let code = print(args.format, |f| f.format_index(&action));
    if failed {
        1
    } else {
        code
    }
}
