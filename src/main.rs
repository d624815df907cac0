use foodsync::cli::commands::{CliArgs, Commands};
use foodsync::cli::handlers::{handle_plan, handle_reindex, handle_run};
use foodsync::util::logging::{init_logging, parse_level, LoggingConfig};
use foodsync::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("foodsync v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args).await,
        Commands::Plan(plan_args) => handle_plan(plan_args).await,
        Commands::Reindex(reindex_args) => handle_reindex(reindex_args).await,
    };

    std::process::exit(exit_code);
}

/// Flags win over `FOODSYNC_LOG_LEVEL`; `FOODSYNC_LOG_JSON` always applies.
fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
