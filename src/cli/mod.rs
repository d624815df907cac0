pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, PlanArgs, ReindexArgs, RunArgs};
pub use output::{OutputFormat, OutputFormatter};
