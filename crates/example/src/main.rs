//! Stratus web app stack CLI.
//!
//! Declares the reference stack and prints its plan document, or with
//! `--preview` the stack outputs resolved by the local preview engine.
//!
//! # Usage
//!
//! ```bash
//! stratus-webapp [--stack <name>] [--config <path>] [--preview]
//! ```
//!
//! # Example
//!
//! ```bash
//! STRATUS_SECRET_registryPassword=... stratus-webapp --stack dev --preview
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use example::{StackError, declare_stack, preview_engine};
use stratus_config::{StackConfig, stack_file_path};
use stratus_core::{BuildInfo, Tracing, TracingFormat};
use tracing::Level;

/// Declare the Stratus reference web app stack.
#[derive(Debug, Parser)]
#[command(name = "stratus-webapp", version, about)]
struct Cli {
    /// Stack to declare; selects `Stratus.<stack>.toml`.
    #[arg(long, short, env = "STRATUS_STACK", default_value = "dev")]
    stack: String,

    /// Stack file to load instead of `Stratus.<stack>.toml`.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Project name override.
    #[arg(long, env = "STRATUS_PROJECT")]
    project: Option<String>,

    /// Resolve the plan with the local preview engine and print the outputs.
    #[arg(long)]
    preview: bool,

    /// Maximum log level.
    #[arg(long, env = "STRATUS_LOG_LEVEL", default_value = "warn")]
    log_level: Level,

    /// Log output format: pretty, compact or json.
    #[arg(long, env = "STRATUS_LOG_FORMAT", default_value = "compact")]
    log_format: TracingFormat,
}

#[expect(clippy::print_stderr, reason = "CLI reports fatal errors on stderr")]
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    Tracing::new()
        .with_level(cli.log_level)
        .with_format(cli.log_format)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<StackConfig, StackError> {
    let mut config = match &cli.config {
        Some(path) => StackConfig::load(path, &cli.stack)?,
        None => {
            let path = stack_file_path(".", &cli.stack);
            if path.is_file() {
                StackConfig::load(&path, &cli.stack)?
            } else {
                tracing::info!(path = %path.display(), "no stack file, using environment only");
                StackConfig::new(stratus_config::DEFAULT_PROJECT, cli.stack.as_str())
            }
        }
    };
    if let Some(project) = &cli.project {
        config = config.with_project(project.as_str());
    }
    let applied = config.apply_process_env();
    tracing::debug!(applied, "applied environment overrides");
    Ok(config)
}

#[expect(clippy::print_stdout, reason = "CLI writes the plan to stdout")]
fn run(cli: &Cli) -> Result<(), StackError> {
    let info = BuildInfo::default();
    tracing::info!(version = info.version, debug = info.debug, stack = %cli.stack, "starting");

    let config = load_config(cli)?;
    let plan = declare_stack(&config)?;

    if cli.preview {
        let (_, resolved) = preview_engine(config.secret_store()).preview(&plan)?;
        println!("{}", serde_json::to_string_pretty(&resolved.public_outputs())?);
    } else {
        println!("{}", plan.to_json_pretty()?);
    }
    Ok(())
}
