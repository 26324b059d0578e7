//! Steward CLI orchestrator
//!
//! This binary provides the main entry point for Steward, offering
//! subcommands to plan cached-channel clients from service descriptors,
//! write a starter configuration, and exercise the lifecycle controller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::Config;
use steward_cli::demo::{run_demo, DemoOptions};
use steward_cli::{build_plans, load_services, write_json, write_plans_to_dir, CliError, Result};

/// Command-line interface configuration for steward.
#[derive(Parser, Debug)]
#[command(name = "steward", about = "Cached-channel client planner", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
    /// Configuration file (defaults to the user config file, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Available steward commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build client plans from service descriptors and print them as JSON
    Plan {
        /// Service descriptor file (defaults to codegen.input_path)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Write the plans to this file instead of stdout
        #[arg(long, conflicts_with = "write")]
        output: Option<PathBuf>,
        /// Write one plan file per service into codegen.output_dir
        #[arg(long)]
        write: bool,
        /// Plan only this service
        #[arg(long)]
        service: Option<String>,
    },
    /// Write a default configuration file
    InitConfig {
        /// Destination (defaults to the user config file)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run calls through a controller over the in-memory backend
    Demo {
        /// Number of calls
        #[arg(long, default_value_t = 5)]
        calls: usize,
        /// Fail every n-th call (0 disables faults)
        #[arg(long, default_value_t = 0)]
        fault_every: usize,
        /// Finish with a cancelled call
        #[arg(long)]
        cancel: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig { path, force } = &cli.cmd {
        return init_config(path.clone(), *force);
    }

    let config = Config::load_or_default(cli.config.as_deref())?;
    logging::init_with_file(&config.logging.level, config.logging.file.as_deref())?;

    match cli.cmd {
        Commands::Plan { input, output, write, service } => {
            let input = input.unwrap_or_else(|| config.codegen.input_path.clone());
            let ir = load_services(&input)?;
            let plans = build_plans(&ir, &config.generation, service.as_deref())?;
            tracing::info!(services = plans.len(), input = %input.display(), "planned clients");

            if write {
                for path in write_plans_to_dir(&plans, &config.codegen.output_dir)? {
                    println!("Wrote {}", path.display());
                }
            } else {
                write_json(&plans, output.as_deref())?;
            }
        }
        Commands::Demo { calls, fault_every, cancel } => {
            let report = run_demo(&DemoOptions { calls, fault_every, cancel }).await?;
            write_json(&report, None)?;
        }
        Commands::InitConfig { .. } => {}
    }
    Ok(())
}

/// Write a default configuration to `path` or the default location.
fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
