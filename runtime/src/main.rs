// Copyright 2026 Listharvest Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use listharvest_runtime::cli::{self, harvest_cmd::HarvestArgs, output::Output};
use listharvest_runtime::config::HarvestConfig;
use listharvest_runtime::logging::{init_logging, LogConfig, LogFormat};

#[derive(Parser)]
#[command(
    name = "listharvest",
    about = "Listharvest — harvest incrementally loaded list pages",
    version,
    after_help = "Run 'listharvest <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest one list view for each user
    Harvest(HarvestArgs),
    /// Print the stored oldest record
    Oldest {
        /// Data directory to read from
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// Data directory to check
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    let log = LogConfig {
        format: if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    if let Err(e) = init_logging(&log) {
        eprintln!("  Warning: logging unavailable: {e:#}");
    }

    let result = run(cli, out).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if out.json {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

async fn run(cli: Cli, out: Output) -> Result<()> {
    match cli.command {
        Commands::Harvest(args) => {
            let config = HarvestConfig::load_or_default(cli.config.as_deref())?;
            cli::harvest_cmd::run(args, config, out).await
        }
        Commands::Oldest { data_dir } => {
            let data_dir = match data_dir {
                Some(dir) => Some(dir),
                None => HarvestConfig::load_or_default(cli.config.as_deref())?.data_dir,
            };
            cli::oldest_cmd::run(data_dir.as_deref(), out)
        }
        Commands::Doctor { data_dir } => {
            let data_dir = match data_dir {
                Some(dir) => Some(dir),
                None => HarvestConfig::load_or_default(cli.config.as_deref())?.data_dir,
            };
            cli::doctor::run(data_dir.as_deref(), out)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "listharvest", &mut std::io::stdout());
            Ok(())
        }
    }
}
