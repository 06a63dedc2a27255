//! Imprint - verified, auditable imaging of optical discs
//!
//! # Usage
//!
//! ```bash
//! # Show attached disks
//! imprint list
//!
//! # Image a disc interactively
//! sudo imprint backup
//!
//! # Image a disc without prompts
//! sudo imprint backup --disk disk4 --filename FamilyPhotos2004 --directory /Backups --operator JD
//!
//! # Rehearse a run without touching the device
//! imprint backup --disk disk4 --filename Test --directory /tmp --operator JD --dry-run
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use console::style;
use imprint_core::{CancelToken, Settings, exit_code};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// Imprint - verified, auditable imaging of optical discs
#[derive(Parser)]
#[command(name = "imprint")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Suppress ALL output (implies --quiet and --yes)
    #[arg(long, global = true)]
    silent: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "IMPRINT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Image an optical disc and write its log and manifest
    Backup {
        /// Disk identifier (e.g. disk4); prompted for when omitted
        #[arg(short, long)]
        disk: Option<String>,

        /// Base name for the image and its reports, without extension
        #[arg(short, long)]
        filename: Option<String>,

        /// Directory that receives the per-disc output directory
        #[arg(short = 'o', long)]
        directory: Option<PathBuf>,

        /// Operator name or initials recorded in the manifest
        #[arg(long)]
        operator: Option<String>,

        /// Walk through the run without unmounting, copying or analyzing
        #[arg(long)]
        dry_run: bool,

        /// Record verification as not performed
        #[arg(long)]
        no_verification: bool,

        /// Skip structural analysis of the finished image
        #[arg(long)]
        no_analysis: bool,

        /// Structural validator executable
        #[arg(long, value_name = "COMMAND")]
        validator: Option<String>,

        /// Overwrite an existing image without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List attached disks
    List {
        /// Output the properties of every whole disk as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: Option<commands::config::ConfigAction>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{} {}", style("Error:").red().bold(), panic_info);
    }));

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);

            if std::env::var("RUST_BACKTRACE").is_ok() {
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("  {} {}", style("Caused by:").yellow(), cause);
                    source = cause.source();
                }
            }

            let code = e
                .downcast_ref::<imprint_core::Error>()
                .map_or(exit_code::FAILURE, imprint_core::Error::exit_code);
            std::process::exit(code);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Settings::config_path);
    let settings = Settings::load_from_path(config_path.clone());

    // --silent implies --quiet
    let silent = cli.silent;
    let quiet = cli.quiet || silent || settings.behavior.quiet;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // First Ctrl+C stops the copy at the next block, the second exits at once
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            if !silent {
                eprintln!("\n{}", style("Forced exit").red().bold());
            }
            std::process::exit(exit_code::INTERRUPTED);
        }
        handler_token.cancel();
        if !silent {
            eprintln!(
                "\n{}",
                style("Cancelling after the current block... Press Ctrl+C again to force exit")
                    .yellow()
            );
        }
    })?;

    match cli.command {
        Commands::Backup {
            disk,
            filename,
            directory,
            operator,
            dry_run,
            no_verification,
            no_analysis,
            validator,
            yes,
        } => commands::backup::execute(
            commands::backup::BackupArgs {
                disk,
                filename,
                directory,
                operator,
                dry_run,
                no_verification,
                no_analysis,
                validator,
                assume_yes: yes || silent || settings.behavior.assume_yes,
                cancel,
                silent,
            },
            &settings,
        ),
        Commands::List { json } => {
            commands::list::execute(json, silent)?;
            Ok(exit_code::SUCCESS)
        }
        Commands::Config { action } => {
            commands::config::execute(commands::config::ConfigArgs {
                action: action.unwrap_or_default(),
                silent,
                config_file: config_path,
            })?;
            Ok(exit_code::SUCCESS)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(exit_code::SUCCESS)
        }
    }
}
