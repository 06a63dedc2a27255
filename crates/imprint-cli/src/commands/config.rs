//! Configuration file management command

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use imprint_core::Settings;
use std::path::PathBuf;

/// What the config command does
#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the effective configuration
    #[default]
    Show,

    /// Show the effective configuration as JSON
    Json,

    /// Create a configuration file with default values
    Init,

    /// Print the configuration file path
    Path,
}

/// Arguments for the config command
pub struct ConfigArgs {
    /// Requested action
    pub action: ConfigAction,
    /// Suppress output (for scripting)
    pub silent: bool,
    /// Configuration file in use (overrides the default)
    pub config_file: Option<PathBuf>,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Path => {
            match &args.config_file {
                Some(path) if !args.silent => println!("{}", path.display()),
                None if !args.silent => {
                    eprintln!("{}", style("Could not determine config path").yellow())
                }
                _ => {}
            }
            Ok(())
        }
        ConfigAction::Init => init_config(args.config_file, args.silent),
        ConfigAction::Show => show_config(args.config_file, false, args.silent),
        ConfigAction::Json => show_config(args.config_file, true, args.silent),
    }
}

/// Write a configuration file with default values
fn init_config(config_path: Option<PathBuf>, silent: bool) -> Result<()> {
    let path = config_path.context("Could not determine configuration directory")?;

    if path.exists() {
        if !silent {
            eprintln!(
                "{} Configuration file already exists at: {}",
                style("Warning:").yellow(),
                path.display()
            );
            eprintln!("Use a text editor to modify it, or delete it to re-initialize.");
        }
        return Ok(());
    }

    let saved_path = Settings::default()
        .save_to_path(Some(path))
        .context("Failed to save configuration file")?;

    if !silent {
        println!(
            "{} Created configuration file at: {}",
            style("Success:").green(),
            saved_path.display()
        );
        println!();
        println!("Example settings:");
        println!();
        println!("  [output]");
        println!("  directory = \"/Volumes/Archive\"   # Where per-disc folders are created");
        println!("  operator = \"JD\"                  # Recorded in every manifest");
        println!();
        println!("  [analysis]");
        println!("  enabled = true");
        println!("  command = \"isolyzer\"");
    }

    Ok(())
}

/// Print the effective configuration
fn show_config(config_path: Option<PathBuf>, json: bool, silent: bool) -> Result<()> {
    if silent {
        return Ok(());
    }

    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let settings = Settings::load_from_path(config_path.clone());

    if json {
        let output = serde_json::to_string_pretty(&settings)
            .context("Failed to serialize settings to JSON")?;
        println!("{}", output);
        return Ok(());
    }

    println!("{}", style("Imprint Configuration").bold());
    println!();

    if let Some(path) = &config_path {
        if config_exists {
            println!("  {} {}", style("Config file:").dim(), path.display());
        } else {
            println!(
                "  {} {} {}",
                style("Config file:").dim(),
                path.display(),
                style("(not found, using defaults)").yellow()
            );
        }
    }
    println!();

    println!("{}", style("[output]").cyan());
    println!(
        "  directory = {}",
        display_option(settings.output.directory.as_ref().map(|d| d.display()))
    );
    println!(
        "  operator = {}",
        display_option(settings.output.operator.as_ref())
    );
    println!();

    println!("{}", style("[analysis]").cyan());
    println!("  enabled = {}", settings.analysis.enabled);
    println!("  command = \"{}\"", settings.analysis.command);
    println!();

    println!("{}", style("[behavior]").cyan());
    println!("  assume_yes = {}", settings.behavior.assume_yes);
    println!("  quiet = {}", settings.behavior.quiet);

    if !config_exists {
        println!();
        println!(
            "{}",
            style("Run 'imprint config init' to create a configuration file.").dim()
        );
    }

    Ok(())
}

fn display_option<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => format!("\"{}\"", v),
        None => "(not set)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_action_is_show() {
        assert_eq!(ConfigAction::default(), ConfigAction::Show);
    }

    #[test]
    fn test_show_config_silent() {
        assert!(show_config(None, false, true).is_ok());
        assert!(show_config(None, true, true).is_ok());
    }

    #[test]
    fn test_execute_path_silent() {
        let args = ConfigArgs {
            action: ConfigAction::Path,
            silent: true,
            config_file: None,
        };
        assert!(execute(args).is_ok());
    }

    #[test]
    fn test_init_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("imprint").join("imprint_config.toml");

        init_config(Some(path.clone()), true).unwrap();
        assert!(path.exists());

        let loaded = Settings::load_from_path(Some(path));
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("imprint_config.toml");
        std::fs::write(&path, "[output]\noperator = \"JD\"\n").unwrap();

        init_config(Some(path.clone()), true).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "[output]\noperator = \"JD\"\n");
    }

    #[test]
    fn test_init_without_path() {
        assert!(init_config(None, true).is_err());
    }

    #[test]
    fn test_display_option() {
        assert_eq!(display_option(Some("JD")), "\"JD\"");
        assert_eq!(display_option::<&str>(None), "(not set)");
    }
}
