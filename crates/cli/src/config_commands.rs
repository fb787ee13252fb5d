use std::path::{Path, PathBuf};

use {anyhow::Result, clap::Subcommand};

use recordbot_config::{
    DEFAULT_CONFIG_TEMPLATE, RecordBotConfig, Severity, ValidationResult, validate,
    write_new_config,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with the token masked.
    Show,
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Write a commented starter config file.
    Init {
        /// Where to write it.
        #[arg(default_value = "recordbot.toml")]
        path: PathBuf,
    },
}

/// `effective` loads the config with command-line overrides applied; only
/// `show` needs it, so a broken file can still be checked.
pub fn handle_config(
    action: &ConfigAction,
    config_path: Option<&Path>,
    effective: impl FnOnce() -> Result<RecordBotConfig>,
) -> Result<()> {
    match action {
        ConfigAction::Show => show(&effective()?),
        ConfigAction::Check { verbose } => check(config_path, *verbose),
        ConfigAction::Init { path } => {
            write_new_config(path, DEFAULT_CONFIG_TEMPLATE)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        },
    }
}

fn show(config: &RecordBotConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate(config_path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let shown = print_diagnostics(&result, verbose);
    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Print diagnostics to stderr. Returns how many were shown.
pub fn print_diagnostics(result: &ValidationResult, verbose: bool) -> usize {
    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }
    shown
}
