use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use version_keeper::cli::{self, Command};
use version_keeper::config::DEFAULT_FILE;
use version_keeper::engine::VersionEngine;
use version_keeper::format::Formatter;
use version_keeper::store::file::{parse_setting_value, ConfigStore};
use version_keeper::ui;

#[derive(Parser)]
#[command(
    name = "version-keeper",
    version,
    about = "Track and bump a project's version kept in a version file"
)]
struct Args {
    #[arg(short, long, global = true, default_value = DEFAULT_FILE, help = "Version file path")]
    file: PathBuf,

    #[arg(long, global = true, help = "Allow major/minor/patch bumps in a source mode")]
    force: bool,

    #[arg(short, long, global = true, help = "Log what the engine is doing")]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the current version
    Show {
        /// Named format or template, e.g. `compact` or `{major}.{minor}`
        format: Option<String>,
    },
    /// Increment the commit counter
    Commit,
    /// Increment the major version
    Major,
    /// Increment the minor version
    Minor,
    /// Increment the patch version
    Patch,
    /// Take the version from the configured source
    Absorb {
        #[arg(long, help = "Only refresh the timestamp")]
        timestamp: bool,
    },
    /// Create the version file with default settings
    Init,
    /// Read or change auxiliary settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a setting, e.g. `source.command`
    Get {
        key: String,
        #[arg(long, help = "Printed when the setting is absent")]
        default: Option<String>,
    },
    /// Change a setting; the value is read as TOML when possible
    Set { key: String, value: String },
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            1
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<i32> {
    let command = match args.command {
        Cmd::Show { format } => Command::Show { format },
        Cmd::Commit => Command::Commit,
        Cmd::Major => Command::Major,
        Cmd::Minor => Command::Minor,
        Cmd::Patch => Command::Patch,
        Cmd::Absorb { timestamp } => Command::Absorb {
            timestamp_only: timestamp,
        },
        Cmd::Init => return init(&args.file),
        Cmd::Config { action } => return config(&args.file, action),
    };

    let store = ConfigStore::open(&args.file)?;
    let settings = store.settings()?;
    let formatter = Formatter::from_settings(&settings);

    let mut engine =
        VersionEngine::from_settings(Box::new(store), &settings).with_override(args.force);
    if command.is_mutation() {
        engine.subscribe(ui::display_event);
    }

    let outcome = cli::run_command(&mut engine, &formatter, &settings.format, &command);
    if outcome.success {
        println!("{}", outcome.output);
        Ok(0)
    } else {
        ui::display_error(&outcome.output);
        Ok(1)
    }
}

fn init(path: &Path) -> Result<i32> {
    if ConfigStore::bootstrap(path)? {
        ui::display_success(&format!("Created {}", path.display()));
    } else {
        ui::display_status(&format!("{} already exists, left untouched", path.display()));
    }
    Ok(0)
}

fn config(path: &Path, action: ConfigAction) -> Result<i32> {
    let mut store = ConfigStore::open(path)?;
    match action {
        ConfigAction::Get { key, default } => match (store.get_value(&key), default) {
            (Some(_), _) => println!("{}", store.get(&key, "")),
            (None, Some(default)) => println!("{}", default),
            (None, None) => {
                ui::display_error(&format!("Setting '{}' is not set", key));
                return Ok(1);
            }
        },
        ConfigAction::Set { key, value } => {
            store
                .set(&key, parse_setting_value(&value))
                .with_context(|| format!("setting '{}'", key))?;
            ui::display_success(&format!("{} = {}", key, value));
        }
    }
    Ok(0)
}
