use clap::{Parser, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use filterkit::action::Action;
use filterkit::config::Config;
use filterkit::core::models::Forest;
use filterkit::services::persistence::{JsonFileSink, load_forest};
use filterkit::session::{EditingSession, Outcome};

/// Replay a script of editor actions against a filter and print the result
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Start from a saved filter instead of a single empty group
    #[arg(long = "load", value_name = "PATH")]
    load: Option<PathBuf>,
    /// JSON array of actions, e.g.
    /// [{"AssignColumn":{"group_id":1,"column_id":"amount"}},"AddGroup"]
    #[arg(long = "script", value_name = "PATH")]
    script: Option<PathBuf>,
    /// Directory saved filters are written to (defaults to <data_dir>/filters)
    #[arg(long = "out", value_name = "DIR")]
    out: Option<PathBuf>,
    /// Print an indented outline instead of the JSON snapshot
    #[arg(long = "outline")]
    outline: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel { Error, Warn, Info, Debug, Trace }

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let level = match args.logging {
        Some(LogLevel::Error) => tracing::Level::ERROR,
        Some(LogLevel::Warn) | None => tracing::Level::WARN,
        Some(LogLevel::Info) => tracing::Level::INFO,
        Some(LogLevel::Debug) => tracing::Level::DEBUG,
        Some(LogLevel::Trace) => tracing::Level::TRACE,
    };
    filterkit::logging::init_with(None, Some(level))?;

    let cfg = Config::from_path(args.config.as_ref()).wrap_err("failed to load configuration")?;
    let sink = JsonFileSink::new(args.out.clone().unwrap_or_else(|| cfg.filters_dir()));

    let mut session = match &args.load {
        Some(path) => {
            let forest: Forest = load_forest(path)
                .wrap_err_with(|| format!("failed to load filter from {}", path.display()))?;
            EditingSession::with_forest(cfg.columns.clone(), forest, sink)
                .wrap_err("cannot resume editing the loaded filter")?
        }
        None => EditingSession::new(cfg.columns.clone(), sink),
    }
    .with_policy(cfg.session.clone());

    let actions: Vec<Action> = match &args.script {
        Some(path) => {
            let text = fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read script {}", path.display()))?;
            serde_json::from_str(&text).wrap_err("script is not a JSON array of actions")?
        }
        None => Vec::new(),
    };

    for (idx, action) in actions.into_iter().enumerate() {
        match session.update(action.clone()) {
            Ok(Outcome::Invalid(errors)) => {
                for (field, error) in errors.iter() {
                    eprintln!("step {}: {} {}: {}", idx + 1, action, field, error);
                }
            }
            Ok(Outcome::Saved(target)) => {
                let path = session.sink().path_for(target);
                eprintln!("step {}: saved to {}", idx + 1, path.display());
            }
            Ok(outcome) => debug!("step {}: {:?}", idx + 1, outcome),
            Err(e) => {
                warn!("step {} failed: {}", idx + 1, e);
                eprintln!("step {}: {} rejected: {}", idx + 1, action, e);
            }
        }
    }

    if args.outline {
        for line in session.forest().outline() {
            println!("{}{}", " ".repeat(line.indent * 2), line.label);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    }
    Ok(())
}
